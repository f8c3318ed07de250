//! Driver identity resolution.
//!
//! OCR frequently confuses similar glyphs in driver codes. Codes that don't
//! appear in the roster are replaced with the most similar roster entry;
//! when a code has no similar entry at all, the whole driver column is read
//! again at a random scale.

use image::DynamicImage;
use log::{debug, info, warn};
use rand::Rng;

use crate::config::Config;
use crate::ocr::extract::read_driver_codes;
use crate::ocr::{preprocess_image, split_drivers, GridGeometry, OcrEngine, SplitError};

/// Candidates returned by `close_matches`.
pub const MAX_CANDIDATES: usize = 3;

/// Minimum similarity ratio for a roster entry to count as a candidate.
pub const SIMILARITY_CUTOFF: f64 = 0.6;

/// Longest common block of `a` and `b` as (start in a, start in b, length).
/// Ties go to the block starting earliest in `a`, then earliest in `b`.
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    for i in 0..a.len() {
        let mut row = vec![0usize; b.len() + 1];
        for j in 0..b.len() {
            if a[i] != b[j] {
                continue;
            }
            let k = prev[j] + 1;
            row[j + 1] = k;
            let (si, sj) = (i + 1 - k, j + 1 - k);
            if k > best.2 || (k == best.2 && (si, sj) < (best.0, best.1)) {
                best = (si, sj, k);
            }
        }
        prev = row;
    }
    best
}

/// Number of characters covered by recursively matched blocks.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, k) = longest_match(a, b);
    if k == 0 {
        return 0;
    }
    k + matching_chars(&a[..i], &b[..j]) + matching_chars(&a[i + k..], &b[j + k..])
}

/// Ratcliff/Obershelp similarity in [0, 1].
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// Roster entries at least `cutoff` similar to `word`, best first.
/// Equal scores are ordered by descending code.
///
/// The ratio is not symmetric: each candidate is the first sequence and
/// `word` the second.
pub fn close_matches(word: &str, roster: &[String], n: usize, cutoff: f64) -> Vec<String> {
    let mut scored: Vec<(f64, &String)> = roster
        .iter()
        .map(|candidate| (similarity(candidate, word), candidate))
        .filter(|(score, _)| *score >= cutoff)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| b.1.cmp(a.1)));
    scored.into_iter().take(n).map(|(_, c)| c.clone()).collect()
}

/// Maps every raw code onto the roster. Returns `None` if any code has no
/// candidate.
pub fn correct_codes(raw: &[String], roster: &[String]) -> Option<Vec<String>> {
    raw.iter()
        .map(|code| {
            if roster.contains(code) {
                return Some(code.clone());
            }
            let best = close_matches(code, roster, MAX_CANDIDATES, SIMILARITY_CUTOFF)
                .into_iter()
                .next()?;
            debug!("{} -> {}", code, best);
            Some(best)
        })
        .collect()
}

/// Reads and resolves the driver codes of one frame.
///
/// The first attempt uses the configured resize scale; every failed attempt
/// is retried at a random scale until `retry_limit` retries are spent. An
/// empty result means the frame could not be identified and should be
/// skipped. A geometry mismatch at any scale is fatal.
pub fn resolve_drivers<R: Rng + ?Sized>(
    engine: &dyn OcrEngine,
    image: &DynamicImage,
    config: &Config,
    rng: &mut R,
) -> Result<Vec<String>, SplitError> {
    let processing = &config.race_processing;
    let geometry = GridGeometry::from_config(config);
    let roster = config.roster();
    let mut resize_scale = processing.default_resize_scale;

    for attempt in 0..=processing.retry_limit {
        let preprocessed = preprocess_image(image, resize_scale, true);
        let bands = split_drivers(&preprocessed, resize_scale, &geometry)?;
        let raw = read_driver_codes(engine, &bands, processing.bright_pixel_threshold);

        if let Some(codes) = correct_codes(&raw, &roster) {
            info!("Parsed drivers: {:?}", codes);
            return Ok(codes);
        }

        resize_scale = rng.gen_range(processing.retry_scale_min..=processing.retry_scale_max);
        debug!(
            "Unmatched driver code in {:?} (attempt {}), retrying at scale {}",
            raw, attempt, resize_scale
        );
    }

    warn!(
        "Could not identify drivers after {} retries, skipping frame",
        processing.retry_limit
    );
    Ok(Vec::new())
}
