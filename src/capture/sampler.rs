//! Frame sampling and screenshot pair output.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use super::overlay::OverlayGeometry;
use crate::config::{Config, GatheringConfig};
use crate::paths::{drivers_dir, sectors_dir};

/// A sequence of decoded frames in playback order.
pub trait FrameSource {
    /// Frames per second of the recording.
    fn fps(&self) -> f64;

    /// Total number of frames, if known up front.
    fn frame_count(&self) -> Option<u64>;

    /// Decodes the next frame. `None` at the end.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Advances past a frame that won't be captured. Returns false at the end.
    fn skip_frame(&mut self) -> Result<bool> {
        Ok(self.next_frame()?.is_some())
    }
}

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Frames already extracted to a directory, ordered by file name.
pub struct ImageSequence {
    frames: Vec<PathBuf>,
    fps: f64,
    position: usize,
}

impl ImageSequence {
    pub fn open(dir: &Path, fps: f64) -> Result<Self> {
        if fps.is_nan() || fps <= 0.0 {
            return Err(anyhow!("Frame rate must be positive, got {}", fps));
        }

        let entries =
            fs::read_dir(dir).with_context(|| format!("Failed to read frames from {}", dir.display()))?;
        let mut frames: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(anyhow!("No frame images in {}", dir.display()));
        }
        info!("Found {} frames in {}", frames.len(), dir.display());

        Ok(Self {
            frames,
            fps,
            position: 0,
        })
    }
}

impl FrameSource for ImageSequence {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.frames.len() as u64)
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.frames.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;
        let frame = image::open(path)
            .with_context(|| format!("Failed to decode frame {}", path.display()))?;
        Ok(Some(frame.to_rgb8()))
    }

    fn skip_frame(&mut self) -> Result<bool> {
        if self.position >= self.frames.len() {
            return Ok(false);
        }
        self.position += 1;
        Ok(true)
    }
}

/// Decides which frames get captured.
///
/// Frames are counted from the start of the recording until the start
/// offset is passed. From then on a frame is captured whenever the counter
/// exceeds one step, and the counter restarts.
#[derive(Debug)]
pub struct SampleSchedule {
    start_frames: f64,
    step_frames: f64,
    stop_at: Option<u64>,
    counter: u64,
    position: u64,
    started: bool,
}

impl SampleSchedule {
    pub fn new(gathering: &GatheringConfig, fps: f64, frame_count: Option<u64>) -> Self {
        let end_frames = gathering.end_offset_min * 60.0 * fps;
        Self {
            start_frames: gathering.start_offset_min * 60.0 * fps,
            step_frames: gathering.step * fps,
            stop_at: frame_count.map(|n| (n as f64 - end_frames).max(0.0) as u64),
            counter: 0,
            position: 0,
            started: false,
        }
    }

    /// Number of captures expected over the whole recording, if its length
    /// is known.
    pub fn expected_captures(&self) -> Option<u64> {
        let stop = self.stop_at?;
        let span = (stop as f64 - self.start_frames).max(0.0);
        if self.step_frames <= 0.0 {
            return Some(span as u64);
        }
        Some((span / self.step_frames) as u64)
    }

    /// True once the end offset is reached.
    pub fn is_finished(&self) -> bool {
        self.stop_at.is_some_and(|stop| self.position >= stop)
    }

    /// Consumes one frame slot and returns whether that frame is captured.
    pub fn advance(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.position += 1;

        let mut capture = false;
        if self.started || self.counter as f64 > self.start_frames {
            self.started = true;
            if self.counter as f64 > self.step_frames {
                self.counter = 0;
                capture = true;
            }
        }
        self.counter += 1;
        capture
    }
}

/// Counts reported at the end of a gathering run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct GatherSummary {
    pub removed: usize,
    pub saved: u64,
    pub red_flags: u64,
}

/// Deletes every file in `dir`, returning how many were removed.
fn clear_dir(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Samples `source` and writes a driver/sector screenshot pair per captured
/// frame.
///
/// Existing screenshots are deleted first. Red-flag frames are not saved
/// but still use up a capture index. `on_progress(captured, expected)` is
/// called once per captured frame.
pub fn gather_screenshots(
    source: &mut dyn FrameSource,
    config: &Config,
    screenshots: &Path,
    mut on_progress: impl FnMut(u64, Option<u64>),
) -> Result<GatherSummary> {
    let drivers_out = drivers_dir(screenshots);
    let sectors_out = sectors_dir(screenshots);
    fs::create_dir_all(&drivers_out)
        .with_context(|| format!("Failed to create {}", drivers_out.display()))?;
    fs::create_dir_all(&sectors_out)
        .with_context(|| format!("Failed to create {}", sectors_out.display()))?;

    let mut summary = GatherSummary {
        removed: clear_dir(&drivers_out)? + clear_dir(&sectors_out)?,
        ..Default::default()
    };
    info!("Removed {} existing screenshots", summary.removed);

    let geometry = OverlayGeometry::from_config(config);
    let frame_count = source.frame_count();
    let mut schedule = SampleSchedule::new(&config.race_gathering, source.fps(), frame_count);
    let expected = schedule.expected_captures();
    let mut captured = 0u64;

    while !schedule.is_finished() {
        if !schedule.advance() {
            if !source.skip_frame()? {
                break;
            }
            continue;
        }

        let Some(frame) = source.next_frame()? else {
            break;
        };

        if geometry.is_red_flag(&frame) {
            debug!("Red flag on capture {}, not saved", captured);
            summary.red_flags += 1;
        } else {
            let (drivers, sectors) = geometry.split_overlay(&frame);
            let name = format!("{}.png", captured);
            drivers
                .save(drivers_out.join(&name))
                .with_context(|| format!("Failed to save driver screenshot {}", name))?;
            sectors
                .save(sectors_out.join(&name))
                .with_context(|| format!("Failed to save sector screenshot {}", name))?;
            summary.saved += 1;
        }

        captured += 1;
        on_progress(captured, expected);
    }

    info!(
        "Captured {} frames: {} saved, {} red flag",
        captured, summary.saved, summary.red_flags
    );
    Ok(summary)
}
