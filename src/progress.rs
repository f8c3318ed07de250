//! Progress bar support.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

/// Our default progress style.
pub fn default_progress_style() -> Result<ProgressStyle> {
    Ok(ProgressStyle::default_bar()
        .template("{prefix:>10} {pos:>5}/{len:5} {wide_bar:.cyan/blue} {eta_precise}")?)
}

/// A bar with the default style and a stage prefix.
pub fn stage_bar(prefix: &'static str, len: u64) -> Result<ProgressBar> {
    Ok(ProgressBar::new(len)
        .with_style(default_progress_style()?)
        .with_prefix(prefix))
}
