//! Terminal progress bars for long-running import and slicing passes.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use strata_mesh::Progress;

/// [`Progress`] observer drawing an indicatif bar on stderr.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    /// Bar labelled with `label`, sized once the operation announces its total.
    pub fn new(label: &str) -> Result<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] {msg:>6} [{bar:40.cyan/blue}] {pos}/{len}")?
                .progress_chars("#>-"),
        );
        bar.set_message(label.to_string());
        Ok(Self { bar })
    }

    #[cfg(test)]
    fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Progress for BarProgress {
    fn set_size(&mut self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    fn increment(&mut self) {
        self.bar.inc(1);
    }

    fn done(&mut self) {
        self.bar.finish();
    }
}
