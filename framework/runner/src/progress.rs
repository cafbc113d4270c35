use indicatif::{ProgressBar, ProgressStyle};

use crate::run::{RunObserver, RunPhase};

/// Displays a progress bar of completed iterations while the test is running.
pub struct ProgressObserver {
    pb: ProgressBar,
}

impl ProgressObserver {
    pub fn new(iterations: usize) -> Self {
        Self::with_bar(ProgressBar::new(iterations as u64))
    }

    fn with_bar(pb: ProgressBar) -> Self {
        match ProgressStyle::with_template(
            "{spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} iterations [{elapsed_precise}] {msg}",
        ) {
            Ok(style) => pb.set_style(style.progress_chars("#>-")),
            Err(e) => log::warn!("Invalid progress style, using the default: {e}"),
        }

        Self { pb }
    }
}

impl RunObserver for ProgressObserver {
    fn on_transition(&self, phase: RunPhase) {
        match phase {
            RunPhase::Done | RunPhase::Failed => self.pb.finish_and_clear(),
            RunPhase::Parsing(iteration) => {
                self.pb.set_position(iteration as u64);
                self.pb.set_message(phase.to_string());
            }
            _ => self.pb.set_message(phase.to_string()),
        }
    }
}
