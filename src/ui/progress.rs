use crate::events::{BatchEvent, EventSink, TracingSink};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct ProgressManager {
    multi_progress: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            enabled,
        }
    }

    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new_spinner());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} [{pos} files] ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        pb.set_message(message.to_string());
        pb
    }

    pub fn clear(&self) {
        if self.enabled {
            self.multi_progress.clear().ok();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Ticks a spinner per visited file and forwards every event to
/// [`TracingSink`].
pub struct ProgressSink {
    progress_bar: ProgressBar,
    inner: TracingSink,
}

impl ProgressSink {
    pub fn new(progress_bar: ProgressBar) -> Self {
        Self {
            progress_bar,
            inner: TracingSink,
        }
    }

    pub fn progress_bar(&self) -> &ProgressBar {
        &self.progress_bar
    }
}

impl EventSink for ProgressSink {
    fn record(&self, event: &BatchEvent<'_>) {
        match event {
            BatchEvent::Visiting { path } => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                self.progress_bar.set_message(format!("Extracting {}", name));
            }
            BatchEvent::Extracted { .. }
            | BatchEvent::Empty { .. }
            | BatchEvent::Failed { .. }
            | BatchEvent::Skipped { .. } => self.progress_bar.inc(1),
            BatchEvent::Finished { outcome } => {
                finish_progress_with_summary(
                    &self.progress_bar,
                    &format!(
                        "Processed {} files ({} extracted, {} failed)",
                        outcome.visited,
                        outcome.results.len(),
                        outcome.failed()
                    ),
                    self.progress_bar.elapsed(),
                );
            }
            BatchEvent::Started { .. } => {}
        }

        self.progress_bar.suspend(|| self.inner.record(event));
    }
}

pub fn finish_progress_with_summary(pb: &ProgressBar, message: &str, duration: Duration) {
    let final_message = format!("{} (completed in {})", message, format_duration(duration));
    pb.finish_with_message(final_message);
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}
