use crate::error::{PostPermError, UserFriendlyError};
use crate::extractor::ExtractionResult;
use crate::scanner::BatchOutcome;
use std::path::Path;

#[derive(Debug)]
pub enum BatchEvent<'a> {
    Started { root: &'a Path },
    Visiting { path: &'a Path },
    Extracted { path: &'a Path, result: &'a ExtractionResult },
    Empty { path: &'a Path },
    Failed { path: &'a Path, error: &'a PostPermError },
    Skipped { path: &'a Path },
    Finished { outcome: &'a BatchOutcome },
}

/// Receives batch events; the runner itself never logs.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &BatchEvent<'_>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &BatchEvent<'_>) {
        match event {
            BatchEvent::Started { root } => {
                tracing::info!(root = %root.display(), "batch started");
            }
            BatchEvent::Visiting { path } => {
                tracing::debug!(path = %path.display(), "extracting");
            }
            BatchEvent::Extracted { path, result } => {
                tracing::debug!(
                    path = %path.display(),
                    post = %result.post,
                    layout = %result.layout,
                    permissions = result.permissions.len(),
                    "extracted"
                );
            }
            BatchEvent::Empty { path } => {
                tracing::debug!(path = %path.display(), "no qualifying permissions");
            }
            BatchEvent::Failed { path, error } => {
                tracing::warn!(path = %path.display(), error = %error.user_message(), "extraction failed");
            }
            BatchEvent::Skipped { path } => {
                tracing::trace!(path = %path.display(), "skipped");
            }
            BatchEvent::Finished { outcome } => {
                tracing::info!(
                    visited = outcome.visited,
                    results = outcome.results.len(),
                    empty = outcome.empty,
                    failed = outcome.failed_paths.len(),
                    skipped = outcome.skipped,
                    "batch finished"
                );
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: &BatchEvent<'_>) {}
}
