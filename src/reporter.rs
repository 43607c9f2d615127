//! Run observers.
//!
//! The workflow never logs its outcomes directly; it hands every event to the
//! [`Reporter`] it was built with. The binary uses [`TracingReporter`] (or
//! [`ProgressReporter`] for batches) and tests plug in a recorder.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{error, info, warn};

use crate::discover::SubtitleStream;
use crate::extract::{StreamOutcome, StreamStatus};
use crate::report::{ExtractionResult, ExtractionStatus};

pub trait Reporter: Send + Sync {
    fn file_started(&self, _source: &Path) {}

    fn streams_discovered(&self, _source: &Path, _streams: &[SubtitleStream]) {}

    /// The file has no subtitle streams
    fn no_streams(&self, _source: &Path) {}

    fn stream_finished(&self, _source: &Path, _outcome: &StreamOutcome) {}

    /// A stream is about to overwrite a file written earlier for the same source
    fn output_overwritten(&self, _source: &Path, _output: &Path) {}

    fn file_finished(&self, _result: &ExtractionResult) {}
}

/// Structured log lines through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn file_started(&self, source: &Path) {
        info!(file = %source.display(), "Processing video file");
    }

    fn streams_discovered(&self, source: &Path, streams: &[SubtitleStream]) {
        info!(
            file = %source.display(),
            count = streams.len(),
            "Found subtitle stream(s)"
        );
    }

    fn no_streams(&self, source: &Path) {
        warn!(file = %source.display(), "No subtitle streams found");
    }

    fn stream_finished(&self, source: &Path, outcome: &StreamOutcome) {
        match outcome.status {
            StreamStatus::Extracted => info!(
                file = %source.display(),
                stream = outcome.index,
                language = %outcome.language,
                output = %outcome.output.display(),
                "Extracted subtitle stream"
            ),
            StreamStatus::Failed => error!(
                file = %source.display(),
                stream = outcome.index,
                language = %outcome.language,
                output = %outcome.output.display(),
                diagnostics = outcome.diagnostics.as_deref().unwrap_or_default(),
                "Failed to extract subtitle stream"
            ),
        }
    }

    fn output_overwritten(&self, source: &Path, output: &Path) {
        warn!(
            file = %source.display(),
            output = %output.display(),
            "Several subtitle streams share a language; overwriting earlier output"
        );
    }

    fn file_finished(&self, result: &ExtractionResult) {
        let message = result.message.as_deref().unwrap_or_default();
        match result.status {
            ExtractionStatus::Ok => {
                info!(file = %result.source_path.display(), "Finished: {}", message)
            }
            ExtractionStatus::Error => {
                error!(file = %result.source_path.display(), "Failed: {}", message)
            }
        }
    }
}

/// A terminal progress bar over a batch of files, with log lines routed
/// around it
pub struct ProgressReporter {
    bar: ProgressBar,
    inner: TracingReporter,
}

impl ProgressReporter {
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }

        Self {
            bar,
            inner: TracingReporter,
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Reporter for ProgressReporter {
    fn file_started(&self, source: &Path) {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.bar.set_message(name);
        self.bar.suspend(|| self.inner.file_started(source));
    }

    fn streams_discovered(&self, source: &Path, streams: &[SubtitleStream]) {
        self.bar
            .suspend(|| self.inner.streams_discovered(source, streams));
    }

    fn no_streams(&self, source: &Path) {
        self.bar.suspend(|| self.inner.no_streams(source));
    }

    fn stream_finished(&self, source: &Path, outcome: &StreamOutcome) {
        self.bar.suspend(|| self.inner.stream_finished(source, outcome));
    }

    fn output_overwritten(&self, source: &Path, output: &Path) {
        self.bar.suspend(|| self.inner.output_overwritten(source, output));
    }

    fn file_finished(&self, result: &ExtractionResult) {
        self.bar.suspend(|| self.inner.file_finished(result));
        self.bar.inc(1);
    }
}
