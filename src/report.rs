use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::extract::StreamOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Ok,
    Error,
}

/// Outcome of processing one video file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pub source_path: PathBuf,
    pub status: ExtractionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub streams: Vec<StreamOutcome>,
}

impl ExtractionResult {
    pub fn ok(source_path: &Path, streams: Vec<StreamOutcome>) -> Self {
        let extracted = streams.iter().filter(|s| s.is_extracted()).count();
        let message = if streams.is_empty() {
            "no subtitle streams found".to_string()
        } else {
            format!(
                "extracted {} of {} subtitle stream(s)",
                extracted,
                streams.len()
            )
        };

        Self {
            source_path: source_path.to_path_buf(),
            status: ExtractionStatus::Ok,
            message: Some(message),
            streams,
        }
    }

    pub fn error<S: Into<String>>(source_path: &Path, message: S) -> Self {
        Self::error_with_streams(source_path, message, Vec::new())
    }

    /// A file that stopped partway; `streams` holds whatever finished before it did
    pub fn error_with_streams<S: Into<String>>(
        source_path: &Path,
        message: S,
        streams: Vec<StreamOutcome>,
    ) -> Self {
        Self {
            source_path: source_path.to_path_buf(),
            status: ExtractionStatus::Error,
            message: Some(message.into()),
            streams,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ExtractionStatus::Ok
    }
}

/// Per-file results of a batch, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub results: Vec<ExtractionResult>,
}

impl BatchReport {
    pub fn push(&mut self, result: ExtractionResult) {
        self.results.push(result);
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Subtitle files written across the whole batch
    pub fn extracted_streams(&self) -> usize {
        self.results
            .iter()
            .flat_map(|r| r.streams.iter())
            .filter(|s| s.is_extracted())
            .count()
    }
}
