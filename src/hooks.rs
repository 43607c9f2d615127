//! Adapters for a media library host.
//!
//! A host calls one hook when its scanner discovers a new file and another
//! for retroactive jobs over files it already knows. Both map the host's
//! JSON records onto [`Workflow::process_one`] / [`Workflow::process_many`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::SubExtractError;
use crate::report::{ExtractionResult, ExtractionStatus};
use crate::workflow::Workflow;

/// A newly scanned media item; fields other than the path are ignored
#[derive(Debug, Clone, Deserialize)]
pub struct ScanEvent {
    #[serde(alias = "file", alias = "file_path", alias = "video_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookStatus {
    pub status: ExtractionStatus,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetroactiveTask {
    #[serde(alias = "files", alias = "video_paths")]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStatus {
    pub file: PathBuf,
    pub status: ExtractionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetroactiveResponse {
    pub results: Vec<FileStatus>,
    /// Set when the task itself could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ExtractionResult> for HookStatus {
    fn from(result: ExtractionResult) -> Self {
        Self {
            status: result.status,
            message: result.message.unwrap_or_default(),
        }
    }
}

impl From<ExtractionResult> for FileStatus {
    fn from(result: ExtractionResult) -> Self {
        Self {
            file: result.source_path,
            status: result.status,
            message: result.message,
        }
    }
}

/// Scan-time hook
pub async fn on_scan(workflow: &Workflow, event: ScanEvent) -> HookStatus {
    workflow.process_one(&event.path).await.into()
}

/// Scan-time hook over a raw JSON record. Malformed input becomes an error status.
pub async fn on_scan_json(workflow: &Workflow, input: &str) -> HookStatus {
    match serde_json::from_str::<ScanEvent>(input) {
        Ok(event) => on_scan(workflow, event).await,
        Err(e) => HookStatus {
            status: ExtractionStatus::Error,
            message: SubExtractError::HookInput(e.to_string()).to_string(),
        },
    }
}

/// Retroactive-task hook
pub async fn on_retroactive(workflow: &Workflow, task: RetroactiveTask) -> RetroactiveResponse {
    let report = workflow.process_many(&task.paths).await;
    RetroactiveResponse {
        results: report.results.into_iter().map(FileStatus::from).collect(),
        error: None,
    }
}

/// Retroactive-task hook over a raw JSON record. Malformed input becomes an
/// empty response carrying the error.
pub async fn on_retroactive_json(workflow: &Workflow, input: &str) -> RetroactiveResponse {
    match serde_json::from_str::<RetroactiveTask>(input) {
        Ok(task) => on_retroactive(workflow, task).await,
        Err(e) => RetroactiveResponse {
            results: Vec::new(),
            error: Some(SubExtractError::HookInput(e.to_string()).to_string()),
        },
    }
}
