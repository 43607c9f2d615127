// Media tool plumbing
//
// - Commands: argument builders and the timed process runner
// - Processor: the ffmpeg-backed implementation of the trait below

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use commands::*;
pub use processor::*;

use crate::config::{MediaConfig, StreamSelector};
use crate::error::Result;

/// Operations the subtitle pipeline needs from the external media tool
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Run the tool against the file with no output and return its diagnostic text
    async fn probe(&self, video_path: &Path) -> Result<String>;

    /// Remux one subtitle stream into `output_path`, overwriting it
    async fn extract_subtitle_stream(
        &self,
        video_path: &Path,
        selector: StreamSelector,
        index: u32,
        output_path: &Path,
    ) -> Result<()>;

    /// Check if media processor is available
    async fn check_availability(&self) -> Result<()>;

    /// Get media processor version information
    async fn get_version_info(&self) -> Result<String>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Arc<dyn MediaProcessorTrait> {
        Arc::new(processor::MediaProcessorImpl::new(config))
    }
}
