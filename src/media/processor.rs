use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

use super::{MediaCommandBuilder, MediaProcessorTrait};
use crate::config::{MediaConfig, StreamSelector};
use crate::error::{Result, SubExtractError};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path, config.timeout());

        Self { command_builder }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn probe(&self, video_path: &Path) -> Result<String> {
        debug!("Probing {} for subtitle streams", video_path.display());

        let command = self.command_builder.probe(video_path);
        // ffmpeg always exits non-zero without an output file, so the exit
        // status carries no meaning here
        let output = command.execute().await.map_err(|e| match e {
            SubExtractError::Io(io) => {
                SubExtractError::DiscoveryTool(format!("Failed to execute {}: {}", command.binary_path, io))
            }
            other => other,
        })?;

        debug!("Probe exited with {:?}", output.status_code);
        Ok(output.stderr)
    }

    async fn extract_subtitle_stream(
        &self,
        video_path: &Path,
        selector: StreamSelector,
        index: u32,
        output_path: &Path,
    ) -> Result<()> {
        let command = self
            .command_builder
            .extract_subtitle(video_path, selector, index, output_path);
        let output = command.execute().await.map_err(|e| match e {
            SubExtractError::Io(io) => {
                SubExtractError::Media(format!("Failed to execute {}: {}", command.binary_path, io))
            }
            other => other,
        })?;

        if !output.success {
            return Err(SubExtractError::StreamExtraction {
                index,
                output: output_path.to_path_buf(),
                diagnostics: output.stderr.trim().to_string(),
            });
        }

        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        let output = self
            .command_builder
            .version_check()
            .execute()
            .await
            .map_err(|e| SubExtractError::Media(format!("Media processor not found: {}", e)))?;

        if output.success {
            info!("Media processor is available");
            Ok(())
        } else {
            Err(SubExtractError::Media("Media processor version check failed".to_string()))
        }
    }

    async fn get_version_info(&self) -> Result<String> {
        debug!("Getting media processor version information");

        let command = self.command_builder.version_check();
        let output = command.execute().await.map_err(|e| match e {
            SubExtractError::Io(io) => {
                SubExtractError::Media(format!("Failed to execute media processor: {}", io))
            }
            other => other,
        })?;

        if output.success {
            // The first line carries the version
            let first_line = output.stdout.lines().next().unwrap_or("Unknown version");
            Ok(first_line.to_string())
        } else {
            Err(SubExtractError::Media(format!(
                "Media processor version check failed: {}",
                output.stderr.trim()
            )))
        }
    }
}
