use async_trait::async_trait;
use serde::Serialize;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::config::StreamSelector;
use crate::discover::SubtitleStream;
use crate::error::{Result, SubExtractError};
use crate::job::ExtractionJob;
use crate::media::MediaProcessorTrait;

/// Extension of every extracted subtitle file
pub const SUBTITLE_EXTENSION: &str = "srt";

/// `{base}.{lang}.srt`, or `{base}.srt` when the language is unknown
pub fn output_file_name(base_name: &OsStr, language: Option<&str>) -> OsString {
    let mut name = base_name.to_os_string();
    if let Some(lang) = language {
        name.push(".");
        name.push(lang);
    }
    name.push(".");
    name.push(SUBTITLE_EXTENSION);
    name
}

pub fn output_path(job: &ExtractionJob, stream: &SubtitleStream) -> PathBuf {
    job.output_dir
        .join(output_file_name(&job.base_name, stream.language.as_deref()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Extracted,
    Failed,
}

/// Result of extracting one subtitle stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamOutcome {
    pub index: u32,
    pub language: String,
    pub output: PathBuf,
    pub status: StreamStatus,
    /// Tool diagnostics, kept only on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

impl StreamOutcome {
    pub fn extracted(stream: &SubtitleStream, output: PathBuf) -> Self {
        Self {
            index: stream.index,
            language: stream.language_tag().to_string(),
            output,
            status: StreamStatus::Extracted,
            diagnostics: None,
        }
    }

    pub fn failed(stream: &SubtitleStream, output: PathBuf, diagnostics: String) -> Self {
        Self {
            index: stream.index,
            language: stream.language_tag().to_string(),
            output,
            status: StreamStatus::Failed,
            diagnostics: Some(diagnostics),
        }
    }

    pub fn is_extracted(&self) -> bool {
        self.status == StreamStatus::Extracted
    }
}

/// Writes one subtitle stream of a job out to its own file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamExtractor: Send + Sync {
    /// A tool failure is reported in the outcome. `Err` is reserved for
    /// failures that make the rest of the file pointless, such as a missing binary.
    async fn extract(&self, job: &ExtractionJob, stream: &SubtitleStream) -> Result<StreamOutcome>;
}

/// Extraction through `ffmpeg -y -i <video> -map <stream> <output>`
pub struct FfmpegStreamExtractor {
    media: Arc<dyn MediaProcessorTrait>,
    selector: StreamSelector,
}

impl FfmpegStreamExtractor {
    pub fn new(media: Arc<dyn MediaProcessorTrait>, selector: StreamSelector) -> Self {
        Self { media, selector }
    }
}

#[async_trait]
impl StreamExtractor for FfmpegStreamExtractor {
    async fn extract(&self, job: &ExtractionJob, stream: &SubtitleStream) -> Result<StreamOutcome> {
        let output = output_path(job, stream);
        debug!(
            "Extracting subtitle stream {} ({}) from {} to {}",
            stream.index,
            stream.language_tag(),
            job.source_path.display(),
            output.display()
        );

        match self
            .media
            .extract_subtitle_stream(&job.source_path, self.selector, stream.index, &output)
            .await
        {
            Ok(()) => Ok(StreamOutcome::extracted(stream, output)),
            Err(SubExtractError::StreamExtraction { diagnostics, .. }) => {
                Ok(StreamOutcome::failed(stream, output, diagnostics))
            }
            Err(e @ SubExtractError::Timeout { .. }) => {
                Ok(StreamOutcome::failed(stream, output, e.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockMediaProcessorTrait;
    use std::path::Path;
    use mockall::predicate::{always, eq};

    fn job() -> ExtractionJob {
        ExtractionJob::resolve(Path::new("/media/Movie.mkv"), None).unwrap()
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name(OsStr::new("Movie"), Some("en")), "Movie.en.srt");
        assert_eq!(output_file_name(OsStr::new("Movie"), None), "Movie.srt");
        assert_eq!(
            output_file_name(OsStr::new("Show.S01E02"), Some("fr")),
            "Show.S01E02.fr.srt"
        );
    }

    #[test]
    fn test_output_path_uses_job_directory() {
        let stream = SubtitleStream::new(2, Some("en"));
        assert_eq!(output_path(&job(), &stream), PathBuf::from("/media/Movie.en.srt"));
    }

    #[tokio::test]
    async fn test_successful_extraction() {
        let mut media = MockMediaProcessorTrait::new();
        media
            .expect_extract_subtitle_stream()
            .withf(|video, selector, index, output| {
                let video: &Path = video.as_ref();
                let output: &Path = output.as_ref();
                video == Path::new("/media/Movie.mkv")
                    && *selector == StreamSelector::Absolute
                    && *index == 2
                    && output == Path::new("/media/Movie.en.srt")
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let extractor = FfmpegStreamExtractor::new(Arc::new(media), StreamSelector::Absolute);
        let outcome = extractor
            .extract(&job(), &SubtitleStream::new(2, Some("en")))
            .await
            .unwrap();

        assert!(outcome.is_extracted());
        assert_eq!(outcome.output, PathBuf::from("/media/Movie.en.srt"));
        assert_eq!(outcome.diagnostics, None);
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_a_failed_outcome() {
        let mut media = MockMediaProcessorTrait::new();
        media
            .expect_extract_subtitle_stream()
            .with(always(), always(), eq(3u32), always())
            .returning(|_, _, index, output| {
                Err(SubExtractError::StreamExtraction {
                    index,
                    output: output.to_path_buf(),
                    diagnostics: "Subtitle encoding currently only possible from text to text or bitmap to bitmap".to_string(),
                })
            });

        let extractor = FfmpegStreamExtractor::new(Arc::new(media), StreamSelector::Absolute);
        let outcome = extractor
            .extract(&job(), &SubtitleStream::new(3, None))
            .await
            .unwrap();

        assert_eq!(outcome.status, StreamStatus::Failed);
        assert_eq!(outcome.language, "unknown");
        assert_eq!(outcome.output, PathBuf::from("/media/Movie.srt"));
        assert!(outcome.diagnostics.unwrap().contains("text to text"));
    }

    #[tokio::test]
    async fn test_timeout_is_a_failed_outcome() {
        let mut media = MockMediaProcessorTrait::new();
        media.expect_extract_subtitle_stream().returning(|_, _, _, _| {
            Err(SubExtractError::Timeout {
                description: "Subtitle stream 2 extraction".to_string(),
                seconds: 5,
            })
        });

        let extractor = FfmpegStreamExtractor::new(Arc::new(media), StreamSelector::Absolute);
        let outcome = extractor
            .extract(&job(), &SubtitleStream::new(2, Some("en")))
            .await
            .unwrap();

        assert_eq!(outcome.status, StreamStatus::Failed);
        assert!(outcome.diagnostics.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_spawn_failure_propagates() {
        let mut media = MockMediaProcessorTrait::new();
        media
            .expect_extract_subtitle_stream()
            .returning(|_, _, _, _| Err(SubExtractError::Media("ffmpeg not found".to_string())));

        let extractor = FfmpegStreamExtractor::new(Arc::new(media), StreamSelector::Absolute);
        let result = extractor.extract(&job(), &SubtitleStream::new(2, Some("en"))).await;
        assert!(matches!(result, Err(SubExtractError::Media(_))));
    }
}
