use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::Config;
use crate::discover::{FfmpegStreamDiscoverer, StreamDiscoverer};
use crate::error::{Result, SubExtractError};
use crate::extract::{FfmpegStreamExtractor, StreamExtractor, StreamOutcome, output_path};
use crate::job::ExtractionJob;
use crate::media::MediaProcessorFactory;
use crate::report::{BatchReport, ExtractionResult};
use crate::reporter::Reporter;

/// Drives discovery and extraction over one file or a list of files.
///
/// Files are processed one at a time and streams within a file in discovery
/// order. Whatever goes wrong with a file (including a panic) ends up as an
/// error result for that file alone.
#[derive(Clone)]
pub struct Workflow {
    discoverer: Arc<dyn StreamDiscoverer>,
    extractor: Arc<dyn StreamExtractor>,
    reporter: Arc<dyn Reporter>,
    output_dir: Option<PathBuf>,
    video_extensions: Vec<String>,
    cancelled: Arc<AtomicBool>,
}

impl Workflow {
    /// Wire the ffmpeg-backed discoverer and extractor from configuration
    pub fn new(config: &Config, reporter: Arc<dyn Reporter>) -> Self {
        let media = MediaProcessorFactory::create_processor(config.media.clone());
        let discoverer = Arc::new(FfmpegStreamDiscoverer::new(media.clone()));
        let extractor = Arc::new(FfmpegStreamExtractor::new(
            media,
            config.extraction.stream_selector,
        ));

        Self::with_components(discoverer, extractor, reporter)
            .with_output_dir(config.extraction.output_dir.clone())
            .with_video_extensions(config.extraction.video_extensions.clone())
    }

    pub fn with_components(
        discoverer: Arc<dyn StreamDiscoverer>,
        extractor: Arc<dyn StreamExtractor>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            discoverer,
            extractor,
            reporter,
            output_dir: None,
            video_extensions: Config::default().extraction.video_extensions,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Write subtitles into `output_dir` instead of next to each video
    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_video_extensions(mut self, extensions: Vec<String>) -> Self {
        self.video_extensions = extensions;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Share an existing cancellation flag instead of the workflow's own
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Flag that stops the run at the next file or stream boundary once set
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Extract every subtitle stream of a single video file
    pub async fn process_one(&self, video_path: &Path) -> ExtractionResult {
        self.reporter.file_started(video_path);

        let result = if self.is_cancelled() {
            ExtractionResult::error(video_path, SubExtractError::Cancelled.to_string())
        } else if !fs::try_exists(video_path).await.unwrap_or(false) {
            ExtractionResult::error(
                video_path,
                SubExtractError::FileNotFound(video_path.display().to_string()).to_string(),
            )
        } else {
            self.process_isolated(video_path).await
        };

        self.reporter.file_finished(&result);
        result
    }

    /// Process each path in order; one file's failure never affects another's
    pub async fn process_many<P: AsRef<Path>>(&self, video_paths: &[P]) -> BatchReport {
        let mut report = BatchReport::default();
        for path in video_paths {
            report.push(self.process_one(path.as_ref()).await);
        }
        report
    }

    /// Process every video file below `input_dir`
    pub async fn process_directory<P: AsRef<Path>>(&self, input_dir: P) -> Result<BatchReport> {
        let video_files = find_video_files(input_dir.as_ref(), &self.video_extensions)?;
        Ok(self.process_many(&video_files).await)
    }

    async fn process_isolated(&self, video_path: &Path) -> ExtractionResult {
        let this = self.clone();
        let owned_path = video_path.to_path_buf();
        let task = tokio::spawn(async move {
            let mut outcomes = Vec::new();
            let result = this.extract_file(&owned_path, &mut outcomes).await;
            (outcomes, result)
        });

        match task.await {
            Ok((outcomes, Ok(()))) => ExtractionResult::ok(video_path, outcomes),
            Ok((outcomes, Err(e))) => {
                ExtractionResult::error_with_streams(video_path, e.to_string(), outcomes)
            }
            Err(join_error) => {
                ExtractionResult::error(video_path, format!("Unexpected failure: {}", join_error))
            }
        }
    }

    /// Streams finished before an error stay in `outcomes`
    async fn extract_file(
        &self,
        video_path: &Path,
        outcomes: &mut Vec<StreamOutcome>,
    ) -> Result<()> {
        let job = ExtractionJob::resolve(video_path, self.output_dir.as_deref())?;
        if self.output_dir.is_some() {
            fs::create_dir_all(&job.output_dir).await?;
        }

        let streams = self.discoverer.discover(&job.source_path).await?;
        if streams.is_empty() {
            self.reporter.no_streams(video_path);
            return Ok(());
        }
        self.reporter.streams_discovered(video_path, &streams);

        // Streams sharing a language map to the same file; the later one wins
        let mut written: HashSet<PathBuf> = HashSet::new();
        outcomes.reserve(streams.len());

        for stream in &streams {
            if self.is_cancelled() {
                return Err(SubExtractError::Cancelled);
            }

            let target = output_path(&job, stream);
            if !written.insert(target.clone()) {
                self.reporter.output_overwritten(video_path, &target);
            }

            let outcome = self.extractor.extract(&job, stream).await?;
            self.reporter.stream_finished(video_path, &outcome);
            outcomes.push(outcome);
        }

        Ok(())
    }
}

/// Video files below `input_dir` whose extension is in `extensions`
/// (case-insensitive), sorted by path
pub fn find_video_files(input_dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Err(SubExtractError::InvalidPath(format!(
            "Input path is not a directory: {}",
            input_dir.display()
        )));
    }

    let mut video_files: Vec<PathBuf> = WalkDir::new(input_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();
    video_files.sort();

    debug!("Found {} video files in {}", video_files.len(), input_dir.display());
    Ok(video_files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::{MockStreamDiscoverer, SubtitleStream};
    use crate::extract::{MockStreamExtractor, StreamStatus};
    use crate::report::ExtractionStatus;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingReporter {
        events: Mutex<Vec<String>>,
    }

    impl RecordingReporter {
        fn record(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Reporter for RecordingReporter {
        fn no_streams(&self, source: &Path) {
            self.record(format!("no_streams {}", file_name(source)));
        }

        fn stream_finished(&self, _source: &Path, outcome: &StreamOutcome) {
            self.record(format!("stream {} {:?}", outcome.index, outcome.status));
        }

        fn output_overwritten(&self, _source: &Path, output: &Path) {
            self.record(format!("overwrite {}", file_name(output)));
        }

        fn file_finished(&self, result: &ExtractionResult) {
            self.record(format!(
                "finished {} {:?}",
                file_name(&result.source_path),
                result.status
            ));
        }
    }

    /// Panics on files named `panicking.*`, extracts everything else
    struct PanickingExtractor;

    #[async_trait::async_trait]
    impl StreamExtractor for PanickingExtractor {
        async fn extract(
            &self,
            job: &ExtractionJob,
            stream: &SubtitleStream,
        ) -> Result<StreamOutcome> {
            if job.base_name == "panicking" {
                panic!("extractor blew up");
            }
            Ok(StreamOutcome::extracted(stream, output_path(job, stream)))
        }
    }

    fn file_name(path: &Path) -> String {
        path.file_name().unwrap().to_string_lossy().into_owned()
    }

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"not really a video").unwrap();
        path
    }

    fn extracting_everything() -> MockStreamExtractor {
        let mut extractor = MockStreamExtractor::new();
        extractor
            .expect_extract()
            .returning(|job, stream| Ok(StreamOutcome::extracted(stream, output_path(job, stream))));
        extractor
    }

    fn workflow(
        discoverer: MockStreamDiscoverer,
        extractor: MockStreamExtractor,
        reporter: Arc<RecordingReporter>,
    ) -> Workflow {
        Workflow::with_components(Arc::new(discoverer), Arc::new(extractor), reporter)
    }

    #[tokio::test]
    async fn test_single_english_stream() {
        let dir = tempfile::tempdir().unwrap();
        let movie = touch(&dir, "Movie.mp4");

        let mut discoverer = MockStreamDiscoverer::new();
        discoverer
            .expect_discover()
            .times(1)
            .returning(|_| Ok(vec![SubtitleStream::new(2, Some("en"))]));

        let reporter = Arc::new(RecordingReporter::default());
        let result = workflow(discoverer, extracting_everything(), reporter.clone())
            .process_one(&movie)
            .await;

        assert_eq!(result.status, ExtractionStatus::Ok);
        assert_eq!(result.streams.len(), 1);
        assert_eq!(result.streams[0].output, dir.path().join("Movie.en.srt"));
        assert_eq!(
            reporter.events(),
            vec!["stream 2 Extracted", "finished Movie.mp4 Ok"]
        );
    }

    #[tokio::test]
    async fn test_known_and_unknown_language_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let movie = touch(&dir, "Movie.mkv");

        let mut discoverer = MockStreamDiscoverer::new();
        discoverer.expect_discover().returning(|_| {
            Ok(vec![
                SubtitleStream::new(2, Some("en")),
                SubtitleStream::new(3, None),
            ])
        });

        let reporter = Arc::new(RecordingReporter::default());
        let result = workflow(discoverer, extracting_everything(), reporter)
            .process_one(&movie)
            .await;

        let outputs: Vec<PathBuf> = result.streams.iter().map(|s| s.output.clone()).collect();
        assert_eq!(
            outputs,
            vec![dir.path().join("Movie.en.srt"), dir.path().join("Movie.srt")]
        );
    }

    #[tokio::test]
    async fn test_no_streams_is_ok_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let movie = touch(&dir, "Plain.mp4");

        let mut discoverer = MockStreamDiscoverer::new();
        discoverer.expect_discover().returning(|_| Ok(Vec::new()));
        let mut extractor = MockStreamExtractor::new();
        extractor.expect_extract().times(0);

        let reporter = Arc::new(RecordingReporter::default());
        let result = workflow(discoverer, extractor, reporter.clone())
            .process_one(&movie)
            .await;

        assert!(result.is_ok());
        assert_eq!(result.message.as_deref(), Some("no subtitle streams found"));
        assert_eq!(
            reporter.events(),
            vec!["no_streams Plain.mp4", "finished Plain.mp4 Ok"]
        );
    }

    #[tokio::test]
    async fn test_failed_stream_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let movie = touch(&dir, "Movie.mkv");

        let mut discoverer = MockStreamDiscoverer::new();
        discoverer.expect_discover().returning(|_| {
            Ok(vec![
                SubtitleStream::new(2, Some("en")),
                SubtitleStream::new(3, Some("fr")),
            ])
        });
        let mut extractor = MockStreamExtractor::new();
        extractor.expect_extract().times(2).returning(|job, stream| {
            let output = output_path(job, stream);
            if stream.index == 2 {
                Ok(StreamOutcome::failed(stream, output, "Invalid data".to_string()))
            } else {
                Ok(StreamOutcome::extracted(stream, output))
            }
        });

        let reporter = Arc::new(RecordingReporter::default());
        let result = workflow(discoverer, extractor, reporter).process_one(&movie).await;

        assert!(result.is_ok());
        assert_eq!(result.streams[0].status, StreamStatus::Failed);
        assert_eq!(result.streams[1].status, StreamStatus::Extracted);
        assert_eq!(
            result.message.as_deref(),
            Some("extracted 1 of 2 subtitle stream(s)")
        );
    }

    #[tokio::test]
    async fn test_duplicate_language_overwrites_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let movie = touch(&dir, "Movie.mkv");

        let mut discoverer = MockStreamDiscoverer::new();
        discoverer.expect_discover().returning(|_| {
            Ok(vec![
                SubtitleStream::new(2, Some("en")),
                SubtitleStream::new(4, Some("en")),
            ])
        });
        let mut extractor = MockStreamExtractor::new();
        extractor
            .expect_extract()
            .times(2)
            .returning(|job, stream| Ok(StreamOutcome::extracted(stream, output_path(job, stream))));

        let reporter = Arc::new(RecordingReporter::default());
        let result = workflow(discoverer, extractor, reporter.clone())
            .process_one(&movie)
            .await;

        assert_eq!(result.streams[0].output, result.streams[1].output);
        assert!(reporter.events().contains(&"overwrite Movie.en.srt".to_string()));
    }

    #[tokio::test]
    async fn test_batch_isolates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let present = touch(&dir, "a.mp4");
        let missing = dir.path().join("missing.mp4");

        let mut discoverer = MockStreamDiscoverer::new();
        discoverer
            .expect_discover()
            .times(1)
            .returning(|_| Ok(vec![SubtitleStream::new(2, Some("en"))]));

        let reporter = Arc::new(RecordingReporter::default());
        let report = workflow(discoverer, extracting_everything(), reporter)
            .process_many(&[present.clone(), missing.clone()])
            .await;

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[0].source_path, present);
        assert_eq!(report.results[0].status, ExtractionStatus::Ok);
        assert_eq!(report.results[1].source_path, missing);
        assert_eq!(report.results[1].status, ExtractionStatus::Error);
        assert!(report.results[1].message.as_deref().unwrap().contains("File not found"));
    }

    #[tokio::test]
    async fn test_batch_isolates_discovery_and_panics() {
        let dir = tempfile::tempdir().unwrap();
        let first = touch(&dir, "first.mkv");
        let broken = touch(&dir, "broken.mkv");
        let panicking = touch(&dir, "panicking.mkv");
        let last = touch(&dir, "last.mkv");

        let mut discoverer = MockStreamDiscoverer::new();
        discoverer.expect_discover().returning(|path| {
            match path.file_name().and_then(|n| n.to_str()) {
                Some("broken.mkv") => Err(SubExtractError::DiscoveryTool(
                    "Failed to execute ffmpeg: No such file or directory".to_string(),
                )),
                _ => Ok(vec![SubtitleStream::new(2, Some("en"))]),
            }
        });

        let reporter = Arc::new(RecordingReporter::default());
        let report = Workflow::with_components(
            Arc::new(discoverer),
            Arc::new(PanickingExtractor),
            reporter,
        )
        .process_many(&[&first, &broken, &panicking, &last])
        .await;

        let statuses: Vec<ExtractionStatus> = report.results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                ExtractionStatus::Ok,
                ExtractionStatus::Error,
                ExtractionStatus::Error,
                ExtractionStatus::Ok,
            ]
        );
        assert!(report.results[1].message.as_deref().unwrap().contains("Stream discovery failed"));
        assert!(report.results[2].message.as_deref().unwrap().starts_with("Unexpected failure"));
        assert_eq!(report.results[3].source_path, last);
    }

    #[tokio::test]
    async fn test_extractor_error_fails_only_that_file() {
        let dir = tempfile::tempdir().unwrap();
        let movie = touch(&dir, "Movie.mkv");

        let mut discoverer = MockStreamDiscoverer::new();
        discoverer.expect_discover().returning(|_| {
            Ok(vec![
                SubtitleStream::new(2, Some("en")),
                SubtitleStream::new(3, Some("fr")),
            ])
        });
        let mut extractor = MockStreamExtractor::new();
        extractor
            .expect_extract()
            .times(1)
            .returning(|_, _| Err(SubExtractError::Media("Failed to execute ffmpeg".to_string())));

        let reporter = Arc::new(RecordingReporter::default());
        let result = workflow(discoverer, extractor, reporter).process_one(&movie).await;

        assert_eq!(result.status, ExtractionStatus::Error);
        assert!(result.message.unwrap().contains("Failed to execute ffmpeg"));
    }

    #[tokio::test]
    async fn test_error_after_written_stream_keeps_its_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let movie = touch(&dir, "Movie.mkv");

        let mut discoverer = MockStreamDiscoverer::new();
        discoverer.expect_discover().returning(|_| {
            Ok(vec![
                SubtitleStream::new(2, Some("en")),
                SubtitleStream::new(3, Some("fr")),
            ])
        });
        let mut extractor = MockStreamExtractor::new();
        extractor.expect_extract().times(2).returning(|job, stream| {
            if stream.index == 2 {
                Ok(StreamOutcome::extracted(stream, output_path(job, stream)))
            } else {
                Err(SubExtractError::Media("Failed to execute ffmpeg".to_string()))
            }
        });

        let reporter = Arc::new(RecordingReporter::default());
        let report = workflow(discoverer, extractor, reporter)
            .process_many(&[&movie])
            .await;

        let result = &report.results[0];
        assert_eq!(result.status, ExtractionStatus::Error);
        assert!(result.message.as_deref().unwrap().contains("Failed to execute ffmpeg"));
        assert_eq!(result.streams.len(), 1);
        assert_eq!(result.streams[0].status, StreamStatus::Extracted);
        assert_eq!(result.streams[0].output, dir.path().join("Movie.en.srt"));
        assert_eq!(report.extracted_streams(), 1);
    }

    #[tokio::test]
    async fn test_cancel_between_streams_keeps_finished_ones() {
        let dir = tempfile::tempdir().unwrap();
        let movie = touch(&dir, "Movie.mkv");
        let cancel = Arc::new(AtomicBool::new(false));

        let mut discoverer = MockStreamDiscoverer::new();
        discoverer.expect_discover().returning(|_| {
            Ok(vec![
                SubtitleStream::new(2, Some("en")),
                SubtitleStream::new(3, Some("fr")),
            ])
        });
        let mut extractor = MockStreamExtractor::new();
        let flag = cancel.clone();
        extractor.expect_extract().times(1).returning(move |job, stream| {
            flag.store(true, Ordering::SeqCst);
            Ok(StreamOutcome::extracted(stream, output_path(job, stream)))
        });

        let reporter = Arc::new(RecordingReporter::default());
        let result = workflow(discoverer, extractor, reporter)
            .with_cancel_flag(cancel)
            .process_one(&movie)
            .await;

        assert_eq!(result.status, ExtractionStatus::Error);
        assert_eq!(result.message.as_deref(), Some("Processing cancelled"));
        assert_eq!(result.streams.len(), 1);
        assert_eq!(result.streams[0].index, 2);
    }

    #[tokio::test]
    async fn test_cancelled_run_skips_remaining_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(&dir, "a.mkv");
        let b = touch(&dir, "b.mkv");

        let mut discoverer = MockStreamDiscoverer::new();
        discoverer.expect_discover().times(0);
        let mut extractor = MockStreamExtractor::new();
        extractor.expect_extract().times(0);

        let reporter = Arc::new(RecordingReporter::default());
        let workflow = workflow(discoverer, extractor, reporter);
        workflow.cancel_flag().store(true, Ordering::SeqCst);

        let report = workflow.process_many(&[a, b]).await;
        assert_eq!(report.failed(), 2);
        assert!(report
            .results
            .iter()
            .all(|r| r.message.as_deref() == Some("Processing cancelled")));
    }

    #[tokio::test]
    async fn test_output_dir_override_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let movie = touch(&dir, "Movie.mkv");
        let subs = dir.path().join("subs");

        let mut discoverer = MockStreamDiscoverer::new();
        discoverer
            .expect_discover()
            .returning(|_| Ok(vec![SubtitleStream::new(2, Some("de"))]));

        let reporter = Arc::new(RecordingReporter::default());
        let result = workflow(discoverer, extracting_everything(), reporter)
            .with_output_dir(Some(subs.clone()))
            .process_one(&movie)
            .await;

        assert!(subs.is_dir());
        assert_eq!(result.streams[0].output, subs.join("Movie.de.srt"));
    }

    #[tokio::test]
    async fn test_process_directory_walks_video_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir, "b.mkv");
        touch(&dir, "a.mp4");
        touch(&dir, "a.en.srt");

        let mut discoverer = MockStreamDiscoverer::new();
        discoverer.expect_discover().times(2).returning(|_| Ok(Vec::new()));
        let mut extractor = MockStreamExtractor::new();
        extractor.expect_extract().times(0);

        let reporter = Arc::new(RecordingReporter::default());
        let report = workflow(discoverer, extractor, reporter)
            .process_directory(dir.path())
            .await
            .unwrap();

        let files: Vec<PathBuf> = report.results.iter().map(|r| r.source_path.clone()).collect();
        assert_eq!(files, vec![dir.path().join("a.mp4"), dir.path().join("b.mkv")]);
        assert_eq!(report.succeeded(), 2);
    }

    #[test]
    fn test_find_video_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("season1")).unwrap();
        touch(&dir, "b.MKV");
        touch(&dir, "a.mp4");
        touch(&dir, "notes.txt");
        touch(&dir, "a.en.srt");
        std::fs::write(dir.path().join("season1/e01.mkv"), b"").unwrap();

        let extensions = vec!["mp4".to_string(), "mkv".to_string()];
        let files = find_video_files(dir.path(), &extensions).unwrap();

        assert_eq!(
            files,
            vec![
                dir.path().join("a.mp4"),
                dir.path().join("b.MKV"),
                dir.path().join("season1/e01.mkv"),
            ]
        );
    }

    #[test]
    fn test_find_video_files_rejects_non_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = touch(&dir, "a.mp4");
        assert!(matches!(
            find_video_files(&file, &["mp4".to_string()]),
            Err(SubExtractError::InvalidPath(_))
        ));
    }
}
