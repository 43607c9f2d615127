//! Subtitle stream discovery.
//!
//! ffmpeg prints a table of the container's streams to stderr when it is given
//! an input and nothing to do with it. Subtitle entries look like
//!
//! ```text
//!   Stream #0:2(eng): Subtitle: subrip (default)
//!   Stream #0:3[0x4](fre): Subtitle: ass
//! ```
//!
//! The parsing lives behind [`StreamDiscoverer`] so a structured probe (for
//! example ffprobe JSON) can replace it without touching extraction.

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::error::Result;
use crate::media::MediaProcessorTrait;

/// Marker that makes a diagnostic line a subtitle stream candidate
const SUBTITLE_MARKER: &str = "Subtitle:";

/// Language tag used in place of a missing `lang:` code
pub const UNKNOWN_LANGUAGE: &str = "unknown";

static STREAM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Stream #(\d+):(\d+)(?:\[\w+\])?(?:\(\w+\))?: Subtitle:")
        .expect("stream pattern is valid")
});

static LANGUAGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"lang:([a-z]{2})").expect("language pattern is valid"));

/// One subtitle stream found in a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleStream {
    /// Second component of `Stream #a:b`
    pub index: u32,
    /// Two-letter code, `None` when the line carried no `lang:` marker
    pub language: Option<String>,
}

impl SubtitleStream {
    pub fn new(index: u32, language: Option<&str>) -> Self {
        Self {
            index,
            language: language.map(str::to_string),
        }
    }

    /// The language code, or `"unknown"`
    pub fn language_tag(&self) -> &str {
        self.language.as_deref().unwrap_or(UNKNOWN_LANGUAGE)
    }
}

/// Scan ffmpeg diagnostic text for subtitle streams, in container order.
///
/// Lines with the `Subtitle:` marker that lack a `Stream #a:b` prefix are skipped.
pub fn parse_subtitle_streams(diagnostics: &str) -> Vec<SubtitleStream> {
    diagnostics
        .lines()
        .filter(|line| line.contains(SUBTITLE_MARKER))
        .filter_map(parse_stream_line)
        .collect()
}

fn parse_stream_line(line: &str) -> Option<SubtitleStream> {
    let captures = STREAM_PATTERN.captures(line)?;
    let index = captures[2].parse::<u32>().ok()?;
    let language = LANGUAGE_PATTERN
        .captures(line)
        .map(|lang| lang[1].to_string());

    Some(SubtitleStream { index, language })
}

/// Finds the subtitle streams of a video file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamDiscoverer: Send + Sync {
    /// An empty list means the file has no subtitles, which is not an error
    async fn discover(&self, video_path: &Path) -> Result<Vec<SubtitleStream>>;
}

/// Discovery through ffmpeg's stderr stream table
pub struct FfmpegStreamDiscoverer {
    media: Arc<dyn MediaProcessorTrait>,
}

impl FfmpegStreamDiscoverer {
    pub fn new(media: Arc<dyn MediaProcessorTrait>) -> Self {
        Self { media }
    }
}

#[async_trait]
impl StreamDiscoverer for FfmpegStreamDiscoverer {
    async fn discover(&self, video_path: &Path) -> Result<Vec<SubtitleStream>> {
        let diagnostics = self.media.probe(video_path).await?;
        let streams = parse_subtitle_streams(&diagnostics);
        debug!(
            "Discovered {} subtitle stream(s) in {}",
            streams.len(),
            video_path.display()
        );
        Ok(streams)
    }
}
