use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SubExtractError};

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "subextract.toml";

fn default_binary_path() -> String {
    "ffmpeg".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_video_extensions() -> Vec<String> {
    ["mp4", "mkv", "avi", "mov", "m4v", "webm", "wmv", "flv", "ts"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub media: MediaConfig,
    pub extraction: ExtractionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    #[serde(default = "default_binary_path")]
    pub binary_path: String,
    /// Upper bound for a single ffmpeg invocation, in seconds (0 disables it)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamSelector {
    /// `-map 0:<index>`: the index printed by ffmpeg in `Stream #0:<index>`
    #[default]
    Absolute,
    /// `-map 0:s:<index>`: the index taken as a position among subtitle streams
    SubtitleRelative,
}

impl StreamSelector {
    /// Stream specifier handed to ffmpeg's `-map` for the given index
    pub fn map_specifier(self, index: u32) -> String {
        match self {
            StreamSelector::Absolute => format!("0:{}", index),
            StreamSelector::SubtitleRelative => format!("0:s:{}", index),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Write every subtitle file here instead of next to its video
    pub output_dir: Option<PathBuf>,
    /// How a discovered stream index is turned into a `-map` directive
    pub stream_selector: StreamSelector,
    /// Extensions picked up when processing a whole directory
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for a daily-rolling log file; console only when unset
    pub directory: Option<PathBuf>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: default_binary_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            stream_selector: StreamSelector::default(),
            video_extensions: default_video_extensions(),
        }
    }
}

impl MediaConfig {
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubExtractError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SubExtractError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubExtractError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubExtractError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Configuration file to read: the explicit path, else `subextract.toml`
    /// in the working directory if present
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                local.exists().then(|| local.to_path_buf())
            }
        }
    }

    /// Load the file [`Config::locate`] finds, or defaults when there is none
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match Self::locate(explicit) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}
