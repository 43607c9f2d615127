use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract the subtitle streams of a single video file
    Extract {
        /// Input video file
        input: PathBuf,

        /// Output directory for subtitle files (defaults to the video's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Extract subtitles from many existing video files
    Batch {
        /// Input video files
        inputs: Vec<PathBuf>,

        /// File listing one video path per line
        #[arg(short, long)]
        list: Option<PathBuf>,

        /// Directory to search recursively for video files
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Output directory for subtitle files (defaults to each video's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Print the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List the subtitle streams of a video file without extracting them
    Probe {
        /// Input video file
        input: PathBuf,
    },

    /// Run a host hook: read its JSON record from stdin, write the response to stdout
    Hook {
        #[arg(value_enum)]
        kind: HookKind,
    },

    /// Check that the media tool is available
    Check,

    /// Write the default configuration file
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "subextract.toml")]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HookKind {
    /// A single newly scanned file: `{"path": ...}`
    Scan,
    /// A list of existing files: `{"paths": [...]}`
    Retroactive,
}

/// Paths from a batch list file: one per line, blank lines and `#` comments skipped
pub fn parse_path_list(content: &str) -> Vec<PathBuf> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect()
}
