use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::config::StreamSelector;
use crate::error::{Result, SubExtractError};

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    /// Paths are kept as raw OS strings so non-UTF-8 file names reach the tool intact
    pub args: Vec<OsString>,
    pub description: String,
    pub timeout: Option<Duration>,
}

/// What a finished media tool invocation left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
            timeout: None,
        }
    }

    /// Add an argument
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Suppress the version banner so stderr carries only file diagnostics
    pub fn hide_banner(self) -> Self {
        self.arg("-hide_banner")
    }

    /// Select a single input stream for the output
    pub fn map_stream<S: AsRef<OsStr>>(self, specifier: S) -> Self {
        self.arg("-map").arg(specifier)
    }

    /// Bound how long the command may run
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the command to completion, capturing its output.
    ///
    /// A non-zero exit is not an error here; callers decide what it means.
    /// Failing to spawn the binary is returned as [`SubExtractError::Io`] and
    /// exceeding the timeout as [`SubExtractError::Timeout`] (the child is killed).
    pub async fn execute(&self) -> Result<CommandOutput> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| SubExtractError::Timeout {
                    description: self.description.clone(),
                    seconds: limit.as_secs(),
                })??,
            None => cmd.output().await?,
        };

        Ok(CommandOutput {
            status_code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Builder for the ffmpeg invocations used by discovery and extraction
pub struct MediaCommandBuilder {
    binary_path: String,
    timeout: Option<Duration>,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S: Into<String>>(binary_path: S, timeout: Option<Duration>) -> Self {
        Self {
            binary_path: binary_path.into(),
            timeout,
        }
    }

    /// Build the metadata probe: input only, no output, so ffmpeg prints the
    /// stream table to stderr and exits non-zero
    pub fn probe<P: AsRef<Path>>(&self, video_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Subtitle stream probe")
            .hide_banner()
            .input(video_path)
            .with_timeout(self.timeout)
    }

    /// Build the remux of one subtitle stream into its own file
    pub fn extract_subtitle<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        video_path: P,
        selector: StreamSelector,
        index: u32,
        output_path: Q,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, format!("Subtitle stream {} extraction", index))
            .hide_banner()
            .overwrite()
            .input(video_path)
            .map_stream(selector.map_specifier(index))
            .output(output_path)
            .with_timeout(self.timeout)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check")
            .arg("-version")
            .with_timeout(self.timeout)
    }
}
