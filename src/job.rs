use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Result, SubExtractError};

/// Where one video's subtitles come from and where they go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionJob {
    pub source_path: PathBuf,
    pub output_dir: PathBuf,
    /// File name of the source without its extension
    pub base_name: OsString,
}

impl ExtractionJob {
    /// Derive the job for `source_path`. Subtitles land next to the video
    /// unless `output_dir` overrides it.
    pub fn resolve(source_path: &Path, output_dir: Option<&Path>) -> Result<Self> {
        let base_name = source_path
            .file_stem()
            .ok_or_else(|| {
                SubExtractError::InvalidPath(format!(
                    "Invalid video filename: {}",
                    source_path.display()
                ))
            })?
            .to_os_string();

        let output_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => match source_path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        };

        Ok(Self {
            source_path: source_path.to_path_buf(),
            output_dir,
            base_name,
        })
    }
}
