//! Subextract - Embedded Subtitle Extraction
//!
//! Finds the subtitle streams of a video file by reading ffmpeg's stream table
//! and writes each one out as `{name}.{lang}.srt` next to the video. Runs as a
//! one-shot hook for a media library scanner or as a batch over existing files.

pub mod cli;
pub mod config;
pub mod discover;
pub mod error;
pub mod extract;
pub mod hooks;
pub mod job;
pub mod media;
pub mod report;
pub mod reporter;
pub mod workflow;
