// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Media probing and transcoding.
//!
//! Romtidy never touches codecs itself. It asks an external media tool what
//! format a video is in, and asks it to transcode when the format is not one
//! the front end can play. The [`Ffmpeg`] implementation shells out to the
//! `ffprobe` and `ffmpeg` binaries.

use serde::Deserialize;
use std::{
    ffi::{OsStr, OsString},
    fs::rename,
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{debug, info, instrument};

/// External media collaborator.
pub trait MediaProbe {
    /// Pixel format of the first video stream, if there is one.
    fn pixel_format(&self, path: &Path) -> Result<Option<String>>;

    /// Transcode video in place to target pixel format.
    fn transcode(&self, path: &Path, pixel_format: &str) -> Result<()>;
}

/// Media probing through the ffmpeg command line tools.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffprobe: OsString,
    ffmpeg: OsString,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self {
            ffprobe: "ffprobe".into(),
            ffmpeg: "ffmpeg".into(),
        }
    }
}

impl Ffmpeg {
    /// Construct new prober using specific binaries.
    pub fn new(ffprobe: impl Into<OsString>, ffmpeg: impl Into<OsString>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            ffmpeg: ffmpeg.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    pix_fmt: Option<String>,
}

impl MediaProbe for Ffmpeg {
    #[instrument(skip(self), level = "debug")]
    fn pixel_format(&self, path: &Path) -> Result<Option<String>> {
        let output = syscall(
            &self.ffprobe,
            [
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-show_entries"),
                OsStr::new("stream=codec_type,pix_fmt"),
                OsStr::new("-of"),
                OsStr::new("json"),
                path.as_os_str(),
            ],
        )?;

        parse_pixel_format(&output).map_err(|err| MediaError::Probe {
            source: err,
            path: path.to_path_buf(),
        })
    }

    #[instrument(skip(self), level = "debug")]
    fn transcode(&self, path: &Path, pixel_format: &str) -> Result<()> {
        let temp = transcode_path(path);
        info!("converting {:?} to {pixel_format}", path.display());
        syscall(
            &self.ffmpeg,
            [
                OsStr::new("-y"),
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-i"),
                path.as_os_str(),
                OsStr::new("-pix_fmt"),
                OsStr::new(pixel_format),
                temp.as_os_str(),
            ],
        )?;

        rename(&temp, path).map_err(|err| MediaError::Replace {
            source: err,
            path: path.to_path_buf(),
        })?;

        Ok(())
    }
}

fn parse_pixel_format(output: &str) -> std::result::Result<Option<String>, serde_json::Error> {
    let probe: ProbeOutput = serde_json::from_str(output)?;
    Ok(probe
        .streams
        .into_iter()
        .find(|stream| stream.codec_type.as_deref() == Some("video"))
        .and_then(|stream| stream.pix_fmt))
}

/// Sibling path a video is transcoded into before it replaces the original.
fn transcode_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}-new.{}", ext.to_string_lossy()),
        None => format!("{stem}-new"),
    };
    path.with_file_name(name)
}

fn syscall(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let output = Command::new(cmd.as_ref()).args(args).output()?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();

    if !output.status.success() {
        return Err(MediaError::Failed {
            command: cmd.as_ref().to_string_lossy().into_owned(),
            message: stderr.trim_end().to_string(),
        });
    }

    debug!("{:?} succeeded", cmd.as_ref());
    Ok(stdout)
}

/// Media collaborator error types.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// Media tool cannot be spawned.
    #[error(transparent)]
    Syscall(#[from] std::io::Error),

    /// Media tool exited unsuccessfully.
    #[error("command {command:?} failed: {message}")]
    Failed { command: String, message: String },

    /// Probe output is not what was expected.
    #[error("failed to read probe output for {:?}", path.display())]
    Probe {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },

    /// Transcoded video cannot replace the original.
    #[error("failed to replace {:?} with transcoded video", path.display())]
    Replace {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = MediaError> = std::result::Result<T, E>;
