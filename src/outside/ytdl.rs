use std::{
    ffi::OsStr,
    path::Path,
    process::{Command, Output},
};

use super::command::{
    assert_success_command, check_status, run_command, stderr_of, Capture, YT_DL, YT_DLP,
};
use crate::{
    result::{Error, Result},
    types::Extension,
};

/// Something able to write the media of a video to a given path.
///
/// The path is the one handed out by the lifecycle manager. The producer must
/// write the complete file at exactly that path or return an error.
pub trait MediaProducer: Sync {
    fn produce(&self, path: &Path, video_id: &str) -> Result<()>;
}

/// Interface for the [youtube-dl](https://github.com/ytdl-org/youtube-dl) program
#[derive(Debug)]
pub struct Ytdl {
    program: &'static str,
}

impl Ytdl {
    /// Verify that the `yt-dlp` or `youtube-dl` binaries are reachable
    pub fn new() -> Result<Self> {
        // Check `yt-dlp`
        if assert_success_command(YT_DLP, |cmd| cmd.arg("--version")).is_ok() {
            Ok(Self { program: YT_DLP })
        } else {
            // Check `youtube-dl`
            assert_success_command(YT_DL, |cmd| cmd.arg("--version"))?;
            Ok(Self { program: YT_DL })
        }
    }

    pub fn program(&self) -> &'static str {
        self.program
    }

    /// Run the command and check if it failed with saying the stream is unavailable.
    /// In that case, return [`Error::UnavailableStream`].
    ///
    /// In other cases, return the output handle.
    pub fn run_check_availability<F>(&self, f: F, capture: Capture) -> Result<Output>
    where
        F: FnOnce(&mut Command) -> &mut Command,
    {
        let res = run_command(self.program, f, capture | Capture::STDERR)?;

        if is_unavailable(&stderr_of(&res)) {
            Err(Error::UnavailableStream)
        } else {
            Ok(res)
        }
    }
}

impl MediaProducer for Ytdl {
    fn produce(&self, path: &Path, video_id: &str) -> Result<()> {
        let extension = Extension::from_path(path).unwrap_or_default();

        let res = self.run_check_availability(
            |cmd| {
                cmd.arg("-q")
                    .arg("--no-warnings")
                    .args([OsStr::new("-o"), path.as_os_str()])
                    .arg("--no-continue") // Or else fails when file already exists, even an empty one
                    .args(["-f", format_selector(extension)])
                    .args(container_args(extension))
                    .arg("--")
                    .arg(video_id)
            },
            Capture::empty(),
        )?;

        check_status(self.program, &res)
    }
}

/// Arguments putting the download in the wanted container.
/// Audio is extracted with ffmpeg, video streams are merged into it
fn container_args(extension: Extension) -> &'static [&'static str] {
    match extension {
        Extension::Mp4 => &["--merge-output-format", "mp4"],
        Extension::Webm => &["--merge-output-format", "webm"],
        Extension::Mkv => &["--merge-output-format", "mkv"],
        Extension::M4a => &["--extract-audio", "--audio-format", "m4a"],
        Extension::Ogg => &["--extract-audio", "--audio-format", "vorbis"],
    }
}

/// Streams of at most 720p, preferring ones already in the wanted container.
/// Audio containers only take the best audio stream
fn format_selector(extension: Extension) -> &'static str {
    match extension {
        Extension::Mp4 => {
            "bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720][ext=mp4]"
        }
        Extension::Webm => {
            "bestvideo[height<=720][ext=webm]+bestaudio[ext=webm]/best[height<=720]"
        }
        Extension::Mkv => "bestvideo[height<=720]+bestaudio/best[height<=720]",
        Extension::M4a => "bestaudio[ext=m4a]/bestaudio",
        Extension::Ogg => "bestaudio",
    }
}

fn is_unavailable(stderr: &str) -> bool {
    stderr
        .lines()
        .any(|line| line.starts_with("ERROR:") && line.to_lowercase().contains("unavailable"))
}
