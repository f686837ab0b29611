use std::process::{Command, Output, Stdio};

use bitflags::bitflags;
use tracing::{debug, trace, Level};

use crate::result::{Error, Result};

pub const YT_DL: &str = "youtube-dl";
pub const YT_DLP: &str = "yt-dlp";

bitflags! {
    /// Output streams of a program kept for the caller
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capture: u8 {
        const STDOUT = 0b01;
        const STDERR = 0b10;
    }
}

impl Capture {
    fn stdio(self, stream: Capture) -> Stdio {
        if self.contains(stream) {
            Stdio::piped()
        } else {
            Stdio::null()
        }
    }
}

/// Launch `program` with the arguments added by `configure` and wait for it.
///
/// Stdin is never connected. Streams missing from `capture` are discarded,
/// unless debug logs are on: both are then kept to log their sizes.
///
/// Only a failure to launch is an error, the exit status is left to the caller.
pub fn run_command<F>(program: &str, configure: F, capture: Capture) -> Result<Output>
where
    F: FnOnce(&mut Command) -> &mut Command,
{
    let verbose = tracing::enabled!(Level::DEBUG);
    let capture = if verbose { Capture::all() } else { capture };

    let mut cmd = Command::new(program);
    configure(&mut cmd)
        .stdin(Stdio::null())
        .stdout(capture.stdio(Capture::STDOUT))
        .stderr(capture.stdio(Capture::STDERR));

    debug!("Launching {cmd:?}");
    let output = cmd.output()?;

    if verbose {
        debug!(
            "{program} exited with {} ({} bytes of stdout, {} bytes of stderr)",
            output.status,
            output.stdout.len(),
            output.stderr.len()
        );
        trace!("{program} stderr: {:?}", stderr_of(&output));
    }

    Ok(output)
}

/// Captured stderr, decoded and trimmed
pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_owned()
}

/// Turn a failed exit status into [`Error::CommandFailed`] carrying the stderr.
pub fn check_status(program: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        Ok(())
    } else {
        Err(Error::CommandFailed {
            program: program.to_owned(),
            stderr: stderr_of(output),
        })
    }
}

/// Run the command, failing unless it exits successfully.
pub fn assert_success_command<F>(program: &str, configure: F) -> Result<()>
where
    F: FnOnce(&mut Command) -> &mut Command,
{
    let output = run_command(program, configure, Capture::STDERR)?;
    check_status(program, &output)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_only_requested_streams_are_captured() {
        let output = run_command(
            "sh",
            |cmd| cmd.args(["-c", "echo out; echo err >&2"]),
            Capture::STDOUT,
        )
        .unwrap();

        assert!(output.status.success());
        assert_eq!(output.stdout, b"out\n");
        assert!(output.stderr.is_empty());
    }

    #[test]
    fn test_failed_status_carries_stderr() {
        let res = assert_success_command("sh", |cmd| {
            cmd.args(["-c", "echo '  no such video ' >&2; exit 3"])
        });

        match res {
            Err(Error::CommandFailed { program, stderr }) => {
                assert_eq!(program, "sh");
                assert_eq!(stderr, "no such video");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_missing_program_is_a_launch_error() {
        let res = run_command("mediatemp-no-such-program", |cmd| cmd, Capture::empty());
        assert!(matches!(res, Err(Error::Io(_))));
    }
}
