use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command as ProcessCommand, ExitStatus, Stdio};

use tracing::debug;

use crate::error::{PipelineError, Result};

/// The external programs the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tool {
    /// rtmpdump
    StreamingClient,
    /// ffmpeg
    Transcoder,
    /// mkvmerge
    Muxer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ToolOutcome {
    Success,
    RetryableIncomplete,
    AcceptableWarning,
    Fatal,
}

impl ToolOutcome {
    pub(crate) fn is_accepted(self) -> bool {
        matches!(self, Self::Success | Self::AcceptableWarning)
    }
}

impl Tool {
    pub(crate) fn classify(self, status: i32) -> ToolOutcome {
        match (self, status) {
            (_, 0) => ToolOutcome::Success,
            (Self::StreamingClient, 2) => ToolOutcome::RetryableIncomplete,
            (Self::Muxer, 1) => ToolOutcome::AcceptableWarning,
            _ => ToolOutcome::Fatal,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::StreamingClient => "streaming client",
            Self::Transcoder => "transcoder",
            Self::Muxer => "muxer",
        }
    }
}

/// One call of an external program: what to run and its literal arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Invocation {
    pub(crate) tool: Tool,
    pub(crate) program: PathBuf,
    pub(crate) args: Vec<OsString>,
}

impl Invocation {
    pub(crate) fn new(tool: Tool, program: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub(crate) fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub(crate) fn path_arg(self, path: &Path) -> Self {
        self.arg(path.as_os_str())
    }

    /// Value following `flag`, e.g. the `-o` target.
    #[cfg(test)]
    pub(crate) fn value_of(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|index| self.args.get(index + 1))
            .map(OsString::as_os_str)
    }

    #[cfg(test)]
    pub(crate) fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|arg| arg == flag)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(self.program.as_os_str()))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

// Display only; arguments are handed to the OS as-is and never pass a shell.
fn quote(arg: &OsStr) -> String {
    let text = arg.to_string_lossy();
    let plain = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if plain {
        text.into_owned()
    } else {
        format!("'{}'", text.replace('\'', r"'\''"))
    }
}

/// Runs an invocation to completion and reports its exit status.
///
/// A non-zero status is not an error here; callers classify it.
pub(crate) trait ToolRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<i32>;
}

/// Spawns real processes with stdout and stderr passed through.
#[derive(Debug, Default)]
pub(crate) struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<i32> {
        debug!(tool = invocation.tool.label(), command = %invocation, "spawning");
        let status = ProcessCommand::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| PipelineError::ToolLaunch {
                program: invocation.program.display().to_string(),
                source,
            })?;
        let code = exit_code(status);
        debug!(tool = invocation.tool.label(), status = code, "exited");
        Ok(code)
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Runs `invocation` and fails unless its status is accepted for its tool.
pub(crate) fn run_checked(runner: &mut dyn ToolRunner, invocation: &Invocation) -> Result<()> {
    let status = runner.run(invocation)?;
    if invocation.tool.classify(status).is_accepted() {
        Ok(())
    } else {
        Err(PipelineError::ExternalToolFailure {
            tool: invocation.tool.label().to_string(),
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_client_statuses() {
        assert_eq!(Tool::StreamingClient.classify(0), ToolOutcome::Success);
        assert_eq!(
            Tool::StreamingClient.classify(2),
            ToolOutcome::RetryableIncomplete
        );
        assert_eq!(Tool::StreamingClient.classify(1), ToolOutcome::Fatal);
        assert_eq!(Tool::StreamingClient.classify(255), ToolOutcome::Fatal);
    }

    #[test]
    fn muxer_accepts_warnings() {
        assert_eq!(Tool::Muxer.classify(0), ToolOutcome::Success);
        assert_eq!(Tool::Muxer.classify(1), ToolOutcome::AcceptableWarning);
        assert_eq!(Tool::Muxer.classify(2), ToolOutcome::Fatal);
        assert!(Tool::Muxer.classify(1).is_accepted());
    }

    #[test]
    fn transcoder_only_accepts_zero() {
        assert_eq!(Tool::Transcoder.classify(0), ToolOutcome::Success);
        assert_eq!(Tool::Transcoder.classify(1), ToolOutcome::Fatal);
        assert_eq!(Tool::Transcoder.classify(2), ToolOutcome::Fatal);
    }

    #[test]
    fn display_quotes_arguments_with_spaces_and_quotes() {
        let invocation = Invocation::new(Tool::Muxer, "mkvmerge")
            .arg("-o")
            .arg("/out/South Park S02E01.mkv")
            .arg("it's");
        assert_eq!(
            invocation.to_string(),
            r#"mkvmerge -o '/out/South Park S02E01.mkv' 'it'\''s'"#
        );
    }

    #[test]
    fn value_of_returns_argument_after_flag() {
        let invocation = Invocation::new(Tool::StreamingClient, "rtmpdump")
            .arg("-o")
            .arg("target.mp4")
            .arg("--resume");
        assert_eq!(invocation.value_of("-o"), Some(OsStr::new("target.mp4")));
        assert_eq!(invocation.value_of("--resume"), None);
        assert!(invocation.has_flag("--resume"));
    }

    struct FixedRunner(i32);

    impl ToolRunner for FixedRunner {
        fn run(&mut self, _invocation: &Invocation) -> Result<i32> {
            Ok(self.0)
        }
    }

    #[test]
    fn run_checked_reports_tool_and_status() {
        let invocation = Invocation::new(Tool::Transcoder, "ffmpeg");
        let err = run_checked(&mut FixedRunner(1), &invocation).expect_err("status 1 is fatal");
        match err {
            PipelineError::ExternalToolFailure { tool, status } => {
                assert_eq!(tool, "transcoder");
                assert_eq!(status, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        run_checked(&mut FixedRunner(1), &Invocation::new(Tool::Muxer, "mkvmerge"))
            .expect("muxer warnings are accepted");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_returns_exit_status() {
        let invocation = Invocation::new(Tool::Transcoder, "sh")
            .arg("-c")
            .arg("exit 3");
        assert_eq!(SystemRunner.run(&invocation).expect("sh should spawn"), 3);
    }

    #[test]
    fn system_runner_reports_missing_program() {
        let invocation = Invocation::new(Tool::Transcoder, "/nonexistent/southpark-dl-tool");
        let err = SystemRunner
            .run(&invocation)
            .expect_err("missing program cannot spawn");
        assert!(matches!(err, PipelineError::ToolLaunch { .. }));
    }
}
