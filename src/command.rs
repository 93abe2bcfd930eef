/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

pub const SUCCESS: ExitCode = 0;
pub const FAILURE: ExitCode = 1;
/// Status of a spawned stage whose program image could not be replaced.
pub const EXEC_FAILED: ExitCode = 126;

/// Tri-state outcome of a builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    Success,
    /// Malformed arguments or a failed operation; a diagnostic was already reported.
    Failure,
    /// Only produced by `exit` with no arguments.
    RequestExit,
}

impl CommandResult {
    /// Status used when the builtin runs as a spawned pipeline stage.
    pub fn code(self) -> ExitCode {
        match self {
            CommandResult::Success | CommandResult::RequestExit => SUCCESS,
            CommandResult::Failure => FAILURE,
        }
    }
}

/// What executing one input line means for the surrounding session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading. Carries the line's status, or `None` if nothing ran.
    Continue(Option<ExitCode>),
    Exit,
}

impl From<CommandResult> for Flow {
    fn from(result: CommandResult) -> Self {
        match result {
            CommandResult::RequestExit => Flow::Exit,
            other => Flow::Continue(Some(other.code())),
        }
    }
}
