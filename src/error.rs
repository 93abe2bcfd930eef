//! Diagnostics raised while resolving and running commands.
//!
//! None of these end the session: each one is reported as a single line on
//! stderr and raises the session failure flag (see [`crate::session::Session::report`]).

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Every recoverable condition the interpreter can report.
#[derive(Debug, Error)]
pub enum ShellError {
    /// A single quote was opened and never closed.
    #[error("missing closing quote")]
    MalformedQuoting,

    /// A builtin was invoked with the wrong number or shape of arguments.
    #[error("{command}: {detail} (usage: {usage})")]
    Usage {
        command: &'static str,
        usage: &'static str,
        detail: String,
    },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    /// `PATH` is unset or empty when a bare command name must be searched.
    #[error("PATH is empty")]
    EmptyPath,

    /// One segment of a pipeline has no tokens left after alias expansion.
    #[error("empty command in pipeline")]
    EmptyPipelineSegment,

    #[error("cd: {}: {source}", path.display())]
    DirectoryChangeFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cd: HOME not set")]
    HomeNotSet,

    #[error("history: no entry {0}")]
    HistoryOutOfRange(usize),

    #[error("{0}: argument contains a NUL byte")]
    NulByte(String),

    #[error("pipe: {0}")]
    Pipe(#[source] nix::Error),

    #[error("{command}: cannot spawn: {source}")]
    Spawn {
        command: String,
        #[source]
        source: nix::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ShellError {
    pub(crate) fn usage(
        command: &'static str,
        usage: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        ShellError::Usage {
            command,
            usage,
            detail: detail.into(),
        }
    }
}
