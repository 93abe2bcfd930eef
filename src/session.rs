use crate::alias::AliasTable;
use crate::command::{ExitCode, FAILURE, SUCCESS};
use crate::env::Environment;
use crate::error::ShellError;
use crate::history::History;

/// Everything that outlives a single input line.
///
/// Created when the session starts and handed by reference to the resolver,
/// the classifier and the builtins.
#[derive(Debug, Clone)]
pub struct Session {
    pub env: Environment,
    pub aliases: AliasTable,
    pub history: History,
    status: ExitCode,
}

impl Session {
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            aliases: AliasTable::new(),
            history: History::new(),
            status: SUCCESS,
        }
    }

    /// Prints a one-line diagnostic to stderr and marks the session as failed.
    pub fn report(&mut self, err: &ShellError) {
        log::debug!("diagnostic: {err:?}");
        eprintln!("{err}");
        self.status = FAILURE;
    }

    /// Whether any diagnostic has been reported so far.
    pub fn failed(&self) -> bool {
        self.status != SUCCESS
    }

    /// `FAILURE` once a diagnostic has been reported, `SUCCESS` otherwise.
    pub fn status(&self) -> ExitCode {
        self.status
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Environment::new())
    }
}
