use std::collections::HashMap;
use std::env as stdenv;
use std::ffi::CString;
use std::path::PathBuf;

pub const PATH_KEY: &str = "PATH";
pub const HOME_KEY: &str = "HOME";

/// Mutable, user-level view of the process environment used by the interpreter.
///
/// The environment contains:
/// - `vars`: a snapshot of environment variables; spawned programs receive exactly these.
/// - `current_dir`: the working directory last set through `cd`.
///
/// Only builtins running in the controlling process mutate it. A builtin run inside a
/// pipeline stage works on that process's private copy, which dies with the stage.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_vars(stdenv::vars().collect(), current_dir)
    }

    /// Build an environment from explicit variables, without looking at the process.
    pub fn with_vars(vars: HashMap<String, String>, current_dir: PathBuf) -> Self {
        Self { vars, current_dir }
    }

    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// The command search path, or `None` when it is unset or empty.
    pub fn search_path(&self) -> Option<&str> {
        self.get_var(PATH_KEY).filter(|path| !path.is_empty())
    }

    pub fn home(&self) -> Option<&str> {
        self.get_var(HOME_KEY).filter(|home| !home.is_empty())
    }

    /// `KEY=VALUE` strings for `execve`.
    ///
    /// Entries holding a NUL byte cannot be passed and are skipped.
    pub fn envp(&self) -> Vec<CString> {
        self.vars
            .iter()
            .filter_map(|(k, v)| CString::new(format!("{k}={v}")).ok())
            .collect()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
