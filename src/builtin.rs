use crate::command::CommandResult;
use crate::error::ShellError;
use crate::external::find_command_path;
use crate::session::Session;
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// against the [`Session`], in the controlling process or inside a pipeline stage.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "alias" or "cd".
    fn name() -> &'static str;

    /// One-line synopsis quoted in usage errors.
    fn usage() -> &'static str;

    /// Executes the command.
    ///
    /// An `Err` is reported by the caller and turns into [`CommandResult::Failure`].
    fn execute(
        self,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<CommandResult, ShellError>;
}

/// The fixed set of builtin names. Matching is exact and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Alias,
    Unalias,
    Which,
    Path,
    Cd,
    History,
}

impl Builtin {
    pub const ALL: [Builtin; 7] = [
        Builtin::Exit,
        Builtin::Alias,
        Builtin::Unalias,
        Builtin::Which,
        Builtin::Path,
        Builtin::Cd,
        Builtin::History,
    ];

    /// Classifies a command name: `None` means it is an external program.
    pub fn lookup(name: &str) -> Option<Builtin> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Exit => Exit::name(),
            Builtin::Alias => Alias::name(),
            Builtin::Unalias => Unalias::name(),
            Builtin::Which => Which::name(),
            Builtin::Path => SearchPath::name(),
            Builtin::Cd => Cd::name(),
            Builtin::History => ShowHistory::name(),
        }
    }

    /// Parses `argv` (name included) and runs the builtin.
    ///
    /// Diagnostics are reported on the session before returning `Failure`.
    pub fn run(
        self,
        argv: &[String],
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> CommandResult {
        match self {
            Builtin::Exit => run_parsed::<Exit>(argv, stdout, session),
            Builtin::Alias => run_parsed::<Alias>(argv, stdout, session),
            Builtin::Unalias => run_parsed::<Unalias>(argv, stdout, session),
            Builtin::Which => run_parsed::<Which>(argv, stdout, session),
            Builtin::Path => run_parsed::<SearchPath>(argv, stdout, session),
            Builtin::Cd => run_parsed::<Cd>(argv, stdout, session),
            Builtin::History => run_parsed::<ShowHistory>(argv, stdout, session),
        }
    }
}

fn run_parsed<T: BuiltinCommand>(
    argv: &[String],
    stdout: &mut dyn Write,
    session: &mut Session,
) -> CommandResult {
    // Everything after the name is an operand, even `--` or a word starting with `-`.
    let args: Vec<&str> = std::iter::once("--")
        .chain(argv.iter().skip(1).map(String::as_str))
        .collect();
    let outcome = match T::from_args(&[T::name()], &args) {
        Ok(cmd) => cmd.execute(stdout, session),
        Err(EarlyExit { output, .. }) => Err(ShellError::usage(
            T::name(),
            T::usage(),
            first_line(&output),
        )),
    };
    match outcome {
        Ok(result) => result,
        Err(err) => {
            session.report(&err);
            CommandResult::Failure
        }
    }
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("invalid arguments")
        .to_string()
}

#[derive(FromArgs)]
/// leave the shell.
pub struct Exit {
    #[argh(positional)]
    /// collected only to reject them: exit takes no arguments.
    pub args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn usage() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        _session: &mut Session,
    ) -> Result<CommandResult, ShellError> {
        if !self.args.is_empty() {
            return Err(ShellError::usage(
                Self::name(),
                Self::usage(),
                "takes no arguments",
            ));
        }
        Ok(CommandResult::RequestExit)
    }
}

#[derive(FromArgs)]
/// define an alias, or list every alias when called without arguments.
pub struct Alias {
    #[argh(positional)]
    /// the definition, written as NAME = VALUE; VALUE may be omitted for an empty alias.
    pub args: Vec<String>,
}

impl Alias {
    fn list(stdout: &mut dyn Write, session: &Session) -> io::Result<()> {
        for (name, value) in session.aliases.iter() {
            writeln!(stdout, "alias {} = '{}'", name, value)?;
        }
        Ok(())
    }

    fn bad_shape(detail: &str) -> ShellError {
        ShellError::usage(Self::name(), Self::usage(), detail)
    }
}

impl BuiltinCommand for Alias {
    fn name() -> &'static str {
        "alias"
    }

    fn usage() -> &'static str {
        "alias [NAME = [VALUE]]"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<CommandResult, ShellError> {
        let (name, value) = match self.args.as_slice() {
            [] => {
                Self::list(stdout, session)?;
                return Ok(CommandResult::Success);
            }
            [name, eq] if eq == "=" => (name, ""),
            [name, eq, value] if eq == "=" => (name, value.as_str()),
            _ => return Err(Self::bad_shape("expected NAME = VALUE")),
        };

        if name == "=" || value == "=" {
            return Err(Self::bad_shape("'=' must appear exactly once, after NAME"));
        }
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(Self::bad_shape("NAME must be a single word"));
        }

        log::debug!("alias {name} = {value:?}");
        session.aliases.insert(name.as_str(), value);
        Ok(CommandResult::Success)
    }
}

#[derive(FromArgs)]
/// remove an alias; removing an unknown name is not an error.
pub struct Unalias {
    #[argh(positional)]
    /// name of the alias to remove.
    pub name: String,
}

impl BuiltinCommand for Unalias {
    fn name() -> &'static str {
        "unalias"
    }

    fn usage() -> &'static str {
        "unalias NAME"
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<CommandResult, ShellError> {
        session.aliases.remove(&self.name);
        Ok(CommandResult::Success)
    }
}

#[derive(FromArgs)]
/// show what running NAME would execute: an alias, a builtin, or a program.
pub struct Which {
    #[argh(positional)]
    /// command name to look up.
    pub name: String,
}

impl BuiltinCommand for Which {
    fn name() -> &'static str {
        "which"
    }

    fn usage() -> &'static str {
        "which NAME"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<CommandResult, ShellError> {
        let name = self.name;
        if let Some(value) = session.aliases.get(&name) {
            writeln!(stdout, "{} is an alias for '{}'", name, value)?;
        } else if let Some(builtin) = Builtin::lookup(&name) {
            writeln!(stdout, "{} is a shell builtin", builtin.name())?;
        } else {
            let path = find_command_path(session.env.search_path(), &name)?;
            writeln!(stdout, "{} is {}", name, path.display())?;
        }
        Ok(CommandResult::Success)
    }
}

#[derive(FromArgs)]
/// print the command search path, or replace it.
pub struct SearchPath {
    #[argh(positional)]
    /// new colon-separated search path.
    pub value: Option<String>,
}

impl BuiltinCommand for SearchPath {
    fn name() -> &'static str {
        "path"
    }

    fn usage() -> &'static str {
        "path [SEARCH_PATH]"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<CommandResult, ShellError> {
        match self.value {
            Some(value) => session.env.set_var(crate::env::PATH_KEY, value),
            None => {
                let path = session.env.search_path().ok_or(ShellError::EmptyPath)?;
                writeln!(stdout, "{}", path)?;
            }
        }
        Ok(CommandResult::Success)
    }
}

#[derive(FromArgs)]
/// change the current working directory; with no argument, go to $HOME.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to, absolute or relative to the current directory.
    /// Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn usage() -> &'static str {
        "cd [DIR]"
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<CommandResult, ShellError> {
        let target = match self.target {
            Some(t) => PathBuf::from(t),
            None => PathBuf::from(session.env.home().ok_or(ShellError::HomeNotSet)?),
        };

        let new_dir = if target.as_os_str().is_empty() || target.is_absolute() {
            target.clone()
        } else {
            session.env.current_dir.join(&target)
        };

        let changed = fs::canonicalize(&new_dir).and_then(|canonical| {
            env::set_current_dir(&canonical)?;
            Ok(canonical)
        });
        match changed {
            Ok(canonical) => {
                log::debug!("cd: now in {}", canonical.display());
                session.env.current_dir = canonical;
                Ok(CommandResult::Success)
            }
            Err(source) => Err(ShellError::DirectoryChangeFailed {
                path: target,
                source,
            }),
        }
    }
}

#[derive(FromArgs)]
/// print the command history, or the N-th entry of it.
pub struct ShowHistory {
    #[argh(positional)]
    /// entry to print, counting from 1.
    pub index: Option<usize>,
}

impl BuiltinCommand for ShowHistory {
    fn name() -> &'static str {
        "history"
    }

    fn usage() -> &'static str {
        "history [N]"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<CommandResult, ShellError> {
        match self.index {
            None => {
                for (i, line) in session.history.iter() {
                    writeln!(stdout, "{:>5}  {}", i, line)?;
                }
            }
            Some(i) => {
                let line = session
                    .history
                    .get(i)
                    .ok_or(ShellError::HistoryOutOfRange(i))?;
                writeln!(stdout, "{}", line)?;
            }
        }
        Ok(CommandResult::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;
    use crate::lexer;
    use std::collections::HashMap;
    use std::env as stdenv;
    use std::sync::{Mutex, MutexGuard, OnceLock};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn lock_current_dir() -> MutexGuard<'static, ()> {
        static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn session() -> Session {
        let mut vars = HashMap::new();
        vars.insert("PATH".to_string(), "/bin:/usr/bin".to_string());
        Session::new(Environment::with_vars(vars, stdenv::current_dir().unwrap()))
    }

    fn run(session: &mut Session, line: &str) -> (CommandResult, String) {
        let argv = lexer::split_into_tokens(line).unwrap();
        let builtin = Builtin::lookup(&argv[0]).expect("builtin name");
        let mut out = Vec::new();
        let result = builtin.run(&argv, &mut out, session);
        (result, String::from_utf8(out).unwrap())
    }

    fn make_unique_temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let p = stdenv::temp_dir().join(format!(
            "pipesh_test_cd_{}_{}",
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&p).expect("failed to create temp dir");
        p
    }

    #[test]
    fn classifier_matches_exact_names_only() {
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::lookup(builtin.name()), Some(builtin));
        }
        assert_eq!(Builtin::lookup("Exit"), None);
        assert_eq!(Builtin::lookup("ls"), None);
        assert_eq!(Builtin::lookup(""), None);
    }

    #[test]
    fn exit_without_arguments_requests_exit() {
        let mut s = session();
        assert_eq!(run(&mut s, "exit").0, CommandResult::RequestExit);
        assert!(!s.failed());
    }

    #[test]
    fn exit_with_arguments_is_a_usage_error() {
        let mut s = session();
        assert_eq!(run(&mut s, "exit 3").0, CommandResult::Failure);
        assert!(s.failed());
    }

    #[test]
    fn alias_defines_and_lists_sorted() {
        let mut s = session();
        assert_eq!(run(&mut s, "alias ll = 'ls -l'").0, CommandResult::Success);
        assert_eq!(run(&mut s, "alias e =").0, CommandResult::Success);
        assert_eq!(run(&mut s, "alias b = c").0, CommandResult::Success);

        assert_eq!(s.aliases.get("ll"), Some("ls -l"));
        assert_eq!(s.aliases.get("e"), Some(""));

        let (result, out) = run(&mut s, "alias");
        assert_eq!(result, CommandResult::Success);
        assert_eq!(out, "alias b = 'c'\nalias e = ''\nalias ll = 'ls -l'\n");
    }

    #[test]
    fn alias_overwrites_existing_value() {
        let mut s = session();
        run(&mut s, "alias x = one");
        run(&mut s, "alias x = two");
        assert_eq!(s.aliases.get("x"), Some("two"));
        assert_eq!(s.aliases.len(), 1);
    }

    #[test]
    fn alias_value_may_look_like_a_flag() {
        let mut s = session();
        assert_eq!(run(&mut s, "alias v = -v").0, CommandResult::Success);
        assert_eq!(s.aliases.get("v"), Some("-v"));
    }

    #[test]
    fn alias_rejects_malformed_definitions() {
        for line in [
            "alias x",
            "alias x y",
            "alias x = a b",
            "alias = x",
            "alias x = =",
            "alias 'a b' = c",
            "alias '' = c",
        ] {
            let mut s = session();
            assert_eq!(run(&mut s, line).0, CommandResult::Failure, "{line:?}");
            assert!(s.failed(), "{line:?} should set the failure flag");
            assert!(s.aliases.is_empty(), "{line:?} must not define anything");
        }
    }

    #[test]
    fn unalias_removes_and_tolerates_missing_names() {
        let mut s = session();
        run(&mut s, "alias x = y");
        assert_eq!(run(&mut s, "unalias x").0, CommandResult::Success);
        assert_eq!(s.aliases.get("x"), None);
        assert_eq!(run(&mut s, "unalias x").0, CommandResult::Success);
        assert!(!s.failed());
    }

    #[test]
    fn unalias_requires_exactly_one_name() {
        let mut s = session();
        assert_eq!(run(&mut s, "unalias").0, CommandResult::Failure);
        assert_eq!(run(&mut s, "unalias a b").0, CommandResult::Failure);
    }

    #[test]
    fn which_prefers_alias_then_builtin_then_path() {
        let mut s = session();
        run(&mut s, "alias cd = ls");

        let (result, out) = run(&mut s, "which cd");
        assert_eq!(result, CommandResult::Success);
        assert_eq!(out, "cd is an alias for 'ls'\n");

        let (_, out) = run(&mut s, "which history");
        assert_eq!(out, "history is a shell builtin\n");

        let (result, out) = run(&mut s, "which sh");
        assert_eq!(result, CommandResult::Success);
        assert!(out.starts_with("sh is /"), "{out:?}");
        assert!(out.trim_end().ends_with("/sh"), "{out:?}");
    }

    #[test]
    fn which_reports_unknown_commands() {
        let mut s = session();
        let (result, out) = run(&mut s, "which definitely-not-a-command-xyz");
        assert_eq!(result, CommandResult::Failure);
        assert!(out.is_empty());
        assert!(s.failed());
    }

    #[test]
    fn path_prints_and_replaces_search_path() {
        let mut s = session();
        let (_, out) = run(&mut s, "path");
        assert_eq!(out, "/bin:/usr/bin\n");

        assert_eq!(run(&mut s, "path /opt/bin").0, CommandResult::Success);
        assert_eq!(s.env.search_path(), Some("/opt/bin"));
    }

    #[test]
    fn path_fails_when_empty() {
        let mut s = session();
        run(&mut s, "path ''");
        let (result, out) = run(&mut s, "path");
        assert_eq!(result, CommandResult::Failure);
        assert!(out.is_empty());
    }

    #[test]
    fn path_takes_at_most_one_argument() {
        let mut s = session();
        assert_eq!(run(&mut s, "path a b").0, CommandResult::Failure);
        assert_eq!(s.env.search_path(), Some("/bin:/usr/bin"));
    }

    #[test]
    fn history_prints_all_and_single_entries() {
        let mut s = session();
        s.history.push("ls");
        s.history.push("echo 'a b'");

        let (_, out) = run(&mut s, "history");
        assert_eq!(out, "    1  ls\n    2  echo 'a b'\n");

        let (result, out) = run(&mut s, "history 2");
        assert_eq!(result, CommandResult::Success);
        assert_eq!(out, "echo 'a b'\n");
    }

    #[test]
    fn history_rejects_bad_indexes() {
        let mut s = session();
        s.history.push("ls");
        assert_eq!(run(&mut s, "history 0").0, CommandResult::Failure);
        assert_eq!(run(&mut s, "history 2").0, CommandResult::Failure);
        assert_eq!(run(&mut s, "history abc").0, CommandResult::Failure);
        assert_eq!(run(&mut s, "history 1 2").0, CommandResult::Failure);
    }

    #[test]
    fn exit_counts_dashes_as_arguments() {
        for line in ["exit --", "exit --help", "exit -"] {
            let mut s = session();
            let (result, out) = run(&mut s, line);
            assert_eq!(result, CommandResult::Failure, "{line:?}");
            assert!(out.is_empty(), "{line:?} printed {out:?}");
            assert!(s.failed());
        }
    }

    #[test]
    fn alias_name_may_start_with_a_dash() {
        let mut s = session();
        assert_eq!(run(&mut s, "alias -la = 'ls -la'").0, CommandResult::Success);
        assert_eq!(s.aliases.get("-la"), Some("ls -la"));

        let (_, out) = run(&mut s, "which -la");
        assert_eq!(out, "-la is an alias for 'ls -la'\n");

        assert_eq!(run(&mut s, "unalias -la").0, CommandResult::Success);
        assert!(s.aliases.is_empty());
        assert!(!s.failed());
    }

    #[test]
    fn help_flag_is_an_ordinary_operand() {
        let mut s = session();
        assert_eq!(run(&mut s, "history --help").0, CommandResult::Failure);
        assert_eq!(run(&mut s, "history --").0, CommandResult::Failure);
        assert_eq!(run(&mut s, "unalias --help").0, CommandResult::Success);
        assert_eq!(run(&mut s, "path --help").0, CommandResult::Success);
        assert_eq!(s.env.search_path(), Some("--help"));
    }

    #[test]
    fn test_cd_to_absolute_path() {
        let _lock = lock_current_dir();
        let temp = make_unique_temp_dir();
        let canonical_temp = fs::canonicalize(&temp).expect("canonicalize failed");

        // save original cwd to restore later
        let orig = stdenv::current_dir().unwrap();
        let mut s = session();

        let line = format!("cd {}", canonical_temp.display());
        assert_eq!(run(&mut s, &line).0, CommandResult::Success);

        let new_canonical = fs::canonicalize(stdenv::current_dir().unwrap()).unwrap();
        assert_eq!(new_canonical, canonical_temp);
        assert_eq!(s.env.current_dir, canonical_temp);

        stdenv::set_current_dir(orig).expect("failed to restore cwd");
        let _ = fs::remove_dir_all(&temp);
    }

    #[test]
    fn test_cd_to_home_when_none() {
        let _lock = lock_current_dir();
        let temp = make_unique_temp_dir();
        let canonical_temp = fs::canonicalize(&temp).expect("canonicalize failed");
        let orig = stdenv::current_dir().unwrap();

        let mut s = session();
        s.env.set_var("HOME", canonical_temp.to_string_lossy().to_string());

        assert_eq!(run(&mut s, "cd").0, CommandResult::Success);
        assert_eq!(s.env.current_dir, canonical_temp);

        stdenv::set_current_dir(orig).expect("failed to restore cwd");
        let _ = fs::remove_dir_all(&temp);
    }

    #[test]
    fn test_cd_without_home_fails() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let mut s = session();

        assert_eq!(run(&mut s, "cd").0, CommandResult::Failure);
        assert!(s.failed());
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_nonexistent_path_errors() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let mut s = session();

        let line = format!("cd nonexistent_dir_for_pipesh_test_{}", std::process::id());
        assert_eq!(run(&mut s, &line).0, CommandResult::Failure);
        assert!(s.failed());
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_with_two_arguments_is_usage_error() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let mut s = session();

        assert_eq!(run(&mut s, "cd /tmp /usr").0, CommandResult::Failure);
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_to_dash_named_directory() {
        let _lock = lock_current_dir();
        let temp = make_unique_temp_dir();
        let dashed = temp.join("-dir");
        fs::create_dir_all(&dashed).expect("create dash dir");
        let canonical = fs::canonicalize(&dashed).expect("canonicalize failed");
        let orig = stdenv::current_dir().unwrap();

        let mut s = session();
        s.env.current_dir = fs::canonicalize(&temp).unwrap();
        assert_eq!(run(&mut s, "cd -dir").0, CommandResult::Success);
        assert_eq!(s.env.current_dir, canonical);

        stdenv::set_current_dir(orig).expect("failed to restore cwd");
        let _ = fs::remove_dir_all(&temp);
    }
}
