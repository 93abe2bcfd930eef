use crate::error::ShellError;
use nix::unistd::{AccessFlags, access};
use std::path::{Path, PathBuf};

/// Resolve a command name to the executable that should be run.
///
/// Behavior:
/// - Name starting with `.` or `/`: an explicit path, returned unchanged if it is executable.
/// - Anything else: each directory of `search_path` (colon separated, empty entries skipped)
///   is tried in order and the first executable `<dir>/<name>` wins.
///
/// Fails with [`ShellError::EmptyPath`] when a search is needed but `search_path` is
/// `None` or empty, and with [`ShellError::CommandNotFound`] when nothing matches.
pub fn find_command_path(
    search_path: Option<&str>,
    name: &str,
) -> Result<PathBuf, ShellError> {
    if name.starts_with('.') || name.starts_with('/') {
        let path = Path::new(name);
        return if is_executable(path) {
            Ok(path.to_path_buf())
        } else {
            Err(ShellError::CommandNotFound(name.to_string()))
        };
    }

    let search_path = search_path
        .filter(|p| !p.is_empty())
        .ok_or(ShellError::EmptyPath)?;

    find_in_path(search_path, name)
        .ok_or_else(|| ShellError::CommandNotFound(name.to_string()))
}

fn find_in_path(search_path: &str, cmd: &str) -> Option<PathBuf> {
    if cmd.is_empty() {
        return None;
    }
    search_path
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(cmd))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    path.is_file() && access(path, AccessFlags::X_OK).is_ok()
}
