//! Runs resolved commands as a process pipeline.
//!
//! A pipeline is first laid out as data: one [`Stage`] per command, each naming the
//! [`Endpoint`] its standard input and output are bound to. [`Pipeline::execute`] then
//! materialises the junctions, forks one process per stage and wires it, and waits
//! for every child. Stage `i` reads junction `i - 1` and writes junction `i`. Every
//! other pipe end is closed in the child before its command starts, and in the
//! parent once all stages are forked, so end-of-file travels down the chain.

use crate::builtin::Builtin;
use crate::command::{EXEC_FAILED, ExitCode, FAILURE, Flow};
use crate::error::ShellError;
use crate::external::find_command_path;
use crate::lexer;
use crate::session::Session;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::Signal;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{self, ForkResult, Pid};
use std::ffi::CString;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::ffi::OsStringExt;

/// Where one standard stream of a stage is connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// The stream the shell itself holds.
    Inherit,
    /// The pipe between stage `n` and stage `n + 1`.
    Junction(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub argv: Vec<String>,
    pub stdin: Endpoint,
    pub stdout: Endpoint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Lays out `commands` as connected stages.
    ///
    /// Fails with [`ShellError::EmptyPipelineSegment`] if any command has no tokens,
    /// so nothing is spawned for an invalid line.
    pub fn new(commands: Vec<Vec<String>>) -> Result<Self, ShellError> {
        if commands.is_empty() || commands.iter().any(Vec::is_empty) {
            return Err(ShellError::EmptyPipelineSegment);
        }

        let last = commands.len() - 1;
        let stages = commands
            .into_iter()
            .enumerate()
            .map(|(i, argv)| Stage {
                argv,
                stdin: if i == 0 {
                    Endpoint::Inherit
                } else {
                    Endpoint::Junction(i - 1)
                },
                stdout: if i == last {
                    Endpoint::Inherit
                } else {
                    Endpoint::Junction(i)
                },
            })
            .collect();
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of pipes joining the stages.
    pub fn junctions(&self) -> usize {
        self.stages.len() - 1
    }

    /// Runs the pipeline and reports the status of its last stage.
    ///
    /// A lone builtin runs in this process and writes to `stdout`. Everything else is
    /// forked and writes to the inherited descriptor 1; `stdout` is only flushed first.
    pub fn execute(&self, session: &mut Session, stdout: &mut dyn Write) -> Flow {
        if let [stage] = self.stages.as_slice() {
            if let Some(builtin) = Builtin::lookup(&stage.argv[0]) {
                return builtin.run(&stage.argv, stdout, session).into();
            }
        }
        Flow::Continue(Some(self.spawn_and_wait(session, stdout)))
    }

    fn spawn_and_wait(&self, session: &mut Session, stdout: &mut dyn Write) -> ExitCode {
        let targets: Vec<Option<Target>> = self
            .stages
            .iter()
            .map(|stage| match Target::resolve(&stage.argv, session) {
                Ok(target) => Some(target),
                Err(err) => {
                    session.report(&err);
                    None
                }
            })
            .collect();
        let envp = session.env.envp();

        let mut junctions = match open_junctions(self.junctions()) {
            Ok(junctions) => junctions,
            Err(err) => {
                session.report(&err);
                return FAILURE;
            }
        };
        log::debug!("opened {} junction(s)", junctions.len());

        // Anything still buffered would otherwise be written again by each child.
        if let Err(err) = stdout.flush().and_then(|()| io::stdout().flush()) {
            log::warn!("flushing output before fork failed: {}", err);
        }

        let mut children = Vec::with_capacity(self.stages.len());
        for (stage, target) in self.stages.iter().zip(&targets) {
            let Some(target) = target else {
                children.push(Child::Finished(FAILURE));
                continue;
            };

            // SAFETY: the child only rewires descriptors, then execs or runs a builtin
            // and `_exit`s.
            match unsafe { unistd::fork() } {
                Ok(ForkResult::Parent { child }) => {
                    log::debug!("forked {} for `{}`", child, lexer::join_tokens(&stage.argv));
                    children.push(Child::Running(child));
                }
                Ok(ForkResult::Child) => {
                    run_stage(stage, target, &mut junctions, &envp, session)
                }
                Err(source) => {
                    session.report(&ShellError::Spawn {
                        command: stage.argv[0].clone(),
                        source,
                    });
                    children.push(Child::Finished(FAILURE));
                }
            }
        }
        drop(junctions);

        let statuses: Vec<ExitCode> = children.into_iter().map(Child::wait).collect();
        log::debug!("pipeline finished with statuses {:?}", statuses);
        statuses.last().copied().unwrap_or(FAILURE)
    }
}

/// What a stage runs, decided in the parent before forking.
#[derive(Debug)]
enum Target {
    Builtin(Builtin),
    Program { path: CString, argv: Vec<CString> },
}

impl Target {
    fn resolve(argv: &[String], session: &Session) -> Result<Self, ShellError> {
        let name = &argv[0];
        if let Some(builtin) = Builtin::lookup(name) {
            return Ok(Target::Builtin(builtin));
        }

        let path = find_command_path(session.env.search_path(), name)?;
        let nul = |_| ShellError::NulByte(name.clone());
        let path = CString::new(path.into_os_string().into_vec()).map_err(nul)?;
        let argv = argv
            .iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(nul)?;
        Ok(Target::Program { path, argv })
    }
}

struct Junction {
    read: OwnedFd,
    write: OwnedFd,
}

/// Pipe ends are close-on-exec; `dup2` clears the flag on the copies a stage keeps.
fn open_junctions(count: usize) -> Result<Vec<Junction>, ShellError> {
    (0..count)
        .map(|_| {
            unistd::pipe2(OFlag::O_CLOEXEC)
                .map(|(read, write)| Junction { read, write })
                .map_err(ShellError::Pipe)
        })
        .collect()
}

/// Binds the stage's streams to its junctions and closes every pipe end.
fn connect(stage: &Stage, junctions: &mut Vec<Junction>) -> nix::Result<()> {
    if let Endpoint::Junction(j) = stage.stdin {
        unistd::dup2(junctions[j].read.as_raw_fd(), libc::STDIN_FILENO)?;
    }
    if let Endpoint::Junction(j) = stage.stdout {
        unistd::dup2(junctions[j].write.as_raw_fd(), libc::STDOUT_FILENO)?;
    }
    junctions.clear();
    Ok(())
}

/// Body of a forked stage. Never returns.
fn run_stage(
    stage: &Stage,
    target: &Target,
    junctions: &mut Vec<Junction>,
    envp: &[CString],
    session: &mut Session,
) -> ! {
    let code = match connect(stage, junctions) {
        Err(errno) => {
            eprintln!("{}: cannot connect pipe: {}", stage.argv[0], errno);
            FAILURE
        }
        Ok(()) => match target {
            Target::Builtin(builtin) => {
                builtin.run(&stage.argv, &mut io::stdout(), session).code()
            }
            Target::Program { path, argv } => match unistd::execve(path, argv, envp) {
                Ok(never) => match never {},
                Err(errno) => {
                    eprintln!("{}: {}", stage.argv[0], errno);
                    EXEC_FAILED
                }
            },
        },
    };
    let _ = io::stdout().flush();
    // SAFETY: `_exit` skips the parent's atexit handlers and buffered state, which
    // this copy must not run.
    unsafe { libc::_exit(code) }
}

enum Child {
    Running(Pid),
    /// Never spawned; carries the status it counts as.
    Finished(ExitCode),
}

impl Child {
    fn wait(self) -> ExitCode {
        let pid = match self {
            Child::Finished(code) => return code,
            Child::Running(pid) => pid,
        };
        loop {
            match waitpid(pid, None) {
                Ok(WaitStatus::Exited(_, code)) => {
                    log::debug!("{} exited with {}", pid, code);
                    return code;
                }
                Ok(WaitStatus::Signaled(_, signal, _)) => {
                    log::debug!("{} killed by {}", pid, signal);
                    return terminated_by_signal(signal);
                }
                Ok(other) => log::trace!("{} changed state: {:?}", pid, other),
                Err(Errno::EINTR) => {}
                Err(errno) => {
                    log::warn!("waitpid {} failed: {}", pid, errno);
                    return FAILURE;
                }
            }
        }
    }
}

fn terminated_by_signal(signal: Signal) -> ExitCode {
    128 + signal as i32
}
