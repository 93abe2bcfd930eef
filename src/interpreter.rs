use crate::command::{ExitCode, FAILURE, Flow, SUCCESS};
use crate::env::Environment;
use crate::io_adapters::LineSource;
use crate::parser;
use crate::pipeline::Pipeline;
use crate::session::Session;
use std::io::{self, Write};

/// How the status of a whole session is derived once input ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPolicy {
    /// 1 if any diagnostic was reported, else 0.
    FailureFlag,
    /// Status of the last line that ran something.
    LastStatus,
}

/// Reads lines, runs them, and keeps the session state between them.
///
/// Example
/// ```
/// use pipesh::{Flow, Interpreter};
/// let mut sh = Interpreter::default();
/// let mut out = Vec::new();
/// sh.run_line_with_output("alias hi = 'echo hi'", &mut out);
/// assert_eq!(sh.session().aliases.get("hi"), Some("echo hi"));
/// assert_eq!(sh.run_line("exit"), Flow::Exit);
/// ```
#[derive(Debug, Default)]
pub struct Interpreter {
    session: Session,
}

impl Interpreter {
    pub fn new(env: Environment) -> Self {
        Self {
            session: Session::new(env),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Drives a whole session over `source`.
    ///
    /// Stops at end of input or when a line requests exit. Only failures of the line
    /// source itself are returned as errors; command failures are reported and folded
    /// into the status according to `policy`.
    pub fn run(
        &mut self,
        source: &mut dyn LineSource,
        policy: ExitPolicy,
    ) -> anyhow::Result<ExitCode> {
        let mut last = SUCCESS;
        loop {
            let Some(line) = source.next_line()? else {
                source.on_eof();
                break;
            };
            match self.run_line(&line) {
                Flow::Exit => break,
                Flow::Continue(Some(code)) => last = code,
                Flow::Continue(None) => {}
            }
        }

        let code = match policy {
            ExitPolicy::FailureFlag => self.session.status(),
            ExitPolicy::LastStatus => last,
        };
        log::debug!("session finished with {}", code);
        Ok(code)
    }

    pub fn run_line(&mut self, line: &str) -> Flow {
        self.run_line_with_output(line, &mut io::stdout())
    }

    /// Runs one line, writing in-process builtin output to `stdout`.
    pub fn run_line_with_output(&mut self, line: &str, stdout: &mut dyn Write) -> Flow {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let flow = self.execute(line, stdout);

        if flow != Flow::Exit && !line.trim_matches(' ').is_empty() {
            self.session.history.push(line);
        }
        flow
    }

    fn execute(&mut self, line: &str, stdout: &mut dyn Write) -> Flow {
        let mut commands = Vec::new();
        for segment in parser::split_pipeline(line) {
            match parser::parse_segment(segment, &self.session.aliases) {
                Ok(argv) => commands.push(argv),
                Err(err) => {
                    self.session.report(&err);
                    return Flow::Continue(Some(FAILURE));
                }
            }
        }

        if let [argv] = commands.as_slice() {
            if argv.is_empty() {
                return Flow::Continue(None);
            }
        }

        match Pipeline::new(commands) {
            Ok(pipeline) => pipeline.execute(&mut self.session, stdout),
            Err(err) => {
                self.session.report(&err);
                Flow::Continue(Some(FAILURE))
            }
        }
    }
}
