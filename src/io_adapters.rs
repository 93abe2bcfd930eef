//! Where input lines come from.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::BufRead;

/// A source of raw input lines for a session.
pub trait LineSource {
    /// The next line without its terminator, or `None` once input is exhausted.
    fn next_line(&mut self) -> anyhow::Result<Option<String>>;

    /// Called once when the source is exhausted.
    fn on_eof(&mut self) {}
}

pub const PROMPT: &str = "pipesh> ";

/// Interactive line editor on the controlling terminal.
pub struct Prompt {
    editor: DefaultEditor,
}

impl Prompt {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for Prompt {
    fn next_line(&mut self) -> anyhow::Result<Option<String>> {
        match self.editor.readline(PROMPT) {
            Ok(line) => Ok(Some(line)),
            // Ctrl-C drops the pending input and shows a fresh prompt.
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn on_eof(&mut self) {
        println!("exit");
    }
}

/// Lines of a script file or any other buffered reader, read without a prompt.
pub struct ScriptLines<R> {
    reader: R,
}

impl<R: BufRead> ScriptLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ScriptLines<R> {
    fn next_line(&mut self) -> anyhow::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}
