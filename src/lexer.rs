//! Splits one line of input into an argument vector.
//!
//! Tokens are separated by plain spaces. A single quote opens a verbatim span that
//! runs to the next single quote; quoted text joins whatever unquoted text touches it,
//! so `ab'c d'e` is the single token `abc de` and `''` is an empty token.

use crate::error::ShellError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
}

impl LexingFSM {
    /// Creates a new instance of the lexical analysis Finite State Machine.
    ///
    /// A trailing newline is dropped; the end of input terminates the last token.
    fn new(line: &str) -> Self {
        let line = line.strip_suffix('\n').unwrap_or(line);
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
        }
    }

    /// Runs the machine to the end of the input.
    ///
    /// On an unterminated quote every token produced so far is discarded.
    fn make_tokens(mut self) -> Result<Vec<String>, ShellError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingSingleQuote => self.handle_single_quote(ch),
            }
        }

        match self.state {
            LexingState::ReadingSingleQuote => Err(ShellError::MalformedQuoting),
            LexingState::ReadingWord => {
                out.push(self.buffer);
                Ok(out)
            }
            LexingState::Start => Ok(out),
        }
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn handle_start(&mut self, ch: char) {
        match ch {
            ' ' => {}
            '\'' => self.state = LexingState::ReadingSingleQuote,
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<String>) {
        match ch {
            ' ' => {
                out.push(std::mem::take(&mut self.buffer));
                self.state = LexingState::Start;
            }
            '\'' => self.state = LexingState::ReadingSingleQuote,
            c => self.buffer.push(c),
        }
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            // The closed span still belongs to a word, even when it was empty.
            '\'' => self.state = LexingState::ReadingWord,
            c => self.buffer.push(c),
        }
    }
}

/// The main entry point function to perform lexical analysis.
///
/// An empty or all-space line yields an empty vector. An opening quote without a
/// matching closing quote yields [`ShellError::MalformedQuoting`].
pub fn split_into_tokens(line: &str) -> Result<Vec<String>, ShellError> {
    LexingFSM::new(line).make_tokens()
}

/// Joins tokens back into a line that tokenizes to the same vector.
///
/// Tokens that are empty or contain a space are wrapped in single quotes.
pub fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|token| {
            let token = token.as_ref();
            if token.is_empty() || token.contains(' ') {
                format!("'{token}'")
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
