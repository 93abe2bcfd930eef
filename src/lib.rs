//! A small POSIX-flavoured command interpreter.
//!
//! A line goes through a fixed chain: it is split on `|` into segments, each segment
//! is tokenized (single quotes group words) and alias-expanded, and the resulting
//! argument vectors are either handed to a builtin or run as a pipeline of forked
//! processes connected by pipes.
//!
//! The main entry point is [`Interpreter`], which owns the [`Session`] state (aliases,
//! history and the environment snapshot) and drives it from any [`LineSource`].

pub mod alias;
mod builtin;
pub mod command;
pub mod env;
pub mod error;
mod external;
pub mod history;
mod interpreter;
pub mod io_adapters;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod session;

pub use command::{ExitCode, Flow};
pub use error::ShellError;
pub use interpreter::{ExitPolicy, Interpreter};
pub use io_adapters::{LineSource, Prompt, ScriptLines};
pub use session::Session;
