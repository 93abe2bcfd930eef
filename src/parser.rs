//! Turns a raw input line into the argument vectors of a pipeline.

use crate::alias::AliasTable;
use crate::error::ShellError;
use crate::lexer;

/// Splits a line on `|` into raw segments, first stage first.
///
/// A `|` inside a single-quoted span is part of the segment. The line always yields
/// at least one segment, so `""` gives `[""]` and `"a||b"` gives `["a", "", "b"]`.
pub fn split_pipeline(line: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quoted = false;

    for (i, ch) in line.char_indices() {
        match ch {
            '\'' => quoted = !quoted,
            '|' if !quoted => {
                segments.push(&line[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&line[start..]);
    segments
}

/// Tokenizes one segment and expands its aliases.
pub fn parse_segment(segment: &str, aliases: &AliasTable) -> Result<Vec<String>, ShellError> {
    let mut argv = lexer::split_into_tokens(segment)?;
    aliases.resolve(&mut argv);
    Ok(argv)
}
