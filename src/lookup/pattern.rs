//! Regular expression engine seam.

use regex::Regex;
use std::fmt;

/// A compiled pattern as used by the regex match tables.
///
/// `exec` separates "no match" from an engine fault so a table can warn about
/// the fault and still treat the rule as non-matching.
pub trait Pattern: Sized {
    /// Compile `pattern`, reporting the engine message and byte offset.
    fn compile(pattern: &str) -> Result<Self, CompileError>;

    /// Run the pattern against `text`.
    fn exec(&self, text: &str) -> Result<bool, ExecFault>;
}

/// Pattern compile failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub message: String,
    /// Byte offset into the pattern where the error was detected.
    pub offset: usize,
}

/// Engine failure while executing a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecFault(pub String);

impl fmt::Display for ExecFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Pattern for Regex {
    fn compile(pattern: &str) -> Result<Self, CompileError> {
        Regex::new(pattern).map_err(|err| {
            syntax_error(pattern).unwrap_or_else(|| CompileError {
                message: err.to_string(),
                offset: 0,
            })
        })
    }

    fn exec(&self, text: &str) -> Result<bool, ExecFault> {
        Ok(self.is_match(text))
    }
}

/// Re-parse a rejected pattern to recover a concise message and its offset.
fn syntax_error(pattern: &str) -> Option<CompileError> {
    match regex_syntax::Parser::new().parse(pattern) {
        Err(regex_syntax::Error::Parse(e)) => Some(CompileError {
            message: e.kind().to_string(),
            offset: e.span().start.offset,
        }),
        Err(regex_syntax::Error::Translate(e)) => Some(CompileError {
            message: e.kind().to_string(),
            offset: e.span().start.offset,
        }),
        _ => None,
    }
}
