//! Error types for ctlmatch.

use thiserror::Error;

/// Error type for ctlmatch operations that can fail as a whole.
///
/// Per-line problems while building a table never surface here; they are
/// reported through an [`ErrorSink`](crate::diag::ErrorSink) and the line is
/// skipped.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for ctlmatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by the line classifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A quoted value was never closed
    #[error("unterminated quote")]
    UnterminatedQuote,

    /// A token is not of the form `label=value`
    #[error("malformed entry: {0}")]
    Malformed(String),

    /// The line carries more tokens than a matcher line can hold
    #[error("too many tokens (max {0})")]
    TooManyTokens(usize),

    /// More than one primary destination label on the line
    #[error("multiple primary destinations")]
    MultiplePrimary,

    /// No primary destination label on the line
    #[error("no primary specifier")]
    NoPrimary,
}

/// Error type for address range parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// The text is not an IP address
    #[error("malformed IP address: {0}")]
    MalformedAddress(String),

    /// CIDR prefix length out of range
    #[error("invalid prefix length: {0}")]
    InvalidPrefix(String),

    /// Range bounds are reversed
    #[error("range start is greater than range end")]
    Reversed,

    /// IPv4 bound paired with an IPv6 bound
    #[error("mixed address families in range")]
    MixedFamilies,
}

/// Error type for inserting one entry into a match table.
///
/// Every variant is recoverable: the builder reports it and moves on to the
/// next line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    /// URL already registered in the exact-URL table
    #[error("url expression error (already exists) at line {line}: {url}")]
    Duplicate { url: String, line: usize },

    /// Pattern failed to compile
    #[error("regular expression error at line {line} position {offset} : {message} (pattern {pattern:?})")]
    Regex {
        pattern: String,
        line: usize,
        offset: usize,
        message: String,
    },

    /// IP range could not be parsed
    #[error("{reason} at line {line} ({text})")]
    IpRange {
        text: String,
        line: usize,
        reason: RangeError,
    },

    /// The record rejected the remaining tokens
    #[error("{message} at line {line}")]
    Init { line: usize, message: String },
}

impl EntryError {
    /// Source line the failed entry came from.
    pub fn line(&self) -> usize {
        match self {
            EntryError::Duplicate { line, .. }
            | EntryError::Regex { line, .. }
            | EntryError::IpRange { line, .. }
            | EntryError::Init { line, .. } => *line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_error_line() {
        let err = EntryError::Duplicate {
            url: "http://a/".to_string(),
            line: 7,
        };
        assert_eq!(err.line(), 7);

        let err = EntryError::IpRange {
            text: "1.2.3".to_string(),
            line: 3,
            reason: RangeError::MalformedAddress("1.2.3".to_string()),
        };
        assert_eq!(err.line(), 3);
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_regex_error_message() {
        let err = EntryError::Regex {
            pattern: "(".to_string(),
            line: 2,
            offset: 0,
            message: "unclosed group".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("line 2"));
        assert!(msg.contains("position 0"));
        assert!(msg.contains("unclosed group"));
    }
}
