//! Config line classifier.
//!
//! Turns one config line such as
//!
//! ```text
//! dest_domain=example.com  action=never-cache  scheme="http"
//! ```
//!
//! into a [`MatcherLine`]: an ordered list of `label=value` tokens with the
//! primary destination token identified and its [`MatchType`] recorded.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::MatchType;

/// Maximum number of tokens on one config line.
pub const MATCHER_MAX_TOKENS: usize = 40;

/// Label names that select a match strategy.
///
/// A `None` tag means the label is not recognised as a primary destination
/// for this table; such a token is treated as an ordinary modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherTags {
    pub match_host: Option<String>,
    pub match_domain: Option<String>,
    pub match_ip: Option<String>,
    pub match_regex: Option<String>,
    pub match_url: Option<String>,
    pub match_host_regex: Option<String>,
}

impl Default for MatcherTags {
    fn default() -> Self {
        Self {
            match_host: Some("dest_host".to_string()),
            match_domain: Some("dest_domain".to_string()),
            match_ip: Some("dest_ip".to_string()),
            match_regex: Some("url_regex".to_string()),
            match_url: Some("url".to_string()),
            match_host_regex: Some("host_regex".to_string()),
        }
    }
}

impl MatcherTags {
    /// Map a token label to the match type it selects (case-insensitive).
    pub fn classify(&self, label: &str) -> Option<MatchType> {
        let candidates = [
            (&self.match_host, MatchType::Host),
            (&self.match_domain, MatchType::Domain),
            (&self.match_ip, MatchType::Ip),
            (&self.match_regex, MatchType::Regex),
            (&self.match_url, MatchType::Url),
            (&self.match_host_regex, MatchType::HostRegex),
        ];

        candidates.into_iter().find_map(|(tag, kind)| match tag {
            Some(tag) if tag.eq_ignore_ascii_case(label) => Some(kind),
            _ => None,
        })
    }
}

/// One `label=value` pair from a config line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub label: String,
    pub value: String,
    /// Set once a match table has taken this token as its key.
    pub consumed: bool,
}

/// A classified config line, ready to be routed to a match table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherLine {
    tokens: Vec<Token>,
    dest_entry: usize,
    kind: MatchType,
    line_num: usize,
}

impl MatcherLine {
    /// Match type selected by the primary label.
    pub fn kind(&self) -> MatchType {
        self.kind
    }

    /// 1-based source line number.
    pub fn line_num(&self) -> usize {
        self.line_num
    }

    /// Value of the primary destination token.
    pub fn primary_value(&self) -> &str {
        &self.tokens[self.dest_entry].value
    }

    /// Remove the primary token from the modifiers seen by record init.
    pub fn consume_primary(&mut self) {
        self.tokens[self.dest_entry].consumed = true;
    }

    /// Tokens not yet consumed, in source order.
    pub fn modifiers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens
            .iter()
            .filter(|t| !t.consumed)
            .map(|t| (t.label.as_str(), t.value.as_str()))
    }

    /// Number of tokens not yet consumed.
    pub fn remaining(&self) -> usize {
        self.tokens.iter().filter(|t| !t.consumed).count()
    }

    /// All tokens, consumed or not.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

/// Iterate the lines of a config buffer that carry rules.
///
/// Yields `(line_num, text)` with 1-based line numbers. Blank lines and lines
/// whose first non-space character is `#` are skipped but still counted.
pub fn config_lines(buf: &str) -> impl Iterator<Item = (usize, &str)> {
    buf.split('\n')
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Classify one config line.
pub fn parse_config_line(
    line: &str,
    tags: &MatcherTags,
    line_num: usize,
) -> Result<MatcherLine, ParseError> {
    let tokens = tokenize(line)?;

    let mut primary: Option<(usize, MatchType)> = None;
    for (idx, token) in tokens.iter().enumerate() {
        if let Some(kind) = tags.classify(&token.label) {
            if primary.is_some() {
                return Err(ParseError::MultiplePrimary);
            }
            primary = Some((idx, kind));
        }
    }

    let (dest_entry, kind) = primary.ok_or(ParseError::NoPrimary)?;

    Ok(MatcherLine {
        tokens,
        dest_entry,
        kind,
        line_num,
    })
}

/// Split a line into `label=value` tokens. Values may be double-quoted.
fn tokenize(line: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();

    loop {
        while matches!(chars.peek(), Some((_, c)) if c.is_whitespace()) {
            chars.next();
        }
        let start = match chars.peek() {
            Some((i, _)) => *i,
            None => break,
        };

        // Label runs up to '='
        let mut eq = None;
        while let Some((i, c)) = chars.peek().copied() {
            if c == '=' {
                eq = Some(i);
                chars.next();
                break;
            }
            if c.is_whitespace() {
                break;
            }
            chars.next();
        }
        let eq = match eq {
            Some(eq) if eq > start => eq,
            _ => {
                let end = chars.peek().map(|(i, _)| *i).unwrap_or(line.len());
                return Err(ParseError::Malformed(line[start..end].to_string()));
            }
        };
        let label = &line[start..eq];

        let value = if matches!(chars.peek(), Some((_, '"'))) {
            let (open, _) = chars.next().unwrap_or((eq + 1, '"'));
            let mut close = None;
            for (i, c) in chars.by_ref() {
                if c == '"' {
                    close = Some(i);
                    break;
                }
            }
            let close = close.ok_or(ParseError::UnterminatedQuote)?;
            line[open + 1..close].to_string()
        } else {
            let vstart = eq + 1;
            let mut vend = line.len();
            while let Some((i, c)) = chars.peek().copied() {
                if c.is_whitespace() {
                    vend = i;
                    break;
                }
                chars.next();
            }
            if vend == vstart {
                return Err(ParseError::Malformed(label.to_string()));
            }
            line[vstart..vend].to_string()
        };

        if tokens.len() == MATCHER_MAX_TOKENS {
            return Err(ParseError::TooManyTokens(MATCHER_MAX_TOKENS));
        }
        tokens.push(Token {
            label: label.to_string(),
            value,
            consumed: false,
        });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<MatcherLine, ParseError> {
        parse_config_line(line, &MatcherTags::default(), 1)
    }

    #[test]
    fn test_parse_primary_and_modifiers() {
        let line = parse("dest_domain=example.com action=never-cache").unwrap();
        assert_eq!(line.kind(), MatchType::Domain);
        assert_eq!(line.primary_value(), "example.com");
        assert_eq!(line.remaining(), 2);

        let mut line = line;
        line.consume_primary();
        let mods: Vec<_> = line.modifiers().collect();
        assert_eq!(mods, vec![("action", "never-cache")]);
    }

    #[test]
    fn test_primary_anywhere_on_line() {
        let line = parse("scheme=http url_regex=^/a port=80").unwrap();
        assert_eq!(line.kind(), MatchType::Regex);
        assert_eq!(line.primary_value(), "^/a");
    }

    #[test]
    fn test_quoted_value() {
        let line = parse(r#"url="http://a b/" note="""#).unwrap();
        assert_eq!(line.kind(), MatchType::Url);
        assert_eq!(line.primary_value(), "http://a b/");
        assert_eq!(line.tokens()[1].value, "");
    }

    #[test]
    fn test_label_case_insensitive() {
        let line = parse("DEST_IP=10.0.0.1").unwrap();
        assert_eq!(line.kind(), MatchType::Ip);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("action=x"), Err(ParseError::NoPrimary));
        assert_eq!(
            parse("dest_host=a.com dest_domain=b.com"),
            Err(ParseError::MultiplePrimary)
        );
        assert_eq!(parse(r#"url="http://a"#), Err(ParseError::UnterminatedQuote));
        assert!(matches!(parse("dest_host"), Err(ParseError::Malformed(_))));
        assert!(matches!(parse("=x dest_host=a"), Err(ParseError::Malformed(_))));
        assert!(matches!(parse("dest_host="), Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_too_many_tokens() {
        let mut line = String::from("dest_host=a.com");
        for i in 0..MATCHER_MAX_TOKENS {
            line.push_str(&format!(" k{}=v", i));
        }
        assert_eq!(
            parse(&line),
            Err(ParseError::TooManyTokens(MATCHER_MAX_TOKENS))
        );
    }

    #[test]
    fn test_disabled_tag() {
        let tags = MatcherTags {
            match_url: None,
            ..MatcherTags::default()
        };
        assert_eq!(
            parse_config_line("url=http://a/", &tags, 1),
            Err(ParseError::NoPrimary)
        );
    }

    #[test]
    fn test_config_lines_skip_comments() {
        let text = "# header\n\n  dest_host=a.com x=1\n   # indented comment\r\ndest_ip=1.1.1.1\n";
        let lines: Vec<_> = config_lines(text).collect();
        assert_eq!(lines, vec![(3, "dest_host=a.com x=1"), (5, "dest_ip=1.1.1.1")]);
    }
}
