//! Match type definitions.

use std::fmt;

/// MatchType is the strategy a config line asks to be matched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchType {
    /// Exact hostname
    Host,
    /// Hostname or any name below it
    Domain,
    /// Exact (unescaped) URL string
    Url,
    /// Regular expression over the URL string
    Regex,
    /// Regular expression over the hostname
    HostRegex,
    /// Destination address range
    Ip,
}

impl MatchType {
    /// All match types, in declaration order.
    pub const ALL: [MatchType; 6] = [
        MatchType::Host,
        MatchType::Domain,
        MatchType::Url,
        MatchType::Regex,
        MatchType::HostRegex,
        MatchType::Ip,
    ];

    /// Get the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Host => "HOST",
            MatchType::Domain => "DOMAIN",
            MatchType::Url => "URL",
            MatchType::Regex => "REGEX",
            MatchType::HostRegex => "HOST-REGEX",
            MatchType::Ip => "IP",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_type_display() {
        assert_eq!(MatchType::Host.to_string(), "HOST");
        assert_eq!(MatchType::HostRegex.to_string(), "HOST-REGEX");
        assert_eq!(MatchType::ALL.len(), 6);
    }
}
