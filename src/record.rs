//! Rule record trait and a general-purpose record implementation.

use serde::Serialize;

use crate::line::MatcherLine;
use crate::request::RequestData;

/// MatcherRecord is the per-table rule payload.
///
/// Each consumer of a [`ControlMatcher`](crate::ControlMatcher) supplies its
/// own record type: the match tables decide *which* records apply to a
/// request, the record decides *what* applying it means.
pub trait MatcherRecord: Sized {
    /// Caller-owned accumulator updated by every matching record.
    type Result;

    /// Build a record from the tokens left on a config line after the
    /// matching table consumed its key.
    ///
    /// Returns a human-readable reason on failure. No record exists unless
    /// this succeeds.
    fn init(line: &MatcherLine) -> Result<Self, String>;

    /// Apply this record to the accumulator.
    fn update_match(&self, result: &mut Self::Result, rdata: &dyn RequestData);

    /// Source line the record was built from.
    fn line_num(&self) -> usize;

    /// Debug rendering.
    fn describe(&self) -> String;
}

/// A record that remembers its line and modifiers.
///
/// Useful when the caller only needs to know which config lines apply to a
/// request, e.g. for diagnostics tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    line_num: usize,
    modifiers: Vec<(String, String)>,
}

/// One entry appended by [`LineRecord::update_match`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedLine {
    pub line_num: usize,
    pub modifiers: Vec<(String, String)>,
}

impl LineRecord {
    /// Modifier tokens in source order.
    pub fn modifiers(&self) -> &[(String, String)] {
        &self.modifiers
    }
}

impl MatcherRecord for LineRecord {
    type Result = Vec<MatchedLine>;

    fn init(line: &MatcherLine) -> Result<Self, String> {
        let modifiers = line
            .modifiers()
            .map(|(label, value)| (label.to_string(), value.to_string()))
            .collect();
        Ok(Self {
            line_num: line.line_num(),
            modifiers,
        })
    }

    fn update_match(&self, result: &mut Self::Result, _rdata: &dyn RequestData) {
        result.push(MatchedLine {
            line_num: self.line_num,
            modifiers: self.modifiers.clone(),
        });
    }

    fn line_num(&self) -> usize {
        self.line_num
    }

    fn describe(&self) -> String {
        let mods: Vec<String> = self
            .modifiers
            .iter()
            .map(|(label, value)| format!("{}={}", label, value))
            .collect();
        format!("line {} [{}]", self.line_num, mods.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::{parse_config_line, MatcherTags};
    use crate::request::HttpRequestData;

    #[test]
    fn test_line_record_skips_consumed_key() {
        let mut line =
            parse_config_line("dest_host=a.com action=deny", &MatcherTags::default(), 4).unwrap();
        line.consume_primary();

        let record = LineRecord::init(&line).unwrap();
        assert_eq!(record.line_num(), 4);
        assert_eq!(
            record.modifiers(),
            &[("action".to_string(), "deny".to_string())]
        );
        assert_eq!(record.describe(), "line 4 [action=deny]");
    }

    #[test]
    fn test_line_record_update_match() {
        let mut line = parse_config_line("dest_ip=10.0.0.1", &MatcherTags::default(), 2).unwrap();
        line.consume_primary();
        let record = LineRecord::init(&line).unwrap();

        let mut hits = Vec::new();
        record.update_match(&mut hits, &HttpRequestData::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].line_num, 2);
        assert!(hits[0].modifiers.is_empty());
    }
}
