//! IP range match table.

use std::fmt::Write;
use std::net::IpAddr;

use crate::error::EntryError;
use crate::line::MatcherLine;
use crate::lookup::{parse_ip_range, IpMap};
use crate::record::MatcherRecord;
use crate::request::RequestData;

/// IpMatcher matches the destination address against address ranges.
///
/// Ranges come from `addr`, `low-high` or CIDR text. When ranges overlap the
/// later line owns the overlapped addresses, independent of range size.
pub struct IpMatcher<D> {
    ip_map: IpMap<usize>,
    data_array: Vec<D>,
    array_len: usize,
    matcher_name: String,
    file_name: String,
}

impl<D: MatcherRecord> IpMatcher<D> {
    /// Create a table with room for exactly `num_entries` records.
    pub fn allocate(matcher_name: &str, file_name: &str, num_entries: usize) -> Self {
        Self {
            ip_map: IpMap::new(),
            data_array: Vec::with_capacity(num_entries),
            array_len: num_entries,
            matcher_name: matcher_name.to_string(),
            file_name: file_name.to_string(),
        }
    }

    /// Add an `Ip` line.
    ///
    /// # Panics
    /// If more entries are added than were allocated.
    pub fn new_entry(&mut self, mut line: MatcherLine) -> Result<(), EntryError> {
        assert!(
            self.data_array.len() < self.array_len,
            "{}: ip table for {} overrun ({} entries allocated)",
            self.matcher_name,
            self.file_name,
            self.array_len
        );

        let match_data = line.primary_value().to_string();
        let (low, high) = parse_ip_range(&match_data).map_err(|reason| EntryError::IpRange {
            text: match_data.clone(),
            line: line.line_num(),
            reason,
        })?;

        line.consume_primary();
        let record = D::init(&line).map_err(|message| EntryError::Init {
            line: line.line_num(),
            message,
        })?;

        self.ip_map
            .mark(low, high, self.data_array.len())
            .map_err(|reason| EntryError::IpRange {
                text: match_data.clone(),
                line: line.line_num(),
                reason,
            })?;
        self.data_array.push(record);
        Ok(())
    }

    /// Record owning `addr`, if any.
    pub fn matches(&self, addr: IpAddr) -> Option<&D> {
        self.ip_map.contains(addr).map(|&idx| &self.data_array[idx])
    }

    /// Apply the record owning the request's destination address.
    pub fn match_request(&self, rdata: &dyn RequestData, result: &mut D::Result) {
        let Some(addr) = rdata.dest_ip() else {
            return;
        };
        if let Some(record) = self.matches(addr) {
            log::debug!(
                target: "matcher",
                "{} matched {} with ip range at line {}",
                self.matcher_name,
                addr,
                record.line_num()
            );
            record.update_match(result, rdata);
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.data_array.len()
    }

    /// Check if no record is stored.
    pub fn is_empty(&self) -> bool {
        self.data_array.is_empty()
    }

    /// Number of records the table was allocated for.
    pub fn capacity(&self) -> usize {
        self.array_len
    }

    /// Debug rendering of the table.
    pub fn describe(&self) -> String {
        let mut out = format!(
            "\tIp Matcher with {} elements, {} ranges.\n",
            self.len(),
            self.ip_map.len()
        );
        for (low, high, &idx) in self.ip_map.iter() {
            let _ = writeln!(
                out,
                "\t\tRange {} - {} {}",
                low,
                high,
                self.data_array[idx].describe()
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RangeError;
    use crate::line::{parse_config_line, MatcherTags};
    use crate::record::LineRecord;

    fn line(text: &str, line_num: usize) -> MatcherLine {
        parse_config_line(text, &MatcherTags::default(), line_num).unwrap()
    }

    fn owner(matcher: &IpMatcher<LineRecord>, addr: &str) -> Option<usize> {
        matcher
            .matches(addr.parse().unwrap())
            .map(|record| record.line_num())
    }

    #[test]
    fn test_later_range_wins_overlap() {
        let mut matcher = IpMatcher::<LineRecord>::allocate("test", "test.config", 2);
        matcher
            .new_entry(line("dest_ip=10.0.0.0-10.0.0.255", 1))
            .unwrap();
        matcher
            .new_entry(line("dest_ip=10.0.0.128-10.0.0.200", 2))
            .unwrap();

        assert_eq!(owner(&matcher, "10.0.0.0"), Some(1));
        assert_eq!(owner(&matcher, "10.0.0.127"), Some(1));
        assert_eq!(owner(&matcher, "10.0.0.128"), Some(2));
        assert_eq!(owner(&matcher, "10.0.0.200"), Some(2));
        assert_eq!(owner(&matcher, "10.0.0.201"), Some(1));
        assert_eq!(owner(&matcher, "10.0.0.255"), Some(1));
        assert_eq!(owner(&matcher, "10.0.1.0"), None);
    }

    #[test]
    fn test_cidr_and_single_address() {
        let mut matcher = IpMatcher::<LineRecord>::allocate("test", "test.config", 2);
        matcher.new_entry(line("dest_ip=192.168.0.0/16", 1)).unwrap();
        matcher.new_entry(line("dest_ip=::1", 2)).unwrap();

        assert_eq!(owner(&matcher, "192.168.3.4"), Some(1));
        assert_eq!(owner(&matcher, "::1"), Some(2));
        assert_eq!(owner(&matcher, "::2"), None);
    }

    #[test]
    fn test_bad_range_skipped() {
        let mut matcher = IpMatcher::<LineRecord>::allocate("test", "test.config", 3);
        let err = matcher
            .new_entry(line("dest_ip=10.0.0.9-10.0.0.1", 1))
            .unwrap_err();
        assert_eq!(
            err,
            EntryError::IpRange {
                text: "10.0.0.9-10.0.0.1".to_string(),
                line: 1,
                reason: RangeError::Reversed,
            }
        );
        assert!(matcher.new_entry(line("dest_ip=10.0.0.1-::1", 2)).is_err());
        matcher.new_entry(line("dest_ip=10.0.0.1", 3)).unwrap();

        assert_eq!(matcher.len(), 1);
        assert_eq!(owner(&matcher, "10.0.0.1"), Some(3));
    }

    #[test]
    fn test_match_uses_destination_address() {
        use crate::request::HttpRequestData;

        let mut matcher = IpMatcher::<LineRecord>::allocate("test", "test.config", 1);
        matcher.new_entry(line("dest_ip=10.0.0.1", 1)).unwrap();

        let mut hits = Vec::new();
        let rdata = HttpRequestData {
            src_ip: Some("10.0.0.1".parse().unwrap()),
            ..HttpRequestData::default()
        };
        matcher.match_request(&rdata, &mut hits);
        assert!(hits.is_empty());

        matcher.match_request(
            &HttpRequestData::with_dest_ip("10.0.0.1".parse().unwrap()),
            &mut hits,
        );
        assert_eq!(hits.len(), 1);
    }
}
