//! Host/domain match table.

use std::fmt::Write;

use crate::error::EntryError;
use crate::line::MatcherLine;
use crate::lookup::HostLookup;
use crate::record::MatcherRecord;
use crate::request::RequestData;
use crate::MatchType;

/// HostMatcher matches the request hostname against host and domain entries.
///
/// Every matching entry is applied, most specific first (see
/// [`HostLookup`]), so one request may update the result several times from
/// this table alone.
pub struct HostMatcher<D> {
    host_lookup: HostLookup,
    data_array: Vec<D>,
    array_len: usize,
    matcher_name: String,
    file_name: String,
}

impl<D: MatcherRecord> HostMatcher<D> {
    /// Create a table with room for exactly `num_entries` records.
    pub fn allocate(matcher_name: &str, file_name: &str, num_entries: usize) -> Self {
        Self {
            host_lookup: HostLookup::with_capacity(num_entries),
            data_array: Vec::with_capacity(num_entries),
            array_len: num_entries,
            matcher_name: matcher_name.to_string(),
            file_name: file_name.to_string(),
        }
    }

    /// Add a `Host` or `Domain` line.
    ///
    /// The record is only linked into the lookup once its init succeeded.
    ///
    /// # Panics
    /// If more entries are added than were allocated.
    pub fn new_entry(&mut self, mut line: MatcherLine) -> Result<(), EntryError> {
        assert!(
            self.data_array.len() < self.array_len,
            "{}: host table for {} overrun ({} entries allocated)",
            self.matcher_name,
            self.file_name,
            self.array_len
        );

        let match_data = line.primary_value().to_string();
        let is_domain = line.kind() == MatchType::Domain;
        line.consume_primary();

        let record = D::init(&line).map_err(|message| EntryError::Init {
            line: line.line_num(),
            message,
        })?;

        self.host_lookup
            .new_entry(&match_data, is_domain, self.data_array.len());
        self.data_array.push(record);
        Ok(())
    }

    /// Records matching `hostname`, most specific first.
    pub fn matches<'a>(&'a self, hostname: &str) -> impl Iterator<Item = &'a D> + 'a {
        let data = &self.data_array;
        self.host_lookup.match_all(hostname).map(move |idx| &data[idx])
    }

    /// Apply every record matching the request hostname.
    pub fn match_request(&self, rdata: &dyn RequestData, result: &mut D::Result) {
        if self.data_array.is_empty() {
            return;
        }
        let Some(host) = rdata.host() else {
            return;
        };

        for record in self.matches(host) {
            log::debug!(
                target: "matcher",
                "{} matched {} with host/domain at line {}",
                self.matcher_name,
                host,
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
        let mut out = format!("\tHost/Domain Matcher with {} elements\n", self.len());
        for (name, is_domain, idx) in self.host_lookup.entries() {
            let kind = if is_domain { "Domain" } else { "Host" };
            let _ = writeln!(
                out,
                "\t\t{}: {} {}",
                kind,
                name,
                self.data_array[idx].describe()
            );
        }
        out
    }
}
