//! Regular expression match tables over the URL and the hostname.

use regex::Regex;
use std::fmt::Write;

use crate::error::EntryError;
use crate::line::MatcherLine;
use crate::lookup::Pattern;
use crate::record::MatcherRecord;
use crate::request::RequestData;

/// RegexMatcher runs every registered pattern against the request URL.
///
/// There is no short-circuit: each pattern that matches applies its record,
/// in insertion (source line) order. An engine fault on one pattern is logged
/// and counts as no match for that pattern only.
pub struct RegexMatcher<D, P = Regex> {
    re_array: Vec<P>,
    re_str: Vec<String>,
    data_array: Vec<D>,
    array_len: usize,
    matcher_name: String,
    file_name: String,
}

impl<D: MatcherRecord, P: Pattern> RegexMatcher<D, P> {
    /// Create a table with room for exactly `num_entries` records.
    pub fn allocate(matcher_name: &str, file_name: &str, num_entries: usize) -> Self {
        Self {
            re_array: Vec::with_capacity(num_entries),
            re_str: Vec::with_capacity(num_entries),
            data_array: Vec::with_capacity(num_entries),
            array_len: num_entries,
            matcher_name: matcher_name.to_string(),
            file_name: file_name.to_string(),
        }
    }

    /// Compile and add a pattern line.
    ///
    /// A pattern that fails to compile, or whose record fails to init, leaves
    /// the table unchanged.
    ///
    /// # Panics
    /// If more entries are added than were allocated.
    pub fn new_entry(&mut self, mut line: MatcherLine) -> Result<(), EntryError> {
        assert!(
            self.data_array.len() < self.array_len,
            "{}: regex table for {} overrun ({} entries allocated)",
            self.matcher_name,
            self.file_name,
            self.array_len
        );

        let pattern = line.primary_value().to_string();
        let compiled = P::compile(&pattern).map_err(|err| EntryError::Regex {
            pattern: pattern.clone(),
            line: line.line_num(),
            offset: err.offset,
            message: err.message,
        })?;

        line.consume_primary();
        let record = D::init(&line).map_err(|message| EntryError::Init {
            line: line.line_num(),
            message,
        })?;

        self.re_array.push(compiled);
        self.re_str.push(pattern);
        self.data_array.push(record);
        Ok(())
    }

    /// Records whose pattern matches `text`, in insertion order.
    pub fn matches<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a D> + 'a {
        self.re_array
            .iter()
            .zip(&self.data_array)
            .filter_map(move |(re, record)| match re.exec(text) {
                Ok(true) => Some(record),
                Ok(false) => None,
                Err(fault) => {
                    log::warn!(
                        "error [{}] matching regex at line {}",
                        fault,
                        record.line_num()
                    );
                    None
                }
            })
    }

    /// Apply every record whose pattern matches the request URL.
    ///
    /// A request without a URL is matched as the empty string.
    pub fn match_request(&self, rdata: &dyn RequestData, result: &mut D::Result) {
        if self.data_array.is_empty() {
            return;
        }
        let url = rdata.url_string();
        self.match_text(url.as_deref().unwrap_or(""), rdata, result);
    }

    pub(crate) fn match_text(&self, text: &str, rdata: &dyn RequestData, result: &mut D::Result) {
        for record in self.matches(text) {
            log::debug!(
                target: "matcher",
                "{} matched {} with regex at line {}",
                self.matcher_name,
                text,
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
        self.describe_as("Regex")
    }

    fn describe_as(&self, kind: &str) -> String {
        let mut out = format!("\t{} Matcher with {} elements\n", kind, self.len());
        for (pattern, record) in self.re_str.iter().zip(&self.data_array) {
            let _ = writeln!(out, "\t\tRegex: {} {}", pattern, record.describe());
        }
        out
    }
}

/// HostRegexMatcher runs every registered pattern against the hostname.
///
/// Same storage and evaluation rules as [`RegexMatcher`]; only the request
/// attribute differs.
pub struct HostRegexMatcher<D, P = Regex> {
    inner: RegexMatcher<D, P>,
}

impl<D: MatcherRecord, P: Pattern> HostRegexMatcher<D, P> {
    /// Create a table with room for exactly `num_entries` records.
    pub fn allocate(matcher_name: &str, file_name: &str, num_entries: usize) -> Self {
        Self {
            inner: RegexMatcher::allocate(matcher_name, file_name, num_entries),
        }
    }

    /// Compile and add a pattern line.
    pub fn new_entry(&mut self, line: MatcherLine) -> Result<(), EntryError> {
        self.inner.new_entry(line)
    }

    /// Records whose pattern matches `host`, in insertion order.
    pub fn matches<'a>(&'a self, host: &'a str) -> impl Iterator<Item = &'a D> + 'a {
        self.inner.matches(host)
    }

    /// Apply every record whose pattern matches the request hostname.
    ///
    /// A request without a hostname is matched as the empty string.
    pub fn match_request(&self, rdata: &dyn RequestData, result: &mut D::Result) {
        if self.inner.is_empty() {
            return;
        }
        self.inner
            .match_text(rdata.host().unwrap_or(""), rdata, result);
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if no record is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of records the table was allocated for.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Debug rendering of the table.
    pub fn describe(&self) -> String {
        self.inner.describe_as("Host Regex")
    }
}
