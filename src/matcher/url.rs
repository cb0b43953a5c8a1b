//! Exact URL match table.

use ahash::AHashMap;
use std::borrow::Cow;
use std::fmt::Write;

use crate::error::EntryError;
use crate::line::MatcherLine;
use crate::record::MatcherRecord;
use crate::request::RequestData;

/// UrlMatcher matches the unescaped request URL by string equality.
///
/// No normalization happens here; the request accessor already decoded
/// escapes. A URL can be registered once; later duplicates are rejected.
pub struct UrlMatcher<D> {
    url_ht: AHashMap<String, usize>,
    url_str: Vec<String>,
    data_array: Vec<D>,
    array_len: usize,
    matcher_name: String,
    file_name: String,
}

impl<D: MatcherRecord> UrlMatcher<D> {
    /// Create a table with room for exactly `num_entries` records.
    pub fn allocate(matcher_name: &str, file_name: &str, num_entries: usize) -> Self {
        Self {
            url_ht: AHashMap::with_capacity(num_entries),
            url_str: Vec::with_capacity(num_entries),
            data_array: Vec::with_capacity(num_entries),
            array_len: num_entries,
            matcher_name: matcher_name.to_string(),
            file_name: file_name.to_string(),
        }
    }

    /// Add a `Url` line.
    ///
    /// # Panics
    /// If more entries are added than were allocated.
    pub fn new_entry(&mut self, mut line: MatcherLine) -> Result<(), EntryError> {
        assert!(
            self.data_array.len() < self.array_len,
            "{}: url table for {} overrun ({} entries allocated)",
            self.matcher_name,
            self.file_name,
            self.array_len
        );

        let pattern = line.primary_value().to_string();
        if self.url_ht.contains_key(&pattern) {
            return Err(EntryError::Duplicate {
                url: pattern,
                line: line.line_num(),
            });
        }

        line.consume_primary();
        let record = D::init(&line).map_err(|message| EntryError::Init {
            line: line.line_num(),
            message,
        })?;

        self.url_ht.insert(pattern.clone(), self.data_array.len());
        self.url_str.push(pattern);
        self.data_array.push(record);
        Ok(())
    }

    /// Record registered for exactly `url`.
    pub fn matches(&self, url: &str) -> Option<&D> {
        self.url_ht.get(url).map(|&idx| &self.data_array[idx])
    }

    /// Apply the record registered for the request URL, if any.
    ///
    /// A request without a URL is looked up as the empty string.
    pub fn match_request(&self, rdata: &dyn RequestData, result: &mut D::Result) {
        if self.data_array.is_empty() {
            return;
        }
        let url = rdata.url_string().unwrap_or(Cow::Borrowed(""));

        if let Some(record) = self.matches(&url) {
            log::debug!(
                target: "matcher",
                "{} matched {} with url at line {}",
                self.matcher_name,
                url,
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
        let mut out = format!("\tUrl Matcher with {} elements\n", self.len());
        for (url, record) in self.url_str.iter().zip(&self.data_array) {
            let _ = writeln!(out, "\t\tUrl: {} {}", url, record.describe());
        }
        out
    }
}
