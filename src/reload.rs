//! Atomic replacement of a built match table.
//!
//! A [`ControlMatcher`] is immutable once built. Reloading builds a complete
//! new table from the new rules and swaps it in; requests that already took a
//! snapshot keep using the old table, which is dropped when the last snapshot
//! goes away.

use arc_swap::ArcSwap;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::control::ControlMatcher;
use crate::diag::ErrorSink;
use crate::lookup::Pattern;
use crate::record::MatcherRecord;
use crate::request::RequestData;

/// Shared handle to the current match table.
///
/// # Example
///
/// ```
/// use ctlmatch::{ControlMatcher, HttpRequestData, LineRecord, LogSink, MatcherConfig, TableHandle};
///
/// let config = MatcherConfig::new("demo");
/// let handle = TableHandle::new(ControlMatcher::<LineRecord>::build(
///     config,
///     "dest_host=a.com",
///     &LogSink,
/// ));
///
/// let before = handle.load();
/// handle.reload("dest_host=b.com", &LogSink);
///
/// let mut hits = Vec::new();
/// before.match_request(&HttpRequestData::with_host("a.com"), &mut hits);
/// assert_eq!(hits.len(), 1);
///
/// hits.clear();
/// handle.match_request(&HttpRequestData::with_host("a.com"), &mut hits);
/// assert!(hits.is_empty());
/// ```
pub struct TableHandle<D, P = Regex> {
    inner: ArcSwap<ControlMatcher<D, P>>,
    generation: AtomicU64,
}

impl<D: MatcherRecord, P: Pattern> TableHandle<D, P> {
    /// Wrap an initial table.
    pub fn new(matcher: ControlMatcher<D, P>) -> Self {
        Self {
            inner: ArcSwap::from_pointee(matcher),
            generation: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current table.
    ///
    /// The snapshot stays valid across reloads.
    pub fn load(&self) -> Arc<ControlMatcher<D, P>> {
        self.inner.load_full()
    }

    /// Replace the current table.
    pub fn store(&self, matcher: ControlMatcher<D, P>) {
        self.inner.store(Arc::new(matcher));
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Build a new table from `text` with the current configuration and
    /// swap it in. Returns the new table's entry count.
    pub fn reload(&self, text: &str, sink: &dyn ErrorSink) -> usize {
        let config = self.inner.load().config().clone();
        let matcher = ControlMatcher::build(config, text, sink);
        let num_entries = matcher.num_entries();
        self.store(matcher);

        log::info!(
            "{}: reloaded match table with {} entries",
            self.inner.load().name(),
            num_entries
        );
        num_entries
    }

    /// Rebuild from the configured rule file and swap it in.
    ///
    /// An unreadable file installs an empty table.
    pub fn reload_from_file(&self, sink: &dyn ErrorSink) -> usize {
        let config = self.inner.load().config().clone();
        let matcher = ControlMatcher::load(config, sink);
        let num_entries = matcher.num_entries();
        self.store(matcher);

        log::info!(
            "{}: reloaded match table from {} with {} entries",
            self.inner.load().name(),
            self.inner.load().config().file_name(),
            num_entries
        );
        num_entries
    }

    /// Match against the current table.
    pub fn match_request(&self, rdata: &dyn RequestData, result: &mut D::Result) {
        self.inner.load().match_request(rdata, result);
    }

    /// Number of swaps since creation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
