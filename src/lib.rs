//! ctlmatch - A rule-based request classifier.
//!
//! This crate decides which configuration lines apply to a request. A rule
//! file is a list of lines such as
//!
//! ```text
//! dest_domain=example.com      action=never-cache
//! url_regex=^http://[^/]*/img/ action=cache ttl=1d
//! dest_ip=10.0.0.0/8           action=deny
//! ```
//!
//! where one primary `label=value` token picks how the line is matched and the
//! remaining tokens are handed to a caller-defined [`MatcherRecord`].
//!
//! # Features
//!
//! - **Host/domain matching**: exact hosts and domain suffixes at label boundaries
//! - **URL matching**: exact unescaped URL lookup
//! - **Regex matching**: URL and hostname regular expressions, every match applied
//! - **IP-range matching**: IPv4 and IPv6 ranges, later lines win on overlap
//! - **Tolerant build**: bad lines are reported and skipped, never fatal
//! - **Hot reload**: atomic table swap with [`TableHandle`]
//!
//! # Quick Start
//!
//! ```
//! use ctlmatch::{ControlMatcher, HttpRequestData, LineRecord, LogSink, MatcherConfig};
//!
//! let rules = "\
//! dest_domain=example.com action=never-cache
//! dest_ip=10.0.0.0/8 action=deny
//! ";
//! let matcher = ControlMatcher::<LineRecord>::build(MatcherConfig::new("cache"), rules, &LogSink);
//!
//! let mut hits = Vec::new();
//! matcher.match_request(&HttpRequestData::with_host("img.example.com"), &mut hits);
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].modifiers[0], ("action".to_string(), "never-cache".to_string()));
//! ```
//!
//! # Matching Order
//!
//! Tables are consulted in a fixed order and every match is applied:
//! 1. Host/domain (most specific name first)
//! 2. URL regex (config order)
//! 3. Exact URL
//! 4. IP range
//! 5. Host regex (config order)

mod error;
mod match_type;

pub mod config;
pub mod control;
pub mod diag;
pub mod line;
pub mod lookup;
pub mod matcher;
pub mod record;
pub mod reload;
pub mod request;

// Re-export core types
pub use error::{EntryError, Error, ParseError, RangeError, Result};
pub use match_type::MatchType;

// Re-export table types
pub use config::MatcherConfig;
pub use control::{ControlMatcher, MatcherFlags};
pub use reload::TableHandle;

// Re-export record and request types
pub use diag::{CollectingSink, ErrorSink, LogSink};
pub use line::{MatcherLine, MatcherTags};
pub use record::{LineRecord, MatchedLine, MatcherRecord};
pub use request::{HttpRequestData, RequestData};
