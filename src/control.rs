//! Composite match table: builds every strategy table from one config buffer
//! and dispatches requests across them.
//!
//! # Build
//!
//! Building is two passes over the config text:
//!
//! 1. Every non-blank, non-comment line is classified. Lines that fail are
//!    reported and dropped; the rest are tallied per strategy and kept in
//!    source order.
//! 2. Each enabled strategy with a non-zero tally gets a table allocated for
//!    exactly that many entries, then the kept lines are replayed in order
//!    into their tables. An entry that fails to insert is reported and
//!    skipped.
//!
//! # Match
//!
//! Tables are consulted in a fixed order: host/domain, URL regex, exact URL,
//! IP range, host regex. Every table runs; every matching record updates the
//! caller's result.

use bitflags::bitflags;
use regex::Regex;
use std::fmt::Write;
use std::fs;

use crate::config::MatcherConfig;
use crate::diag::ErrorSink;
use crate::error::{Error, Result};
use crate::line::{config_lines, parse_config_line, MatcherLine};
use crate::lookup::Pattern;
use crate::matcher::{HostMatcher, HostRegexMatcher, IpMatcher, RegexMatcher, UrlMatcher};
use crate::record::MatcherRecord;
use crate::request::RequestData;
use crate::MatchType;

bitflags! {
    /// Match tables a [`ControlMatcher`] is allowed to build.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MatcherFlags: u32 {
        /// Host and domain lines
        const ALLOW_HOST_TABLE = 0b0000_0001;
        /// Destination IP range lines
        const ALLOW_IP_TABLE = 0b0000_0010;
        /// URL regex lines
        const ALLOW_REGEX_TABLE = 0b0000_0100;
        /// Hostname regex lines
        const ALLOW_HOST_REGEX_TABLE = 0b0000_1000;
        /// Exact URL lines
        const ALLOW_URL_TABLE = 0b0001_0000;
        /// Construct an empty matcher without reading any rules
        const DONT_BUILD_TABLE = 0b0010_0000;

        const ALL_TABLES = Self::ALLOW_HOST_TABLE.bits()
            | Self::ALLOW_IP_TABLE.bits()
            | Self::ALLOW_REGEX_TABLE.bits()
            | Self::ALLOW_HOST_REGEX_TABLE.bits()
            | Self::ALLOW_URL_TABLE.bits();
    }
}

impl MatcherFlags {
    /// Parse flag names as used in YAML profiles.
    ///
    /// Accepted names: `host`, `ip`, `regex`, `host_regex`, `url`, `all`,
    /// `dont_build`.
    pub fn from_names<'a, I>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut flags = MatcherFlags::empty();
        for name in names {
            flags |= match name.trim().to_lowercase().as_str() {
                "host" => MatcherFlags::ALLOW_HOST_TABLE,
                "ip" => MatcherFlags::ALLOW_IP_TABLE,
                "regex" => MatcherFlags::ALLOW_REGEX_TABLE,
                "host_regex" | "host-regex" => MatcherFlags::ALLOW_HOST_REGEX_TABLE,
                "url" => MatcherFlags::ALLOW_URL_TABLE,
                "all" => MatcherFlags::ALL_TABLES,
                "dont_build" => MatcherFlags::DONT_BUILD_TABLE,
                other => return Err(Error::Config(format!("unknown matcher flag: {}", other))),
            };
        }
        Ok(flags)
    }

    /// Check if lines of `kind` may be stored.
    pub fn allows(self, kind: MatchType) -> bool {
        let flag = match kind {
            MatchType::Host | MatchType::Domain => MatcherFlags::ALLOW_HOST_TABLE,
            MatchType::Ip => MatcherFlags::ALLOW_IP_TABLE,
            MatchType::Regex => MatcherFlags::ALLOW_REGEX_TABLE,
            MatchType::HostRegex => MatcherFlags::ALLOW_HOST_REGEX_TABLE,
            MatchType::Url => MatcherFlags::ALLOW_URL_TABLE,
        };
        self.contains(flag)
    }
}

/// Per-strategy line tallies.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct TypeCounts {
    host_domain: usize,
    regex: usize,
    url: usize,
    ip: usize,
    host_regex: usize,
}

impl TypeCounts {
    fn tally(&mut self, kind: MatchType) {
        match kind {
            MatchType::Host | MatchType::Domain => self.host_domain += 1,
            MatchType::Regex => self.regex += 1,
            MatchType::Url => self.url += 1,
            MatchType::Ip => self.ip += 1,
            MatchType::HostRegex => self.host_regex += 1,
        }
    }
}

/// ControlMatcher decides which rule records apply to a request.
///
/// It owns at most one table per strategy; a table exists only if it is
/// enabled in the config flags and at least one line asked for it. Once
/// built the matcher is immutable and can be shared across threads.
///
/// # Examples
/// ```
/// use ctlmatch::{CollectingSink, ControlMatcher, HttpRequestData, LineRecord, MatcherConfig};
///
/// let text = "\
/// dest_domain=example.com action=a
/// url_regex=^http://www\\. action=b
/// ";
/// let sink = CollectingSink::new();
/// let matcher = ControlMatcher::<LineRecord>::build(MatcherConfig::new("demo"), text, &sink);
///
/// let rdata = HttpRequestData {
///     hostname: Some("www.example.com".to_string()),
///     url: Some("http://www.example.com/".to_string()),
///     ..HttpRequestData::default()
/// };
/// let mut hits = Vec::new();
/// matcher.match_request(&rdata, &mut hits);
///
/// let lines: Vec<usize> = hits.iter().map(|h| h.line_num).collect();
/// assert_eq!(lines, vec![1, 2]);
/// ```
pub struct ControlMatcher<D, P = Regex> {
    config: MatcherConfig,
    host_match: Option<HostMatcher<D>>,
    re_match: Option<RegexMatcher<D, P>>,
    url_match: Option<UrlMatcher<D>>,
    ip_match: Option<IpMatcher<D>>,
    hr_match: Option<HostRegexMatcher<D, P>>,
    num_entries: usize,
}

impl<D: MatcherRecord, P: Pattern> ControlMatcher<D, P> {
    /// Create a matcher with no tables.
    ///
    /// # Panics
    /// If the config enables no match table.
    pub fn new(config: MatcherConfig) -> Self {
        if let Err(e) = config.validate() {
            panic!("{}", e);
        }
        Self {
            config,
            host_match: None,
            re_match: None,
            url_match: None,
            ip_match: None,
            hr_match: None,
            num_entries: 0,
        }
    }

    /// Build a matcher from rule text.
    ///
    /// Never fails: bad lines are reported to `sink` and skipped. With
    /// `DONT_BUILD_TABLE` set the text is ignored.
    pub fn build(config: MatcherConfig, file_buf: &str, sink: &dyn ErrorSink) -> Self {
        let mut matcher = Self::new(config);
        if !matcher.config.flags.contains(MatcherFlags::DONT_BUILD_TABLE) {
            matcher.num_entries = matcher.build_table_from_string(file_buf, sink);
        }
        matcher
    }

    /// Build a matcher from the rule file named in the config.
    ///
    /// An unreadable file is logged and yields an empty matcher.
    pub fn load(config: MatcherConfig, sink: &dyn ErrorSink) -> Self {
        if config.flags.contains(MatcherFlags::DONT_BUILD_TABLE) {
            return Self::new(config);
        }

        match read_rules(&config) {
            Ok(text) => Self::build(config, &text, sink),
            Err(e) => {
                log::error!("{}: failed to read rules: {}", config.name, e);
                Self::new(config)
            }
        }
    }

    fn build_table_from_string(&mut self, file_buf: &str, sink: &dyn ErrorSink) -> usize {
        let matcher_name = self.config.name.clone();
        let file_name = self.config.file_name();
        let mut already_alarmed = false;

        // First pass: classify and count
        let mut counts = TypeCounts::default();
        let mut worklist: Vec<MatcherLine> = Vec::new();
        for (line_num, text) in config_lines(file_buf) {
            match parse_config_line(text, &self.config.tags, line_num) {
                Ok(line) => {
                    counts.tally(line.kind());
                    worklist.push(line);
                }
                Err(e) => {
                    let msg = format!(
                        "{} discarding {} entry at line {} : {}",
                        matcher_name, file_name, line_num, e
                    );
                    sink.signal_error(&msg, &mut already_alarmed);
                }
            }
        }

        let num_entries = worklist.len();
        if num_entries == 0 {
            return 0;
        }

        // Allocate exactly what the first pass counted
        let flags = self.config.flags;
        if flags.contains(MatcherFlags::ALLOW_REGEX_TABLE) && counts.regex > 0 {
            self.re_match = Some(RegexMatcher::allocate(&matcher_name, &file_name, counts.regex));
        }
        if flags.contains(MatcherFlags::ALLOW_URL_TABLE) && counts.url > 0 {
            self.url_match = Some(UrlMatcher::allocate(&matcher_name, &file_name, counts.url));
        }
        if flags.contains(MatcherFlags::ALLOW_HOST_TABLE) && counts.host_domain > 0 {
            self.host_match = Some(HostMatcher::allocate(
                &matcher_name,
                &file_name,
                counts.host_domain,
            ));
        }
        if flags.contains(MatcherFlags::ALLOW_IP_TABLE) && counts.ip > 0 {
            self.ip_match = Some(IpMatcher::allocate(&matcher_name, &file_name, counts.ip));
        }
        if flags.contains(MatcherFlags::ALLOW_HOST_REGEX_TABLE) && counts.host_regex > 0 {
            self.hr_match = Some(HostRegexMatcher::allocate(
                &matcher_name,
                &file_name,
                counts.host_regex,
            ));
        }

        // Second pass: populate in source order
        let mut second_pass = TypeCounts::default();
        for line in worklist {
            let kind = line.kind();
            let line_num = line.line_num();
            second_pass.tally(kind);

            let outcome = if flags.allows(kind) {
                match kind {
                    MatchType::Host | MatchType::Domain => {
                        self.host_match.as_mut().map(|m| m.new_entry(line))
                    }
                    MatchType::Regex => self.re_match.as_mut().map(|m| m.new_entry(line)),
                    MatchType::Url => self.url_match.as_mut().map(|m| m.new_entry(line)),
                    MatchType::Ip => self.ip_match.as_mut().map(|m| m.new_entry(line)),
                    MatchType::HostRegex => self.hr_match.as_mut().map(|m| m.new_entry(line)),
                }
            } else {
                None
            };

            match outcome {
                Some(Ok(())) => {}
                Some(Err(e)) => {
                    let msg = format!(
                        "{} discarding {} entry at line {} : {}",
                        matcher_name,
                        file_name,
                        e.line(),
                        e
                    );
                    sink.signal_error(&msg, &mut already_alarmed);
                }
                None => {
                    let msg = format!(
                        "{} discarding {} entry with unknown or disabled match type {} at line {}",
                        matcher_name, file_name, kind, line_num
                    );
                    sink.signal_error(&msg, &mut already_alarmed);
                }
            }
        }

        assert_eq!(
            second_pass, counts,
            "{}: second pass routed a different set of entries than the first pass counted",
            matcher_name
        );

        if log::log_enabled!(target: "matcher", log::Level::Debug) {
            log::debug!(target: "matcher", "{}", self.describe());
        }

        num_entries
    }

    /// Apply every matching record to `result`.
    ///
    /// Tables run in the order host/domain, URL regex, exact URL, IP range,
    /// host regex. Matching an empty matcher leaves `result` untouched.
    pub fn match_request(&self, rdata: &dyn RequestData, result: &mut D::Result) {
        if let Some(m) = &self.host_match {
            m.match_request(rdata, result);
        }
        if let Some(m) = &self.re_match {
            m.match_request(rdata, result);
        }
        if let Some(m) = &self.url_match {
            m.match_request(rdata, result);
        }
        if let Some(m) = &self.ip_match {
            m.match_request(rdata, result);
        }
        if let Some(m) = &self.hr_match {
            m.match_request(rdata, result);
        }
    }

    /// Number of lines that classified successfully during the build.
    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    /// Number of records stored across all tables.
    pub fn inserted_entries(&self) -> usize {
        self.host_match.as_ref().map_or(0, |m| m.len())
            + self.re_match.as_ref().map_or(0, |m| m.len())
            + self.url_match.as_ref().map_or(0, |m| m.len())
            + self.ip_match.as_ref().map_or(0, |m| m.len())
            + self.hr_match.as_ref().map_or(0, |m| m.len())
    }

    /// Matcher configuration.
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Matcher name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Host/domain table, if built.
    pub fn host_table(&self) -> Option<&HostMatcher<D>> {
        self.host_match.as_ref()
    }

    /// URL regex table, if built.
    pub fn regex_table(&self) -> Option<&RegexMatcher<D, P>> {
        self.re_match.as_ref()
    }

    /// Exact URL table, if built.
    pub fn url_table(&self) -> Option<&UrlMatcher<D>> {
        self.url_match.as_ref()
    }

    /// IP range table, if built.
    pub fn ip_table(&self) -> Option<&IpMatcher<D>> {
        self.ip_match.as_ref()
    }

    /// Host regex table, if built.
    pub fn host_regex_table(&self) -> Option<&HostRegexMatcher<D, P>> {
        self.hr_match.as_ref()
    }

    /// Debug rendering of every table.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Control Matcher Table: {}", self.config.name);
        if let Some(m) = &self.host_match {
            out.push_str(&m.describe());
        }
        if let Some(m) = &self.re_match {
            out.push_str(&m.describe());
        }
        if let Some(m) = &self.url_match {
            out.push_str(&m.describe());
        }
        if let Some(m) = &self.ip_match {
            out.push_str(&m.describe());
        }
        if let Some(m) = &self.hr_match {
            out.push_str(&m.describe());
        }
        out
    }
}

fn read_rules(config: &MatcherConfig) -> Result<String> {
    let path = config
        .file_path
        .as_ref()
        .ok_or_else(|| Error::Config(format!("{}: no rule file configured", config.name)))?;
    Ok(fs::read_to_string(path)?)
}
