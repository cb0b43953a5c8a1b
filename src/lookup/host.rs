//! Hostname label index.

use ahash::AHashMap;

/// HostLookup maps host and domain names to entry positions.
///
/// Names are stored lower-cased with any leading or trailing dot removed.
/// A host entry matches only the exact name; a domain entry matches the name
/// itself and every name below it at a label boundary.
///
/// Matching yields the most specific entries first: everything registered
/// for the full hostname, then domain entries for each parent name from the
/// longest to the shortest. Entries registered for the same name are yielded
/// in insertion order.
///
/// # Examples
/// ```
/// use ctlmatch::lookup::HostLookup;
///
/// let mut lookup = HostLookup::with_capacity(2);
/// lookup.new_entry("example.com", true, 0);
/// lookup.new_entry("www.example.com", false, 1);
///
/// let hits: Vec<usize> = lookup.match_all("WWW.example.com").collect();
/// assert_eq!(hits, vec![1, 0]);
/// ```
#[derive(Debug)]
pub struct HostLookup {
    leaves: AHashMap<String, Vec<HostLeaf>>,
    count: usize,
}

#[derive(Debug, Clone, Copy)]
struct HostLeaf {
    is_domain: bool,
    value: usize,
}

impl HostLookup {
    /// Create an index sized for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            leaves: AHashMap::with_capacity(capacity),
            count: 0,
        }
    }

    /// Register a host (`is_domain == false`) or domain name.
    pub fn new_entry(&mut self, match_data: &str, is_domain: bool, value: usize) {
        let key = normalize(match_data);
        self.leaves
            .entry(key)
            .or_default()
            .push(HostLeaf { is_domain, value });
        self.count += 1;
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Iterate every entry matching `hostname`, most specific first.
    pub fn match_all(&self, hostname: &str) -> HostMatches<'_> {
        let host = normalize(hostname);
        let leaves = self.lookup(&host);
        HostMatches {
            lookup: self,
            host,
            pos: Some(0),
            leaves,
            idx: 0,
            exact: true,
        }
    }

    /// Registered names with their entries, sorted by name.
    pub fn entries(&self) -> Vec<(&str, bool, usize)> {
        let mut out: Vec<_> = self
            .leaves
            .iter()
            .flat_map(|(name, leaves)| {
                leaves
                    .iter()
                    .map(move |leaf| (name.as_str(), leaf.is_domain, leaf.value))
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0).then(a.2.cmp(&b.2)));
        out
    }

    fn lookup(&self, name: &str) -> &[HostLeaf] {
        self.leaves.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Lazy iterator returned by [`HostLookup::match_all`].
pub struct HostMatches<'a> {
    lookup: &'a HostLookup,
    host: String,
    /// Start of the name currently being visited; `None` once exhausted.
    pos: Option<usize>,
    leaves: &'a [HostLeaf],
    idx: usize,
    /// The full hostname is being visited, so host entries count too.
    exact: bool,
}

impl Iterator for HostMatches<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            while let Some(leaf) = self.leaves.get(self.idx) {
                self.idx += 1;
                if self.exact || leaf.is_domain {
                    return Some(leaf.value);
                }
            }

            let start = self.pos?;
            match self.host[start..].find('.') {
                Some(dot) => {
                    let next = start + dot + 1;
                    self.pos = Some(next);
                    self.leaves = self.lookup.lookup(&self.host[next..]);
                    self.idx = 0;
                    self.exact = false;
                }
                None => {
                    self.pos = None;
                    return None;
                }
            }
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim()
        .trim_start_matches('.')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(lookup: &HostLookup, host: &str) -> Vec<usize> {
        lookup.match_all(host).collect()
    }

    #[test]
    fn test_exact_host() {
        let mut lookup = HostLookup::with_capacity(1);
        lookup.new_entry("api.example.com", false, 0);

        assert_eq!(hits(&lookup, "api.example.com"), vec![0]);
        assert_eq!(hits(&lookup, "API.EXAMPLE.COM"), vec![0]);
        assert!(hits(&lookup, "example.com").is_empty());
        assert!(hits(&lookup, "x.api.example.com").is_empty());
    }

    #[test]
    fn test_domain_suffix() {
        let mut lookup = HostLookup::with_capacity(1);
        lookup.new_entry("example.com", true, 0);

        assert_eq!(hits(&lookup, "example.com"), vec![0]);
        assert_eq!(hits(&lookup, "www.example.com"), vec![0]);
        assert_eq!(hits(&lookup, "a.b.example.com"), vec![0]);
        assert!(hits(&lookup, "notexample.com").is_empty());
        assert!(hits(&lookup, "com").is_empty());
    }

    #[test]
    fn test_most_specific_first() {
        let mut lookup = HostLookup::with_capacity(4);
        lookup.new_entry("com", true, 0);
        lookup.new_entry("example.com", true, 1);
        lookup.new_entry("www.example.com", false, 2);
        lookup.new_entry("www.example.com", true, 3);

        assert_eq!(hits(&lookup, "www.example.com"), vec![2, 3, 1, 0]);
        assert_eq!(hits(&lookup, "mail.example.com"), vec![1, 0]);
    }

    #[test]
    fn test_leading_and_trailing_dots() {
        let mut lookup = HostLookup::with_capacity(1);
        lookup.new_entry(".example.com", true, 0);

        assert_eq!(hits(&lookup, "www.example.com."), vec![0]);
    }

    #[test]
    fn test_host_entry_not_matched_as_parent() {
        let mut lookup = HostLookup::with_capacity(1);
        lookup.new_entry("example.com", false, 0);

        assert!(hits(&lookup, "www.example.com").is_empty());
    }

    #[test]
    fn test_match_is_restartable() {
        let mut lookup = HostLookup::with_capacity(1);
        lookup.new_entry("example.com", true, 0);

        assert_eq!(hits(&lookup, "a.example.com"), vec![0]);
        assert_eq!(hits(&lookup, "a.example.com"), vec![0]);
        assert_eq!(lookup.len(), 1);
    }
}
