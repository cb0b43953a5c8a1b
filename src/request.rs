//! Request attributes used as match input.

use std::borrow::Cow;
use std::net::IpAddr;

/// Read-only view of the request attributes a match table looks at.
///
/// Matching never mutates the request.
pub trait RequestData {
    /// Request hostname, if known.
    fn host(&self) -> Option<&str>;

    /// Request URL with percent-escapes decoded.
    ///
    /// Decoded bytes that are not valid UTF-8 (such as `%FF`) come back as
    /// U+FFFD, so the result does not always re-encode to the original URL.
    fn url_string(&self) -> Option<Cow<'_, str>>;

    /// Destination address.
    fn dest_ip(&self) -> Option<IpAddr>;

    /// Client (source) address.
    fn client_ip(&self) -> Option<IpAddr>;
}

/// Plain request attributes for an HTTP transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequestData {
    pub hostname: Option<String>,
    /// URL as received, escapes intact
    pub url: Option<String>,
    pub dest_ip: Option<IpAddr>,
    pub src_ip: Option<IpAddr>,
}

impl HttpRequestData {
    /// Create request data for a hostname only.
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            hostname: Some(host.into()),
            ..Self::default()
        }
    }

    /// Create request data for a URL only.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Create request data for a destination address only.
    pub fn with_dest_ip(ip: IpAddr) -> Self {
        Self {
            dest_ip: Some(ip),
            ..Self::default()
        }
    }
}

impl RequestData for HttpRequestData {
    fn host(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    fn url_string(&self) -> Option<Cow<'_, str>> {
        self.url.as_deref().map(unescape)
    }

    fn dest_ip(&self) -> Option<IpAddr> {
        self.dest_ip
    }

    fn client_ip(&self) -> Option<IpAddr> {
        self.src_ip
    }
}

/// Decode `%XX` escapes. Invalid escapes are kept verbatim.
///
/// Decoded bytes that do not form valid UTF-8 are each replaced with
/// U+FFFD (see [`String::from_utf8_lossy`]).
pub fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('%') {
        return Cow::Borrowed(s);
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    match String::from_utf8(out) {
        Ok(decoded) => Cow::Owned(decoded),
        Err(e) => Cow::Owned(String::from_utf8_lossy(e.as_bytes()).into_owned()),
    }
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
