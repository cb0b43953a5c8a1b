//! Per-strategy match tables.
//!
//! Each table is allocated for an exact number of entries, filled once from
//! classified config lines, and read-only afterwards. A line that fails to
//! insert leaves its table untouched, so tables may end up holding fewer
//! records than they were allocated for.

mod host;
mod ip;
mod regexp;
mod url;

pub use host::HostMatcher;
pub use ip::IpMatcher;
pub use regexp::{HostRegexMatcher, RegexMatcher};
pub use url::UrlMatcher;
