//! Lookup structures the match tables are built on.

mod host;
mod ip_map;
mod pattern;

pub use host::{HostLookup, HostMatches};
pub use ip_map::{parse_ip_range, IpMap};
pub use pattern::{CompileError, ExecFault, Pattern};
