//! IP address interval map.

use ipnet::IpNet;
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::RangeError;

/// IpMap stores non-overlapping address ranges, each owned by one value.
///
/// Marking a range that overlaps existing ranges takes over the overlapped
/// part; the remainders of the older ranges keep their owner. Later marks
/// always win regardless of range size.
///
/// # Examples
/// ```
/// use ctlmatch::lookup::IpMap;
/// use std::net::IpAddr;
///
/// let mut map = IpMap::new();
/// map.mark("10.0.0.0".parse().unwrap(), "10.0.0.255".parse().unwrap(), 'a').unwrap();
/// map.mark("10.0.0.128".parse().unwrap(), "10.0.0.200".parse().unwrap(), 'b').unwrap();
///
/// let ip: IpAddr = "10.0.0.150".parse().unwrap();
/// assert_eq!(map.contains(ip), Some(&'b'));
/// ```
#[derive(Debug, Clone)]
pub struct IpMap<T> {
    v4: BTreeMap<u32, (u32, T)>,
    v6: BTreeMap<u128, (u128, T)>,
}

impl<T: Clone> IpMap<T> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            v4: BTreeMap::new(),
            v6: BTreeMap::new(),
        }
    }

    /// Assign `[low, high]` to `value`.
    ///
    /// Ranges need not be sorted or disjoint from earlier marks.
    pub fn mark(&mut self, low: IpAddr, high: IpAddr, value: T) -> Result<(), RangeError> {
        match (low, high) {
            (IpAddr::V4(lo), IpAddr::V4(hi)) => {
                let (lo, hi) = (u32::from(lo), u32::from(hi));
                if lo > hi {
                    return Err(RangeError::Reversed);
                }
                mark_range(&mut self.v4, lo, hi, value);
            }
            (IpAddr::V6(lo), IpAddr::V6(hi)) => {
                let (lo, hi) = (u128::from(lo), u128::from(hi));
                if lo > hi {
                    return Err(RangeError::Reversed);
                }
                mark_range(&mut self.v6, lo, hi, value);
            }
            _ => return Err(RangeError::MixedFamilies),
        }
        Ok(())
    }

    /// Value owning `addr`, if any.
    pub fn contains(&self, addr: IpAddr) -> Option<&T> {
        match addr {
            IpAddr::V4(v4) => find(&self.v4, u32::from(v4)),
            IpAddr::V6(v6) => find(&self.v6, u128::from(v6)),
        }
    }

    /// Number of stored ranges.
    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    /// Check if no range is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ranges in address order, IPv4 first.
    pub fn iter(&self) -> impl Iterator<Item = (IpAddr, IpAddr, &T)> {
        let v4 = self.v4.iter().map(|(lo, (hi, v))| {
            (
                IpAddr::V4(Ipv4Addr::from(*lo)),
                IpAddr::V4(Ipv4Addr::from(*hi)),
                v,
            )
        });
        let v6 = self.v6.iter().map(|(lo, (hi, v))| {
            (
                IpAddr::V6(Ipv6Addr::from(*lo)),
                IpAddr::V6(Ipv6Addr::from(*hi)),
                v,
            )
        });
        v4.chain(v6)
    }
}

impl<T: Clone> Default for IpMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer address keys.
trait Addr: Ord + Copy {
    fn pred(self) -> Option<Self>;
    fn succ(self) -> Option<Self>;
}

impl Addr for u32 {
    fn pred(self) -> Option<Self> {
        self.checked_sub(1)
    }
    fn succ(self) -> Option<Self> {
        self.checked_add(1)
    }
}

impl Addr for u128 {
    fn pred(self) -> Option<Self> {
        self.checked_sub(1)
    }
    fn succ(self) -> Option<Self> {
        self.checked_add(1)
    }
}

fn mark_range<K: Addr, T: Clone>(map: &mut BTreeMap<K, (K, T)>, lo: K, hi: K, value: T) {
    // Stored ranges are disjoint and sorted, so the ones touching [lo, hi]
    // are contiguous and end at the last start <= hi.
    let overlapping: Vec<K> = map
        .range(..=hi)
        .rev()
        .take_while(|(_, (end, _))| *end >= lo)
        .map(|(start, _)| *start)
        .collect();

    for start in overlapping {
        let Some((end, owner)) = map.remove(&start) else {
            continue;
        };
        if start < lo {
            if let Some(left_end) = lo.pred() {
                map.insert(start, (left_end, owner.clone()));
            }
        }
        if end > hi {
            if let Some(right_start) = hi.succ() {
                map.insert(right_start, (end, owner));
            }
        }
    }

    map.insert(lo, (hi, value));
}

fn find<K: Addr, T>(map: &BTreeMap<K, (K, T)>, addr: K) -> Option<&T> {
    map.range(..=addr)
        .next_back()
        .filter(|(_, (end, _))| *end >= addr)
        .map(|(_, (_, v))| v)
}

/// Parse range text: `addr`, `low-high`, or CIDR `addr/len`.
pub fn parse_ip_range(text: &str) -> Result<(IpAddr, IpAddr), RangeError> {
    let text = text.trim();

    if let Some((addr, prefix)) = text.split_once('/') {
        let addr: IpAddr = addr
            .trim()
            .parse()
            .map_err(|_| RangeError::MalformedAddress(addr.trim().to_string()))?;
        let prefix: u8 = prefix
            .trim()
            .parse()
            .map_err(|_| RangeError::InvalidPrefix(prefix.trim().to_string()))?;
        let net = IpNet::new(addr, prefix)
            .map_err(|_| RangeError::InvalidPrefix(prefix.to_string()))?;
        return Ok((net.network(), net.broadcast()));
    }

    if let Some((low, high)) = text.split_once('-') {
        let low = parse_addr(low)?;
        let high = parse_addr(high)?;
        return match (low, high) {
            (IpAddr::V4(_), IpAddr::V6(_)) | (IpAddr::V6(_), IpAddr::V4(_)) => {
                Err(RangeError::MixedFamilies)
            }
            _ if low > high => Err(RangeError::Reversed),
            _ => Ok((low, high)),
        };
    }

    let addr = parse_addr(text)?;
    Ok((addr, addr))
}

fn parse_addr(text: &str) -> Result<IpAddr, RangeError> {
    let text = text.trim();
    text.parse()
        .map_err(|_| RangeError::MalformedAddress(text.to_string()))
}
