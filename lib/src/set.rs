//! Sets of IP addresses, stored as ranges.
//!
//! An [`AddrSet`] holds any combination of IPv4 and IPv6 space. Internally each address family is
//! represented as a sorted list of disjoint, non-adjacent, inclusive address intervals. The set
//! can be decomposed into the minimal list of CIDR networks covering exactly the same space.
use std::{
    cmp::{max, min},
    fmt,
    iter::once,
    net::{Ipv4Addr, Ipv6Addr},
    ops::{BitAnd, BitOr, BitOrAssign, Sub, SubAssign},
};

use ipnet::{IpNet, Ipv4Subnets, Ipv6Subnets};

/// Integer representation of an address.
trait Addr: Copy + Ord + Default + fmt::Debug {
    fn succ(self) -> Option<Self>;
    fn pred(self) -> Option<Self>;
}

macro_rules! impl_addr {
    ( $( $t:ty ),* $(,)? ) => {
        $(
            impl Addr for $t {
                fn succ(self) -> Option<Self> {
                    self.checked_add(1)
                }
                fn pred(self) -> Option<Self> {
                    self.checked_sub(1)
                }
            }
        )*
    };
}
impl_addr!(u32, u128);

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
struct Ranges<T> {
    inner: Vec<(T, T)>,
}

impl<T: Addr> Ranges<T> {
    fn from_unsorted(mut ranges: Vec<(T, T)>) -> Self {
        ranges.sort_unstable();
        let mut inner: Vec<(T, T)> = Vec::with_capacity(ranges.len());
        for (lo, hi) in ranges {
            match inner.last_mut() {
                Some((_, last_hi)) if last_hi.succ().map_or(true, |next| lo <= next) => {
                    *last_hi = max(*last_hi, hi);
                }
                _ => inner.push((lo, hi)),
            }
        }
        Self { inner }
    }

    fn insert(&mut self, lo: T, hi: T) {
        // ranges ending strictly before `lo`, and not adjacent to it
        let start = self
            .inner
            .partition_point(|&(_, h)| h.succ().map_or(false, |next| next < lo));
        // ranges starting at or before `hi + 1`
        let end = self
            .inner
            .partition_point(|&(l, _)| hi.succ().map_or(true, |next| l <= next));
        if start == end {
            self.inner.insert(start, (lo, hi));
        } else {
            let merged = (min(lo, self.inner[start].0), max(hi, self.inner[end - 1].1));
            _ = self.inner.splice(start..end, once(merged));
        }
    }

    fn contains(&self, lo: T, hi: T) -> bool {
        match self.inner.partition_point(|&(l, _)| l <= lo) {
            0 => false,
            idx => self.inner[idx - 1].1 >= hi,
        }
    }

    fn union(&self, other: &Self) -> Self {
        Self::from_unsorted(self.inner.iter().chain(&other.inner).copied().collect())
    }

    fn difference(&self, other: &Self) -> Self {
        let mut inner = Vec::with_capacity(self.inner.len());
        let mut j = 0;
        for &(lo, hi) in &self.inner {
            while other.inner.get(j).is_some_and(|&(_, ohi)| ohi < lo) {
                j += 1;
            }
            let mut k = j;
            let mut next = Some(lo);
            while let Some(start) = next {
                match other.inner.get(k) {
                    Some(&(olo, ohi)) if olo <= hi => {
                        if olo > start {
                            inner.push((start, olo.pred().unwrap_or(start)));
                        }
                        next = if ohi < hi { ohi.succ() } else { None };
                        k += 1;
                    }
                    _ => {
                        inner.push((start, hi));
                        next = None;
                    }
                }
            }
        }
        Self { inner }
    }

    fn intersection(&self, other: &Self) -> Self {
        let mut inner = Vec::new();
        let (mut i, mut j) = (0, 0);
        while let (Some(&(alo, ahi)), Some(&(blo, bhi))) = (self.inner.get(i), other.inner.get(j)) {
            let (lo, hi) = (max(alo, blo), min(ahi, bhi));
            if lo <= hi {
                inner.push((lo, hi));
            }
            if ahi < bhi {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self { inner }
    }

    fn is_disjoint(&self, other: &Self) -> bool {
        let (mut i, mut j) = (0, 0);
        while let (Some(&(alo, ahi)), Some(&(blo, bhi))) = (self.inner.get(i), other.inner.get(j)) {
            if max(alo, blo) <= min(ahi, bhi) {
                return false;
            }
            if ahi < bhi {
                i += 1;
            } else {
                j += 1;
            }
        }
        true
    }
}

/// A set of IPv4 and IPv6 addresses.
///
/// # Examples
///
/// ```
/// use iplocbuild::AddrSet;
///
/// let base: AddrSet = ["192.0.2.0/24".parse()?].into_iter().collect();
/// let carved: AddrSet = ["192.0.2.128/25".parse()?].into_iter().collect();
/// let remaining = &base - &carved;
/// assert_eq!(remaining.cidrs(), vec!["192.0.2.0/25".parse()?]);
/// # Ok::<_, ipnet::AddrParseError>(())
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct AddrSet {
    v4: Ranges<u32>,
    v6: Ranges<u128>,
}

impl AddrSet {
    /// Construct an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the set contains no addresses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.v4.inner.is_empty() && self.v6.inner.is_empty()
    }

    /// Add every address in `net` to the set.
    pub fn insert(&mut self, net: IpNet) {
        match net {
            IpNet::V4(net) => self.v4.insert(net.network().into(), net.broadcast().into()),
            IpNet::V6(net) => self.v6.insert(net.network().into(), net.broadcast().into()),
        }
    }

    /// Returns `true` if every address in `net` is in the set.
    #[must_use]
    pub fn contains(&self, net: &IpNet) -> bool {
        match net {
            IpNet::V4(net) => self
                .v4
                .contains(net.network().into(), net.broadcast().into()),
            IpNet::V6(net) => self
                .v6
                .contains(net.network().into(), net.broadcast().into()),
        }
    }

    /// Returns `true` if the two sets have no address in common.
    #[must_use]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.v4.is_disjoint(&other.v4) && self.v6.is_disjoint(&other.v6)
    }

    /// Addresses in either set.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            v4: self.v4.union(&other.v4),
            v6: self.v6.union(&other.v6),
        }
    }

    /// Addresses in `self` but not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        Self {
            v4: self.v4.difference(&other.v4),
            v6: self.v6.difference(&other.v6),
        }
    }

    /// Addresses in both sets.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            v4: self.v4.intersection(&other.v4),
            v6: self.v6.intersection(&other.v6),
        }
    }

    /// Iterate over the minimal list of networks covering the set.
    ///
    /// IPv4 networks are yielded before IPv6 networks, each in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = IpNet> + '_ {
        let v4 = self.v4.inner.iter().flat_map(|&(lo, hi)| {
            Ipv4Subnets::new(Ipv4Addr::from(lo), Ipv4Addr::from(hi), 0).map(IpNet::V4)
        });
        let v6 = self.v6.inner.iter().flat_map(|&(lo, hi)| {
            Ipv6Subnets::new(Ipv6Addr::from(lo), Ipv6Addr::from(hi), 0).map(IpNet::V6)
        });
        v4.chain(v6)
    }

    /// Collect the minimal list of networks covering the set.
    #[must_use]
    pub fn cidrs(&self) -> Vec<IpNet> {
        self.iter().collect()
    }
}

impl FromIterator<IpNet> for AddrSet {
    fn from_iter<I: IntoIterator<Item = IpNet>>(iter: I) -> Self {
        let mut this = Self::new();
        this.extend(iter);
        this
    }
}

impl Extend<IpNet> for AddrSet {
    fn extend<I: IntoIterator<Item = IpNet>>(&mut self, iter: I) {
        let (mut v4, mut v6): (Vec<(u32, u32)>, Vec<(u128, u128)>) =
            (self.v4.inner.clone(), self.v6.inner.clone());
        iter.into_iter().for_each(|net| match net {
            IpNet::V4(net) => v4.push((net.network().into(), net.broadcast().into())),
            IpNet::V6(net) => v6.push((net.network().into(), net.broadcast().into())),
        });
        self.v4 = Ranges::from_unsorted(v4);
        self.v6 = Ranges::from_unsorted(v6);
    }
}

impl BitOr for &AddrSet {
    type Output = AddrSet;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl Sub for &AddrSet {
    type Output = AddrSet;

    fn sub(self, rhs: Self) -> Self::Output {
        self.difference(rhs)
    }
}

impl BitAnd for &AddrSet {
    type Output = AddrSet;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.intersection(rhs)
    }
}

impl BitOrAssign<&Self> for AddrSet {
    fn bitor_assign(&mut self, rhs: &Self) {
        *self = self.union(rhs);
    }
}

impl SubAssign<&Self> for AddrSet {
    fn sub_assign(&mut self, rhs: &Self) {
        *self = self.difference(rhs);
    }
}
