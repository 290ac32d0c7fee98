//! Routes learned from network devices.
use std::{fmt, net::IpAddr, str::FromStr};

use ipnet::IpNet;

use crate::Error;

/// A single routing table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    prefix: IpNet,
    protocol: Option<String>,
    next_hops: Vec<NextHop>,
    as_path: Option<String>,
    communities: Vec<String>,
}

impl Route {
    /// Construct a new route to `prefix`, with no other attributes.
    #[must_use]
    pub const fn new(prefix: IpNet) -> Self {
        Self {
            prefix,
            protocol: None,
            next_hops: Vec::new(),
            as_path: None,
            communities: Vec::new(),
        }
    }

    /// Set the name of the protocol that learned the route.
    #[must_use]
    pub fn with_protocol<S: Into<String>>(mut self, protocol: S) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// Add a forwarding next-hop.
    #[must_use]
    pub fn with_next_hop(mut self, next_hop: NextHop) -> Self {
        self.next_hops.push(next_hop);
        self
    }

    /// Set the AS path, as the raw text reported by the device.
    #[must_use]
    pub fn with_as_path<S: Into<String>>(mut self, as_path: S) -> Self {
        self.as_path = Some(as_path.into());
        self
    }

    /// Add a BGP community, e.g. `65000:100`.
    #[must_use]
    pub fn with_community<S: Into<String>>(mut self, community: S) -> Self {
        self.communities.push(community.into());
        self
    }

    /// The destination prefix.
    #[must_use]
    pub const fn prefix(&self) -> IpNet {
        self.prefix
    }

    /// The protocol that learned the route, if known.
    #[must_use]
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Forwarding next-hops, in the order reported by the device.
    pub fn next_hops(&self) -> impl Iterator<Item = &NextHop> {
        self.next_hops.iter()
    }

    /// BGP communities carried by the route.
    pub fn communities(&self) -> impl Iterator<Item = &str> {
        self.communities.iter().map(String::as_str)
    }

    /// The raw AS path text, if present.
    #[must_use]
    pub fn as_path_text(&self) -> Option<&str> {
        self.as_path.as_deref()
    }

    /// Parse the AS path of the route.
    ///
    /// # Errors
    ///
    /// An error is returned if the route has no AS path, or it could not be parsed.
    pub fn as_path(&self) -> Result<AsPath, Error> {
        self.as_path
            .as_deref()
            .ok_or_else(|| Error::ParseAsPath(String::new()))?
            .parse()
    }

    /// Returns `true` for routes to a single address.
    #[must_use]
    pub fn is_host_route(&self) -> bool {
        self.prefix.prefix_len() == self.prefix.max_prefix_len()
    }
}

/// A forwarding next-hop of a [`Route`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NextHop {
    to: Option<IpAddr>,
    via: Option<String>,
}

impl NextHop {
    /// Construct a next-hop. The address and the outgoing interface are both optional.
    #[must_use]
    pub const fn new(to: Option<IpAddr>, via: Option<String>) -> Self {
        Self { to, via }
    }

    /// Next-hop address.
    #[must_use]
    pub const fn to(&self) -> Option<IpAddr> {
        self.to
    }

    /// Outgoing interface name.
    #[must_use]
    pub fn via(&self) -> Option<&str> {
        self.via.as_deref()
    }
}

/// A BGP AS path, as printed by Junos in detailed route output.
///
/// The text takes the form `AS path: 64496 64497 I`, where the final token is the BGP origin
/// code. Only the leading sequence of AS numbers is retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsPath {
    asns: Vec<u32>,
}

impl AsPath {
    /// The origin of the path.
    #[must_use]
    pub fn origin(&self) -> PathOrigin {
        self.asns
            .first()
            .map_or(PathOrigin::Local, |asn| PathOrigin::External(*asn))
    }

    /// AS numbers of the path, nearest neighbour first.
    pub fn asns(&self) -> impl Iterator<Item = u32> + '_ {
        self.asns.iter().copied()
    }
}

impl FromStr for AsPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || Error::ParseAsPath(s.to_string());
        let mut tokens = s
            .trim_start()
            .strip_prefix("AS path:")
            .ok_or_else(err)?
            .split_whitespace();
        match tokens.next() {
            Some("I" | "?") => Ok(Self { asns: Vec::new() }),
            Some(first) => {
                let asns = std::iter::once(first)
                    .chain(tokens)
                    .map_while(|token| token.parse::<u32>().ok())
                    .collect::<Vec<_>>();
                if asns.is_empty() {
                    Err(err())
                } else {
                    Ok(Self { asns })
                }
            }
            None => Err(err()),
        }
    }
}

/// Where a route was originated, according to its AS path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOrigin {
    /// Originated within the local AS.
    Local,
    /// Announced by the given neighbouring AS.
    External(u32),
}

impl fmt::Display for PathOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::External(asn) => write!(f, "AS{asn}"),
        }
    }
}
