//! Classification of routes learned from a device.
use crate::{route::PathOrigin, AddrSet, Route};

/// The kind of address space a query was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    /// Provider aggregate space.
    Pa,
    /// Provider independent space.
    Pi,
}

impl Space {
    /// Returns `true` for [`Space::Pi`].
    #[must_use]
    pub const fn is_pi(self) -> bool {
        matches!(self, Self::Pi)
    }
}

/// Address space announced to a city, split by how it must be reconciled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Announcements {
    /// Space announced to the city.
    pub prefixes: AddrSet,
    /// Provider aggregate space announced by an external AS.
    pub carved: AddrSet,
}

impl Announcements {
    /// Returns `true` if neither set contains any address.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.carved.is_empty()
    }
}

/// Classify `routes` returned by a query for `space`.
///
/// Host routes are ignored. For [`Space::Pi`] queries, routes falling within `pa_space` are
/// examined further: those announced by an external AS are carved out of the aggregate, while
/// those originated locally are ignored.
#[tracing::instrument(skip(routes, pa_space), fields(routes = routes.len()), level = "debug")]
pub fn classify(routes: &[Route], pa_space: &AddrSet, space: Space) -> Announcements {
    let mut prefixes = Vec::new();
    let mut carved = Vec::new();
    for route in routes {
        let prefix = route.prefix();
        tracing::trace!(%prefix, "classifying route");
        if route.is_host_route() {
            tracing::debug!(%prefix, "ignoring host route");
            continue;
        }
        if space.is_pi() && pa_space.contains(&prefix) {
            match route.as_path().map(|path| path.origin()) {
                Ok(PathOrigin::External(asn)) => {
                    tracing::info!(%prefix, "carving out PA space announced by external AS{asn}");
                    carved.push(prefix);
                }
                Ok(PathOrigin::Local) => {
                    tracing::info!(%prefix, "ignoring locally originated PA space tagged as PI");
                }
                Err(err) => {
                    tracing::error!(%prefix, %err, "failed to parse AS path, skipping route");
                }
            }
            continue;
        }
        prefixes.push(prefix);
    }
    Announcements {
        prefixes: prefixes.into_iter().collect(),
        carved: carved.into_iter().collect(),
    }
}
