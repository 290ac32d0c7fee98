//! Reconciliation of announced address space against the allocation plan.
use std::collections::BTreeMap;

use ipnet::IpNet;

use crate::{
    announce::{Announcements, Space},
    AddrSet, Config, Error,
};

/// Address space bookkeeping for a single city.
#[derive(Debug, Clone, Default)]
struct City {
    country: String,
    region: String,
    base: AddrSet,
    additions: AddrSet,
    exclude: AddrSet,
    pi: AddrSet,
    small_pi: AddrSet,
    carved: AddrSet,
    overrides: AddrSet,
}

/// Per-city state accumulated while processing device queries.
///
/// Routes announced to each city are fed in with [`Locations::apply`] (or
/// [`Locations::process`]), and the final per-city address space is obtained with
/// [`Locations::finish`].
#[derive(Debug, Clone, Default)]
pub struct Locations {
    cities: BTreeMap<String, City>,
}

impl Locations {
    /// Initialise state from the allocation plan.
    ///
    /// # Errors
    ///
    /// [`Error::Overlap`] is returned if the base allocations of any two cities overlap. Every
    /// overlapping network is logged.
    #[tracing::instrument(skip(config), level = "debug")]
    pub fn new(config: &Config) -> Result<Self, Error> {
        let cities = config
            .cities()
            .map(|(name, city)| {
                let state = City {
                    country: city.country().to_string(),
                    region: city.region().to_string(),
                    base: city.cidrs(),
                    overrides: city.overrides(),
                    ..City::default()
                };
                (name.to_string(), state)
            })
            .collect::<BTreeMap<_, _>>();
        let mut overlaps = AddrSet::new();
        for (i, (name, city)) in cities.iter().enumerate() {
            for (other_name, other) in cities.iter().skip(i + 1) {
                let overlap = &city.base & &other.base;
                overlap.iter().for_each(|cidr| {
                    tracing::error!("overlapping cidr {cidr} from {name} found in {other_name}");
                });
                overlaps |= &overlap;
            }
        }
        if overlaps.is_empty() {
            Ok(Self { cities })
        } else {
            Err(Error::Overlap(overlaps.cidrs()))
        }
    }

    /// Apply the result of classifying one query for `city`.
    ///
    /// Announced prefixes are processed before carved space.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownCity`] is returned if `city` is not in the allocation plan.
    pub fn apply(
        &mut self,
        city: &str,
        space: Space,
        announcements: &Announcements,
    ) -> Result<(), Error> {
        self.process(city, &announcements.prefixes, space, false)?;
        self.process(city, &announcements.carved, space, true)
    }

    /// Reconcile each network in `set`, announced to `city`, against the allocation plan.
    ///
    /// - Space within the city's own allocation is left alone, unless `carved`, in which case it
    ///   is moved from the allocation to the city's provider independent space.
    /// - Space within another city's allocation is removed from that city, and added either to
    ///   this city's allocation or, if `carved`, its provider independent space.
    /// - Space outside of every allocation is recorded as provider independent.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownCity`] is returned if `city` is not in the allocation plan.
    #[tracing::instrument(skip(self, set), level = "debug")]
    pub fn process(
        &mut self,
        city: &str,
        set: &AddrSet,
        space: Space,
        carved: bool,
    ) -> Result<(), Error> {
        for cidr in set.iter() {
            if self.city(city)?.base.contains(&cidr) {
                if carved {
                    tracing::info!("{cidr} belongs to {city} allocation but is announced by an external AS");
                    let this = self.city_mut(city)?;
                    this.exclude.insert(cidr);
                    this.carved.insert(cidr);
                } else {
                    tracing::trace!("{cidr} belongs to {city} allocation");
                }
                continue;
            }
            if let Some(owner) = self.owner_of(&cidr, city) {
                self.city_mut(&owner)?.exclude.insert(cidr);
                let this = self.city_mut(city)?;
                if carved {
                    tracing::info!("moving {cidr} announced by an external AS from {owner} to {city}");
                    this.carved.insert(cidr);
                } else {
                    tracing::debug!("moving {cidr} from {owner} to {city}");
                    this.additions.insert(cidr);
                }
            } else {
                tracing::debug!("{cidr} is a small allocation or PI range, adding to {city}");
                let this = self.city_mut(city)?;
                if space.is_pi() {
                    this.pi.insert(cidr);
                } else {
                    this.small_pi.insert(cidr);
                }
            }
        }
        Ok(())
    }

    fn city(&self, name: &str) -> Result<&City, Error> {
        self.cities
            .get(name)
            .ok_or_else(|| Error::UnknownCity(name.to_string()))
    }

    fn city_mut(&mut self, name: &str) -> Result<&mut City, Error> {
        self.cities
            .get_mut(name)
            .ok_or_else(|| Error::UnknownCity(name.to_string()))
    }

    /// Find the city, other than `except`, whose allocation holds `cidr`.
    fn owner_of(&self, cidr: &IpNet, except: &str) -> Option<String> {
        self.cities
            .iter()
            .find(|(name, city)| name.as_str() != except && city.base.contains(cidr))
            .map(|(name, _)| name.clone())
    }

    /// Consolidate the accumulated state into the final per-city address space.
    #[tracing::instrument(skip(self), level = "debug")]
    #[must_use]
    pub fn finish(self) -> Report {
        let mut cities = self.cities;

        // remove PI networks that contain space announced as a small allocation anywhere
        let small_pi = cities
            .values()
            .fold(AddrSet::new(), |acc, city| &acc | &city.small_pi)
            .cidrs();
        for (name, city) in &mut cities {
            let duplicates = city
                .pi
                .iter()
                .filter(|cidr| {
                    small_pi.iter().any(|small| {
                        let contained = cidr.contains(small);
                        if contained {
                            tracing::debug!(
                                "removing duplicate PI cidr from {name}: {cidr} contains {small}"
                            );
                        }
                        contained
                    })
                })
                .collect::<AddrSet>();
            city.pi -= &duplicates;
        }

        for city in cities.values_mut() {
            city.base = &(&(&city.base | &city.additions) - &city.exclude) | &city.overrides;
            city.pi = &(&city.pi | &city.small_pi) | &city.carved;
        }

        let overrides = cities
            .iter()
            .filter(|(_, city)| !city.overrides.is_empty())
            .map(|(name, city)| (name.clone(), city.overrides.clone()))
            .collect::<Vec<_>>();
        for (name, overrides) in &overrides {
            for (other_name, other) in cities.iter_mut().filter(|(other, _)| *other != name) {
                (&other.base | &other.pi)
                    .intersection(overrides)
                    .iter()
                    .for_each(|cidr| {
                        tracing::info!("overridden cidr {cidr} from {name} found in {other_name}");
                    });
                other.base -= overrides;
                other.pi -= overrides;
            }
        }

        Report {
            cities: cities
                .into_iter()
                .map(|(name, city)| {
                    let report = CityReport {
                        country: city.country,
                        region: city.region,
                        cidrs: city.base,
                        pi_cidrs: city.pi,
                    };
                    (name, report)
                })
                .collect(),
        }
    }
}

/// The final address space of every city.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    cities: BTreeMap<String, CityReport>,
}

impl Report {
    /// Iterate over cities in name order.
    pub fn cities(&self) -> impl Iterator<Item = (&str, &CityReport)> {
        self.cities.iter().map(|(name, city)| (name.as_str(), city))
    }

    /// Look up a city by name.
    #[must_use]
    pub fn city(&self, name: &str) -> Option<&CityReport> {
        self.cities.get(name)
    }

    /// Aggregate the address space of cities by country code.
    #[must_use]
    pub fn countries(&self) -> BTreeMap<&str, CountryReport> {
        self.cities
            .values()
            .fold(BTreeMap::new(), |mut countries, city| {
                let country: &mut CountryReport = countries.entry(city.country()).or_default();
                country.cidrs |= &city.cidrs;
                country.pi_cidrs |= &city.pi_cidrs;
                countries
            })
    }
}

/// The final address space of a single city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityReport {
    country: String,
    region: String,
    cidrs: AddrSet,
    pi_cidrs: AddrSet,
}

impl CityReport {
    /// ISO 3166-1 country code.
    #[must_use]
    pub fn country(&self) -> &str {
        &self.country
    }

    /// ISO 3166-2 region code, or the empty string.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The city's allocation after reconciliation.
    #[must_use]
    pub const fn cidrs(&self) -> &AddrSet {
        &self.cidrs
    }

    /// Provider independent and carved out space announced to the city.
    #[must_use]
    pub const fn pi_cidrs(&self) -> &AddrSet {
        &self.pi_cidrs
    }
}

/// The aggregated address space of a single country.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryReport {
    cidrs: AddrSet,
    pi_cidrs: AddrSet,
}

impl CountryReport {
    /// Union of the allocations of every city in the country.
    #[must_use]
    pub const fn cidrs(&self) -> &AddrSet {
        &self.cidrs
    }

    /// Union of the provider independent space of every city in the country.
    #[must_use]
    pub const fn pi_cidrs(&self) -> &AddrSet {
        &self.pi_cidrs
    }
}
