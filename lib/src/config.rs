//! Allocation plan configuration.
use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    net::IpAddr,
    path::Path,
    str::FromStr,
};

use ipnet::IpNet;
use serde::Deserialize;

use crate::{AddrSet, Error};

/// Top level configuration, normally read from a JSON file.
///
/// ``` json
/// {
///     "username": "netops",
///     "password": "secret",
///     "paspace": ["192.0.2.0/24"],
///     "cities": {
///         "London": {
///             "country": "GB",
///             "region": "GB-LND",
///             "cidrs": ["198.51.100.0/24"],
///             "community": "65000:100",
///             "device": "edge1.lon"
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    paspace: Vec<Net>,
    #[serde(default)]
    cities: BTreeMap<String, CityConfig>,
}

impl Config {
    /// Read and parse the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// An error is returned if the file cannot be opened, or its contents are not a valid
    /// configuration.
    #[tracing::instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self, Error> {
        let file = File::open(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        tracing::debug!(cities = config.cities.len(), "configuration loaded");
        Ok(config)
    }

    /// Device login username, if configured.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Device login password, if configured.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Provider aggregate address space.
    #[must_use]
    pub fn pa_space(&self) -> AddrSet {
        self.paspace.iter().map(|net| net.0).collect()
    }

    /// Configured cities, in name order.
    pub fn cities(&self) -> impl Iterator<Item = (&str, &CityConfig)> {
        self.cities.iter().map(|(name, city)| (name.as_str(), city))
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Per-city configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CityConfig {
    country: String,
    #[serde(default)]
    region: String,
    cidrs: Vec<Net>,
    #[serde(default, rename = "override")]
    overrides: Vec<Net>,
    #[serde(default)]
    community: Option<String>,
    #[serde(default)]
    device: Option<String>,
}

impl CityConfig {
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

    /// The base address allocation.
    #[must_use]
    pub fn cidrs(&self) -> AddrSet {
        self.cidrs.iter().map(|net| net.0).collect()
    }

    /// Address space forced into this city, regardless of routing.
    #[must_use]
    pub fn overrides(&self) -> AddrSet {
        self.overrides.iter().map(|net| net.0).collect()
    }

    /// Location community, if set and non-empty.
    #[must_use]
    pub fn community(&self) -> Option<&str> {
        self.community.as_deref().filter(|s| !s.is_empty())
    }

    /// Device to query, if set and non-empty.
    #[must_use]
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref().filter(|s| !s.is_empty())
    }
}

/// An IP network as written in the configuration file.
///
/// Either CIDR notation or a bare address is accepted, and any host bits are cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
struct Net(IpNet);

impl FromStr for Net {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        s.parse::<IpNet>()
            .or_else(|_| s.parse::<IpAddr>().map(IpNet::from))
            .map(|net| Self(net.trunc()))
            .map_err(|_| Error::ParseNet(s.to_string()))
    }
}

impl TryFrom<String> for Net {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const EXAMPLE: &str = r#"
        {
            "username": "netops",
            "password": "secret",
            "paspace": ["192.0.2.0/24", "2001:db8::/32"],
            "cities": {
                "London": {
                    "country": "GB",
                    "region": "GB-LND",
                    "cidrs": ["198.51.100.0/24"],
                    "override": ["192.0.2.10"],
                    "community": "65000:100",
                    "device": "edge1.lon"
                },
                "Amsterdam": {
                    "country": "NL",
                    "cidrs": ["203.0.113.5/24"],
                    "community": "",
                    "device": "edge1.ams"
                }
            }
        }
    "#;

    #[test]
    fn parse_example() {
        let config: Config = EXAMPLE.parse().unwrap();
        assert_eq!(config.username(), Some("netops"));
        assert_eq!(config.password(), Some("secret"));
        assert_eq!(
            config.pa_space().cidrs(),
            vec![
                "192.0.2.0/24".parse::<IpNet>().unwrap(),
                "2001:db8::/32".parse().unwrap()
            ]
        );
        let names: Vec<_> = config.cities().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Amsterdam", "London"]);
    }

    #[test]
    fn city_defaults_and_normalisation() {
        let config: Config = EXAMPLE.parse().unwrap();
        let (_, ams) = config.cities().next().unwrap();
        assert_eq!(ams.country(), "NL");
        assert_eq!(ams.region(), "");
        assert_eq!(ams.community(), None);
        assert_eq!(ams.device(), Some("edge1.ams"));
        assert!(ams.overrides().is_empty());
        // host bits are truncated
        assert_eq!(
            ams.cidrs().cidrs(),
            vec!["203.0.113.0/24".parse::<IpNet>().unwrap()]
        );
        let (_, lon) = config.cities().nth(1).unwrap();
        // bare addresses are host networks
        assert_eq!(
            lon.overrides().cidrs(),
            vec!["192.0.2.10/32".parse::<IpNet>().unwrap()]
        );
    }

    #[test]
    fn invalid_network_is_rejected() {
        let json = r#"{"cities": {"X": {"country": "XX", "cidrs": ["not-a-network"]}}}"#;
        assert!(matches!(json.parse::<Config>(), Err(Error::ParseConfig(_))));
    }

    #[test]
    fn missing_cidrs_is_rejected() {
        let json = r#"{"cities": {"X": {"country": "XX"}}}"#;
        assert!(json.parse::<Config>().is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.cities().count(), 2);
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load(&dir.path().join("absent.json")),
            Err(Error::ReadConfig { .. })
        ));
    }
}
