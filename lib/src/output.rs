//! Geolocation feed output files.
//!
//! Four files are written, named after a common base path `B`:
//!
//! | File             | Contents                                                     |
//! |------------------|--------------------------------------------------------------|
//! | `B.csv`          | Geofeed of every city's allocation                           |
//! | `B_pi.csv`       | Geofeed of every city's allocation and provider independent space |
//! | `B.json`         | Per-city summary                                             |
//! | `B_country.json` | Per-country summary                                          |
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use ipnet::IpNet;
use serde::Serialize;

use crate::{location::CityReport, AddrSet, Error, Report};

/// Paths of the output files derived from a base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Allocation geofeed.
    pub csv: PathBuf,
    /// Allocation and provider independent geofeed.
    pub pi_csv: PathBuf,
    /// Per-city summary.
    pub json: PathBuf,
    /// Per-country summary.
    pub country_json: PathBuf,
}

impl Paths {
    /// Derive output paths by appending suffixes to `base`.
    #[must_use]
    pub fn new(base: &Path) -> Self {
        let with_suffix = |suffix: &str| {
            let mut path = base.as_os_str().to_os_string();
            path.push(suffix);
            PathBuf::from(path)
        };
        Self {
            csv: with_suffix(".csv"),
            pi_csv: with_suffix("_pi.csv"),
            json: with_suffix(".json"),
            country_json: with_suffix("_country.json"),
        }
    }
}

/// Write every output file for `report`, using `base` as the common path prefix.
///
/// # Errors
///
/// An error is returned if any file cannot be created or written.
#[tracing::instrument(skip(report), level = "debug")]
pub fn write_all(report: &Report, base: &Path) -> Result<Paths, Error> {
    let paths = Paths::new(base);
    write_file(&paths.csv, |w| write_geofeed(report, false, w))?;
    write_file(&paths.pi_csv, |w| write_geofeed(report, true, w))?;
    write_file(&paths.json, |w| write_cities(report, w))?;
    write_file(&paths.country_json, |w| write_countries(report, w))?;
    Ok(paths)
}

fn write_file<F>(path: &Path, f: F) -> Result<(), Error>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), Box<dyn std::error::Error + Send + Sync>>,
{
    let file = File::create(path).map_err(|err| Error::write_output(path.to_path_buf(), err))?;
    let mut writer = BufWriter::new(file);
    f(&mut writer)
        .and_then(|()| writer.flush().map_err(Into::into))
        .map_err(|err| Error::write_output(path.to_path_buf(), err))?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}

/// Write an RFC 8805 style geofeed.
///
/// Each row has the form `prefix,country,region,city,` with an empty postal code. If `with_pi`
/// is set, provider independent space is included alongside each city's allocation.
///
/// # Errors
///
/// An error is returned if writing to `writer` fails.
pub fn write_geofeed<W: Write>(
    report: &Report,
    with_pi: bool,
    writer: W,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    for (name, city) in report.cities() {
        let cidrs = if with_pi {
            city.cidrs() | city.pi_cidrs()
        } else {
            city.cidrs().clone()
        };
        for cidr in cidrs.iter() {
            csv.write_record([
                cidr.to_string().as_str(),
                city.country(),
                city.region(),
                name,
                "",
            ])?;
        }
    }
    csv.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct CityEntry<'a> {
    cidrs: Vec<IpNet>,
    country: &'a str,
    #[serde(rename = "piCidrs")]
    pi_cidrs: Vec<IpNet>,
    region: &'a str,
}

impl<'a> From<&'a CityReport> for CityEntry<'a> {
    fn from(city: &'a CityReport) -> Self {
        Self {
            cidrs: city.cidrs().cidrs(),
            country: city.country(),
            pi_cidrs: city.pi_cidrs().cidrs(),
            region: city.region(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CountryEntry {
    cidrs: Vec<IpNet>,
    #[serde(rename = "piCidrs")]
    pi_cidrs: Vec<IpNet>,
}

/// Write the per-city summary as JSON.
///
/// # Errors
///
/// An error is returned if writing to `writer` fails.
pub fn write_cities<W: Write>(
    report: &Report,
    writer: W,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cities = report
        .cities()
        .map(|(name, city)| (name, CityEntry::from(city)))
        .collect::<BTreeMap<_, _>>();
    write_json(&cities, writer)
}

/// Write the per-country summary as JSON.
///
/// # Errors
///
/// An error is returned if writing to `writer` fails.
pub fn write_countries<W: Write>(
    report: &Report,
    writer: W,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cidrs = |set: &AddrSet| set.cidrs();
    let countries = report
        .countries()
        .into_iter()
        .map(|(code, country)| {
            let entry = CountryEntry {
                cidrs: cidrs(country.cidrs()),
                pi_cidrs: cidrs(country.pi_cidrs()),
            };
            (code, entry)
        })
        .collect::<BTreeMap<_, _>>();
    write_json(&countries, writer)
}

fn write_json<T: Serialize, W: Write>(
    value: &T,
    writer: W,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(writer, formatter);
    value.serialize(&mut ser)?;
    Ok(())
}
