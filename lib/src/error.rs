use std::path::PathBuf;

use ipnet::IpNet;

/// Error condition variants.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration file could not be read.
    #[error("failed to read configuration file '{}'", .path.display())]
    ReadConfig {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid.
    #[error("failed to parse configuration")]
    ParseConfig(#[from] serde_json::Error),
    /// A network could not be parsed from a string.
    #[error("invalid IP network '{0}'")]
    ParseNet(String),
    /// An AS path could not be parsed from route output.
    #[error("failed to parse AS path from '{0}'")]
    ParseAsPath(String),
    /// Base allocations of two or more cities overlap.
    #[error("overlapping base allocations: {}", display_nets(.0))]
    Overlap(Vec<IpNet>),
    /// A city name that is not present in the configuration was referenced.
    #[error("unknown city '{0}'")]
    UnknownCity(String),
    /// Writing an output file failed.
    #[error("failed to write output file '{}'", .path.display())]
    WriteOutput {
        /// Path to the output file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

fn display_nets(nets: &[IpNet]) -> String {
    nets.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    pub(crate) fn write_output<E>(path: PathBuf, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self::WriteOutput {
            path,
            source: source.into(),
        }
    }
}
