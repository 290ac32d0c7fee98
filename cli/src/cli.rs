use std::{
    fmt,
    fs::File,
    io::stderr,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{anyhow, Context};
use clap::{Args, Parser};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use iplocbuild::{output, Config};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_log::AsTrace;

use crate::{
    device::Netconf,
    task::{Communities, Job},
};

/// Entry-point function for `iplocbuild`.
#[allow(clippy::missing_errors_doc)]
pub async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let _guard = args.logging.init()?;
    run(args).await.map_err(|err| {
        tracing::error!("{err:#}");
        err
    })
}

async fn run(args: Cli) -> anyhow::Result<()> {
    let config_path = args.config_path()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load configuration from '{}'", config_path.display()))?;
    let username = args
        .device
        .username
        .or_else(|| config.username().map(ToString::to_string))
        .context("no username given on the command line or in the configuration file")?;
    let password = args
        .device
        .password
        .or_else(|| config.password().map(ToString::to_string))
        .context("no password given on the command line or in the configuration file")?;
    let collector = Netconf::new(
        args.device.port,
        username,
        password.into(),
        Duration::from_secs(args.device.timeout),
        args.query.table,
    );
    let communities = Communities {
        pa: args.query.pa_community,
        pi: args.query.pi_community,
    };
    let report = Job::new(collector, communities).run(&config).await?;
    let paths = output::write_all(&report, &args.outfile)
        .with_context(|| format!("failed to write output files '{}.*'", args.outfile.display()))?;
    tracing::info!(?paths, "output files written");
    Ok(())
}

/// Build IP geolocation feeds from BGP routes learned by network devices.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the allocation plan. Defaults to `$HOME/.cfg/iplocbuild.json`.
    #[arg(short, long = "config")]
    config: Option<PathBuf>,

    /// Base name of the output files.
    #[arg(short, long, default_value = "iplocdata")]
    outfile: PathBuf,

    #[command(flatten, next_help_heading = "Device options")]
    device: DeviceOpts,

    #[command(flatten, next_help_heading = "Query options")]
    query: QueryOpts,

    #[command(flatten, next_help_heading = "Logging options")]
    logging: LoggingOpts,
}

impl Cli {
    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => dirs::home_dir()
                .map(|home| default_config_path(&home))
                .ok_or_else(|| anyhow!("failed to determine home directory, use '--config'")),
        }
    }
}

fn default_config_path(home: &Path) -> PathBuf {
    home.join(".cfg").join("iplocbuild.json")
}

#[derive(Debug, Args)]
struct DeviceOpts {
    /// Authentication username. Overrides the configuration file.
    #[arg(short = 'u', long)]
    username: Option<String>,

    /// Authentication password. Overrides the configuration file.
    #[arg(short = 'p', long)]
    password: Option<String>,

    /// NETCONF SSH port.
    #[arg(short = 'P', long, default_value_t = 22)]
    port: u16,

    /// Timeout, in seconds, for each NETCONF exchange.
    #[arg(short = 't', long, default_value_t = 60)]
    timeout: u64,
}

#[derive(Debug, Args)]
struct QueryOpts {
    /// Routing table to query.
    #[arg(long, default_value = "inet.0")]
    table: String,

    /// Community marking provider aggregate space.
    #[arg(long, default_value = "8220:65404")]
    pa_community: String,

    /// Community marking provider independent space.
    #[arg(long, default_value = "8220:65403")]
    pi_community: String,
}

#[derive(Debug, Args)]
struct LoggingOpts {
    /// Logging output destination
    #[arg(short = 'l', long, default_value = "STDERR")]
    logging_dest: LoggingDest,

    #[command(flatten)]
    verbosity: Verbosity<WarnLevel>,
}

impl LoggingOpts {
    fn init(&self) -> anyhow::Result<WorkerGuard> {
        let level = self.verbosity.log_level_filter().as_trace();
        let (writer, guard, ansi) = match &self.logging_dest {
            LoggingDest::File(path) => {
                let file = File::options()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("failed to open log file '{}'", path.display()))?;
                let (writer, guard) = tracing_appender::non_blocking(file);
                (writer, guard, false)
            }
            LoggingDest::StdErr => {
                let (writer, guard) = tracing_appender::non_blocking(stderr());
                (writer, guard, true)
            }
        };
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(writer)
            .with_ansi(ansi)
            .try_init()
            .map_err(|err| anyhow!(err))
            .context("failed to initialize logger")?;
        Ok(guard)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LoggingDest {
    StdErr,
    File(PathBuf),
}

impl fmt::Display for LoggingDest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StdErr => write!(f, "STDERR"),
            Self::File(path) => path.to_string_lossy().fmt(f),
        }
    }
}

impl FromStr for LoggingDest {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "STDERR" {
            Ok(Self::StdErr)
        } else {
            Ok(Self::File(s.into()))
        }
    }
}
