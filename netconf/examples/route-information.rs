use std::io::stderr;

use anyhow::{anyhow, Context};
use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use quick_xml::{
    events::{BytesStart, Event},
    NsReader,
};
use tracing_log::AsTrace;

use netconf::{
    message::{
        rpc::operation::{junos::GetRouteInformation, Builder},
        ReadError, ReadXml,
    },
    transport::Password,
    Session,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.verbosity.log_level_filter().as_trace())
        .with_writer(stderr)
        .try_init()
        .map_err(|err| anyhow!(err))?;
    let addr = (args.host.as_str(), args.port);
    let mut session = Session::ssh(addr, args.username, args.password)
        .await
        .context("failed to establish netconf session")?;
    println!("server capabilities:");
    session
        .context()
        .server_capabilities()
        .iter()
        .for_each(|capability| println!("    {capability}"));
    let destinations = session
        .rpc::<GetRouteInformation<Destinations>, _>(|builder| {
            builder
                .table(&args.table)
                .protocol("bgp")
                .communities(&args.communities)
                .finish()
        })
        .await?
        .await?;
    session.close().await?;
    destinations
        .inner
        .iter()
        .for_each(|destination| println!("{destination}"));
    Ok(())
}

/// The text of every `<rt-destination>` element in the reply.
#[derive(Debug)]
struct Destinations {
    inner: Vec<String>,
}

impl ReadXml for Destinations {
    fn read_xml(reader: &mut NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<Self, ReadError> {
        let end = start.to_end().into_owned();
        let mut inner = Vec::new();
        loop {
            match reader.read_event()? {
                Event::Start(tag) if tag.local_name().as_ref() == b"rt-destination" => {
                    inner.push(reader.read_text(tag.to_end().name())?.trim().to_string());
                }
                Event::End(tag) if tag == end => break,
                Event::Eof => return Err(ReadError::UnexpectedXmlEvent(Event::Eof)),
                _ => continue,
            }
        }
        Ok(Self { inner })
    }
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    host: String,

    #[arg(short, long, default_value_t = 22)]
    port: u16,

    #[arg(short, long, default_value = "test")]
    username: String,

    #[arg(short = 'P', long, default_value = "test123")]
    password: Password,

    #[arg(short, long, default_value = "inet.0")]
    table: String,

    /// Communities that matching routes must carry.
    #[arg(short, long = "community")]
    communities: Vec<String>,

    #[command(flatten)]
    verbosity: Verbosity<WarnLevel>,
}
