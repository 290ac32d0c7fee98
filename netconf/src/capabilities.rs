use std::{
    collections::{BTreeSet, HashSet},
    fmt,
    io::Write,
};

use quick_xml::{
    events::{BytesStart, BytesText, Event},
    name::ResolveResult,
    NsReader, Writer,
};

use crate::{
    message::{xmlns, ReadError, ReadXml, WriteError, WriteXml},
    Error,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    inner: HashSet<Capability>,
}

impl Capabilities {
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.inner.iter()
    }

    #[tracing::instrument(ret, level = "debug")]
    pub fn contains(&self, elem: &Capability) -> bool {
        self.inner.contains(elem)
    }

    #[tracing::instrument(ret, level = "debug")]
    pub(crate) fn highest_common_version(&self, other: &Self) -> Result<Base, Error> {
        self.inner
            .intersection(&other.inner)
            .filter_map(|capability| {
                if let Capability::Base(base) = capability {
                    Some(*base)
                } else {
                    None
                }
            })
            .collect::<BTreeSet<_>>()
            .last()
            .ok_or_else(|| Error::VersionNegotiation)
            .copied()
    }
}

impl ReadXml for Capabilities {
    #[tracing::instrument(skip_all, level = "debug")]
    fn read_xml(reader: &mut NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<Self, ReadError> {
        let mut inner = HashSet::new();
        let end = start.to_end();
        loop {
            match reader.read_resolved_event()? {
                (ResolveResult::Bound(ns), Event::Start(tag))
                    if ns == xmlns::BASE && tag.local_name().as_ref() == b"capability" =>
                {
                    let span = reader.read_text(tag.to_end().name())?;
                    _ = inner.insert(Capability::from_uri(span.trim()));
                }
                (_, Event::Comment(_)) => continue,
                (_, Event::End(tag)) if tag == end => break,
                (ns, event) => {
                    tracing::error!(?event, ?ns, "unexpected xml event");
                    return Err(ReadError::UnexpectedXmlEvent(event.into_owned()));
                }
            }
        }
        Ok(Self { inner })
    }
}

impl WriteXml for Capabilities {
    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), WriteError> {
        _ = writer
            .create_element("capabilities")
            .write_inner_content(|writer| {
                self.inner
                    .iter()
                    .try_for_each(|capability| capability.write_xml(writer))
            })?;
        Ok(())
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Capability>,
    {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

mod uri {
    pub(super) const BASE_V1_0: &str = "urn:ietf:params:netconf:base:1.0";
    pub(super) const BASE_V1_1: &str = "urn:ietf:params:netconf:base:1.1";
    pub(super) const JUNOS_XML_MANAGEMENT_PROTOCOL: &str =
        "http://xml.juniper.net/netconf/junos/1.0";
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    Base(Base),
    JunosXmlManagementProtocol,
    Unknown(String),
}

impl Capability {
    #[tracing::instrument(level = "debug")]
    pub fn from_uri(uri: &str) -> Self {
        match uri {
            uri::BASE_V1_0 => Self::Base(Base::V1_0),
            uri::BASE_V1_1 => Self::Base(Base::V1_1),
            uri::JUNOS_XML_MANAGEMENT_PROTOCOL => Self::JunosXmlManagementProtocol,
            _ => Self::Unknown(uri.to_string()),
        }
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        match self {
            Self::Base(base) => base.uri(),
            Self::JunosXmlManagementProtocol => uri::JUNOS_XML_MANAGEMENT_PROTOCOL,
            Self::Unknown(uri) => uri.as_str(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

impl WriteXml for Capability {
    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), WriteError> {
        _ = writer
            .create_element("capability")
            .write_text_content(BytesText::new(self.uri()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Base {
    V1_0,
    V1_1,
}

impl Base {
    const fn uri(self) -> &'static str {
        match self {
            Self::V1_0 => uri::BASE_V1_0,
            Self::V1_1 => uri::BASE_V1_1,
        }
    }
}

/// Capabilities that the server must advertise before an operation may be requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirements {
    None,
    One(Capability),
}

impl Requirements {
    #[tracing::instrument(ret, level = "debug")]
    pub fn check(&self, capabilities: &Capabilities) -> bool {
        match self {
            Self::None => true,
            Self::One(capability) => capabilities.contains(capability),
        }
    }
}

impl fmt::Display for Requirements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("no capabilities"),
            Self::One(capability) => write!(f, "capability '{capability}'"),
        }
    }
}
