use std::{fmt::Debug, io::Write, str::from_utf8};

use async_trait::async_trait;
use quick_xml::{
    events::{BytesStart, Event},
    name::{Namespace, ResolveResult},
    NsReader, Writer,
};

use crate::{
    transport::{RecvHandle, SendHandle},
    Error,
};

mod error;
pub use self::error::{Read as ReadError, Write as WriteError};

mod hello;
pub(crate) use self::hello::{ClientHello, ServerHello};

pub mod rpc;

/// NETCONF base:1.0 end-of-message marker.
pub(crate) const MARKER: &[u8] = b"]]>]]>";

pub(crate) mod xmlns {
    use quick_xml::name::Namespace;

    pub(crate) const BASE: Namespace<'_> = Namespace(b"urn:ietf:params:xml:ns:netconf:base:1.0");
}

/// Types that can be decoded from the content of an XML element, given its start tag.
pub trait ReadXml: Sized {
    fn read_xml(reader: &mut NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<Self, ReadError>;
}

/// Types that can be encoded as XML.
pub trait WriteXml {
    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), WriteError>;
}

#[async_trait]
pub(crate) trait ClientMsg: WriteXml + Debug + Send + Sync {
    fn to_xml(&self) -> Result<String, WriteError> {
        let mut buf = Vec::new();
        {
            let mut writer = Writer::new(&mut buf);
            self.write_xml(&mut writer)?;
        }
        buf.extend_from_slice(MARKER);
        Ok(String::from_utf8(buf)?)
    }

    #[tracing::instrument(skip(self, sender), level = "debug")]
    async fn send<T: SendHandle>(&self, sender: &mut T) -> Result<(), Error> {
        let serialized = self.to_xml()?;
        tracing::trace!(%serialized);
        sender.send(serialized.into()).await
    }
}

#[async_trait]
pub(crate) trait ServerMsg: ReadXml + Debug + Send {
    const TAG_NS: Namespace<'static>;
    const TAG_NAME: &'static str;

    #[tracing::instrument(skip(input), level = "debug")]
    fn from_xml<S>(input: S) -> Result<Self, ReadError>
    where
        S: AsRef<str> + Debug,
    {
        let mut reader = NsReader::from_str(input.as_ref());
        _ = reader.trim_text(true);
        let mut this = None;
        tracing::debug!("expecting <{}>", Self::TAG_NAME);
        loop {
            match reader.read_resolved_event()? {
                (ResolveResult::Bound(ns), Event::Start(tag))
                    if ns == Self::TAG_NS
                        && tag.local_name().as_ref() == Self::TAG_NAME.as_bytes()
                        && this.is_none() =>
                {
                    this = Some(Self::read_xml(&mut reader, &tag)?);
                }
                (_, Event::Decl(_) | Event::Comment(_) | Event::PI(_)) => continue,
                (_, Event::Eof) => break,
                (_, Event::Text(txt)) if &*txt == MARKER => break,
                (ns, event) => {
                    tracing::error!(?event, ?ns, "unexpected xml event");
                    return Err(ReadError::UnexpectedXmlEvent(event.into_owned()));
                }
            }
        }
        this.ok_or_else(|| ReadError::missing_element("message", Self::TAG_NAME))
    }

    #[tracing::instrument(skip(receiver), level = "debug")]
    async fn recv<T: RecvHandle>(receiver: &mut T) -> Result<Self, Error> {
        let bytes = receiver.recv().await?;
        let serialized = from_utf8(&bytes).map_err(ReadError::from)?;
        tracing::trace!(%serialized);
        Ok(Self::from_xml(serialized)?)
    }
}

/// Skip over an element whose start tag has already been consumed.
pub fn skip_element(
    reader: &mut NsReader<&[u8]>,
    start: &BytesStart<'_>,
) -> Result<(), ReadError> {
    tracing::trace!(tag = ?start.local_name(), "skipping element");
    _ = reader.read_to_end(start.to_end().name())?;
    Ok(())
}
