use std::io::Write;

use quick_xml::{
    events::{BytesStart, Event},
    name::{Namespace, ResolveResult},
    NsReader, Writer,
};

use crate::{
    capabilities::{Base, Capabilities, Capability},
    Error,
};

use super::{xmlns, ClientMsg, ReadError, ReadXml, ServerMsg, WriteError, WriteXml};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServerHello {
    capabilities: Capabilities,
    session_id: usize,
}

impl ServerHello {
    pub(crate) const fn session_id(&self) -> usize {
        self.session_id
    }

    pub(crate) fn capabilities(self) -> Capabilities {
        self.capabilities
    }
}

impl ReadXml for ServerHello {
    #[tracing::instrument(skip_all, level = "debug")]
    fn read_xml(reader: &mut NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<Self, ReadError> {
        let end = start.to_end();
        let (mut capabilities, mut session_id) = (None, None);
        tracing::debug!("expecting <capabilities> or <session-id>");
        loop {
            match reader.read_resolved_event()? {
                (ResolveResult::Bound(ns), Event::Start(tag))
                    if ns == xmlns::BASE
                        && tag.local_name().as_ref() == b"capabilities"
                        && capabilities.is_none() =>
                {
                    tracing::debug!(?tag);
                    capabilities = Some(Capabilities::read_xml(reader, &tag)?);
                }
                (ResolveResult::Bound(ns), Event::Start(tag))
                    if ns == xmlns::BASE
                        && tag.local_name().as_ref() == b"session-id"
                        && session_id.is_none() =>
                {
                    tracing::debug!(?tag);
                    session_id = Some(
                        reader
                            .read_text(tag.to_end().name())?
                            .trim()
                            .parse()
                            .map_err(ReadError::SessionIdParse)?,
                    );
                }
                (_, Event::Comment(_)) => continue,
                (_, Event::End(tag)) if tag == end => break,
                (ns, event) => {
                    tracing::error!(?event, ?ns, "unexpected xml event");
                    return Err(ReadError::UnexpectedXmlEvent(event.into_owned()));
                }
            }
        }
        Ok(Self {
            capabilities: capabilities
                .ok_or_else(|| ReadError::missing_element("hello", "capabilities"))?,
            session_id: session_id
                .ok_or_else(|| ReadError::missing_element("hello", "session-id"))?,
        })
    }
}

impl ServerMsg for ServerHello {
    const TAG_NS: Namespace<'static> = xmlns::BASE;
    const TAG_NAME: &'static str = "hello";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClientHello {
    capabilities: Capabilities,
}

impl ClientHello {
    pub(crate) fn new(capabilities: &[Capability]) -> Self {
        Self {
            capabilities: capabilities.iter().cloned().collect(),
        }
    }

    pub(crate) const fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    #[tracing::instrument(skip_all, ret, level = "debug")]
    pub(crate) fn common_version(&self, server_hello: &ServerHello) -> Result<Base, Error> {
        self.capabilities
            .highest_common_version(&server_hello.capabilities)
    }
}

impl WriteXml for ClientHello {
    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), WriteError> {
        _ = writer
            .create_element("hello")
            .with_attribute(("xmlns", "urn:ietf:params:xml:ns:netconf:base:1.0"))
            .write_inner_content(|writer| self.capabilities.write_xml(writer))?;
        Ok(())
    }
}

impl ClientMsg for ClientHello {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_hello_from_xml() {
        let xml = r#"
            <!-- No zombies were killed during the creation of this user interface -->
            <!-- user netops, class j-read-only -->
            <hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
              <capabilities>
                <capability>urn:ietf:params:netconf:base:1.0</capability>
                <capability>urn:ietf:params:netconf:capability:candidate:1.0</capability>
                <capability>urn:ietf:params:netconf:capability:validate:1.0</capability>
                <capability>urn:ietf:params:xml:ns:netconf:base:1.0</capability>
                <capability>http://xml.juniper.net/netconf/junos/1.0</capability>
                <capability>http://xml.juniper.net/dmi/system/1.0</capability>
              </capabilities>
              <session-id>802</session-id>
            </hello>
            ]]>]]>
        "#;
        let expect = ServerHello {
            capabilities: [
                Capability::Base(Base::V1_0),
                Capability::Unknown(
                    "urn:ietf:params:netconf:capability:candidate:1.0".to_string(),
                ),
                Capability::Unknown(
                    "urn:ietf:params:netconf:capability:validate:1.0".to_string(),
                ),
                Capability::Unknown("urn:ietf:params:xml:ns:netconf:base:1.0".to_string()),
                Capability::JunosXmlManagementProtocol,
                Capability::Unknown("http://xml.juniper.net/dmi/system/1.0".to_string()),
            ]
            .into_iter()
            .collect(),
            session_id: 802,
        };
        assert_eq!(expect, ServerHello::from_xml(xml).unwrap());
    }

    #[test]
    fn server_hello_without_session_id() {
        let xml = r#"
            <hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
              <capabilities>
                <capability>urn:ietf:params:netconf:base:1.0</capability>
              </capabilities>
            </hello>
        "#;
        assert!(matches!(
            ServerHello::from_xml(xml),
            Err(ReadError::MissingElement {
                msg_type: "hello",
                element: "session-id"
            })
        ));
    }

    #[test]
    fn client_hello_to_xml() {
        let req = ClientHello::new(&[Capability::Base(Base::V1_0)]);
        let expect = "<hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\"><capabilities><capability>urn:ietf:params:netconf:base:1.0</capability></capabilities></hello>]]>]]>";
        assert_eq!(req.to_xml().unwrap(), expect);
    }

    #[test]
    fn negotiate_base_version() {
        let client = ClientHello::new(&[Capability::Base(Base::V1_0)]);
        let server = ServerHello {
            capabilities: [
                Capability::Base(Base::V1_0),
                Capability::JunosXmlManagementProtocol,
            ]
            .into_iter()
            .collect(),
            session_id: 1,
        };
        assert_eq!(client.common_version(&server).unwrap(), Base::V1_0);
    }
}
