//! Decoding of Junos `<route-information>` replies.
//!
//! Junos versions the namespace of operational output, so elements are matched by local name
//! only.
use std::net::IpAddr;

use ipnet::IpNet;
use iplocbuild::{NextHop, Route};
use netconf::message::{skip_element, ReadError, ReadXml};
use quick_xml::{
    events::{BytesStart, Event},
    NsReader,
};

/// Routes decoded from a `<route-information>` element.
#[derive(Debug, Default)]
pub(crate) struct RouteInformation {
    routes: Vec<Route>,
}

impl RouteInformation {
    pub(crate) fn into_routes(self) -> Vec<Route> {
        self.routes
    }
}

impl ReadXml for RouteInformation {
    #[tracing::instrument(skip_all, fields(tag = ?start.local_name()), level = "debug")]
    fn read_xml(reader: &mut NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<Self, ReadError> {
        let end = start.to_end().into_owned();
        let mut routes = Vec::new();
        loop {
            match reader.read_event()? {
                // containers: descend without consuming their content
                Event::Start(tag)
                    if matches!(
                        tag.local_name().as_ref(),
                        b"route-information" | b"route-table"
                    ) =>
                {
                    tracing::trace!(?tag);
                }
                Event::Start(tag) if tag.local_name().as_ref() == b"rt" => {
                    if let Some(route) = read_rt(reader, &tag)? {
                        tracing::trace!(?route);
                        routes.push(route);
                    }
                }
                Event::Start(tag) => skip_element(reader, &tag)?,
                Event::End(tag) if tag == end => break,
                Event::Eof => {
                    tracing::error!("unexpected end of document");
                    return Err(ReadError::UnexpectedXmlEvent(Event::Eof));
                }
                _ => continue,
            }
        }
        tracing::debug!("decoded {} routes", routes.len());
        Ok(Self { routes })
    }
}

fn read_rt(reader: &mut NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<Option<Route>, ReadError> {
    let end = start.to_end().into_owned();
    let mut destination = None;
    let mut prefix_len = None;
    let mut entry = None;
    loop {
        match reader.read_event()? {
            Event::Start(tag) => match tag.local_name().as_ref() {
                b"rt-destination" if destination.is_none() => {
                    destination = Some(read_text(reader, &tag)?);
                }
                b"rt-prefix-length" if prefix_len.is_none() => {
                    prefix_len = Some(read_text(reader, &tag)?);
                }
                b"rt-entry" if entry.is_none() => entry = Some(read_entry(reader, &tag)?),
                _ => skip_element(reader, &tag)?,
            },
            Event::End(tag) if tag == end => break,
            Event::Eof => return Err(ReadError::UnexpectedXmlEvent(Event::Eof)),
            _ => continue,
        }
    }
    let Some(destination) = destination else {
        tracing::warn!("skipping route without destination");
        return Ok(None);
    };
    let prefix = match parse_prefix(&destination, prefix_len.as_deref()) {
        Some(prefix) => prefix,
        None => {
            tracing::warn!(
                "skipping route with invalid destination '{destination}' (prefix length {prefix_len:?})"
            );
            return Ok(None);
        }
    };
    Ok(Some(entry.unwrap_or_default().into_route(prefix)))
}

fn parse_prefix(destination: &str, prefix_len: Option<&str>) -> Option<IpNet> {
    if destination.contains('/') {
        return destination.parse().ok();
    }
    let addr = destination.parse::<IpAddr>().ok()?;
    let net = match prefix_len {
        Some(len) => IpNet::new(addr, len.parse().ok()?).ok()?,
        None => IpNet::from(addr),
    };
    Some(net.trunc())
}

/// Attributes of the first `<rt-entry>` of a route.
#[derive(Debug, Default)]
struct Entry {
    protocol: Option<String>,
    as_path: Option<String>,
    communities: Vec<String>,
    next_hops: Vec<NextHop>,
}

impl Entry {
    fn into_route(self, prefix: IpNet) -> Route {
        let mut route = Route::new(prefix);
        if let Some(protocol) = self.protocol {
            route = route.with_protocol(protocol);
        }
        if let Some(as_path) = self.as_path {
            route = route.with_as_path(as_path);
        }
        let route = self
            .communities
            .into_iter()
            .fold(route, Route::with_community);
        self.next_hops
            .into_iter()
            .fold(route, Route::with_next_hop)
    }
}

fn read_entry(reader: &mut NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<Entry, ReadError> {
    let end = start.to_end().into_owned();
    let mut entry = Entry::default();
    loop {
        match reader.read_event()? {
            Event::Start(tag) => match tag.local_name().as_ref() {
                b"protocol-name" => entry.protocol = Some(read_text(reader, &tag)?),
                b"as-path" => entry.as_path = Some(read_text(reader, &tag)?),
                b"communities" => {
                    let end = tag.to_end().into_owned();
                    loop {
                        match reader.read_event()? {
                            Event::Start(tag) if tag.local_name().as_ref() == b"community" => {
                                entry.communities.push(read_text(reader, &tag)?);
                            }
                            Event::Start(tag) => skip_element(reader, &tag)?,
                            Event::End(tag) if tag == end => break,
                            Event::Eof => return Err(ReadError::UnexpectedXmlEvent(Event::Eof)),
                            _ => continue,
                        }
                    }
                }
                b"nh" => entry.next_hops.push(read_next_hop(reader, &tag)?),
                _ => skip_element(reader, &tag)?,
            },
            Event::End(tag) if tag == end => break,
            Event::Eof => return Err(ReadError::UnexpectedXmlEvent(Event::Eof)),
            _ => continue,
        }
    }
    Ok(entry)
}

fn read_next_hop(
    reader: &mut NsReader<&[u8]>,
    start: &BytesStart<'_>,
) -> Result<NextHop, ReadError> {
    let end = start.to_end().into_owned();
    let (mut to, mut via) = (None, None);
    loop {
        match reader.read_event()? {
            Event::Start(tag) => match tag.local_name().as_ref() {
                b"to" => {
                    let text = read_text(reader, &tag)?;
                    to = text.parse().map_or_else(
                        |_| {
                            tracing::debug!("ignoring invalid next-hop address '{text}'");
                            None
                        },
                        Some,
                    );
                }
                b"via" => via = Some(read_text(reader, &tag)?),
                _ => skip_element(reader, &tag)?,
            },
            Event::End(tag) if tag == end => break,
            Event::Eof => return Err(ReadError::UnexpectedXmlEvent(Event::Eof)),
            _ => continue,
        }
    }
    Ok(NextHop::new(to, via))
}

fn read_text(reader: &mut NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<String, ReadError> {
    Ok(reader.read_text(start.to_end().name())?.trim().to_string())
}

#[cfg(test)]
mod tests {
    use iplocbuild::PathOrigin;

    use super::*;

    fn decode(xml: &str) -> Vec<Route> {
        let mut reader = NsReader::from_str(xml);
        _ = reader.trim_text(true);
        loop {
            match reader.read_event().unwrap() {
                Event::Start(tag) => {
                    break RouteInformation::read_xml(&mut reader, &tag)
                        .unwrap()
                        .into_routes();
                }
                Event::Eof => panic!("no start tag"),
                _ => continue,
            }
        }
    }

    const REPLY: &str = r#"
        <route-information xmlns="http://xml.juniper.net/junos/21.4R0/junos-routing">
            <route-table>
                <table-name>inet.0</table-name>
                <destination-count>912345</destination-count>
                <rt style="detail">
                    <rt-destination>192.0.2.0</rt-destination>
                    <rt-prefix-length>24</rt-prefix-length>
                    <rt-entry-count format="2 entries">2</rt-entry-count>
                    <rt-entry>
                        <active-tag>*</active-tag>
                        <protocol-name>BGP</protocol-name>
                        <preference>170</preference>
                        <nh>
                            <selected-next-hop/>
                            <to>198.51.100.1</to>
                            <via>ae0.0</via>
                        </nh>
                        <as-path>AS path: 64496 64511 I
</as-path>
                        <communities>
                            <community>65000:100</community>
                            <community>8220:65403</community>
                        </communities>
                    </rt-entry>
                    <rt-entry>
                        <protocol-name>BGP</protocol-name>
                        <as-path>AS path: I</as-path>
                    </rt-entry>
                </rt>
                <rt style="detail">
                    <rt-destination>2001:db8::/48</rt-destination>
                    <rt-entry>
                        <protocol-name>BGP</protocol-name>
                        <as-path>AS path: I</as-path>
                    </rt-entry>
                </rt>
                <rt style="detail">
                    <rt-destination>not-an-address</rt-destination>
                    <rt-prefix-length>24</rt-prefix-length>
                </rt>
                <rt style="detail">
                    <rt-destination>198.51.100.7</rt-destination>
                    <rt-prefix-length>32</rt-prefix-length>
                </rt>
            </route-table>
        </route-information>
    "#;

    #[test]
    fn decode_detail_output() {
        let routes = decode(REPLY);
        assert_eq!(routes.len(), 3);

        let first = &routes[0];
        assert_eq!(first.prefix(), "192.0.2.0/24".parse::<IpNet>().unwrap());
        assert_eq!(first.protocol(), Some("BGP"));
        assert_eq!(
            first.communities().collect::<Vec<_>>(),
            vec!["65000:100", "8220:65403"]
        );
        assert_eq!(
            first.as_path().unwrap().origin(),
            PathOrigin::External(64496)
        );
        let next_hop = first.next_hops().next().unwrap();
        assert_eq!(next_hop.to(), Some("198.51.100.1".parse().unwrap()));
        assert_eq!(next_hop.via(), Some("ae0.0"));

        assert_eq!(routes[1].prefix(), "2001:db8::/48".parse::<IpNet>().unwrap());
        assert_eq!(routes[1].as_path().unwrap().origin(), PathOrigin::Local);

        assert!(routes[2].is_host_route());
    }

    #[test]
    fn multiple_tables() {
        let xml = r"
            <route-information>
                <route-table>
                    <rt><rt-destination>192.0.2.0</rt-destination><rt-prefix-length>25</rt-prefix-length></rt>
                </route-table>
                <route-table>
                    <rt><rt-destination>2001:db8::</rt-destination><rt-prefix-length>32</rt-prefix-length></rt>
                </route-table>
            </route-information>
        ";
        let prefixes = decode(xml)
            .iter()
            .map(Route::prefix)
            .collect::<Vec<_>>();
        assert_eq!(
            prefixes,
            vec![
                "192.0.2.0/25".parse::<IpNet>().unwrap(),
                "2001:db8::/32".parse().unwrap()
            ]
        );
    }

    #[test]
    fn empty_reply() {
        assert!(decode("<route-information></route-information>").is_empty());
        assert!(decode("<route-information><route-table/></route-information>").is_empty());
    }

    #[test]
    fn prefix_forms() {
        assert_eq!(
            parse_prefix("192.0.2.1", Some("24")),
            Some("192.0.2.0/24".parse().unwrap())
        );
        assert_eq!(
            parse_prefix("192.0.2.1", None),
            Some("192.0.2.1/32".parse().unwrap())
        );
        assert_eq!(parse_prefix("192.0.2.0", Some("33")), None);
        assert_eq!(parse_prefix("192.0.2.0", Some("x")), None);
    }
}
