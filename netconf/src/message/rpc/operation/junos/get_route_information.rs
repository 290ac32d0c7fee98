use std::{fmt::Debug, io::Write, marker::PhantomData, sync::Arc};

use quick_xml::{events::BytesText, Writer};

use crate::{
    capabilities::{Capability, Requirements},
    message::{
        rpc::{operation, DataReply, Operation},
        ReadXml, WriteError, WriteXml,
    },
    session::Context,
    Error,
};

/// Request routing table entries from a Junos device.
///
/// This is the XML RPC equivalent of the `show route` CLI command.
/// Output is always requested at `detail` level, which carries the AS path, next-hops and
/// communities of each route. The reply content is decoded as `T`, which is expected to consume
/// the `<route-information>` element returned by the device.
///
/// See [Juniper documentation][junos-docs].
///
/// [junos-docs]: https://www.juniper.net/documentation/us/en/software/junos/rpc-reference/topics/ref/tag/get-route-information.html
#[derive(Debug, Clone)]
pub struct GetRouteInformation<T> {
    table: Option<Arc<str>>,
    protocol: Option<Arc<str>>,
    communities: Vec<Arc<str>>,
    _reply: PhantomData<fn() -> T>,
}

impl<T> Operation for GetRouteInformation<T>
where
    T: ReadXml + Debug + Send,
{
    const NAME: &'static str = "get-route-information";
    const REQUIRED_CAPABILITIES: Requirements =
        Requirements::One(Capability::JunosXmlManagementProtocol);
    type Builder<'a> = Builder<'a, T>;
    type ReplyData = DataReply<T>;
}

impl<T> WriteXml for GetRouteInformation<T>
where
    T: ReadXml + Debug + Send,
{
    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), WriteError> {
        _ = writer
            .create_element(Self::NAME)
            .write_inner_content(|writer| {
                _ = writer
                    .create_element("level")
                    .write_text_content(BytesText::new("detail"))?;
                if let Some(ref table) = self.table {
                    _ = writer
                        .create_element("table")
                        .write_text_content(BytesText::new(table))?;
                }
                if let Some(ref protocol) = self.protocol {
                    _ = writer
                        .create_element("protocol")
                        .write_text_content(BytesText::new(protocol))?;
                }
                self.communities.iter().try_for_each(|community| {
                    _ = writer
                        .create_element("community")
                        .write_text_content(BytesText::new(community))?;
                    Ok::<_, WriteError>(())
                })
            })?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
#[must_use]
pub struct Builder<'a, T> {
    _ctx: &'a Context,
    table: Option<Arc<str>>,
    protocol: Option<Arc<str>>,
    communities: Vec<Arc<str>>,
    _reply: PhantomData<fn() -> T>,
}

impl<T> Builder<'_, T> {
    pub fn table<S: AsRef<str>>(mut self, table: S) -> Self {
        self.table = Some(table.as_ref().into());
        self
    }

    pub fn protocol<S: AsRef<str>>(mut self, protocol: S) -> Self {
        self.protocol = Some(protocol.as_ref().into());
        self
    }

    /// Restrict the output to routes carrying `community`.
    ///
    /// May be called more than once, in which case routes must carry every given community.
    pub fn community<S: AsRef<str>>(mut self, community: S) -> Self {
        self.communities.push(community.as_ref().into());
        self
    }

    pub fn communities<I, S>(self, communities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        communities
            .into_iter()
            .fold(self, |builder, community| builder.community(community))
    }
}

impl<'a, T> operation::Builder<'a, GetRouteInformation<T>> for Builder<'a, T>
where
    T: ReadXml + Debug + Send,
{
    fn new(ctx: &'a Context) -> Self {
        Self {
            _ctx: ctx,
            table: None,
            protocol: None,
            communities: Vec::new(),
            _reply: PhantomData,
        }
    }

    fn finish(self) -> Result<GetRouteInformation<T>, Error> {
        if self.communities.iter().any(|community| community.is_empty()) {
            return Err(Error::missing_operation_parameter(
                GetRouteInformation::<T>::NAME,
                "community",
            ));
        }
        Ok(GetRouteInformation {
            table: self.table,
            protocol: self.protocol,
            communities: self.communities,
            _reply: PhantomData,
        })
    }
}
