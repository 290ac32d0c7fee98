use std::fmt::Debug;

use crate::{capabilities::Requirements, message::WriteXml, session::Context, Error};

use super::ReplyData;

/// An RPC operation that can be sent to a NETCONF server.
pub trait Operation: Debug + WriteXml + Send + Sync + Sized {
    const NAME: &'static str;
    const REQUIRED_CAPABILITIES: Requirements;

    type Builder<'a>: Builder<'a, Self>;
    type ReplyData: ReplyData;

    /// Construct a new operation request, after checking that the server has advertised the
    /// capabilities required by the operation.
    fn new<'a, F>(ctx: &'a Context, build_fn: F) -> Result<Self, Error>
    where
        F: FnOnce(Self::Builder<'a>) -> Result<Self, Error>,
    {
        Self::REQUIRED_CAPABILITIES
            .check(ctx.server_capabilities())
            .then(|| Self::Builder::new(ctx).build(build_fn))
            .ok_or_else(|| Error::UnsupportedOperation(Self::NAME, Self::REQUIRED_CAPABILITIES))?
    }
}

pub trait Builder<'a, O: Operation>: Debug + Sized {
    fn new(ctx: &'a Context) -> Self;

    fn finish(self) -> Result<O, Error>;

    fn build<F>(self, build_fn: F) -> Result<O, Error>
    where
        F: FnOnce(Self) -> Result<O, Error>,
    {
        build_fn(self)
    }
}

pub(crate) mod close_session;
pub(crate) use self::close_session::CloseSession;

#[cfg(feature = "junos")]
pub mod junos;
