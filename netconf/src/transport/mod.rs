use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

use crate::Error;

#[cfg(feature = "ssh")]
mod ssh;
#[cfg(feature = "ssh")]
pub use self::ssh::{Password, Ssh};

/// A bidirectional, message-oriented channel to a NETCONF server.
///
/// Messages handed to the [`SendHandle`] must already be framed. Messages produced by the
/// [`RecvHandle`] have had the framing removed.
pub trait Transport: Send {
    type SendHandle: SendHandle;
    type RecvHandle: RecvHandle;

    fn split(&mut self) -> (&mut Self::SendHandle, &mut Self::RecvHandle);
}

#[async_trait]
pub trait SendHandle: Debug + Send {
    async fn send(&mut self, data: Bytes) -> Result<(), Error>;
}

#[async_trait]
pub trait RecvHandle: Debug + Send {
    async fn recv(&mut self) -> Result<Bytes, Error>;
}
