use std::{
    collections::{hash_map::Entry, HashMap},
    fmt::Debug,
    future::Future,
    mem,
};

#[cfg(feature = "ssh")]
use tokio::net::ToSocketAddrs;

use crate::{
    capabilities::{Base, Capabilities, Capability},
    message::{
        rpc::{
            self,
            operation::{Builder as _, CloseSession},
            Operation, ReplyData,
        },
        ClientHello, ClientMsg, ServerHello, ServerMsg,
    },
    transport::Transport,
    Error,
};

#[cfg(feature = "ssh")]
use crate::transport::{Password, Ssh};

/// An established NETCONF session over transport `T`.
#[derive(Debug)]
pub struct Session<T: Transport> {
    transport: T,
    context: Context,
    last_message_id: rpc::MessageId,
    requests: HashMap<rpc::MessageId, OutstandingRequest>,
}

/// Session state negotiated during the `<hello>` exchange.
#[derive(Debug, Clone)]
pub struct Context {
    session_id: usize,
    protocol_version: Base,
    client_capabilities: Capabilities,
    server_capabilities: Capabilities,
}

impl Context {
    pub(crate) const fn new(
        session_id: usize,
        protocol_version: Base,
        client_capabilities: Capabilities,
        server_capabilities: Capabilities,
    ) -> Self {
        Self {
            session_id,
            protocol_version,
            client_capabilities,
            server_capabilities,
        }
    }

    #[must_use]
    pub const fn session_id(&self) -> usize {
        self.session_id
    }

    #[must_use]
    pub const fn protocol_version(&self) -> Base {
        self.protocol_version
    }

    #[must_use]
    pub const fn client_capabilities(&self) -> &Capabilities {
        &self.client_capabilities
    }

    #[must_use]
    pub const fn server_capabilities(&self) -> &Capabilities {
        &self.server_capabilities
    }
}

#[derive(Debug)]
enum OutstandingRequest {
    Pending,
    Ready(rpc::PartialReply),
    Complete,
}

impl OutstandingRequest {
    #[tracing::instrument(level = "trace")]
    fn take(&mut self) -> Result<Option<rpc::PartialReply>, Error> {
        match mem::replace(self, Self::Complete) {
            mut pending @ Self::Pending => {
                mem::swap(self, &mut pending);
                Ok(None)
            }
            Self::Complete => Err(Error::RequestComplete),
            Self::Ready(reply) => Ok(Some(reply)),
        }
    }
}

#[cfg(feature = "ssh")]
impl Session<Ssh> {
    /// Connect to `addr` over SSH, authenticate with a password and exchange `<hello>` messages.
    #[tracing::instrument(skip(password), level = "debug")]
    pub async fn ssh<A>(addr: A, username: String, password: Password) -> Result<Self, Error>
    where
        A: ToSocketAddrs + Send + Debug,
    {
        tracing::info!("starting ssh transport");
        let transport = Ssh::connect(addr, username, password).await?;
        Self::new(transport).await
    }
}

impl<T: Transport> Session<T> {
    const CLIENT_CAPABILITIES: [Capability; 1] = [Capability::Base(Base::V1_0)];

    /// Exchange `<hello>` messages over an already connected `transport`.
    #[tracing::instrument(skip(transport), level = "debug")]
    pub async fn new(mut transport: T) -> Result<Self, Error> {
        let client_hello = ClientHello::new(&Self::CLIENT_CAPABILITIES);
        let (tx, rx) = transport.split();
        let ((), server_hello) = tokio::try_join!(client_hello.send(tx), ServerHello::recv(rx))?;
        let protocol_version = client_hello.common_version(&server_hello)?;
        let session_id = server_hello.session_id();
        tracing::info!(session_id, ?protocol_version, "netconf session established");
        let context = Context::new(
            session_id,
            protocol_version,
            client_hello.capabilities().clone(),
            server_hello.capabilities(),
        );
        Ok(Self {
            transport,
            context,
            last_message_id: rpc::MessageId::default(),
            requests: HashMap::default(),
        })
    }

    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    /// Build and send an rpc request.
    ///
    /// On success, the returned future resolves to the decoded reply once it is received.
    #[tracing::instrument(skip(self, build_fn), fields(operation = O::NAME), level = "debug")]
    pub async fn rpc<O, F>(
        &mut self,
        build_fn: F,
    ) -> Result<
        impl Future<Output = Result<<O::ReplyData as ReplyData>::Ok, Error>> + '_,
        Error,
    >
    where
        O: Operation,
        F: FnOnce(O::Builder<'_>) -> Result<O, Error> + Send,
    {
        let operation = O::new(&self.context, build_fn)?;
        let message_id = self.last_message_id.increment();
        let request = rpc::Request::new(message_id, operation);
        let (tx, rx) = self.transport.split();
        match self.requests.entry(message_id) {
            Entry::Occupied(_) => return Err(Error::MessageIdCollision(message_id)),
            Entry::Vacant(entry) => {
                request.send(tx).await?;
                _ = entry.insert(OutstandingRequest::Pending);
            }
        };
        let requests = &mut self.requests;
        let fut = async move {
            loop {
                if let Some(partial) = requests
                    .get_mut(&message_id)
                    .ok_or(Error::RequestNotFound(message_id))?
                    .take()?
                {
                    let reply: rpc::Reply<O> = partial.try_into()?;
                    break reply.into_result();
                };
                let reply = rpc::PartialReply::recv(rx).await?;
                match requests
                    .get_mut(&reply.message_id())
                    .ok_or_else(|| Error::RequestNotFound(reply.message_id()))?
                {
                    OutstandingRequest::Complete => break Err(Error::RequestComplete),
                    OutstandingRequest::Ready(_) => {
                        break Err(Error::MessageIdCollision(reply.message_id()))
                    }
                    pending @ OutstandingRequest::Pending => {
                        _ = mem::replace(pending, OutstandingRequest::Ready(reply));
                    }
                }
            }
        };
        Ok(fut)
    }

    /// Gracefully end the session with `<close-session>`.
    #[tracing::instrument(skip(self), fields(session_id = self.context.session_id), level = "debug")]
    pub async fn close(mut self) -> Result<(), Error> {
        self.rpc::<CloseSession, _>(|builder| builder.finish())
            .await?
            .await?;
        tracing::info!("netconf session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::transport::{RecvHandle, SendHandle};

    #[derive(Debug, Default)]
    struct Sent {
        inner: Vec<Bytes>,
    }

    #[async_trait]
    impl SendHandle for Sent {
        async fn send(&mut self, data: Bytes) -> Result<(), Error> {
            self.inner.push(data);
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct Canned {
        inner: VecDeque<Bytes>,
    }

    #[async_trait]
    impl RecvHandle for Canned {
        async fn recv(&mut self) -> Result<Bytes, Error> {
            self.inner
                .pop_front()
                .ok_or(Error::DequeueMessage("no more canned replies"))
        }
    }

    #[derive(Debug, Default)]
    struct Loopback {
        sent: Sent,
        canned: Canned,
    }

    impl Loopback {
        fn with_replies(replies: &[&'static str]) -> Self {
            Self {
                sent: Sent::default(),
                canned: Canned {
                    inner: replies.iter().map(|s| Bytes::from_static(s.as_bytes())).collect(),
                },
            }
        }
    }

    impl Transport for Loopback {
        type SendHandle = Sent;
        type RecvHandle = Canned;

        fn split(&mut self) -> (&mut Self::SendHandle, &mut Self::RecvHandle) {
            (&mut self.sent, &mut self.canned)
        }
    }

    const SERVER_HELLO: &str = r#"
        <hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
          <capabilities>
            <capability>urn:ietf:params:netconf:base:1.0</capability>
            <capability>http://xml.juniper.net/netconf/junos/1.0</capability>
          </capabilities>
          <session-id>4242</session-id>
        </hello>
    "#;

    const CLOSE_REPLY: &str = r#"
        <rpc-reply xmlns="urn:ietf:params:xml:ns:netconf:base:1.0" message-id="1">
          <ok/>
        </rpc-reply>
    "#;

    #[tokio::test]
    async fn hello_then_close() {
        let transport = Loopback::with_replies(&[SERVER_HELLO, CLOSE_REPLY]);
        let mut session = Session::new(transport).await.unwrap();
        assert_eq!(session.context().session_id(), 4242);
        assert_eq!(session.context().protocol_version(), Base::V1_0);
        assert!(session
            .context()
            .server_capabilities()
            .contains(&Capability::JunosXmlManagementProtocol));
        session
            .rpc::<CloseSession, _>(|builder| builder.finish())
            .await
            .unwrap()
            .await
            .unwrap();
        let sent = &session.transport.sent.inner;
        assert_eq!(sent.len(), 2);
        assert_eq!(
            &sent[1][..],
            &b"<rpc message-id=\"1\"><close-session/></rpc>]]>]]>"[..]
        );
    }

    #[tokio::test]
    async fn hello_without_common_version() {
        let hello = r#"
            <hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
              <capabilities>
                <capability>urn:ietf:params:netconf:base:1.1</capability>
              </capabilities>
              <session-id>1</session-id>
            </hello>
        "#;
        let transport = Loopback::with_replies(&[hello]);
        assert!(matches!(
            Session::new(transport).await,
            Err(Error::VersionNegotiation)
        ));
    }

    #[tokio::test]
    async fn reply_with_unknown_message_id() {
        let reply = r#"
            <rpc-reply xmlns="urn:ietf:params:xml:ns:netconf:base:1.0" message-id="9">
              <ok/>
            </rpc-reply>
        "#;
        let transport = Loopback::with_replies(&[SERVER_HELLO, reply]);
        let session = Session::new(transport).await.unwrap();
        assert!(matches!(
            session.close().await,
            Err(Error::RequestNotFound(_))
        ));
    }
}
