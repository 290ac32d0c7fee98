use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bytes::{Buf, Bytes, BytesMut};
use memchr::memmem::Finder;
use russh::{
    client::{connect, Config, Handle},
    ChannelMsg, Disconnect,
};
use russh_keys::key::PublicKey;
use tokio::{net::ToSocketAddrs, sync::mpsc, task::JoinHandle};

use super::{RecvHandle, SendHandle, Transport};
use crate::{message::MARKER, Error};

/// SSH password credential.
///
/// The wrapped value is never printed by the [`Debug`][fmt::Debug] implementation.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(****)")
    }
}

/// NETCONF over SSH transport, using the `netconf` SSH subsystem.
#[derive(Debug)]
pub struct Ssh {
    _task: JoinHandle<Result<(), Error>>,
    in_queue: Receiver,
    out_queue: Sender,
}

impl Ssh {
    #[tracing::instrument(skip(password), level = "debug")]
    pub(crate) async fn connect<A>(
        addr: A,
        username: String,
        password: Password,
    ) -> Result<Self, Error>
    where
        A: ToSocketAddrs + fmt::Debug + Send,
    {
        tracing::info!("attempting to establish SSH session");
        let config = Arc::new(Config::default());
        let handler = Handler::new();
        let session = {
            let mut session = connect(config, addr, handler).await?;
            tracing::debug!("ssh session established");
            if !session
                .authenticate_password(username.clone(), password.into_inner())
                .await?
            {
                return Err(Error::Authentication(username));
            };
            tracing::debug!("ssh authentication successful");
            session
        };
        tracing::debug!("attempting to open ssh channel");
        let mut channel = session.channel_open_session().await?;
        tracing::debug!("requesting netconf ssh subsystem");
        channel.request_subsystem(true, "netconf").await?;
        tracing::info!("netconf ssh subsystem activated");
        let (out_queue_tx, out_queue_rx) = mpsc::channel::<Bytes>(32);
        let (in_queue_tx, in_queue_rx) = mpsc::channel(32);
        let task = tokio::spawn(run(session, channel, out_queue_rx, in_queue_tx));
        Ok(Self {
            _task: task,
            in_queue: Receiver { inner: in_queue_rx },
            out_queue: Sender {
                inner: out_queue_tx,
            },
        })
    }
}

#[tracing::instrument(skip_all, level = "debug")]
async fn run(
    session: Handle<Handler>,
    mut channel: russh::Channel<russh::client::Msg>,
    mut out_queue_rx: mpsc::Receiver<Bytes>,
    in_queue_tx: mpsc::Sender<Bytes>,
) -> Result<(), Error> {
    let mut in_buf = BytesMut::new();
    let message_break = Finder::new(MARKER);
    loop {
        tokio::select! {
            to_send = out_queue_rx.recv() => {
                let Some(data) = to_send else {
                    tracing::debug!("output queue closed");
                    break;
                };
                tracing::trace!(?data, "sending message");
                channel.data(data.as_ref()).await?;
            }
            msg = channel.wait() => {
                match msg {
                    Some(ChannelMsg::Data { data }) => {
                        tracing::trace!("got {} bytes on channel", data.len());
                        in_buf.extend_from_slice(&data);
                        for message in split_messages(&mut in_buf, &message_break) {
                            in_queue_tx.send(message).await?;
                        }
                    }
                    Some(ChannelMsg::Eof | ChannelMsg::Close) | None => {
                        tracing::debug!("channel closed by server");
                        break;
                    }
                    Some(msg) => tracing::trace!("ignoring msg {msg:?}"),
                }
            }
        }
    }
    if !in_buf.is_empty() {
        tracing::warn!("discarding {} bytes of incomplete message", in_buf.len());
    }
    session
        .disconnect(Disconnect::ByApplication, "", "en")
        .await?;
    Ok(())
}

/// Split every complete, marker-terminated message off the front of `buf`.
///
/// The marker is not included in the returned messages.
fn split_messages(buf: &mut BytesMut, message_break: &Finder<'_>) -> Vec<Bytes> {
    let mut messages = Vec::new();
    while let Some(index) = message_break.find(buf) {
        tracing::debug!("splitting {index} message bytes from input buffer");
        messages.push(buf.split_to(index).freeze());
        buf.advance(MARKER.len());
    }
    messages
}

impl Transport for Ssh {
    type SendHandle = Sender;
    type RecvHandle = Receiver;

    fn split(&mut self) -> (&mut Self::SendHandle, &mut Self::RecvHandle) {
        (&mut self.out_queue, &mut self.in_queue)
    }
}

#[derive(Debug)]
pub struct Sender {
    inner: mpsc::Sender<Bytes>,
}

#[async_trait]
impl SendHandle for Sender {
    #[tracing::instrument(skip(data), level = "trace")]
    async fn send(&mut self, data: Bytes) -> Result<(), Error> {
        Ok(self.inner.send(data).await?)
    }
}

#[derive(Debug)]
pub struct Receiver {
    inner: mpsc::Receiver<Bytes>,
}

#[async_trait]
impl RecvHandle for Receiver {
    #[tracing::instrument(level = "trace")]
    async fn recv(&mut self) -> Result<Bytes, Error> {
        self.inner
            .recv()
            .await
            .ok_or(Error::DequeueMessage("input message channel closed"))
    }
}

#[derive(Debug)]
struct Handler {}

impl Handler {
    const fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl russh::client::Handler for Handler {
    type Error = Error;

    // TODO: verify host keys against a known_hosts file
    #[tracing::instrument(skip_all)]
    async fn check_server_key(self, _: &PublicKey) -> Result<(Self, bool), Self::Error> {
        tracing::debug!("NOT checking server public key");
        Ok((self, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_single_message() {
        let mut buf = BytesMut::from(&b"<hello/>]]>]]>"[..]);
        let messages = split_messages(&mut buf, &Finder::new(MARKER));
        assert_eq!(messages, vec![Bytes::from_static(b"<hello/>")]);
        assert!(buf.is_empty());
    }

    #[test]
    fn split_keeps_partial_tail() {
        let mut buf = BytesMut::from(&b"<a/>]]>]]><b/>]]>]]><c>"[..]);
        let messages = split_messages(&mut buf, &Finder::new(MARKER));
        assert_eq!(
            messages,
            vec![Bytes::from_static(b"<a/>"), Bytes::from_static(b"<b/>")]
        );
        assert_eq!(&buf[..], b"<c>");
    }

    #[test]
    fn split_incomplete_marker() {
        let finder = Finder::new(MARKER);
        let mut buf = BytesMut::from(&b"<ok/>]]>]"[..]);
        assert!(split_messages(&mut buf, &finder).is_empty());
        buf.extend_from_slice(b"]>");
        assert_eq!(
            split_messages(&mut buf, &finder),
            vec![Bytes::from_static(b"<ok/>")]
        );
    }

    #[test]
    fn password_debug_is_redacted() {
        let password = Password::from("hunter2".to_string());
        assert_eq!(format!("{password:?}"), "Password(****)");
    }
}
