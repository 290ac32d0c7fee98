use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use futures::TryFutureExt;
use iplocbuild::Route;
use netconf::{
    message::rpc::operation::{junos::GetRouteInformation, Builder},
    transport::{Password, Ssh, Transport},
    Session,
};
use tokio::time::timeout;

use crate::{routes::RouteInformation, task::Collect};

/// A NETCONF session to a single device, with every exchange bounded by a timeout.
#[derive(Debug)]
pub(crate) struct Client<T: Transport> {
    session: Session<T>,
    timeout: Duration,
}

impl Client<Ssh> {
    #[tracing::instrument(skip(password), level = "debug")]
    pub(crate) async fn connect(
        host: &str,
        port: u16,
        username: &str,
        password: Password,
        timeout_after: Duration,
    ) -> anyhow::Result<Self> {
        tracing::debug!("trying to connect to NETCONF server at '{host}:{port}'");
        timeout(
            timeout_after,
            Session::ssh((host, port), username.to_string(), password),
        )
        .await
        .context("timed out establishing NETCONF session")?
        .context("failed to establish NETCONF session")
        .map(|session| Self::new(session, timeout_after))
    }
}

impl<T: Transport> Client<T> {
    pub(crate) const fn new(session: Session<T>, timeout: Duration) -> Self {
        Self { session, timeout }
    }

    #[tracing::instrument(skip(self), level = "debug")]
    pub(crate) async fn get_routes(
        &mut self,
        table: &str,
        communities: &[&str],
    ) -> anyhow::Result<Vec<Route>> {
        tracing::debug!("trying to fetch routes");
        let timeout_after = self.timeout;
        let future = self
            .session
            .rpc::<GetRouteInformation<RouteInformation>, _>(|builder| {
                builder
                    .table(table)
                    .protocol("bgp")
                    .communities(communities)
                    .finish()
            })
            .await
            .context("failed to send NETCONF '<get-route-information>' RPC request")?
            .map_err(|err| anyhow!(err).context("failed to get route information"));
        timeout(timeout_after, future)
            .await
            .context("timed out waiting for '<get-route-information>' reply")?
            .map(RouteInformation::into_routes)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    pub(crate) async fn close(self) -> anyhow::Result<()> {
        tracing::debug!("closing NETCONF session");
        timeout(self.timeout, self.session.close())
            .await
            .context("timed out closing NETCONF session")?
            .context("error while closing NETCONF session")
    }
}

/// Collects routes from devices over NETCONF, using a new session for every query.
#[derive(Debug, Clone)]
pub(crate) struct Netconf {
    port: u16,
    username: String,
    password: Password,
    timeout: Duration,
    table: String,
}

impl Netconf {
    pub(crate) const fn new(
        port: u16,
        username: String,
        password: Password,
        timeout: Duration,
        table: String,
    ) -> Self {
        Self {
            port,
            username,
            password,
            timeout,
            table,
        }
    }
}

#[async_trait]
impl Collect for Netconf {
    async fn collect(&self, device: &str, communities: &[&str]) -> anyhow::Result<Vec<Route>> {
        let mut client = Client::connect(
            device,
            self.port,
            &self.username,
            self.password.clone(),
            self.timeout,
        )
        .await?;
        let routes = client.get_routes(&self.table, communities).await?;
        if let Err(err) = client.close().await {
            tracing::warn!("{err:#}");
        }
        Ok(routes)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, net::IpAddr};

    use bytes::Bytes;
    use iplocbuild::NextHop;
    use ipnet::IpNet;
    use netconf::{
        transport::{RecvHandle, SendHandle},
        Error,
    };

    use super::*;

    #[derive(Debug)]
    struct Discard;

    #[async_trait]
    impl SendHandle for Discard {
        async fn send(&mut self, _: Bytes) -> Result<(), Error> {
            Ok(())
        }
    }

    /// Replays canned messages, then waits forever like a device that stopped answering.
    #[derive(Debug)]
    struct Canned {
        inner: VecDeque<Bytes>,
    }

    #[async_trait]
    impl RecvHandle for Canned {
        async fn recv(&mut self) -> Result<Bytes, Error> {
            match self.inner.pop_front() {
                Some(message) => Ok(message),
                None => std::future::pending().await,
            }
        }
    }

    #[derive(Debug)]
    struct Device {
        sent: Discard,
        canned: Canned,
    }

    impl Transport for Device {
        type SendHandle = Discard;
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
          <session-id>7</session-id>
        </hello>
    "#;

    const ROUTE_REPLY: &str = r#"
        <rpc-reply xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"
          xmlns:junos="http://xml.juniper.net/junos/21.4R0/junos" message-id="1">
          <route-information xmlns="http://xml.juniper.net/junos/21.4R0/junos-routing">
            <route-table>
              <table-name>inet.0</table-name>
              <rt junos:style="detail">
                <rt-destination>192.0.2.0</rt-destination>
                <rt-prefix-length>24</rt-prefix-length>
                <rt-entry>
                  <protocol-name>BGP</protocol-name>
                  <as-path>AS path: 64496 I</as-path>
                  <nh>
                    <to>198.51.100.1</to>
                  </nh>
                  <communities>
                    <community>65000:100</community>
                    <community>8220:65403</community>
                  </communities>
                </rt-entry>
              </rt>
            </route-table>
          </route-information>
        </rpc-reply>
    "#;

    async fn client(replies: &[&'static str], timeout: Duration) -> Client<Device> {
        let transport = Device {
            sent: Discard,
            canned: Canned {
                inner: replies
                    .iter()
                    .map(|s| Bytes::from_static(s.as_bytes()))
                    .collect(),
            },
        };
        let session = Session::new(transport).await.unwrap();
        Client::new(session, timeout)
    }

    #[tokio::test]
    async fn route_information_reply_is_decoded() {
        let mut client = client(&[SERVER_HELLO, ROUTE_REPLY], Duration::from_secs(5)).await;
        let routes = client
            .get_routes("inet.0", &["65000:100", "8220:65403"])
            .await
            .unwrap();
        assert_eq!(routes.len(), 1);
        let route = &routes[0];
        assert_eq!(route.prefix(), "192.0.2.0/24".parse::<IpNet>().unwrap());
        assert_eq!(route.as_path_text(), Some("AS path: 64496 I"));
        assert_eq!(route.protocol(), Some("BGP"));
        assert_eq!(
            route.communities().collect::<Vec<_>>(),
            vec!["65000:100", "8220:65403"]
        );
        assert_eq!(
            route.next_hops().filter_map(NextHop::to).collect::<Vec<_>>(),
            vec!["198.51.100.1".parse::<IpAddr>().unwrap()]
        );
    }

    #[tokio::test]
    async fn silent_device_times_out() {
        let mut client = client(&[SERVER_HELLO], Duration::from_millis(50)).await;
        let err = client
            .get_routes("inet.0", &["65000:100", "8220:65404"])
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("timed out"), "{err:#}");
    }

    #[tokio::test]
    async fn silent_device_times_out_on_close() {
        let client = client(&[SERVER_HELLO], Duration::from_millis(50)).await;
        let err = client.close().await.unwrap_err();
        assert!(format!("{err:#}").contains("timed out closing"), "{err:#}");
    }
}
