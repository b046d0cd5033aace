use crate::RetryPolicy;
use rustmotion_datalink::SEND_PORT;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Settings for a [`GatewayClient`](crate::GatewayClient).
///
/// The defaults discover the gateway over multicast, bind an ephemeral
/// command port on all interfaces and listen for heartbeats and reports.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Gateway key used to derive write access tokens.
    pub key: Option<String>,
    /// Session token known from an earlier run or another client.
    pub token: Option<String>,
    /// Gateway command address; overrides multicast discovery.
    pub gateway: Option<SocketAddr>,
    pub bind_addr: SocketAddr,
    pub listen_broadcast: bool,
    pub multicast_interface: Ipv4Addr,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            key: None,
            token: None,
            gateway: None,
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            listen_broadcast: true,
            multicast_interface: Ipv4Addr::UNSPECIFIED,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sends commands to `ip` on the standard command port.
    pub fn with_gateway(self, ip: IpAddr) -> Self {
        self.with_gateway_addr(SocketAddr::new(ip, SEND_PORT))
    }

    pub fn with_gateway_addr(mut self, addr: SocketAddr) -> Self {
        self.gateway = Some(addr);
        self
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_broadcast_listener(mut self, enabled: bool) -> Self {
        self.listen_broadcast = enabled;
        self
    }

    pub fn with_multicast_interface(mut self, interface: Ipv4Addr) -> Self {
        self.multicast_interface = interface;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
