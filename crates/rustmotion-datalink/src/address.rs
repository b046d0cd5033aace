use core::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Multicast group gateways listen on and announce to.
pub const MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(238, 0, 0, 18);
/// Port gateways accept commands on.
pub const SEND_PORT: u16 = 32100;
/// Port gateways multicast heartbeats and reports to.
pub const RECEIVE_PORT: u16 = 32101;
pub const MULTICAST_TTL: u32 = 128;
pub const MAX_DATAGRAM_LEN: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataLinkAddress {
    Ip(SocketAddr),
}

impl DataLinkAddress {
    /// The multicast group on the command port, used until a gateway is known.
    pub fn multicast() -> Self {
        Self::Ip(SocketAddr::new(IpAddr::V4(MULTICAST_GROUP), SEND_PORT))
    }

    /// A gateway's unicast command address.
    pub fn gateway(addr: IpAddr) -> Self {
        Self::Ip(SocketAddr::new(addr, SEND_PORT))
    }

    pub fn as_socket_addr(self) -> SocketAddr {
        match self {
            Self::Ip(addr) => addr,
        }
    }

    pub fn ip(self) -> IpAddr {
        self.as_socket_addr().ip()
    }

    pub fn is_multicast(self) -> bool {
        self.ip().is_multicast()
    }
}

impl fmt::Display for DataLinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip(addr) => write!(f, "{addr}"),
        }
    }
}
