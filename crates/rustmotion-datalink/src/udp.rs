use crate::{DataLink, DataLinkAddress, DataLinkError, MAX_DATAGRAM_LEN, MULTICAST_TTL};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use tokio::net::UdpSocket;

/// A UDP socket configured for gateway traffic.
///
/// Two flavours exist: the command socket ([`bind_command`](Self::bind_command))
/// sends requests and receives their replies; the broadcast socket
/// ([`bind_broadcast`](Self::bind_broadcast)) sits on the multicast group and
/// receives heartbeats and reports. Both must be created inside a Tokio
/// runtime.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    /// Binds a command socket. Address reuse is enabled so several clients
    /// can share a host.
    pub async fn bind_command(bind_addr: SocketAddr) -> Result<Self, DataLinkError> {
        let socket = Socket::new(Domain::for_address(bind_addr), Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_broadcast(true)?;
        if bind_addr.is_ipv4() {
            socket.set_multicast_ttl_v4(MULTICAST_TTL)?;
            socket.set_multicast_loop_v4(true)?;
        }
        Self::finish(socket, bind_addr)
    }

    /// Binds the multicast listener on `port` and joins `group` on
    /// `interface` (`0.0.0.0` lets the OS choose).
    pub async fn bind_broadcast(
        group: Ipv4Addr,
        port: u16,
        interface: Ipv4Addr,
    ) -> Result<Self, DataLinkError> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
        socket.set_reuse_port(true)?;
        socket.set_broadcast(true)?;
        socket.set_multicast_ttl_v4(MULTICAST_TTL)?;
        let transport = Self::finish(
            socket,
            SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port)),
        )?;
        transport.socket.join_multicast_v4(group, interface)?;
        log::debug!("joined multicast group {group} on port {port}");
        Ok(transport)
    }

    fn finish(socket: Socket, bind_addr: SocketAddr) -> Result<Self, DataLinkError> {
        socket.set_nonblocking(true)?;
        socket.bind(&bind_addr.into())?;
        let socket = UdpSocket::from_std(socket.into())?;
        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DataLinkError> {
        self.socket.local_addr().map_err(DataLinkError::Io)
    }
}

impl DataLink for UdpTransport {
    async fn send(&self, address: DataLinkAddress, payload: &[u8]) -> Result<(), DataLinkError> {
        if payload.len() > MAX_DATAGRAM_LEN {
            return Err(DataLinkError::FrameTooLarge);
        }
        log::trace!("tx {} bytes to {address}", payload.len());
        self.socket
            .send_to(payload, address.as_socket_addr())
            .await?;
        Ok(())
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, DataLinkAddress), DataLinkError> {
        let (n, src) = self.socket.recv_from(buf).await?;
        log::trace!("rx {n} bytes from {src}");
        Ok((n, DataLinkAddress::Ip(src)))
    }
}
