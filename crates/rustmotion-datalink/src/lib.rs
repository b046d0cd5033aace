pub mod address;
pub mod traits;
pub mod udp;

pub use address::{
    DataLinkAddress, MAX_DATAGRAM_LEN, MULTICAST_GROUP, MULTICAST_TTL, RECEIVE_PORT, SEND_PORT,
};
pub use traits::{DataLink, DataLinkError};
pub use udp::UdpTransport;
