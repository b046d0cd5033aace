use rustmotion_core::{MessageId, MessageIdGenerator};
use rustmotion_datalink::DataLinkAddress;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Mutex, PoisonError};

/// Mutable per-client protocol state.
#[derive(Debug)]
pub(crate) struct Session {
    key: Option<String>,
    token: Mutex<Option<String>>,
    ids: Mutex<MessageIdGenerator>,
    gateway: Option<SocketAddr>,
    seen_gateway: Mutex<Option<IpAddr>>,
}

impl Session {
    pub(crate) fn new(key: Option<String>, token: Option<String>, gateway: Option<SocketAddr>) -> Self {
        Self {
            key,
            token: Mutex::new(token.filter(|t| !t.is_empty())),
            ids: Mutex::new(MessageIdGenerator::new()),
            gateway,
            seen_gateway: Mutex::new(None),
        }
    }

    pub(crate) fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub(crate) fn token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Adopts a token seen on the wire. Empty tokens are ignored.
    pub(crate) fn set_token(&self, token: &str) {
        if token.is_empty() {
            return;
        }
        let mut current = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_deref() != Some(token) {
            log::debug!("session token refreshed");
            *current = Some(token.to_string());
        }
    }

    pub(crate) fn next_message_id(&self) -> MessageId {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_id()
    }

    pub(crate) fn seen_gateway(&self) -> Option<IpAddr> {
        *self
            .seen_gateway
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn record_gateway(&self, ip: IpAddr) {
        let mut seen = self
            .seen_gateway
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *seen != Some(ip) {
            log::debug!("gateway seen at {ip}");
            *seen = Some(ip);
        }
    }

    /// Where commands go: the configured gateway, else the last address
    /// traffic came from, else the multicast group.
    pub(crate) fn destination(&self) -> DataLinkAddress {
        if let Some(addr) = self.gateway {
            return DataLinkAddress::Ip(addr);
        }
        match self.seen_gateway() {
            Some(ip) => DataLinkAddress::gateway(ip),
            None => DataLinkAddress::multicast(),
        }
    }
}
