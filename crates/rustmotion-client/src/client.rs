use crate::correlator::{Correlator, Reply};
use crate::error::duplicate;
use crate::events::Subscribers;
use crate::session::Session;
use crate::{AuthError, ClientConfig, ClientError, Notification, RetryPolicy, Subscription};
use futures_util::future::try_join_all;
use rustmotion_core::message::{
    Acknowledgement, GetDeviceListAck, Heartbeat, ReadDeviceAck, Report, Request,
    UnsolicitedEvent, WriteDeviceAck, WriteDeviceData,
};
use rustmotion_core::types::DeviceType;
use rustmotion_core::{access_token, decode_datagram, Inbound, MessageType, WaitHandle};
use rustmotion_datalink::{
    DataLink, DataLinkAddress, DataLinkError, UdpTransport, MAX_DATAGRAM_LEN, MULTICAST_GROUP,
    RECEIVE_PORT,
};
use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

const RECEIVE_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct Shared {
    correlator: Correlator,
    session: Session,
    heartbeats: Subscribers<Notification<Heartbeat>>,
    reports: Subscribers<Notification<Report>>,
    errors: Subscribers<Arc<ClientError>>,
}

impl Shared {
    fn dispatch(&self, frame: &[u8], source: DataLinkAddress) {
        let source = source.as_socket_addr();
        let inbound = match decode_datagram(frame) {
            Ok(inbound) => inbound,
            Err(err) => {
                log::debug!("dropping datagram from {source}: {err}");
                self.errors.publish(Arc::new(ClientError::Decode(err)));
                return;
            }
        };
        log::trace!("{} from {source}", inbound.msg_type());

        if let Some(token) = inbound.session_token() {
            self.session.set_token(token);
        }
        self.session.record_gateway(source.ip());

        match inbound {
            Inbound::Ack(ack) => {
                if let Err(ack) = self.correlator.resolve(ack) {
                    log::debug!("no request waiting for {}", ack.wait_handle());
                }
            }
            Inbound::Event(UnsolicitedEvent::Heartbeat(message)) => {
                self.heartbeats.publish(Notification { source, message });
            }
            Inbound::Event(UnsolicitedEvent::Report(message)) => {
                self.reports.publish(Notification { source, message });
            }
        }
    }

    /// Requests are only in flight on the command link, so only its
    /// failures reject them.
    fn receive_failed(&self, link: LinkRole, err: DataLinkError) {
        let rejected = match link {
            LinkRole::Command => self
                .correlator
                .fail_all(|| ClientError::DataLink(duplicate(&err))),
            LinkRole::Broadcast => 0,
        };
        if rejected == 0 {
            self.errors.publish(Arc::new(ClientError::DataLink(err)));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkRole {
    Command,
    Broadcast,
}

impl fmt::Display for LinkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => f.write_str("command"),
            Self::Broadcast => f.write_str("broadcast"),
        }
    }
}

/// Outcome of one step of a request's retry sequence.
#[derive(Debug)]
enum RequestState {
    Sending { attempt: u32 },
    Waiting { attempt: u32 },
    Expired { attempt: u32 },
    Matched(Acknowledgement),
    Superseded(WaitHandle),
    /// Closed client or a receive failure on the command link.
    Rejected(ClientError),
    TimedOut { attempts: u32 },
    TransportFailed(DataLinkError),
}

impl RequestState {
    fn from_reply(reply: Reply) -> Self {
        match reply {
            Ok(ack) => Self::Matched(ack),
            Err(ClientError::Superseded(handle)) => Self::Superseded(handle),
            Err(err) => Self::Rejected(err),
        }
    }
}

/// Async client for one gateway.
///
/// Requests go out on the command socket; replies and unsolicited traffic
/// arriving on either the command socket or the multicast listener are
/// decoded by background driver tasks and routed to waiting requests or
/// to subscribers.
#[derive(Debug)]
pub struct GatewayClient<D: DataLink> {
    shared: Arc<Shared>,
    command: Mutex<Option<Arc<D>>>,
    broadcast: Mutex<Option<Arc<D>>>,
    drivers: Mutex<Vec<JoinHandle<()>>>,
    retry: RetryPolicy,
}

impl GatewayClient<UdpTransport> {
    /// Binds the command socket and, unless disabled, joins the multicast
    /// group to receive heartbeats and reports.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let command = UdpTransport::bind_command(config.bind_addr).await?;
        let broadcast = if config.listen_broadcast {
            Some(
                UdpTransport::bind_broadcast(
                    MULTICAST_GROUP,
                    RECEIVE_PORT,
                    config.multicast_interface,
                )
                .await?,
            )
        } else {
            None
        };
        Ok(Self::with_datalinks(command, broadcast, config))
    }
}

impl<D: DataLink + 'static> GatewayClient<D> {
    /// Builds a client over arbitrary datalinks and starts their receive
    /// drivers. Must be called from within a tokio runtime.
    pub fn with_datalinks(command: D, broadcast: Option<D>, config: ClientConfig) -> Self {
        let shared = Arc::new(Shared {
            correlator: Correlator::default(),
            session: Session::new(config.key, config.token, config.gateway),
            heartbeats: Subscribers::default(),
            reports: Subscribers::default(),
            errors: Subscribers::default(),
        });
        let command = Arc::new(command);
        let broadcast = broadcast.map(Arc::new);

        let mut drivers = vec![tokio::spawn(drive(
            command.clone(),
            shared.clone(),
            LinkRole::Command,
        ))];
        if let Some(link) = &broadcast {
            drivers.push(tokio::spawn(drive(
                link.clone(),
                shared.clone(),
                LinkRole::Broadcast,
            )));
        }

        Self {
            shared,
            command: Mutex::new(Some(command)),
            broadcast: Mutex::new(broadcast),
            drivers: Mutex::new(drivers),
            retry: config.retry,
        }
    }

    /// Asks the gateway for its device list and stores the session token
    /// it carries.
    pub async fn get_device_list(&self) -> Result<GetDeviceListAck, ClientError> {
        let handle = WaitHandle::new(MessageType::GetDeviceListAck, None);
        match self
            .send_and_await(&Request::get_device_list(), handle)
            .await?
        {
            Acknowledgement::GetDeviceList(ack) => Ok(ack),
            other => Err(ClientError::UnexpectedResponse(other.msg_type())),
        }
    }

    pub async fn read_device(
        &self,
        mac: &str,
        device_type: DeviceType,
    ) -> Result<ReadDeviceAck, ClientError> {
        let handle = WaitHandle::new(MessageType::ReadDeviceAck, Some(mac));
        match self
            .send_and_await(&Request::read_device(mac, device_type), handle)
            .await?
        {
            Acknowledgement::ReadDevice(ack) => Ok(ack),
            other => Err(ClientError::UnexpectedResponse(other.msg_type())),
        }
    }

    /// Lists the devices behind the gateway and reads each of them
    /// concurrently. Fails if any single read fails.
    pub async fn read_all_devices(&self) -> Result<Vec<ReadDeviceAck>, ClientError> {
        let list = self.get_device_list().await?;
        try_join_all(
            list.devices()
                .map(|device| self.read_device(&device.mac, device.device_type.clone())),
        )
        .await
    }

    /// Sends a motor command.
    ///
    /// Out-of-range targets are rejected before anything is sent. Without
    /// an explicit `access_token` one is derived from the configured key
    /// and the current session token.
    pub async fn write_device(
        &self,
        mac: &str,
        device_type: DeviceType,
        data: WriteDeviceData,
        access_token: Option<&str>,
    ) -> Result<WriteDeviceAck, ClientError> {
        data.validate()?;
        let token = match access_token {
            Some(token) => token.to_string(),
            None => self.access_token()?,
        };
        let handle = WaitHandle::new(MessageType::WriteDeviceAck, Some(mac));
        let request = Request::write_device(mac, device_type, data, token);
        match self.send_and_await(&request, handle).await? {
            Acknowledgement::WriteDevice(ack) => Ok(ack),
            other => Err(ClientError::UnexpectedResponse(other.msg_type())),
        }
    }

    /// Derives the write access token from the key and session token.
    pub fn access_token(&self) -> Result<String, ClientError> {
        let session = &self.shared.session;
        let key = session.key().ok_or(AuthError::MissingKey)?;
        let token = session.token().ok_or(AuthError::MissingToken)?;
        Ok(access_token(key.as_bytes(), token.as_bytes())?)
    }

    pub fn session_token(&self) -> Option<String> {
        self.shared.session.token()
    }

    /// Address of the gateway that most recently sent us anything.
    pub fn seen_gateway(&self) -> Option<IpAddr> {
        self.shared.session.seen_gateway()
    }

    pub fn subscribe_heartbeats(&self) -> Subscription<Notification<Heartbeat>> {
        self.shared.heartbeats.subscribe()
    }

    pub fn subscribe_reports(&self) -> Subscription<Notification<Report>> {
        self.shared.reports.subscribe()
    }

    /// Errors not owned by any request: undecodable datagrams and receive
    /// failures while nothing was pending.
    pub fn subscribe_errors(&self) -> Subscription<Arc<ClientError>> {
        self.shared.errors.subscribe()
    }

    /// Stops the receive drivers, releases the sockets and rejects every
    /// pending request. Later requests fail with [`ClientError::Closed`].
    pub fn close(&self) {
        let command = self
            .command
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.broadcast
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.abort_drivers();
        let rejected = self.shared.correlator.fail_all(|| ClientError::Closed);
        if command.is_some() {
            log::debug!("client closed with {rejected} pending requests");
        }
    }

    fn command_link(&self) -> Result<Arc<D>, ClientError> {
        self.command
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ClientError::Closed)
    }

    async fn send_and_await(
        &self,
        request: &Request,
        handle: WaitHandle,
    ) -> Result<Acknowledgement, ClientError> {
        // Registered before the link is fetched so a concurrent close either
        // finds this waiter or leaves no link behind.
        let mut registration = self.shared.correlator.register(handle);
        let link = self.command_link()?;
        let max_retries = self.retry.max_retries();

        let mut state = RequestState::Sending { attempt: 0 };
        loop {
            state = match state {
                RequestState::Sending { attempt } => {
                    let msg_id = self.shared.session.next_message_id();
                    let frame = request.encode(&msg_id)?;
                    let destination = self.shared.session.destination();
                    if attempt > 0 {
                        log::debug!(
                            "retrying {} as {msg_id} (attempt {})",
                            request.msg_type,
                            attempt + 1
                        );
                    }
                    match link.send(destination, &frame).await {
                        Ok(()) => RequestState::Waiting { attempt },
                        Err(err) => RequestState::TransportFailed(err),
                    }
                }
                RequestState::Waiting { attempt } => {
                    let delay = self.retry.delay_for(attempt);
                    match tokio::time::timeout(delay, registration.receiver()).await {
                        Ok(Ok(reply)) => RequestState::from_reply(reply),
                        Ok(Err(_)) => RequestState::Rejected(ClientError::Closed),
                        Err(_) => RequestState::Expired { attempt },
                    }
                }
                RequestState::Expired { attempt } if attempt < max_retries => {
                    RequestState::Sending {
                        attempt: attempt + 1,
                    }
                }
                RequestState::Expired { attempt } => match registration.expire() {
                    Some(reply) => RequestState::from_reply(reply),
                    None => RequestState::TimedOut {
                        attempts: attempt + 1,
                    },
                },
                RequestState::Matched(ack) => return Ok(ack),
                RequestState::Superseded(handle) => {
                    log::debug!("{handle} superseded by a newer request");
                    return Err(ClientError::Superseded(handle));
                }
                RequestState::Rejected(err) => return Err(err),
                RequestState::TimedOut { attempts } => {
                    log::debug!("{} timed out after {attempts} attempts", registration.handle());
                    return Err(ClientError::Timeout { attempts });
                }
                RequestState::TransportFailed(err) => {
                    log::warn!("sending {} failed: {err}", request.msg_type);
                    return Err(err.into());
                }
            };
        }
    }
}

impl<D: DataLink> GatewayClient<D> {
    fn abort_drivers(&self) {
        for task in self
            .drivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            task.abort();
        }
    }
}

impl<D: DataLink> Drop for GatewayClient<D> {
    fn drop(&mut self) {
        self.abort_drivers();
    }
}

async fn drive<D: DataLink>(link: Arc<D>, shared: Arc<Shared>, role: LinkRole) {
    let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
    loop {
        match link.recv(&mut buf).await {
            Ok((n, source)) => shared.dispatch(&buf[..n], source),
            Err(DataLinkError::Closed) => {
                log::debug!("{role} datalink closed");
                return;
            }
            Err(err) => {
                log::warn!("{role} receive failed: {err}");
                shared.receive_failed(role, err);
                tokio::time::sleep(RECEIVE_RETRY_DELAY).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GatewayClient;
    use crate::{AuthError, ClientConfig, ClientError, RetryPolicy};
    use rustmotion_core::message::WriteDeviceData;
    use rustmotion_core::types::{DeviceType, Operation};
    use rustmotion_core::{DecodeError, MessageType, WaitHandle};
    use rustmotion_datalink::{DataLink, DataLinkAddress, DataLinkError};
    use serde_json::{json, Value};
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{mpsc, Mutex};

    const GATEWAY: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50)), 32100);
    const KEY: &str = "74ae544c-d16e-4c";
    const TOKEN: &str = "37412C478E0FBEAB";

    type Inbound = Result<(Vec<u8>, DataLinkAddress), DataLinkError>;

    struct MockDataLink {
        sent: mpsc::UnboundedSender<(DataLinkAddress, Vec<u8>)>,
        inbound: Mutex<mpsc::UnboundedReceiver<Inbound>>,
        fail_sends: Arc<AtomicBool>,
    }

    struct MockPeer {
        sent: mpsc::UnboundedReceiver<(DataLinkAddress, Vec<u8>)>,
        inbound: mpsc::UnboundedSender<Inbound>,
        fail_sends: Arc<AtomicBool>,
    }

    fn mock_pair() -> (MockDataLink, MockPeer) {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let fail_sends = Arc::new(AtomicBool::new(false));
        (
            MockDataLink {
                sent: sent_tx,
                inbound: Mutex::new(in_rx),
                fail_sends: fail_sends.clone(),
            },
            MockPeer {
                sent: sent_rx,
                inbound: in_tx,
                fail_sends,
            },
        )
    }

    impl DataLink for MockDataLink {
        async fn send(
            &self,
            address: DataLinkAddress,
            payload: &[u8],
        ) -> Result<(), DataLinkError> {
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err(DataLinkError::Io(std::io::Error::new(
                    std::io::ErrorKind::NetworkUnreachable,
                    "network unreachable",
                )));
            }
            let _ = self.sent.send((address, payload.to_vec()));
            Ok(())
        }

        async fn recv(&self, buf: &mut [u8]) -> Result<(usize, DataLinkAddress), DataLinkError> {
            match self.inbound.lock().await.recv().await {
                Some(Ok((payload, source))) => {
                    if payload.len() > buf.len() {
                        return Err(DataLinkError::FrameTooLarge);
                    }
                    buf[..payload.len()].copy_from_slice(&payload);
                    Ok((payload.len(), source))
                }
                Some(Err(err)) => Err(err),
                None => Err(DataLinkError::Closed),
            }
        }
    }

    impl MockPeer {
        async fn next_request(&mut self) -> (DataLinkAddress, Value) {
            let (address, frame) = tokio::time::timeout(Duration::from_secs(5), self.sent.recv())
                .await
                .expect("no request sent")
                .expect("client dropped");
            (address, serde_json::from_slice(&frame).unwrap())
        }

        fn sent_count(&mut self) -> usize {
            let mut count = 0;
            while self.sent.try_recv().is_ok() {
                count += 1;
            }
            count
        }

        fn reply(&self, message: Value) {
            self.reply_raw(message.to_string().as_bytes());
        }

        fn reply_raw(&self, frame: &[u8]) {
            self.inbound
                .send(Ok((frame.to_vec(), DataLinkAddress::Ip(GATEWAY))))
                .unwrap();
        }

        fn fail_receive(&self) {
            self.inbound
                .send(Err(DataLinkError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "reset",
                ))))
                .unwrap();
        }
    }

    fn patient() -> RetryPolicy {
        RetryPolicy::new(vec![Duration::from_secs(2)], Duration::from_secs(2), Duration::ZERO)
    }

    fn quick(retries: usize) -> RetryPolicy {
        RetryPolicy::new(
            vec![Duration::from_millis(10); retries],
            Duration::from_millis(10),
            Duration::ZERO,
        )
    }

    fn mock_client(config: ClientConfig) -> (GatewayClient<MockDataLink>, MockPeer) {
        let (link, peer) = mock_pair();
        (GatewayClient::with_datalinks(link, None, config), peer)
    }

    fn device_list_ack() -> Value {
        json!({
            "msgType": "GetDeviceListAck",
            "mac": "f008d1e4a5b0",
            "deviceType": "02000002",
            "ProtocolVersion": "0.9",
            "token": TOKEN,
            "data": [
                {"mac": "f008d1e4a5b0", "deviceType": "02000002"},
                {"mac": "f008d1e4a5b00001", "deviceType": "10000000"},
                {"mac": "f008d1e4a5b00002", "deviceType": "10000001"}
            ]
        })
    }

    fn read_ack(mac: &str, position: i32) -> Value {
        json!({
            "msgType": "ReadDeviceAck",
            "mac": mac,
            "deviceType": "10000000",
            "data": {"type": 1, "operation": 2, "currentPosition": position, "batteryLevel": 1232}
        })
    }

    #[tokio::test]
    async fn device_list_stores_token_and_switches_to_unicast() {
        let (client, mut peer) = mock_client(ClientConfig::default().with_retry_policy(patient()));

        let (list, _) = tokio::join!(client.get_device_list(), async {
            let (address, request) = peer.next_request().await;
            assert_eq!(address, DataLinkAddress::multicast());
            assert_eq!(request["msgType"], "GetDeviceList");
            assert!(request["msgID"].as_str().unwrap().len() >= 17);
            peer.reply(device_list_ack());
        });
        let list = list.unwrap();
        assert_eq!(list.devices().count(), 2);
        assert_eq!(client.session_token().as_deref(), Some(TOKEN));
        assert_eq!(client.seen_gateway(), Some(GATEWAY.ip()));

        let (read, _) = tokio::join!(client.read_device("aa01", DeviceType::Blind), async {
            let (address, request) = peer.next_request().await;
            assert_eq!(address, DataLinkAddress::gateway(GATEWAY.ip()));
            assert_eq!(request["mac"], "aa01");
            assert_eq!(request["deviceType"], "10000000");
            peer.reply(read_ack("aa01", 40));
        });
        let read = read.unwrap();
        assert_eq!(read.data.current_position, Some(40));
        assert_eq!(read.data.operation(), Some(Operation::Stop));
    }

    #[tokio::test]
    async fn unanswered_request_is_sent_once_per_attempt_then_times_out() {
        let retry = quick(4);
        let attempts = retry.max_retries() + 1;
        let (client, mut peer) = mock_client(ClientConfig::default().with_retry_policy(retry));

        let err = client
            .read_device("aa01", DeviceType::Blind)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Timeout { attempts: 5 }));
        assert_eq!(peer.sent_count(), attempts as usize);
        assert_eq!(client.shared.correlator.len(), 0);
    }

    #[tokio::test]
    async fn every_attempt_carries_a_fresh_message_id() {
        let (client, mut peer) = mock_client(ClientConfig::default().with_retry_policy(quick(2)));

        let _ = client.get_device_list().await;
        let mut ids = Vec::new();
        while let Ok((_, frame)) = peer.sent.try_recv() {
            let request: Value = serde_json::from_slice(&frame).unwrap();
            ids.push(request["msgID"].as_str().unwrap().parse::<u128>().unwrap());
        }
        assert_eq!(ids.len(), 3);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn late_reply_to_an_earlier_attempt_completes_the_request() {
        let retry = RetryPolicy::new(
            vec![Duration::from_millis(30)],
            Duration::from_secs(2),
            Duration::ZERO,
        );
        let (client, mut peer) = mock_client(ClientConfig::default().with_retry_policy(retry));

        let (read, _) = tokio::join!(client.read_device("aa01", DeviceType::Blind), async {
            let (_, first) = peer.next_request().await;
            let (_, second) = peer.next_request().await;
            assert_ne!(first["msgID"], second["msgID"]);
            peer.reply(read_ack("aa01", 10));
        });
        assert_eq!(read.unwrap().data.current_position, Some(10));
    }

    #[tokio::test]
    async fn newer_request_supersedes_outstanding_one() {
        let (client, mut peer) = mock_client(ClientConfig::default().with_retry_policy(patient()));
        let client = Arc::new(client);

        let first = tokio::spawn({
            let client = client.clone();
            async move { client.read_device("aa01", DeviceType::Blind).await }
        });
        peer.next_request().await;

        let second = tokio::spawn({
            let client = client.clone();
            async move { client.read_device("aa01", DeviceType::Blind).await }
        });
        peer.next_request().await;

        let err = first.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            ClientError::Superseded(ref h)
                if *h == WaitHandle::new(MessageType::ReadDeviceAck, Some("aa01"))
        ));

        peer.reply(read_ack("aa01", 75));
        let read = second.await.unwrap().unwrap();
        assert_eq!(read.data.current_position, Some(75));
        assert_eq!(client.shared.correlator.len(), 0);
    }

    #[tokio::test]
    async fn replies_are_matched_by_device() {
        let (client, mut peer) = mock_client(ClientConfig::default().with_retry_policy(patient()));

        let (read, _) = tokio::join!(client.read_device("aa01", DeviceType::Blind), async {
            peer.next_request().await;
            peer.reply(read_ack("bb02", 5));
            peer.reply(read_ack("aa01", 6));
        });
        assert_eq!(read.unwrap().mac, "aa01");
    }

    #[tokio::test]
    async fn gateway_echo_with_ack_suffix_resolves_request() {
        let (client, mut peer) = mock_client(ClientConfig::default().with_retry_policy(patient()));

        let (read, _) = tokio::join!(client.read_device("aa01", DeviceType::Blind), async {
            let (_, mut echo) = peer.next_request().await;
            echo["msgType"] = json!("ReadDeviceAck");
            peer.reply(echo);
        });
        let read = read.unwrap();
        assert_eq!(read.mac, "aa01");
        assert_eq!(read.device_type, DeviceType::Blind);
    }

    #[tokio::test]
    async fn out_of_range_writes_are_rejected_before_sending() {
        let config = ClientConfig::default().with_key(KEY).with_token(TOKEN);
        let (client, mut peer) = mock_client(config);

        let err = client
            .write_device("aa01", DeviceType::Blind, WriteDeviceData::position(150), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(ref v) if v.field == "targetPosition"));

        let err = client
            .write_device("aa01", DeviceType::Blind, WriteDeviceData::angle(-1), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(ref v) if v.value == -1));

        assert_eq!(peer.sent_count(), 0);
    }

    #[tokio::test]
    async fn write_without_key_or_token_fails_auth() {
        let (client, mut peer) = mock_client(ClientConfig::default());
        let err = client
            .write_device("aa01", DeviceType::Blind, WriteDeviceData::position(50), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Auth(AuthError::MissingKey)));

        let (client, _peer2) = mock_client(ClientConfig::default().with_key(KEY));
        let err = client
            .write_device("aa01", DeviceType::Blind, WriteDeviceData::position(50), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Auth(AuthError::MissingToken)));

        assert_eq!(peer.sent_count(), 0);
    }

    #[tokio::test]
    async fn write_carries_derived_access_token() {
        let config = ClientConfig::default()
            .with_key(KEY)
            .with_token(TOKEN)
            .with_retry_policy(patient());
        let (client, mut peer) = mock_client(config);
        assert_eq!(
            client.access_token().unwrap(),
            "8570A96BC18ADB21D1FC155B24ECFD73"
        );

        let data = WriteDeviceData::operation(Operation::OpenUp);
        let (write, _) = tokio::join!(
            client.write_device("aa01", DeviceType::Blind, data, None),
            async {
                let (_, request) = peer.next_request().await;
                assert_eq!(request["msgType"], "WriteDevice");
                assert_eq!(request["AccessToken"], "8570A96BC18ADB21D1FC155B24ECFD73");
                assert_eq!(request["data"], json!({"operation": 1}));
                peer.reply(json!({
                    "msgType": "WriteDeviceAck",
                    "mac": "aa01",
                    "deviceType": "10000000",
                    "msgID": request["msgID"],
                    "data": {"type": 1, "operation": 1}
                }));
            }
        );
        let write = write.unwrap();
        assert_eq!(write.data.operation(), Some(Operation::OpenUp));
        assert!(write.msg_id.is_some());
    }

    #[tokio::test]
    async fn explicit_access_token_overrides_derivation() {
        let (client, mut peer) = mock_client(ClientConfig::default().with_retry_policy(patient()));

        let (write, _) = tokio::join!(
            client.write_device(
                "aa01",
                DeviceType::Blind,
                WriteDeviceData::position(30),
                Some("CAFE")
            ),
            async {
                let (_, request) = peer.next_request().await;
                assert_eq!(request["AccessToken"], "CAFE");
                assert_eq!(request["data"], json!({"targetPosition": 30}));
                peer.reply(json!({"msgType": "WriteDeviceAck", "mac": "aa01", "deviceType": "10000000"}));
            }
        );
        write.unwrap();
    }

    #[tokio::test]
    async fn read_all_devices_reads_every_device_behind_the_gateway() {
        let (client, mut peer) = mock_client(ClientConfig::default().with_retry_policy(patient()));

        let (reads, _) = tokio::join!(client.read_all_devices(), async {
            peer.next_request().await;
            peer.reply(device_list_ack());
            for _ in 0..2 {
                let (_, request) = peer.next_request().await;
                assert_eq!(request["msgType"], "ReadDevice");
                let mac = request["mac"].as_str().unwrap().to_string();
                peer.reply(read_ack(&mac, 0));
            }
        });
        let mut macs: Vec<_> = reads.unwrap().into_iter().map(|r| r.mac).collect();
        macs.sort();
        assert_eq!(macs, ["f008d1e4a5b00001", "f008d1e4a5b00002"]);
    }

    #[tokio::test]
    async fn read_all_devices_fails_when_one_read_fails() {
        let retry = RetryPolicy::new(
            vec![Duration::from_millis(200)],
            Duration::from_millis(200),
            Duration::ZERO,
        );
        let (client, mut peer) = mock_client(ClientConfig::default().with_retry_policy(retry));

        let (reads, _) = tokio::join!(client.read_all_devices(), async {
            peer.next_request().await;
            peer.reply(device_list_ack());
            peer.next_request().await;
            peer.reply(read_ack("f008d1e4a5b00001", 0));
        });
        assert!(matches!(reads, Err(ClientError::Timeout { .. })));
    }

    #[tokio::test]
    async fn heartbeats_and_reports_reach_subscribers() {
        let (command, _command_peer) = mock_pair();
        let (broadcast, broadcast_peer) = mock_pair();
        let client = GatewayClient::with_datalinks(command, Some(broadcast), ClientConfig::default());
        let mut heartbeats = client.subscribe_heartbeats();
        let mut reports = client.subscribe_reports();

        broadcast_peer.reply(json!({
            "msgType": "Heartbeat",
            "mac": "f008d1e4a5b0",
            "deviceType": "02000002",
            "token": "FEEDFACECAFEBEEF",
            "data": {"currentState": 1, "numberOfDevices": 2, "RSSI": -48}
        }));
        broadcast_peer.reply(json!({
            "msgType": "Report",
            "mac": "aa01",
            "deviceType": "10000000",
            "data": {"type": 1, "currentPosition": 100}
        }));

        let heartbeat = heartbeats.recv().await.unwrap();
        assert_eq!(heartbeat.source, GATEWAY);
        assert_eq!(heartbeat.message.data.number_of_devices, 2);
        let report = reports.recv().await.unwrap();
        assert_eq!(report.message.mac, "aa01");
        assert_eq!(report.message.data.current_position, Some(100));

        assert_eq!(client.session_token().as_deref(), Some("FEEDFACECAFEBEEF"));
        assert_eq!(client.seen_gateway(), Some(GATEWAY.ip()));
    }

    #[tokio::test]
    async fn token_carried_by_a_report_refreshes_the_session() {
        let (command, _command_peer) = mock_pair();
        let (broadcast, broadcast_peer) = mock_pair();
        let config = ClientConfig::default().with_key(KEY).with_token(TOKEN);
        let client = GatewayClient::with_datalinks(command, Some(broadcast), config);
        let mut reports = client.subscribe_reports();

        broadcast_peer.reply(json!({
            "msgType": "Report",
            "mac": "aa01",
            "deviceType": "10000000",
            "token": "FEEDFACECAFEBEEF",
            "data": {"type": 1, "currentPosition": 20}
        }));
        let report = reports.recv().await.unwrap();
        assert_eq!(report.message.token.as_deref(), Some("FEEDFACECAFEBEEF"));
        assert_eq!(client.session_token().as_deref(), Some("FEEDFACECAFEBEEF"));
        assert_ne!(
            client.access_token().unwrap(),
            "8570A96BC18ADB21D1FC155B24ECFD73"
        );
    }

    #[tokio::test]
    async fn empty_token_from_gateway_is_ignored() {
        let (client, mut peer) = mock_client(
            ClientConfig::default()
                .with_key(KEY)
                .with_retry_policy(patient()),
        );
        let mut ack = device_list_ack();
        ack["token"] = json!("");

        let (list, _) = tokio::join!(client.get_device_list(), async {
            peer.next_request().await;
            peer.reply(ack);
        });
        list.unwrap();
        assert_eq!(client.session_token(), None);
        assert!(matches!(
            client.access_token(),
            Err(ClientError::Auth(AuthError::MissingToken))
        ));
    }

    #[tokio::test]
    async fn broadcast_receive_failure_leaves_command_requests_pending() {
        let (command, mut command_peer) = mock_pair();
        let (broadcast, broadcast_peer) = mock_pair();
        let config = ClientConfig::default().with_retry_policy(patient());
        let client = GatewayClient::with_datalinks(command, Some(broadcast), config);
        let mut errors = client.subscribe_errors();

        let (read, _) = tokio::join!(client.read_device("aa01", DeviceType::Blind), async {
            command_peer.next_request().await;
            broadcast_peer.fail_receive();
            tokio::time::sleep(Duration::from_millis(50)).await;
            command_peer.reply(read_ack("aa01", 55));
        });
        assert_eq!(read.unwrap().data.current_position, Some(55));

        let err = errors.recv().await.unwrap();
        assert!(matches!(*err, ClientError::DataLink(DataLinkError::Io(_))));
    }

    #[tokio::test]
    async fn malformed_datagrams_are_published_as_errors() {
        let (client, mut peer) = mock_client(ClientConfig::default().with_retry_policy(patient()));
        let mut errors = client.subscribe_errors();

        peer.reply_raw(b"not json");
        peer.reply(json!({"msgType": "Bogus"}));

        let err = errors.recv().await.unwrap();
        assert!(matches!(*err, ClientError::Decode(DecodeError::Json(_))));
        let err = errors.recv().await.unwrap();
        assert!(matches!(
            *err,
            ClientError::Decode(DecodeError::UnknownMessageType(ref t)) if t == "Bogus"
        ));

        let (read, _) = tokio::join!(client.read_device("aa01", DeviceType::Blind), async {
            peer.next_request().await;
            peer.reply(read_ack("aa01", 1));
        });
        read.unwrap();
    }

    #[tokio::test]
    async fn send_failure_fails_only_that_request() {
        let (client, mut peer) = mock_client(ClientConfig::default().with_retry_policy(patient()));
        peer.fail_sends.store(true, Ordering::SeqCst);

        let err = client
            .read_device("aa01", DeviceType::Blind)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::DataLink(DataLinkError::Io(_))));
        assert_eq!(client.shared.correlator.len(), 0);

        peer.fail_sends.store(false, Ordering::SeqCst);
        let (read, _) = tokio::join!(client.read_device("aa01", DeviceType::Blind), async {
            peer.next_request().await;
            peer.reply(read_ack("aa01", 2));
        });
        read.unwrap();
    }

    #[tokio::test]
    async fn receive_failure_rejects_pending_or_is_published() {
        let (client, mut peer) = mock_client(ClientConfig::default().with_retry_policy(patient()));
        let mut errors = client.subscribe_errors();

        let (read, _) = tokio::join!(client.read_device("aa01", DeviceType::Blind), async {
            peer.next_request().await;
            peer.fail_receive();
        });
        assert!(matches!(
            read,
            Err(ClientError::DataLink(DataLinkError::Io(_)))
        ));
        assert!(errors.try_recv().is_none());

        peer.fail_receive();
        let err = errors.recv().await.unwrap();
        assert!(matches!(*err, ClientError::DataLink(DataLinkError::Io(_))));
    }

    #[tokio::test]
    async fn close_rejects_pending_and_later_requests() {
        let (client, mut peer) = mock_client(ClientConfig::default().with_retry_policy(patient()));
        let client = Arc::new(client);

        let pending = tokio::spawn({
            let client = client.clone();
            async move { client.get_device_list().await }
        });
        peer.next_request().await;

        client.close();
        assert!(matches!(
            pending.await.unwrap(),
            Err(ClientError::Closed)
        ));
        assert!(matches!(
            client.read_device("aa01", DeviceType::Blind).await,
            Err(ClientError::Closed)
        ));
        assert_eq!(client.shared.correlator.len(), 0);
    }

    #[tokio::test]
    async fn configured_gateway_is_used_from_the_first_request() {
        let pinned = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9)), 32100);
        let config = ClientConfig::default()
            .with_gateway(pinned.ip())
            .with_retry_policy(patient());
        let (client, mut peer) = mock_client(config);

        let (list, _) = tokio::join!(client.get_device_list(), async {
            let (address, _) = peer.next_request().await;
            assert_eq!(address, DataLinkAddress::Ip(pinned));
            peer.reply(device_list_ack());
        });
        list.unwrap();
    }
}
