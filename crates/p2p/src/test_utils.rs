//! Shared mocks for unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use libp2p::identity::{Keypair, PublicKey};
use libp2p::{Multiaddr, PeerId, StreamProtocol};
use meridian_core::{
    Connection, DisconnectError, DisconnectRequestHandler, EventSink, PeerEvent,
    ReputationManager, RpcError, RpcHandler, RpcResponseHandler, RpcStreamController,
    TransportError,
};
use meridian_types::{
    DisconnectReason, IdentifyInfo, PeerAddress, ReputationAdjustment, RpcMethod,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Let spawned tasks on the current-thread test runtime run to quiescence.
pub(crate) async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Everything currently sitting in the channel.
pub(crate) fn drain<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Ok(item) = rx.try_recv() {
        items.push(item);
    }
    items
}

/// In-memory connection whose close signal and identify answers are
/// controlled by the test.
pub(crate) struct MockConnection {
    peer_id: PeerId,
    public_key: PublicKey,
    address: Multiaddr,
    initiator: bool,
    closed_tx: watch::Sender<bool>,
    fail_close: AtomicBool,
    close_calls: AtomicUsize,
    streams_opened: Mutex<Vec<StreamProtocol>>,
    identify_calls: AtomicUsize,
    identify_results: Mutex<VecDeque<Result<IdentifyInfo, TransportError>>>,
}

impl MockConnection {
    pub(crate) fn new() -> Arc<Self> {
        Self::with_initiator(true)
    }

    pub(crate) fn with_initiator(initiator: bool) -> Arc<Self> {
        let keypair = Keypair::generate_ed25519();
        let (closed_tx, _) = watch::channel(false);
        Arc::new(Self {
            peer_id: keypair.public().to_peer_id(),
            public_key: keypair.public(),
            address: "/ip4/192.168.1.7/tcp/9000".parse().unwrap(),
            initiator,
            closed_tx,
            fail_close: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            streams_opened: Mutex::new(Vec::new()),
            identify_calls: AtomicUsize::new(0),
            identify_results: Mutex::new(VecDeque::new()),
        })
    }

    pub(crate) fn peer_address(&self) -> PeerAddress {
        PeerAddress::new(self.peer_id, self.address.clone())
    }

    /// Simulate the remote side hanging up.
    pub(crate) fn close_remotely(&self) {
        self.closed_tx.send_replace(true);
    }

    /// Make `close()` fail without closing anything.
    pub(crate) fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn streams_opened(&self) -> Vec<StreamProtocol> {
        self.streams_opened.lock().clone()
    }

    pub(crate) fn identify_calls(&self) -> usize {
        self.identify_calls.load(Ordering::SeqCst)
    }

    /// Queue the answer for the next identify call.
    pub(crate) fn push_identify(&self, result: Result<IdentifyInfo, TransportError>) {
        self.identify_results.lock().push_back(result);
    }
}

#[async_trait]
impl Connection for MockConnection {
    type Stream = StreamProtocol;

    fn remote_peer_id(&self) -> PeerId {
        self.peer_id
    }

    fn remote_public_key(&self) -> PublicKey {
        self.public_key.clone()
    }

    fn remote_address(&self) -> Multiaddr {
        self.address.clone()
    }

    fn is_initiator(&self) -> bool {
        self.initiator
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(TransportError::Io("close refused".to_string()));
        }
        self.closed_tx.send_replace(true);
        Ok(())
    }

    async fn closed(&self) {
        let mut closed_rx = self.closed_tx.subscribe();
        let _ = closed_rx.wait_for(|closed| *closed).await;
    }

    async fn open_stream(&self, protocol: StreamProtocol) -> Result<StreamProtocol, TransportError> {
        if *self.closed_tx.borrow() {
            return Err(TransportError::ConnectionClosed);
        }
        self.streams_opened.lock().push(protocol.clone());
        Ok(protocol)
    }

    async fn identify(&self) -> Result<IdentifyInfo, TransportError> {
        self.identify_calls.fetch_add(1, Ordering::SeqCst);
        self.identify_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Identify("no answer".to_string())))
    }
}

pub(crate) struct MockController {
    method: RpcMethod,
}

impl RpcStreamController for MockController {
    fn method(&self) -> RpcMethod {
        self.method
    }

    fn close_abruptly(&self) {}
}

/// A started request waiting for the test to finish it.
pub(crate) struct StartedRequest {
    pub(crate) request: Bytes,
    pub(crate) finish: oneshot::Sender<Result<(), RpcError>>,
}

/// RPC delegate that opens a stream, reports the request to the test and
/// waits until the test finishes it. On success it echoes the request back
/// to the response handler.
pub(crate) struct GatedRpcHandler {
    method: RpcMethod,
    started: mpsc::UnboundedSender<StartedRequest>,
}

impl GatedRpcHandler {
    pub(crate) fn new(method: RpcMethod) -> (Arc<Self>, mpsc::UnboundedReceiver<StartedRequest>) {
        let (started, started_rx) = mpsc::unbounded_channel();
        (Arc::new(Self { method, started }), started_rx)
    }
}

#[async_trait]
impl<C: Connection> RpcHandler<C> for GatedRpcHandler {
    fn method(&self) -> RpcMethod {
        self.method
    }

    async fn send_request(
        &self,
        connection: &C,
        request: Bytes,
        response_handler: Arc<dyn RpcResponseHandler>,
    ) -> Result<Box<dyn RpcStreamController>, RpcError> {
        connection.open_stream(self.method.protocol()).await?;

        let (finish, finished) = oneshot::channel();
        self.started
            .send(StartedRequest {
                request: request.clone(),
                finish,
            })
            .map_err(|_| RpcError::Aborted)?;
        finished.await.map_err(|_| RpcError::Aborted)??;

        response_handler.on_response(request);
        response_handler.on_completed(Ok(()));
        Ok(Box::new(MockController {
            method: self.method,
        }))
    }
}

/// RPC delegate that answers immediately, recording what it was sent.
pub(crate) struct InstantRpcHandler {
    method: RpcMethod,
    requests: Mutex<Vec<Bytes>>,
}

impl InstantRpcHandler {
    pub(crate) fn new(method: RpcMethod) -> Arc<Self> {
        Arc::new(Self {
            method,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<Bytes> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl<C: Connection> RpcHandler<C> for InstantRpcHandler {
    fn method(&self) -> RpcMethod {
        self.method
    }

    async fn send_request(
        &self,
        connection: &C,
        request: Bytes,
        _response_handler: Arc<dyn RpcResponseHandler>,
    ) -> Result<Box<dyn RpcStreamController>, RpcError> {
        connection.open_stream(self.method.protocol()).await?;
        self.requests.lock().push(request);
        Ok(Box::new(MockController {
            method: self.method,
        }))
    }
}

/// Response handler that keeps everything it receives.
#[derive(Default)]
pub(crate) struct RecordingResponseHandler {
    responses: Mutex<Vec<Bytes>>,
    completed: Mutex<Option<Result<(), RpcError>>>,
}

impl RecordingResponseHandler {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn responses(&self) -> Vec<Bytes> {
        self.responses.lock().clone()
    }

    pub(crate) fn completed(&self) -> Option<Result<(), RpcError>> {
        self.completed.lock().clone()
    }
}

impl RpcResponseHandler for RecordingResponseHandler {
    fn on_response(&self, response: Bytes) {
        self.responses.lock().push(response);
    }

    fn on_completed(&self, result: Result<(), RpcError>) {
        *self.completed.lock() = Some(result);
    }
}

/// Reputation authority with a fixed verdict that counts its calls.
pub(crate) struct FixedReputation {
    disconnect: bool,
    calls: Mutex<Vec<(PeerAddress, ReputationAdjustment)>>,
}

impl FixedReputation {
    pub(crate) fn new(disconnect: bool) -> Arc<Self> {
        Arc::new(Self {
            disconnect,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn calls(&self) -> Vec<(PeerAddress, ReputationAdjustment)> {
        self.calls.lock().clone()
    }
}

impl ReputationManager for FixedReputation {
    fn adjust_reputation(&self, address: &PeerAddress, adjustment: ReputationAdjustment) -> bool {
        self.calls.lock().push((address.clone(), adjustment));
        self.disconnect
    }
}

/// Goodbye handler that records each request and answers with a fixed result.
pub(crate) struct ScriptedGoodbye {
    result: Result<(), DisconnectError>,
    requests: Mutex<Vec<DisconnectReason>>,
}

impl ScriptedGoodbye {
    pub(crate) fn succeeding() -> Arc<Self> {
        Self::with_result(Ok(()))
    }

    pub(crate) fn failing() -> Arc<Self> {
        Self::with_result(Err(DisconnectError::Timeout))
    }

    fn with_result(result: Result<(), DisconnectError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<DisconnectReason> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl DisconnectRequestHandler for ScriptedGoodbye {
    async fn request_disconnect(&self, reason: DisconnectReason) -> Result<(), DisconnectError> {
        self.requests.lock().push(reason);
        tokio::task::yield_now().await;
        self.result.clone()
    }
}

/// Event sink that keeps every event.
#[derive(Default)]
pub(crate) struct RecordingEventSink {
    events: Mutex<Vec<PeerEvent>>,
}

impl RecordingEventSink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn events(&self) -> Vec<PeerEvent> {
        self.events.lock().clone()
    }

    pub(crate) fn count(&self, type_name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.type_name() == type_name)
            .count()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: PeerEvent) {
        self.events.lock().push(event);
    }
}

/// Collects disconnect notifications.
pub(crate) type Notifications = Arc<Mutex<Vec<(Option<DisconnectReason>, bool)>>>;

pub(crate) fn recording_subscriber() -> (
    Notifications,
    impl Fn(Option<DisconnectReason>, bool) + Send + Sync + 'static,
) {
    let seen: Notifications = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |reason, locally_initiated| {
        sink.lock().push((reason, locally_initiated))
    })
}
