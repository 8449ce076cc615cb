use super::consts::{
    CLOSE_TIMEOUT, CONNECT_TIMEOUT, INBOUND_CAPACITY, KEEPALIVE_INTERVAL, KEEPALIVE_PAYLOAD,
    OUTBOUND_CAPACITY, RECONNECT_DELAY, STATUS_CAPACITY,
};
use super::error::{Result, SocketError};
use super::tls::TlsOptions;
use crate::config::SeppConfig;
use crate::message::{self, SeppMessage};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

type RawWs = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<RawWs, Message>;
type WsStream = SplitStream<RawWs>;

/// The operations a call needs from a signaling connection.
#[async_trait]
pub trait Signaling: Send + Sync {
    /// Queues a message for the wire.
    async fn send_message(&self, msg: &SeppMessage) -> Result<()>;

    /// Next typed inbound message, `None` once the connection is stopped.
    async fn recv(&self) -> Option<SeppMessage>;

    /// Next connect attempt outcome, `None` once the connection is stopped.
    async fn next_status(&self) -> Option<bool>;

    /// A status that is already queued, without waiting for one.
    fn try_next_status(&self) -> Option<bool>;

    /// Shuts the connection down for good.
    async fn stop(&self);
}

/// State shared between the transport handle and its two worker tasks.
struct Shared {
    endpoint: String,
    auth_token: Option<String>,
    tls: Option<native_tls::TlsConnector>,
    running: AtomicBool,
    shutdown: CancellationToken,
}

/// Self-healing websocket connection to a SEPP endpoint.
///
/// Construction spawns a reader task, which keeps (re)connecting and routes
/// inbound frames, and a writer task, which drains the outbound queue and
/// sends keepalive pings. Both run until [`SeppTransport::stop`].
///
/// The writer owns the write half of the live connection. The reader hands
/// it over on every connect and revokes it when the connection ends.
pub struct SeppTransport {
    shared: Arc<Shared>,
    inbound_rx: Mutex<mpsc::Receiver<SeppMessage>>,
    status_rx: Mutex<mpsc::Receiver<bool>>,
    send_tx: Mutex<Option<mpsc::Sender<String>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl SeppTransport {
    /// Starts a transport for `endpoint`. Must be called within a tokio runtime.
    ///
    /// An empty `auth_token` is treated as no token.
    pub fn new(
        endpoint: impl Into<String>,
        auth_token: Option<String>,
        tls: Option<native_tls::TlsConnector>,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            endpoint: endpoint.into(),
            auth_token: auth_token.filter(|token| !token.is_empty()),
            tls,
            running: AtomicBool::new(true),
            shutdown: CancellationToken::new(),
        });
        // Fail fast on a bad endpoint or token instead of retrying forever.
        shared.request()?;

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (status_tx, status_rx) = mpsc::channel(STATUS_CAPACITY);
        let (send_tx, send_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let (sink_tx, sink_rx) = mpsc::unbounded_channel();

        let reader = tokio::spawn(Arc::clone(&shared).read_loop(inbound_tx, status_tx, sink_tx));
        let writer = tokio::spawn(Arc::clone(&shared).write_loop(send_rx, sink_rx));

        Ok(Self {
            shared,
            inbound_rx: Mutex::new(inbound_rx),
            status_rx: Mutex::new(status_rx),
            send_tx: Mutex::new(Some(send_tx)),
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
        })
    }

    pub fn from_config(config: &SeppConfig) -> Result<Self> {
        let tls = config.tls.as_ref().map(TlsOptions::build).transpose()?;
        Self::new(config.endpoint.clone(), config.auth_token.clone(), tls)
    }

    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Serializes `msg` and queues it for the writer.
    ///
    /// Messages are not written immediately. A message queued while the
    /// connection is down is dropped by the writer.
    pub async fn send<T: Serialize + ?Sized>(&self, msg: &T) -> Result<()> {
        let payload = serde_json::to_string(msg)?;
        if !self.is_running() {
            return Err(SocketError::NotRunning);
        }
        let tx = self
            .send_tx
            .lock()
            .await
            .clone()
            .ok_or(SocketError::NotRunning)?;
        tx.send(payload).await.map_err(|_| SocketError::NotRunning)
    }

    /// Next typed inbound message. Blocks the reader until taken.
    pub async fn recv(&self) -> Option<SeppMessage> {
        self.inbound_rx.lock().await.recv().await
    }

    /// Next connection status: `true` per successful connect, `false` per failed attempt.
    pub async fn next_status(&self) -> Option<bool> {
        self.status_rx.lock().await.recv().await
    }

    /// A queued status, `None` if nothing is queued or another task is waiting for one.
    pub fn try_next_status(&self) -> Option<bool> {
        self.status_rx.try_lock().ok()?.try_recv().ok()
    }

    /// Stops both workers and closes every channel. Irreversible.
    pub async fn stop(&self) {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            debug!(target: "Sepp/Transport", "Stop called on a stopped transport");
            return;
        }
        info!(target: "Sepp/Transport", "Stopping transport for {}", self.shared.endpoint);

        // Interrupts connects, reads, channel deliveries and writes. The
        // writer then sends a close frame, bounded by CLOSE_TIMEOUT.
        self.shared.shutdown.cancel();

        // The reader owns the inbound and status senders; both channels
        // close once it has exited.
        let reader = self.reader.lock().await.take();
        if let Some(reader) = reader {
            if let Err(e) = reader.await {
                warn!(target: "Sepp/Transport", "Reader task failed: {e}");
            }
        }

        self.send_tx.lock().await.take();
        let writer = self.writer.lock().await.take();
        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                warn!(target: "Sepp/Transport", "Writer task failed: {e}");
            }
        }
        debug!(target: "Sepp/Transport", "Transport stopped");
    }
}

impl Drop for SeppTransport {
    fn drop(&mut self) {
        // Without an explicit stop both detached tasks exit on the cancellation.
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.shutdown.cancel();
    }
}

#[async_trait]
impl Signaling for SeppTransport {
    async fn send_message(&self, msg: &SeppMessage) -> Result<()> {
        self.send(msg).await
    }

    async fn recv(&self) -> Option<SeppMessage> {
        SeppTransport::recv(self).await
    }

    async fn next_status(&self) -> Option<bool> {
        SeppTransport::next_status(self).await
    }

    fn try_next_status(&self) -> Option<bool> {
        SeppTransport::try_next_status(self)
    }

    async fn stop(&self) {
        SeppTransport::stop(self).await
    }
}

impl Shared {
    fn request(&self) -> Result<Request> {
        let mut request = self
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(|source| SocketError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                source,
            })?;
        if let Some(token) = &self.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| SocketError::InvalidToken)?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Ok(request)
    }

    /// One handshake attempt, bounded by [`CONNECT_TIMEOUT`] and by shutdown.
    async fn connect(&self) -> Result<(WsSink, WsStream)> {
        let request = self.request()?;
        let connector = self.tls.clone().map(Connector::NativeTls);

        debug!(target: "Sepp/Transport", "Dialing {}", self.endpoint);
        let handshake =
            tokio_tungstenite::connect_async_tls_with_config(request, None, false, connector);
        let (ws, _response) = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Err(SocketError::Cancelled),
            res = tokio::time::timeout(CONNECT_TIMEOUT, handshake) => {
                res.map_err(|_| SocketError::ConnectTimeout(CONNECT_TIMEOUT))??
            }
        };

        Ok(ws.split())
    }

    async fn read_loop(
        self: Arc<Self>,
        inbound_tx: mpsc::Sender<SeppMessage>,
        status_tx: mpsc::Sender<bool>,
        sink_tx: mpsc::UnboundedSender<Option<WsSink>>,
    ) {
        while self.running.load(Ordering::SeqCst) {
            let (sink, stream) = match self.connect().await {
                Ok(halves) => halves,
                Err(SocketError::Cancelled) => break,
                Err(e) => {
                    warn!(target: "Sepp/Transport", "Failed to connect to {} [{e}]. Retrying.", self.endpoint);
                    if !self.emit_status(&status_tx, false).await {
                        break;
                    }
                    if self.running.load(Ordering::SeqCst) {
                        tokio::select! {
                            _ = self.shutdown.cancelled() => break,
                            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                        }
                    }
                    continue;
                }
            };

            info!(target: "Sepp/Transport", "Connected to {}", self.endpoint);
            if sink_tx.send(Some(sink)).is_err() {
                break;
            }
            if !self.emit_status(&status_tx, true).await {
                break;
            }
            self.pump_frames(stream, &inbound_tx).await;
            if sink_tx.send(None).is_err() {
                break;
            }
        }

        debug!(target: "Sepp/Transport", "Reader stopped");
    }

    /// Returns false if shutdown interrupted the delivery.
    async fn emit_status(&self, status_tx: &mpsc::Sender<bool>, connected: bool) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => false,
            res = status_tx.send(connected) => res.is_ok(),
        }
    }

    /// Reads one connection epoch until a read error, end of stream or shutdown.
    async fn pump_frames(&self, mut stream: WsStream, inbound_tx: &mpsc::Sender<SeppMessage>) {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return,
                next = stream.next() => next,
            };

            let text = match next {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(frame))) => {
                    debug!(target: "Sepp/Transport", "Received close frame: {frame:?}");
                    continue;
                }
                Some(Ok(other)) => {
                    trace!(target: "Sepp/Transport", "Ignoring non-text frame ({} bytes)", other.len());
                    continue;
                }
                Some(Err(e)) => {
                    warn!(target: "Sepp/Transport", "Read failed with: {e}");
                    return;
                }
                None => {
                    info!(target: "Sepp/Transport", "Connection closed by peer");
                    return;
                }
            };

            trace!(target: "Sepp/Transport", "<-- {}", text.as_str());
            let msg = match message::decode(text.as_str()) {
                Ok(SeppMessage::Unrecognized(envelope)) => {
                    debug!(target: "Sepp/Router", "Message-type {} not supported.", envelope.kind);
                    continue;
                }
                Ok(msg) => msg,
                Err(e) => {
                    debug!(target: "Sepp/Router", "Dropping frame: {e}");
                    continue;
                }
            };

            // Capacity 1: a slow consumer stalls reading here, nothing is dropped.
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return,
                res = inbound_tx.send(msg) => {
                    if res.is_err() {
                        return;
                    }
                }
            }
        }
    }

    async fn write_loop(
        self: Arc<Self>,
        mut send_rx: mpsc::Receiver<String>,
        mut sink_rx: mpsc::UnboundedReceiver<Option<WsSink>>,
    ) {
        let mut sink: Option<WsSink> = None;
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                next = sink_rx.recv() => {
                    let Some(next) = next else {
                        break;
                    };
                    sink = next;
                    continue;
                }
                payload = send_rx.recv() => {
                    let Some(payload) = payload else {
                        break;
                    };
                    trace!(target: "Sepp/Transport", "--> {payload}");
                    Message::text(payload)
                }
                _ = tokio::time::sleep(KEEPALIVE_INTERVAL) => {
                    Message::Ping(Bytes::from_static(KEEPALIVE_PAYLOAD))
                }
            };

            let is_ping = matches!(frame, Message::Ping(_));
            let Some(active) = sink.as_mut() else {
                if !is_ping {
                    debug!(target: "Sepp/Transport", "Dropping frame: not connected");
                }
                continue;
            };

            // A peer that stops reading must not hold up shutdown.
            let result = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                res = active.send(frame) => res,
            };
            match result {
                Ok(()) if is_ping => trace!(target: "Sepp/Transport", "--> ping"),
                Ok(()) => {}
                Err(e) => {
                    warn!(target: "Sepp/Transport", "Failed to send: {e}");
                    // The reader notices the broken connection and hands over a new sink.
                    sink = None;
                }
            }
        }

        if let Some(sink) = sink {
            close_sink(sink).await;
        }
        debug!(target: "Sepp/Transport", "Writer stopped");
    }
}

/// Sends a close frame, bounded by [`CLOSE_TIMEOUT`].
async fn close_sink(mut sink: WsSink) {
    match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(target: "Sepp/Transport", "Close failed: {e}"),
        Err(_) => debug!(target: "Sepp/Transport", "Timed out closing the connection"),
    }
}
