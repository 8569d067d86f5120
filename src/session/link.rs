//! Connection to the device-emulation service
//!
//! The session never touches a socket. It asks a [`Connector`] for a [`LinkHandle`],
//! pushes encoded frames into it and drains [`LinkEvent`]s from it once per frame.
//!
//! The production connector spawns a WebSocket worker on the tokio runtime:
//!
//! ```text
//!  SessionManager ──(Vec<u8>)──► LinkHandle ══ mpsc ══► LinkWorker<Streaming> ──► socket
//!        ▲                                                      │
//!        └──────────(LinkEvent)──── mpsc ◄──────────────────────┘
//! ```
//!
//! Dropping or closing the handle cancels the worker.

use futures_util::{SinkExt, StreamExt};
use statum::{machine, state};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio_tungstenite::{
    connect_async, tungstenite::client::IntoClientRequest, tungstenite::Message,
    MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to connect: {0}")]
    ConnectFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Link is closed")]
    ChannelClosed,
}

/// Lifecycle event reported by a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Opened,
    Message(Vec<u8>),
    /// Peer close, transport error or failed connection attempt
    Closed(String),
}

/// Session-side end of a link
#[derive(Debug)]
pub struct LinkHandle {
    outgoing: mpsc::UnboundedSender<Vec<u8>>,
    inbound: mpsc::UnboundedReceiver<LinkEvent>,
    cancel: CancellationToken,
}

/// Transport-side end of a link
#[derive(Debug)]
pub struct LinkEndpoint {
    pub outgoing: mpsc::UnboundedReceiver<Vec<u8>>,
    pub events: mpsc::UnboundedSender<LinkEvent>,
    pub cancel: CancellationToken,
}

impl LinkHandle {
    /// Creates both ends of a link
    pub fn channel() -> (LinkHandle, LinkEndpoint) {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let handle = LinkHandle {
            outgoing: outgoing_tx,
            inbound: events_rx,
            cancel: cancel.clone(),
        };
        let endpoint = LinkEndpoint {
            outgoing: outgoing_rx,
            events: events_tx,
            cancel,
        };
        (handle, endpoint)
    }

    pub fn send(&self, frame: Vec<u8>) -> Result<(), LinkError> {
        self.outgoing
            .send(frame)
            .map_err(|_| LinkError::ChannelClosed)
    }

    pub fn try_recv(&mut self) -> Result<LinkEvent, TryRecvError> {
        self.inbound.try_recv()
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for LinkHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Opens links to a service endpoint.
///
/// `connect` must return immediately; the outcome arrives later as
/// [`LinkEvent::Opened`] or [`LinkEvent::Closed`].
pub trait Connector {
    fn connect(&mut self, url: &str) -> LinkHandle;
}

/// Binary-frame WebSocket connector
pub struct WebSocketConnector {
    runtime: Handle,
}

impl WebSocketConnector {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }
}

impl Connector for WebSocketConnector {
    fn connect(&mut self, url: &str) -> LinkHandle {
        let (handle, endpoint) = LinkHandle::channel();
        info!("Connecting to {}", url);
        self.runtime.spawn(run_link(url.to_string(), endpoint));
        handle
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum LinkState {
    Dialing,
    Streaming,
}

#[machine]
#[derive(Debug)]
pub struct LinkWorker<S: LinkState> {
    url: String,
    endpoint: LinkEndpoint,
}

impl<S: LinkState> LinkWorker<S> {
    fn report(&self, event: LinkEvent) -> bool {
        self.endpoint.events.send(event).is_ok()
    }
}

impl LinkWorker<Dialing> {
    pub fn create(url: String, endpoint: LinkEndpoint) -> Self {
        debug!("Creating link worker for {}", url);
        Self::new(url, endpoint)
    }

    pub async fn dial(self) -> (Result<Socket, LinkError>, LinkWorker<Streaming>) {
        let result = match self.url.as_str().into_client_request() {
            Ok(request) => connect_async(request)
                .await
                .map(|(socket, _)| socket)
                .map_err(|e| LinkError::ConnectFailed(e.to_string())),
            Err(e) => Err(LinkError::InvalidUrl(e.to_string())),
        };
        (result, self.transition())
    }
}

impl LinkWorker<Streaming> {
    // Pumps frames both ways until either side goes away, returns the close reason
    pub async fn stream(&mut self, socket: Socket) -> String {
        info!("Connected to {}", self.url);
        if !self.report(LinkEvent::Opened) {
            return "session dropped".to_string();
        }

        let (mut write, mut read) = socket.split();
        let cancel = self.endpoint.cancel.clone();
        let events = self.endpoint.events.clone();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Link cancelled, closing socket");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!("Failed to send close frame: {}", e);
                    }
                    return "closed locally".to_string();
                }

                frame = self.endpoint.outgoing.recv() => {
                    let Some(frame) = frame else {
                        return "session dropped".to_string();
                    };
                    trace!("Sending {} byte frame", frame.len());
                    if let Err(e) = write.send(Message::Binary(frame)).await {
                        error!("Failed to send frame: {}", e);
                        return LinkError::Transport(e.to_string()).to_string();
                    }
                }

                message = read.next() => {
                    match message {
                        Some(Ok(Message::Binary(data))) => {
                            if events.send(LinkEvent::Message(data)).is_err() {
                                return "session dropped".to_string();
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if write.send(Message::Pong(data)).await.is_err() {
                                warn!("Failed to send pong");
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!("Connection closed by peer: {:?}", frame);
                            return "closed by peer".to_string();
                        }
                        Some(Ok(other)) => {
                            trace!("Ignoring non-binary frame: {:?}", other);
                        }
                        Some(Err(e)) => {
                            error!("WebSocket error: {}", e);
                            return LinkError::Transport(e.to_string()).to_string();
                        }
                        None => return "stream ended".to_string(),
                    }
                }
            }
        }
    }
}

async fn run_link(url: String, endpoint: LinkEndpoint) {
    let cancel = endpoint.cancel.clone();
    let worker = LinkWorker::create(url, endpoint);

    let (dialed, mut worker) = tokio::select! {
        _ = cancel.cancelled() => {
            debug!("Link cancelled while dialing");
            return;
        }
        dialed = worker.dial() => dialed,
    };

    let reason = match dialed {
        Ok(socket) => worker.stream(socket).await,
        Err(e) => {
            error!("{}", e);
            e.to_string()
        }
    };

    info!("Link closed: {}", reason);
    worker.report(LinkEvent::Closed(reason));
}
