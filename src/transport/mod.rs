//! Capability contract for the STOMP-over-WebSocket client the session drives.
//!
//! Frame encoding, heartbeats and the socket itself belong to the transport.
//! The session only builds a transport, activates it, subscribes, publishes,
//! deactivates it, and consumes the [`TransportEvent`]s it emits through the
//! [`EventSink`] it was built with.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use url::Url;

use crate::error::TransportError;
use crate::models::connection::{ConnectionConfig, Header};

pub(crate) const HEARTBEAT_INCOMING: Duration = Duration::from_millis(4000);
pub(crate) const HEARTBEAT_OUTGOING: Duration = Duration::from_millis(4000);
pub(crate) const TRANSPORT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Parameters handed to a [`TransportFactory`] for one client instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportOptions {
    pub broker_url: Url,
    pub connect_headers: Vec<Header>,
    pub heartbeat_incoming: Duration,
    pub heartbeat_outgoing: Duration,
    pub reconnect_delay: Duration,
}

impl TransportOptions {
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, TransportError> {
        let broker_url = Url::parse(config.url.trim()).map_err(|err| TransportError::InvalidUrl {
            url: config.url.clone(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            broker_url,
            connect_headers: config.connect_headers(),
            heartbeat_incoming: HEARTBEAT_INCOMING,
            heartbeat_outgoing: HEARTBEAT_OUTGOING,
            reconnect_delay: TRANSPORT_RECONNECT_DELAY,
        })
    }
}

/// A STOMP frame as surfaced by the transport: headers plus body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub headers: Vec<Header>,
    pub body: String,
}

impl Frame {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(key, value));
        self
    }

    /// First value of `name`, as STOMP defines for repeated headers.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|header| header.key == name)
            .map(|header| header.value.as_str())
    }
}

/// Outbound SEND request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Publish {
    pub destination: String,
    pub headers: Vec<Header>,
    pub body: String,
}

/// Lifecycle and delivery events emitted by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// STOMP session established.
    Connected,
    /// Broker sent an ERROR frame.
    ProtocolError(Frame),
    /// Socket-level failure.
    TransportError(String),
    Disconnected,
    /// MESSAGE frame delivered to a subscription.
    Message(Frame),
}

/// Channel end a transport uses to report events.
///
/// Each sink is stamped with the generation of the client it was built for, so
/// the session can tell events of a replaced client from current ones.
#[derive(Clone, Debug)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
}

impl EventSink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, TransportEvent)>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue `event` for the session loop. Events sent after the session is
    /// gone are dropped.
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.tx.send((self.generation, event));
    }
}

/// One live STOMP client.
///
/// `activate` may take as long as the broker handshake. The session runs it
/// on a task of its own and drops the future when the attempt is cancelled
/// or superseded, so dropping a transport must release whatever it holds.
pub trait Transport: Send + 'static {
    fn activate(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn deactivate(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Subscribe to `destination`; deliveries arrive as
    /// [`TransportEvent::Message`].
    fn subscribe(&mut self, destination: &str) -> Result<(), TransportError>;

    fn publish(&mut self, publish: Publish) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Builds transports for the session. The session is the only caller and
/// the only owner of what it builds.
pub trait TransportFactory: Send + 'static {
    type Transport: Transport;

    fn build(&mut self, options: TransportOptions, events: EventSink) -> Result<Self::Transport, TransportError>;
}
