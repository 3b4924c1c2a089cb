//! Connection session manager.
//!
//! [`SessionManager`] owns the single live transport client, the connection
//! status, the received-message buffer and the recent destinations. Every
//! operation, transport event and retry deadline is handled on one task, so
//! the state needs no locking: either the spawned loop in
//! [`crate::client::spawn_session`] drives it, or a test drives it directly
//! through [`SessionManager::pump`] and [`SessionManager::step`].
//!
//! Activating a client can take as long as the broker handshake, so it runs
//! on a task of its own and reports back as an input. The loop keeps serving
//! commands meanwhile; a cancel or a new connect aborts the attempt.

use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{SessionError, TransportError};
use crate::models::connection::{ConnectionConfig, ConnectionStatus, Header};
use crate::models::ipc::{Notice, NoticeLevel, SessionSnapshot};
use crate::models::message::{ContentType, Message, RecentDestinations, push_capped};
use crate::models::settings::SettingsProvider;
use crate::session::reconnect::{MAX_RECONNECT_ATTEMPTS, ReconnectDecision};
use crate::transport::{EventSink, Frame, Publish, Transport, TransportEvent, TransportFactory, TransportOptions};

pub mod notify;
pub mod reconnect;

use notify::NotificationSink;

pub(crate) const TRANSPORT_FAILED: &str = "transport connection failed";
const UNKNOWN_PROTOCOL_ERROR: &str = "Unknown STOMP error";
const NOTIFICATION_TITLE: &str = "New STOMP Message";

/// Undrained notices kept before new ones are dropped.
pub const NOTICE_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug)]
struct PendingRetry {
    attempt: u32,
    delay: Duration,
    deadline: Instant,
}

/// Outcome of an activation task, handed back to the session loop.
pub(crate) struct Activation<T> {
    generation: u64,
    client: T,
    result: Result<(), TransportError>,
}

/// Something the session loop has to react to.
pub(crate) enum Input<T> {
    Transport { generation: u64, event: TransportEvent },
    Activated(Activation<T>),
    RetryDue,
    Closed,
}

pub struct SessionManager<F, S, N>
where
    F: TransportFactory,
{
    runtime: Handle,
    factory: F,
    settings: S,
    notifier: N,
    status: ConnectionStatus,
    client: Option<F::Transport>,
    activation: Option<JoinHandle<()>>,
    config: Option<ConnectionConfig>,
    recent_destinations: RecentDestinations,
    cancelled: bool,
    attempt: u32,
    pending_retry: Option<PendingRetry>,
    /// Bumped whenever the current client is replaced or released.
    generation: u64,
    events_tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
    events_rx: mpsc::UnboundedReceiver<(u64, TransportEvent)>,
    activated_tx: mpsc::UnboundedSender<Activation<F::Transport>>,
    activated_rx: mpsc::UnboundedReceiver<Activation<F::Transport>>,
    notice_tx: Option<std_mpsc::SyncSender<Notice>>,
    /// Published view; the message buffer lives here and is edited in place.
    view: watch::Sender<SessionSnapshot>,
}

impl<F, S, N> SessionManager<F, S, N>
where
    F: TransportFactory,
    S: SettingsProvider,
    N: NotificationSink,
{
    /// Background work (activation, releasing clients) is spawned on
    /// `runtime`, so the manager may be driven from any thread.
    pub fn new(runtime: &Handle, factory: F, settings: S, notifier: N) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (activated_tx, activated_rx) = mpsc::unbounded_channel();
        let (view, _) = watch::channel(SessionSnapshot::default());

        Self {
            runtime: runtime.clone(),
            factory,
            settings,
            notifier,
            status: ConnectionStatus::Disconnected,
            client: None,
            activation: None,
            config: None,
            recent_destinations: RecentDestinations::default(),
            cancelled: false,
            attempt: 0,
            pending_retry: None,
            generation: 0,
            events_tx,
            events_rx,
            activated_tx,
            activated_rx,
            notice_tx: None,
            view,
        }
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Copy of the message buffer, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.view.borrow().messages.iter().cloned().collect()
    }

    pub fn recent_destinations(&self) -> &RecentDestinations {
        &self.recent_destinations
    }

    /// Retries made since the last successful connection.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Whether an activated client is held.
    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Whether a client is still being activated.
    pub fn is_activating(&self) -> bool {
        self.activation.is_some()
    }

    /// Delay of the outstanding retry, if one is scheduled.
    pub fn pending_retry(&self) -> Option<Duration> {
        self.pending_retry.map(|retry| retry.delay)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.view.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.view.subscribe()
    }

    /// Route user notices to a new receiver, replacing any previous one.
    ///
    /// At most [`NOTICE_CAPACITY`] notices wait in the receiver; while it is
    /// full, newer notices are dropped.
    pub fn notices(&mut self) -> std_mpsc::Receiver<Notice> {
        let (tx, rx) = std_mpsc::sync_channel(NOTICE_CAPACITY);
        self.notice_tx = Some(tx);
        rx
    }

    /// Manual connect: resets the retry counter and starts a new attempt.
    ///
    /// Returns as soon as the attempt is under way; its outcome arrives
    /// through [`SessionManager::status`].
    pub fn connect(&mut self, config: ConnectionConfig) {
        self.attempt = 0;
        self.open(config);
    }

    pub async fn disconnect(&mut self) -> Result<(), SessionError> {
        self.pending_retry = None;
        let aborted = self.abort_activation();
        self.generation += 1;

        let released = self.client.take();
        let had_client = aborted || released.is_some();
        let result = match released {
            Some(mut client) => client.deactivate().await,
            None => Ok(()),
        };

        self.set_status(ConnectionStatus::Disconnected);
        match &result {
            Ok(()) if had_client => {
                info!("disconnected from broker");
                self.notice(NoticeLevel::Success, "Disconnected successfully");
            }
            Ok(()) => {}
            Err(err) => {
                warn!(error = %err, "deactivation failed during disconnect");
                self.notice(NoticeLevel::Error, "Failed to disconnect");
            }
        }

        result.map_err(SessionError::from)
    }

    pub async fn send_message(
        &mut self,
        destination: &str,
        content: &str,
        content_type: ContentType,
    ) -> Result<(), SessionError> {
        if !self.status.is_connected() {
            return Err(SessionError::NotConnected);
        }
        let Some(client) = self.client.as_mut() else {
            return Err(SessionError::NotConnected);
        };

        let publish = Publish {
            destination: destination.to_string(),
            headers: vec![Header::new("content-type", content_type.mime())],
            body: content.to_string(),
        };
        client
            .publish(publish)
            .await
            .inspect_err(|err| warn!(destination, error = %err, "publish failed"))?;

        debug!(destination, "message sent");
        self.recent_destinations.touch(destination);
        let recent = self.recent_destinations.to_vec();
        self.view.send_modify(|view| view.recent_destinations = recent);
        Ok(())
    }

    pub fn clear_messages(&mut self) {
        self.view.send_modify(|view| view.messages.clear());
        self.notice(NoticeLevel::Success, "Messages cleared");
    }

    /// Stop connecting and suppress any retry until the next [`connect`].
    ///
    /// An activation in flight is aborted and a held client is released in
    /// the background.
    ///
    /// [`connect`]: SessionManager::connect
    pub fn cancel_connection(&mut self) {
        self.pending_retry = None;
        self.attempt = 0;
        self.cancelled = true;
        self.abort_activation();
        self.generation += 1;

        if let Some(client) = self.client.take() {
            self.release(client);
        }

        self.set_status(ConnectionStatus::Disconnected);
        info!("connection cancelled");
        self.notice(NoticeLevel::Info, "Connection cancelled");
    }

    /// Release the client on session teardown.
    pub async fn shutdown(&mut self) {
        self.pending_retry = None;
        self.abort_activation();
        self.generation += 1;
        if let Some(mut client) = self.client.take()
            && let Err(err) = client.deactivate().await
        {
            warn!(error = %err, "deactivation on shutdown failed");
        }
        self.set_status(ConnectionStatus::Disconnected);
    }

    /// Handle every finished activation and transport event already queued,
    /// without waiting.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let input = if let Ok(activation) = self.activated_rx.try_recv() {
                Input::Activated(activation)
            } else if let Ok((generation, event)) = self.events_rx.try_recv() {
                Input::Transport { generation, event }
            } else {
                break;
            };
            self.handle_input(input);
            handled += 1;
        }
        handled
    }

    /// Wait for the next activation outcome, transport event or retry
    /// deadline and handle it.
    pub async fn step(&mut self) {
        let input = self.next_input().await;
        self.handle_input(input);
    }

    pub(crate) async fn next_input(&mut self) -> Input<F::Transport> {
        let retry_at = self.pending_retry.map(|retry| retry.deadline);

        tokio::select! {
            biased;
            Some(activation) = self.activated_rx.recv() => Input::Activated(activation),
            received = self.events_rx.recv() => match received {
                Some((generation, event)) => Input::Transport { generation, event },
                None => Input::Closed,
            },
            () = tokio::time::sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                Input::RetryDue
            }
        }
    }

    pub(crate) fn handle_input(&mut self, input: Input<F::Transport>) {
        match input {
            Input::Transport { generation, event } if generation == self.generation => {
                self.handle_event(event);
            }
            Input::Transport { generation, .. } => {
                debug!(generation, current = self.generation, "ignoring event from released client");
            }
            Input::Activated(activation) => self.on_activated(activation),
            Input::RetryDue => self.retry_due(),
            Input::Closed => {}
        }
    }

    /// Shared by manual connects and scheduled retries.
    fn open(&mut self, config: ConnectionConfig) {
        self.cancelled = false;
        self.pending_retry = None;
        self.abort_activation();
        self.generation += 1;

        let previous = self.client.take();
        self.set_status(ConnectionStatus::Connecting);
        info!(url = %config.url, attempt = self.attempt, generation = self.generation, "connecting to broker");

        let built = TransportOptions::from_config(&config).and_then(|options| {
            let events = EventSink::new(self.generation, self.events_tx.clone());
            self.factory.build(options, events)
        });
        self.config = Some(config);

        let client = match built {
            Ok(client) => client,
            Err(err) => {
                if let Some(previous) = previous {
                    self.release(previous);
                }
                self.attempt_failed(err);
                return;
            }
        };

        let generation = self.generation;
        let activated_tx = self.activated_tx.clone();
        self.activation = Some(self.runtime.spawn(async move {
            // the previous client is gone before the new one goes live
            if let Some(mut previous) = previous
                && let Err(err) = previous.deactivate().await
            {
                warn!(error = %err, "failed to deactivate previous client");
            }
            let mut client = client;
            let result = client.activate().await;
            let _ = activated_tx.send(Activation {
                generation,
                client,
                result,
            });
        }));
    }

    fn on_activated(&mut self, activation: Activation<F::Transport>) {
        let Activation {
            generation,
            client,
            result,
        } = activation;

        if generation != self.generation {
            debug!(generation, current = self.generation, "releasing client of a superseded attempt");
            self.release(client);
            return;
        }
        self.activation = None;

        match result {
            Ok(()) => {
                debug!(generation, "client activated");
                self.client = Some(client);
                // the broker may have confirmed the session before activation returned
                if self.status.is_connected() {
                    self.subscribe();
                }
            }
            Err(err) => {
                self.release(client);
                self.attempt_failed(err);
            }
        }
    }

    fn attempt_failed(&mut self, err: TransportError) {
        warn!(error = %err, "connection attempt failed");
        // whatever the failed client still emits is stale
        self.generation += 1;
        self.set_status(ConnectionStatus::error(err.to_string()));
        if !self.cancelled && self.pending_retry.is_none() {
            self.schedule_reconnect();
        }
    }

    fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => self.on_connected(),
            TransportEvent::ProtocolError(frame) => {
                let message = frame.header("message").unwrap_or(UNKNOWN_PROTOCOL_ERROR).to_string();
                warn!(%message, "broker reported a protocol error");
                self.notice(NoticeLevel::Error, format!("STOMP error: {message}"));
                self.set_status(ConnectionStatus::Error { message });
            }
            TransportEvent::TransportError(reason) => {
                warn!(%reason, "transport connection failed");
                self.set_status(ConnectionStatus::error(TRANSPORT_FAILED));
                if !self.cancelled {
                    self.schedule_reconnect();
                }
            }
            TransportEvent::Disconnected => {
                if self.status != ConnectionStatus::Disconnected {
                    info!("broker connection closed");
                    self.set_status(ConnectionStatus::Disconnected);
                }
            }
            TransportEvent::Message(frame) => self.on_message(frame),
        }
    }

    fn on_connected(&mut self) {
        self.set_status(ConnectionStatus::Connected);
        self.attempt = 0;
        if self.client.is_some() {
            self.subscribe();
        }
    }

    fn subscribe(&mut self) {
        let Some(destination) = self.config.as_ref().map(|config| config.subscription_url.clone()) else {
            return;
        };
        let Some(client) = self.client.as_mut() else {
            return;
        };

        match client.subscribe(&destination) {
            Ok(()) => {
                info!(%destination, "connected and subscribed");
                self.notice(NoticeLevel::Success, "Connected successfully");
            }
            Err(err) => {
                warn!(%destination, error = %err, "subscribe failed");
                self.notice(NoticeLevel::Error, err.to_string());
                self.set_status(ConnectionStatus::error(err.to_string()));
            }
        }
    }

    fn on_message(&mut self, frame: Frame) {
        let destination = frame.header("destination").map(str::to_string);
        let message = Message::received(destination.as_deref(), frame.body);
        debug!(destination = %message.destination, "message received");

        let alert = (self.settings.notifications_enabled() && !self.notifier.window_focused())
            .then(|| format!("Received message on {}", message.destination));

        let cap = self.settings.max_messages();
        self.view.send_modify(|view| push_capped(&mut view.messages, message, cap));

        if let Some(body) = alert {
            self.notifier.notify(NOTIFICATION_TITLE, &body);
        }
    }

    fn schedule_reconnect(&mut self) {
        match reconnect::decide(self.attempt, self.cancelled, self.settings.auto_reconnect()) {
            ReconnectDecision::Skip => debug!("automatic reconnection skipped"),
            ReconnectDecision::Retry { attempt, delay } => {
                self.attempt = attempt;
                self.pending_retry = Some(PendingRetry {
                    attempt,
                    delay,
                    deadline: Instant::now() + delay,
                });
                debug!(attempt, delay_ms = delay.as_millis() as u64, "reconnection scheduled");
                self.notice(
                    NoticeLevel::Info,
                    format!(
                        "Reconnecting in {} seconds... (attempt {attempt}/{MAX_RECONNECT_ATTEMPTS})",
                        delay.as_secs()
                    ),
                );
            }
            ReconnectDecision::GiveUp => {
                warn!(attempts = self.attempt, "giving up on reconnection");
                self.notice(NoticeLevel::Error, "Maximum reconnection attempts reached");
            }
        }
    }

    fn retry_due(&mut self) {
        let Some(retry) = self.pending_retry.take() else {
            return;
        };
        // cancellation may have landed while the timer was pending
        if self.cancelled {
            return;
        }
        let Some(config) = self.config.clone() else {
            return;
        };

        debug!(attempt = retry.attempt, "retrying connection");
        self.open(config);
    }

    /// Returns whether an activation was in flight.
    fn abort_activation(&mut self) -> bool {
        match self.activation.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Deactivate `client` in the background.
    fn release(&self, mut client: F::Transport) {
        self.runtime.spawn(async move {
            if let Err(err) = client.deactivate().await {
                debug!(error = %err, "failed to release client");
            }
        });
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            debug!(from = %self.status, to = %status, "connection status changed");
            self.status = status.clone();
            self.view.send_modify(|view| view.status = status);
        }
    }

    fn notice(&self, level: NoticeLevel, text: impl Into<String>) {
        let Some(tx) = &self.notice_tx else {
            return;
        };
        if let Err(std_mpsc::TrySendError::Full(notice)) = tx.try_send(Notice::new(level, text)) {
            debug!(text = %notice.text, "notice dropped, receiver is full");
        }
    }
}
