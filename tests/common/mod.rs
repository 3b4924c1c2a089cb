#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use stompui::{
    ConnectionConfig, EventSink, Frame, NotificationSink, Publish, SessionManager, Settings, SharedSettings, Transport,
    TransportError, TransportEvent, TransportFactory, TransportOptions,
};
use tokio::runtime::Handle;

pub const BROKER_URL: &str = "ws://localhost:15674/ws";
pub const SUBSCRIPTION: &str = "/topic/updates";

pub type TestManager = SessionManager<MockFactory, SharedSettings, RecordingNotifier>;

#[derive(Debug, Default)]
pub struct BrokerState {
    pub built: Vec<TransportOptions>,
    pub sinks: Vec<EventSink>,
    pub activations: usize,
    pub deactivations: usize,
    /// Active clients released by being dropped instead of deactivated.
    pub dropped: usize,
    pub live: usize,
    pub max_live: usize,
    pub subscriptions: Vec<String>,
    pub published: Vec<Publish>,
    pub fail_next_activation: Option<String>,
    pub fail_publish: Option<String>,
    pub fail_deactivate: bool,
    /// How long each activation takes before it resolves.
    pub activation_delay: Option<Duration>,
}

/// Shared record of everything the session asked its transports to do.
#[derive(Clone, Debug, Default)]
pub struct MockBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MockBroker {
    pub fn state(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap()
    }

    pub fn factory(&self) -> MockFactory {
        MockFactory { broker: self.clone() }
    }

    /// Emit `event` from the most recently built client.
    pub fn emit(&self, event: TransportEvent) {
        let sink = self.state().sinks.last().cloned().expect("no client built yet");
        sink.emit(event);
    }

    /// Emit `event` from the `index`-th client ever built.
    pub fn emit_from(&self, index: usize, event: TransportEvent) {
        let sink = self.state().sinks[index].clone();
        sink.emit(event);
    }

    pub fn deliver(&self, destination: Option<&str>, body: &str) {
        let mut frame = Frame::new(body);
        if let Some(destination) = destination {
            frame = frame.with_header("destination", destination);
        }
        self.emit(TransportEvent::Message(frame));
    }

    pub fn built(&self) -> usize {
        self.state().built.len()
    }

    pub fn live(&self) -> usize {
        self.state().live
    }

    pub fn max_live(&self) -> usize {
        self.state().max_live
    }
}

#[derive(Debug)]
pub struct MockFactory {
    broker: MockBroker,
}

impl TransportFactory for MockFactory {
    type Transport = MockTransport;

    fn build(&mut self, options: TransportOptions, events: EventSink) -> Result<MockTransport, TransportError> {
        let mut state = self.broker.state();
        state.built.push(options);
        state.sinks.push(events);
        Ok(MockTransport {
            broker: self.broker.clone(),
            active: false,
        })
    }
}

#[derive(Debug)]
pub struct MockTransport {
    broker: MockBroker,
    active: bool,
}

impl Transport for MockTransport {
    async fn activate(&mut self) -> Result<(), TransportError> {
        let delay = self.broker.state().activation_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.broker.state();
        if let Some(reason) = state.fail_next_activation.take() {
            return Err(TransportError::Activate(reason));
        }
        state.activations += 1;
        state.live += 1;
        state.max_live = state.max_live.max(state.live);
        self.active = true;
        Ok(())
    }

    async fn deactivate(&mut self) -> Result<(), TransportError> {
        let mut state = self.broker.state();
        if self.active {
            self.active = false;
            state.deactivations += 1;
            state.live -= 1;
        }
        if state.fail_deactivate {
            return Err(TransportError::Deactivate("socket already gone".to_string()));
        }
        Ok(())
    }

    fn subscribe(&mut self, destination: &str) -> Result<(), TransportError> {
        self.broker.state().subscriptions.push(destination.to_string());
        Ok(())
    }

    async fn publish(&mut self, publish: Publish) -> Result<(), TransportError> {
        let mut state = self.broker.state();
        if let Some(reason) = state.fail_publish.clone() {
            return Err(TransportError::Publish {
                destination: publish.destination,
                reason,
            });
        }
        state.published.push(publish);
        Ok(())
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        if self.active
            && let Ok(mut state) = self.broker.state.lock()
        {
            state.dropped += 1;
            state.live -= 1;
        }
    }
}

#[derive(Debug, Default)]
struct NotifierState {
    focused: bool,
    sent: Vec<(String, String)>,
}

#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    state: Arc<Mutex<NotifierState>>,
}

impl RecordingNotifier {
    pub fn set_focused(&self, focused: bool) {
        self.state.lock().unwrap().focused = focused;
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().sent.clone()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) {
        self.state.lock().unwrap().sent.push((title.to_string(), body.to_string()));
    }

    fn window_focused(&self) -> bool {
        self.state.lock().unwrap().focused
    }
}

pub struct Harness {
    pub broker: MockBroker,
    pub settings: SharedSettings,
    pub notifier: RecordingNotifier,
    pub manager: TestManager,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let broker = MockBroker::default();
        let settings = SharedSettings::new(settings);
        let notifier = RecordingNotifier::default();
        let manager = SessionManager::new(&Handle::current(), broker.factory(), settings.clone(), notifier.clone());
        Self {
            broker,
            settings,
            notifier,
            manager,
        }
    }

    /// Connect and wait until the new client is activated.
    pub async fn start(&mut self) {
        self.manager.connect(config());
        self.manager.step().await;
    }

    /// Connect and let the broker accept the session.
    pub async fn connected(&mut self) {
        self.start().await;
        self.broker.emit(TransportEvent::Connected);
        self.manager.pump();
    }

    /// Make the current client fail at the socket level and handle it.
    pub fn drop_transport(&mut self) {
        self.broker
            .emit(TransportEvent::TransportError("connection reset".to_string()));
        self.manager.pump();
    }

    /// Wait for the pending retry to fire, then for its activation.
    pub async fn retry(&mut self) {
        self.manager.step().await;
        self.manager.step().await;
    }
}

pub fn config() -> ConnectionConfig {
    ConnectionConfig::new(BROKER_URL, SUBSCRIPTION)
}
