//! Connection core of a desktop STOMP client.
//!
//! A [`SessionManager`] owns one STOMP-over-WebSocket session at a time,
//! tracks its [`ConnectionStatus`], buffers received [`Message`]s and retries
//! failed connections with capped exponential backoff until the user cancels.
//! The transport itself is supplied by the host through [`TransportFactory`].

pub mod client;
pub mod error;
pub mod models;
pub mod session;
pub mod transport;
pub mod utils;

pub use client::spawn_session;
pub use error::{SessionError, SettingsError, TransportError, ValidationError};
pub use models::client::SessionHandle;
pub use models::connection::{ConnectionConfig, ConnectionStatus, Header};
pub use models::ipc::{Notice, NoticeLevel, SessionSnapshot};
pub use models::message::{ContentType, Message, RecentDestinations};
pub use models::settings::{Settings, SettingsProvider, SharedSettings};
pub use session::{NOTICE_CAPACITY, SessionManager};
pub use session::notify::{NoNotifications, NotificationSink};
pub use session::reconnect::{MAX_RECONNECT_ATTEMPTS, ReconnectDecision};
pub use transport::{EventSink, Frame, Publish, Transport, TransportEvent, TransportFactory, TransportOptions};
