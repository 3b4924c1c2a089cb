use std::collections::VecDeque;

use tokio::sync::oneshot;

use crate::error::SessionError;
use crate::models::connection::{ConnectionConfig, ConnectionStatus};
use crate::models::message::{ContentType, Message};

/// State the UI renders from. The session edits it in place on every change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    pub messages: VecDeque<Message>,
    pub recent_destinations: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Short user-facing feedback, shown by the UI as a toast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub(crate) fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

#[derive(Debug)]
pub(crate) enum SessionCommand {
    Connect {
        config: ConnectionConfig,
        reply: oneshot::Sender<()>,
    },
    Disconnect {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Send {
        destination: String,
        content: String,
        content_type: ContentType,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    ClearMessages,
    CancelConnection,
}
