use std::sync::mpsc::Receiver;

use tokio::sync::{mpsc as tokio_mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::models::ipc::{Notice, SessionCommand, SessionSnapshot};

/// UI-side handle to a spawned session task.
#[derive(Debug)]
pub struct SessionHandle {
    pub(crate) shutdown_tx: Option<oneshot::Sender<()>>,
    pub(crate) join_handle: JoinHandle<()>,
    pub(crate) command_tx: tokio_mpsc::UnboundedSender<SessionCommand>,
    pub(crate) snapshot_rx: watch::Receiver<SessionSnapshot>,
    pub(crate) notice_rx: Receiver<Notice>,
}
