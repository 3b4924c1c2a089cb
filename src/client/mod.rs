use tokio::sync::{mpsc as tokio_mpsc, oneshot, watch};

use crate::error::SessionError;
use crate::models::client::SessionHandle;
use crate::models::connection::{ConnectionConfig, ConnectionStatus};
use crate::models::ipc::{Notice, SessionCommand, SessionSnapshot};
use crate::models::message::{ContentType, Message};
use crate::models::settings::SettingsProvider;
use crate::session::SessionManager;
use crate::session::notify::NotificationSink;
use crate::transport::TransportFactory;

/// Run `manager` on its runtime and hand back the UI-side handle.
///
/// The task is the session's only loop: commands from the handle, activation
/// outcomes, transport events and the retry deadline are handled one at a
/// time, in arrival order. Nothing in the loop waits on the broker handshake,
/// so a cancel is served while an attempt is still activating.
pub fn spawn_session<F, S, N>(mut manager: SessionManager<F, S, N>) -> SessionHandle
where
    F: TransportFactory,
    S: SettingsProvider,
    N: NotificationSink,
{
    let (command_tx, mut command_rx) = tokio_mpsc::unbounded_channel::<SessionCommand>();
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let notice_rx = manager.notices();
    let snapshot_rx = manager.watch();
    let runtime = manager.runtime().clone();

    let join_handle = runtime.spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    manager.shutdown().await;
                    break;
                }
                maybe_command = command_rx.recv() => {
                    let Some(command) = maybe_command else {
                        manager.shutdown().await;
                        break;
                    };
                    run_command(&mut manager, command).await;
                }
                input = manager.next_input() => manager.handle_input(input),
            }
        }
        tracing::debug!("session task stopped");
    });

    SessionHandle {
        shutdown_tx: Some(shutdown_tx),
        join_handle,
        command_tx,
        snapshot_rx,
        notice_rx,
    }
}

async fn run_command<F, S, N>(manager: &mut SessionManager<F, S, N>, command: SessionCommand)
where
    F: TransportFactory,
    S: SettingsProvider,
    N: NotificationSink,
{
    match command {
        SessionCommand::Connect { config, reply } => {
            manager.connect(config);
            let _ = reply.send(());
        }
        SessionCommand::Disconnect { reply } => {
            let _ = reply.send(manager.disconnect().await);
        }
        SessionCommand::Send {
            destination,
            content,
            content_type,
            reply,
        } => {
            let _ = reply.send(manager.send_message(&destination, &content, content_type).await);
        }
        SessionCommand::ClearMessages => manager.clear_messages(),
        SessionCommand::CancelConnection => manager.cancel_connection(),
    }
}

impl SessionHandle {
    /// Resolves once the connection attempt has been started; the outcome is
    /// reported through [`SessionHandle::status`].
    pub async fn connect(&self, config: ConnectionConfig) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Connect { config, reply }).await
    }

    pub async fn disconnect(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Disconnect { reply }).await?
    }

    pub async fn send_message(
        &self,
        destination: impl Into<String>,
        content: impl Into<String>,
        content_type: ContentType,
    ) -> Result<(), SessionError> {
        let destination = destination.into();
        let content = content.into();
        self.request(|reply| SessionCommand::Send {
            destination,
            content,
            content_type,
            reply,
        })
        .await?
    }

    pub fn clear_messages(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::ClearMessages)
    }

    pub fn cancel_connection(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::CancelConnection)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.snapshot_rx.borrow().status.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.snapshot_rx.borrow().messages.iter().cloned().collect()
    }

    pub fn recent_destinations(&self) -> Vec<String> {
        self.snapshot_rx.borrow().recent_destinations.clone()
    }

    /// Receiver that wakes whenever the session state changes.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Notices produced since the last call, oldest first.
    pub fn drain_notices(&self) -> Vec<Notice> {
        self.notice_rx.try_iter().collect()
    }

    /// Stop the session task, releasing its client, and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        let _ = (&mut self.join_handle).await;
    }

    fn stop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }

    fn command(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.command_tx.send(command).map_err(|_| SessionError::Closed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command(build(reply_tx))?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
