/// Desktop notification hook provided by the host window.
pub trait NotificationSink: Send + Sync + 'static {
    /// Best-effort; implementations swallow their own failures.
    fn notify(&self, title: &str, body: &str);

    fn window_focused(&self) -> bool;
}

/// Sink for hosts without desktop notifications.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoNotifications;

impl NotificationSink for NoNotifications {
    fn notify(&self, _title: &str, _body: &str) {}

    fn window_focused(&self) -> bool {
        true
    }
}
