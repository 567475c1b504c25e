use super::NotificationSink;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A queued outbound notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Text(String),
    Photo { path: PathBuf, caption: String },
}

/// Counters reported by the notification worker when it exits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationStats {
    pub delivered: u64,
    pub failed: u64,
}

/// Fire-and-forget handle used by the recording state machine.
///
/// Sending never blocks: notifications are queued to a worker task which
/// talks to the network. A disabled notifier discards everything.
#[derive(Clone, Debug)]
pub struct Notifier {
    sender: Option<mpsc::UnboundedSender<Notification>>,
}

impl Notifier {
    /// Create a notifier and the receiving end for a worker
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// Notifier that drops every notification
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    pub fn notify_text<S: Into<String>>(&self, message: S) {
        self.dispatch(Notification::Text(message.into()));
    }

    pub fn notify_photo<P: Into<PathBuf>, S: Into<String>>(&self, path: P, caption: S) {
        self.dispatch(Notification::Photo {
            path: path.into(),
            caption: caption.into(),
        });
    }

    fn dispatch(&self, notification: Notification) {
        let Some(sender) = &self.sender else {
            debug!("Notifications disabled; dropping {:?}", notification);
            return;
        };

        if let Err(e) = sender.send(notification) {
            warn!("Notification worker is gone; dropping {:?}", e.0);
        }
    }
}

/// Deliver queued notifications in order until every `Notifier` is dropped
pub async fn run_notification_worker(
    mut receiver: mpsc::UnboundedReceiver<Notification>,
    sink: Arc<dyn NotificationSink>,
) -> NotificationStats {
    info!("Notification worker started");
    let mut stats = NotificationStats::default();

    while let Some(notification) = receiver.recv().await {
        let delivered = match &notification {
            Notification::Text(message) => sink.send_text(message).await,
            Notification::Photo { path, caption } => sink.send_photo(path, caption).await,
        };

        if delivered {
            debug!("Delivered notification {:?}", notification);
            stats.delivered += 1;
        } else {
            warn!("Notification not delivered: {:?}", notification);
            stats.failed += 1;
        }
    }

    info!(
        "Notification worker stopped ({} delivered, {} failed)",
        stats.delivered, stats.failed
    );
    stats
}

/// Spawn the worker on the current runtime and return its handle
pub fn spawn_notification_worker(
    sink: Arc<dyn NotificationSink>,
) -> (Notifier, JoinHandle<NotificationStats>) {
    let (notifier, receiver) = Notifier::channel();
    let handle = tokio::spawn(run_notification_worker(receiver, sink));
    (notifier, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::Path;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<Notification>>,
        succeed: bool,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send_text(&self, message: &str) -> bool {
            self.calls
                .lock()
                .push(Notification::Text(message.to_string()));
            self.succeed
        }

        async fn send_photo(&self, path: &Path, caption: &str) -> bool {
            self.calls.lock().push(Notification::Photo {
                path: path.to_path_buf(),
                caption: caption.to_string(),
            });
            self.succeed
        }
    }

    #[tokio::test]
    async fn test_worker_delivers_in_order() {
        let sink = Arc::new(RecordingSink {
            succeed: true,
            ..Default::default()
        });
        let (notifier, handle) = spawn_notification_worker(sink.clone());

        notifier.notify_text("started");
        notifier.notify_photo("photos/snap.jpg", "Snapshot");
        notifier.notify_text("ended");
        drop(notifier);

        let stats = handle.await.unwrap();
        assert_eq!(stats.delivered, 3);
        assert_eq!(stats.failed, 0);

        let calls = sink.calls.lock().clone();
        assert_eq!(
            calls,
            vec![
                Notification::Text("started".to_string()),
                Notification::Photo {
                    path: PathBuf::from("photos/snap.jpg"),
                    caption: "Snapshot".to_string(),
                },
                Notification::Text("ended".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_worker_counts_failures() {
        let sink = Arc::new(RecordingSink::default());
        let (notifier, handle) = spawn_notification_worker(sink);

        notifier.notify_text("one");
        notifier.notify_text("two");
        drop(notifier);

        let stats = handle.await.unwrap();
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.delivered, 0);
    }

    #[test]
    fn test_disabled_notifier_drops_silently() {
        let notifier = Notifier::disabled();
        assert!(!notifier.is_enabled());
        notifier.notify_text("ignored");
    }

    #[test]
    fn test_send_after_worker_exit_does_not_panic() {
        let (notifier, receiver) = Notifier::channel();
        drop(receiver);
        notifier.notify_text("nobody listening");
    }
}
