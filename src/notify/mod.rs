mod dispatch;
mod telegram;

pub use dispatch::{
    run_notification_worker, spawn_notification_worker, Notification, NotificationStats,
    Notifier,
};
pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use std::path::Path;

/// Outbound push-notification transport.
///
/// Implementations report failure as `false` and never return errors: missing
/// credentials, missing files and transport failures are all just `false`.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_text(&self, message: &str) -> bool;

    async fn send_photo(&self, path: &Path, caption: &str) -> bool;
}
