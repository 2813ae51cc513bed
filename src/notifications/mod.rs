pub mod refresh;

pub use refresh::RefreshClient;

use crate::config::Config;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Fire-and-forget refresh notifications.
///
/// Each notification runs on its own task so a slow or failing media server
/// never delays descriptor generation. Handles are kept so the scan can wait
/// for them, bounded, before the runtime shuts down.
pub struct NotificationManager {
    client: Option<Arc<RefreshClient>>,
    pending: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl NotificationManager {
    pub fn new(config: &Config) -> Self {
        Self::with_client(RefreshClient::from_config(&config.notify))
    }

    pub fn with_client(client: Option<RefreshClient>) -> Self {
        Self {
            client: client.map(Arc::new),
            pending: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Check if there is an enabled notification target
    pub fn has_targets(&self) -> bool {
        self.client.is_some()
    }

    /// Detach a refresh for a newly written descriptor.
    pub fn notify_descriptor_written(&self, descriptor: &Path) {
        let Some(client) = self.client.clone() else {
            return;
        };
        let path_display = descriptor.display().to_string();

        let handle = tokio::spawn(async move {
            match client.refresh_library().await {
                Ok(()) => {
                    tracing::info!("Library refresh triggered for: {}", path_display);
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to notify {} about {}: {}",
                        client.base_url(),
                        path_display,
                        e
                    );
                }
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
    }

    /// Wait for outstanding notifications, giving up after `limit`.
    pub async fn drain(&self, limit: Duration) {
        let handles: Vec<JoinHandle<()>> = match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => return,
        };
        if handles.is_empty() {
            return;
        }

        let count = handles.len();
        let joined = tokio::time::timeout(limit, futures::future::join_all(handles)).await;
        if joined.is_err() {
            tracing::warn!(
                "{} refresh notification(s) still running after {:?}; abandoning",
                count,
                limit
            );
        }
    }
}
