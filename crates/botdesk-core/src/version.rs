// ── Deployment version watcher ──
//
// Polls `version.json`. The first successful fetch is the baseline; any
// later fetch reporting a different version flags an update and raises a
// single banner. Fetch failures are logged and otherwise ignored.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use botdesk_api::{ApiClient, VersionInfo};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::notifications::{Notification, NotificationCenter, NotificationKind};

/// Where deployed version info comes from.
pub trait VersionSource: Send + Sync + 'static {
    fn fetch_version(&self) -> impl Future<Output = Result<VersionInfo, CoreError>> + Send;
}

impl VersionSource for ApiClient {
    async fn fetch_version(&self) -> Result<VersionInfo, CoreError> {
        Ok(ApiClient::fetch_version(self).await?)
    }
}

/// Handle to a running version poll.
pub struct VersionWatcher {
    update: watch::Receiver<Option<VersionInfo>>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl VersionWatcher {
    pub fn spawn<S: VersionSource>(
        source: Arc<S>,
        notifications: NotificationCenter,
        interval: Duration,
        parent: &CancellationToken,
    ) -> Self {
        let cancel = parent.child_token();
        let (tx, update) = watch::channel(None);
        let handle = tokio::spawn(poll_loop(
            source,
            notifications,
            interval,
            tx,
            cancel.clone(),
        ));
        Self {
            update,
            cancel,
            handle,
        }
    }

    /// The newer deployment, once one has been seen.
    pub fn update_available(&self) -> Option<VersionInfo> {
        self.update.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<VersionInfo>> {
        self.update.clone()
    }

    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

async fn poll_loop<S: VersionSource>(
    source: Arc<S>,
    notifications: NotificationCenter,
    interval: Duration,
    tx: watch::Sender<Option<VersionInfo>>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut baseline: Option<String> = None;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let info = match source.fetch_version().await {
            Ok(info) => info,
            Err(e) => {
                debug!(error = %e, "version check failed");
                continue;
            }
        };

        let Some(current) = baseline.as_deref() else {
            debug!(version = %info.version, "version baseline");
            baseline = Some(info.version);
            continue;
        };
        if current == info.version {
            continue;
        }

        let first = tx.borrow().is_none();
        if first {
            info!(from = %current, to = %info.version, "new deployment detected");
            notifications.push(
                Notification::new(
                    NotificationKind::Info,
                    "Update available",
                    format!("Version {} has been deployed", info.version),
                )
                .banner(),
            );
        }
        tx.send_replace(Some(info));
    }
    debug!("version watcher stopped");
}
