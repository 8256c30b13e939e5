//! 过期记录定期清理
//!
//! 按固定间隔删除滑出窗口且没有生效锁定的尝试记录。

use chrono::{DateTime, Utc};
use cuba_errors::AppResult;
use cuba_ports::{AttemptKind, AttemptStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::domain::attempt_window;

pub struct CleanupTask {
    store: Arc<dyn AttemptStore>,
    interval: Duration,
}

impl CleanupTask {
    pub fn new(store: Arc<dyn AttemptStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "Cleanup task started");
            let mut ticker = interval(self.interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_cleanup(Utc::now()).await {
                            error!(error = %e, "Failed to run periodic cleanup");
                        }
                    }
                    _ = shutdown.cancelled() => {
                        info!("Cleanup task received shutdown signal");
                        break;
                    }
                }
            }
            info!("Cleanup task stopped");
        })
    }

    /// 清理两个集合中窗口外的记录，返回删除总数
    pub async fn run_cleanup(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let cutoff = now - attempt_window();
        let mut purged = 0;

        for kind in AttemptKind::ALL {
            let count = self.store.purge_stale(kind, cutoff, now).await?;
            if count > 0 {
                info!(%kind, count, "Purged stale login attempts");
            }
            purged += count;
        }

        Ok(purged)
    }
}
