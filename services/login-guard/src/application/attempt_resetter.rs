//! 登录成功后无条件删除两个键的记录

use cuba_ports::{AttemptKind, AttemptStore};
use std::sync::Arc;
use tracing::{error, info};

use crate::domain::normalize_email;
use crate::infrastructure::metrics;

#[derive(Clone)]
pub struct AttemptResetter {
    store: Arc<dyn AttemptStore>,
}

impl AttemptResetter {
    pub fn new(store: Arc<dyn AttemptStore>) -> Self {
        Self { store }
    }

    /// 删除 IP 与邮箱记录，幂等
    pub async fn reset(&self, ip: &str, email: &str) {
        let email = normalize_email(email);
        let (ip_result, email_result) = tokio::join!(
            self.store.delete(AttemptKind::Ip, ip),
            self.store.delete(AttemptKind::Email, &email),
        );

        let mut failed = false;
        for (kind, result) in [(AttemptKind::Ip, ip_result), (AttemptKind::Email, email_result)] {
            if let Err(e) = result {
                error!(error = %e, %kind, "Failed to reset login attempts");
                metrics::record_store_error("reset", &e);
                failed = true;
            }
        }

        if !failed {
            metrics::record_reset();
            info!(ip, "Login attempt counters cleared");
        }
    }
}
