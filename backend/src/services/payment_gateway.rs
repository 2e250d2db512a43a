//! # Payment Gateway
//!
//! External collaborator that moves money. The rest of the service only
//! sees the [`PaymentGateway`] trait; [`MockPaymentGateway`] is the only
//! implementation shipped and never settles anything.
//!
//! ```text
//! charge(amount, currency, method, details) ──► Ok(receipt) | Err(GatewayError)
//! refund(transaction_id, amount)            ──► Ok(receipt) | Err(GatewayError)
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::PaymentMethod;

/// Successful gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReceipt {
    pub transaction_id: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// The gateway refused the operation.
    #[error("{0}")]
    Declined(String),

    /// The gateway could not be reached or failed internally.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(
        &self,
        amount: i64,
        currency: &str,
        method: PaymentMethod,
        details: &serde_json::Value,
    ) -> Result<GatewayReceipt, GatewayError>;

    async fn refund(&self, transaction_id: &str, amount: i64) -> Result<GatewayReceipt, GatewayError>;
}

/// Simulated gateway with a fixed latency.
///
/// Declines negative amounts; everything else succeeds with a
/// `mock_txn_*` / `mock_ref_*` transaction id.
#[derive(Debug, Clone)]
pub struct MockPaymentGateway {
    latency: Duration,
}

impl MockPaymentGateway {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    fn reference(prefix: &str) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), &suffix[..9])
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn charge(
        &self,
        amount: i64,
        currency: &str,
        method: PaymentMethod,
        details: &serde_json::Value,
    ) -> Result<GatewayReceipt, GatewayError> {
        debug!("Mock charge {} {} via {} ({})", amount, currency, method, details);
        tokio::time::sleep(self.latency).await;

        if amount < 0 {
            return Err(GatewayError::Declined("Invalid amount".to_string()));
        }

        let transaction_id = Self::reference("mock_txn");
        info!("💳 Mock charge approved: {} {} ({})", amount, currency, transaction_id);
        Ok(GatewayReceipt { transaction_id })
    }

    async fn refund(&self, transaction_id: &str, amount: i64) -> Result<GatewayReceipt, GatewayError> {
        tokio::time::sleep(self.latency).await;

        let refund_id = Self::reference("mock_ref");
        info!("↩️  Mock refund of {} for {} ({})", amount, transaction_id, refund_id);
        Ok(GatewayReceipt {
            transaction_id: refund_id,
        })
    }
}
