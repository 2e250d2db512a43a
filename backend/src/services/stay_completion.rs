//! # Stay Completion Sweeper
//!
//! Moves CONFIRMED bookings to COMPLETED once their check-out date has
//! arrived, so finished stays stop holding dates and become reviewable
//! history without a host having to close them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::config::AppConfig;
use crate::db::MarketplaceStore;

use super::ServiceError;

/// Periodic background sweep.
///
/// ## Usage
///
/// ```rust,ignore
/// let sweeper = StayCompletionSweeper::new(store, config);
/// tokio::spawn(async move {
///     sweeper.start_sweep_loop().await;
/// });
/// ```
#[derive(Clone)]
pub struct StayCompletionSweeper {
    store: Arc<dyn MarketplaceStore>,
    config: AppConfig,
}

impl StayCompletionSweeper {
    pub fn new(store: Arc<dyn MarketplaceStore>, config: AppConfig) -> Self {
        Self { store, config }
    }

    /// Run forever. Failures are logged and the next tick tries again.
    pub async fn start_sweep_loop(&self) {
        info!(
            "Starting stay completion sweeper (interval: {}s)",
            self.config.completion_sweep_interval
        );

        let mut ticker = interval(Duration::from_secs(self.config.completion_sweep_interval.max(1)));

        loop {
            ticker.tick().await;

            if let Err(e) = self.sweep(Utc::now().date_naive()).await {
                error!("Stay completion sweep failed: {}", e);
            }
        }
    }

    /// One pass. Returns how many bookings were completed.
    pub async fn sweep(&self, today: NaiveDate) -> Result<usize, ServiceError> {
        let completed = self.store.complete_finished_stays(today).await?;
        if completed.is_empty() {
            debug!("No finished stays to complete");
        } else {
            info!("🏁 Completed {} finished stays", completed.len());
        }
        Ok(completed.len())
    }
}
