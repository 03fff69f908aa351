//! Month-rollover scheduler
//!
//! Ticks on a fixed interval. When the clock has moved into a new month since
//! the last tick, the month just closed is calculated. The open month is kept
//! fresh by the real-time recalculation hook instead.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::period::BillingMonth;
use crate::services::debt_engine::{DebtCalculationEngine, RunOutcome};

pub struct MonthlyScheduler {
    engine: Arc<DebtCalculationEngine>,
    last_seen: BillingMonth,
}

impl MonthlyScheduler {
    pub fn new(engine: Arc<DebtCalculationEngine>) -> Self {
        let last_seen = BillingMonth::containing(engine.now());
        Self { engine, last_seen }
    }

    /// Check for a month rollover and calculate the closed month if one happened
    ///
    /// Returns `None` when the month has not changed or the run failed.
    pub async fn tick(&mut self) -> Option<RunOutcome> {
        let current = BillingMonth::containing(self.engine.now());
        if current == self.last_seen {
            return None;
        }

        let closed = current.previous();
        tracing::info!(month = %closed, "Month rolled over, calculating closed month");

        let result = self
            .engine
            .calculate_monthly_debts(closed.year(), closed.month())
            .await;

        match result {
            // A skipped run is retried on the next tick
            Ok(RunOutcome::Skipped) => Some(RunOutcome::Skipped),
            Ok(outcome) => {
                self.last_seen = current;
                Some(outcome)
            }
            Err(e) => {
                tracing::error!(month = %closed, error = %e, "Scheduled debt calculation failed");
                self.last_seen = current;
                None
            }
        }
    }
}

/// Spawn the scheduler loop on the current runtime
pub fn spawn_monthly_scheduler(engine: Arc<DebtCalculationEngine>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut scheduler = MonthlyScheduler::new(engine);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_secs = interval.as_secs(), "Debt scheduler started");

        loop {
            ticker.tick().await;
            scheduler.tick().await;
        }
    })
}
