//! Monthly debt calculation engine
//!
//! For one billing month, sums every active member's bar consumption,
//! reservations, kitchen uses and subscription dues and upserts one `debts`
//! row per member. Recalculating a month is idempotent: only the amount
//! components and the total are overwritten, payment status is preserved.
//!
//! Runs are single-flight per engine. Members are processed independently
//! through a bounded pool; a failing member is logged and skipped without
//! aborting the rest of the run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::FutureExt;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::models::{DebtAmounts, Member, NewDebtEntry, Society};
use crate::money::format_minor;
use crate::period::{BillingMonth, MonthWindow, PeriodError};
use crate::repos::{DebtStore, StoreError};
use crate::services::run_guard::RunGuard;
use crate::services::subscription_charge::charge_for_month;

/// Errors that abort a whole calculation run
#[derive(Debug, Error)]
pub enum DebtError {
    #[error("No active tenant configured")]
    NoActiveTenant,

    #[error("Invalid billing period: {0}")]
    InvalidPeriod(#[from] PeriodError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Failure confined to a single member; the run carries on without it
#[derive(Debug, Error)]
#[error("Failed to process member {member_id}: {source}")]
pub struct MemberProcessingError {
    pub member_id: Uuid,
    #[source]
    pub source: StoreError,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Members processed concurrently within one run
    pub member_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            member_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub month: String,
    pub members_total: usize,
    pub members_processed: usize,
    pub members_failed: usize,
    pub entries_created: usize,
    pub entries_updated: usize,
    pub total_amount_minor: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another calculation was in flight; nothing was written
    Skipped,
    Completed(RunSummary),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatchupOutcome {
    /// Entries already exist for the previous month
    AlreadyCalculated { month: String },
    Ran(RunOutcome),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberOutcome {
    Created(i64),
    Updated(i64),
    NoActivity,
}

pub struct DebtCalculationEngine {
    store: Arc<dyn DebtStore>,
    clock: Arc<dyn Clock>,
    guard: RunGuard,
    config: EngineConfig,
}

impl DebtCalculationEngine {
    pub fn new(store: Arc<dyn DebtStore>, config: EngineConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    pub fn with_clock(store: Arc<dyn DebtStore>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self {
            store,
            clock,
            guard: RunGuard::new(),
            config,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    /// Calculate and upsert every active member's debt for `year`-`month`
    ///
    /// Returns `RunOutcome::Skipped` without touching the store when another
    /// run holds the guard. Fails with `DebtError::NoActiveTenant` when no
    /// society is active.
    pub async fn calculate_monthly_debts(&self, year: i32, month: u32) -> Result<RunOutcome, DebtError> {
        let period = BillingMonth::new(year, month)?;

        let Some(_permit) = self.guard.try_acquire() else {
            tracing::info!(month = %period, "Debt calculation already running, skipping");
            return Ok(RunOutcome::Skipped);
        };

        let summary = self.run(period).await?;
        Ok(RunOutcome::Completed(summary))
    }

    async fn run(&self, period: BillingMonth) -> Result<RunSummary, DebtError> {
        let society = self
            .store
            .find_active_society()
            .await?
            .ok_or(DebtError::NoActiveTenant)?;

        let members = self.store.list_active_members(society.id).await?;
        let window = period.window();

        tracing::info!(
            society_id = %society.id,
            month = %period,
            members = members.len(),
            "Starting debt calculation"
        );

        let results: Vec<Result<MemberOutcome, MemberProcessingError>> = stream::iter(members.iter())
            .map(|member| self.process_member(&society, member, period, window))
            .buffer_unordered(self.config.member_concurrency.max(1))
            .collect::<Vec<_>>()
            .boxed()
            .await;

        let mut summary = RunSummary {
            month: period.label(),
            members_total: members.len(),
            members_processed: 0,
            members_failed: 0,
            entries_created: 0,
            entries_updated: 0,
            total_amount_minor: 0,
        };

        for result in results {
            match result {
                Ok(outcome) => {
                    summary.members_processed += 1;
                    match outcome {
                        MemberOutcome::Created(total) => {
                            summary.entries_created += 1;
                            summary.total_amount_minor += total;
                        }
                        MemberOutcome::Updated(total) => {
                            summary.entries_updated += 1;
                            summary.total_amount_minor += total;
                        }
                        MemberOutcome::NoActivity => {}
                    }
                }
                Err(e) => {
                    summary.members_failed += 1;
                    tracing::error!(
                        member_id = %e.member_id,
                        month = %period,
                        error = %e.source,
                        "Failed to calculate member debt"
                    );
                }
            }
        }

        tracing::info!(
            society_id = %society.id,
            month = %summary.month,
            processed = summary.members_processed,
            members_total = summary.members_total,
            failed = summary.members_failed,
            created = summary.entries_created,
            updated = summary.entries_updated,
            total_amount = %format_minor(summary.total_amount_minor),
            "Debt calculation completed"
        );

        Ok(summary)
    }

    async fn process_member(
        &self,
        society: &Society,
        member: &Member,
        period: BillingMonth,
        window: MonthWindow,
    ) -> Result<MemberOutcome, MemberProcessingError> {
        let fail = |source: StoreError| MemberProcessingError {
            member_id: member.id,
            source,
        };

        let (consumption_minor, reservations, subscription_minor) = tokio::try_join!(
            self.store.sum_consumptions(member.id, society.id, window),
            self.store.reservation_totals(member.id, society.id, window),
            async {
                Ok::<i64, StoreError>(
                    self.calculate_subscription_charge(member.id, society.id, period.year(), period.month())
                        .await,
                )
            },
        )
        .map_err(fail)?;

        let amounts = DebtAmounts {
            consumption_minor,
            reservation_minor: reservations.amount_minor,
            kitchen_minor: reservations.kitchen_uses * society.kitchen_fee_per_use_minor,
            subscription_minor,
        };
        let total = amounts.total_minor();

        if total <= 0 {
            tracing::debug!(member_id = %member.id, month = %period, "No chargeable activity");
            return Ok(MemberOutcome::NoActivity);
        }

        let label = period.label();
        if let Some(existing) = self
            .store
            .find_debt(member.id, society.id, &label)
            .await
            .map_err(fail)?
        {
            self.store
                .update_debt_amounts(existing.id, amounts)
                .await
                .map_err(fail)?;
            tracing::debug!(member_id = %member.id, month = %label, total = %format_minor(total), "Updated debt entry");
            return Ok(MemberOutcome::Updated(total));
        }

        let new_entry = NewDebtEntry {
            member_id: member.id,
            society_id: society.id,
            month: label.clone(),
            year: period.year(),
            month_number: period.month() as i32,
            amounts,
        };

        match self.store.insert_debt(new_entry).await {
            Ok(_) => {
                tracing::debug!(member_id = %member.id, month = %label, total = %format_minor(total), "Created debt entry");
                Ok(MemberOutcome::Created(total))
            }
            // Another writer created the row between our lookup and insert
            Err(StoreError::DuplicateDebt { .. }) => {
                let existing = self
                    .store
                    .find_debt(member.id, society.id, &label)
                    .await
                    .map_err(fail)?
                    .ok_or_else(|| {
                        fail(StoreError::Unavailable(format!(
                            "debt entry for {} vanished after conflict",
                            label
                        )))
                    })?;
                self.store
                    .update_debt_amounts(existing.id, amounts)
                    .await
                    .map_err(fail)?;
                Ok(MemberOutcome::Updated(total))
            }
            Err(e) => Err(fail(e)),
        }
    }

    /// Subscription fee the member owes in `month`, in minor units
    ///
    /// Lookup failures are logged and count as no charge.
    pub async fn calculate_subscription_charge(
        &self,
        member_id: Uuid,
        society_id: Uuid,
        year: i32,
        month: u32,
    ) -> i64 {
        match self.store.find_member_subscription(member_id, society_id).await {
            Ok(subscription) => charge_for_month(subscription.as_ref(), month),
            Err(e) => {
                tracing::warn!(
                    member_id = %member_id,
                    year,
                    month,
                    error = %e,
                    "Subscription lookup failed, charging nothing"
                );
                0
            }
        }
    }

    /// Recalculate the month containing "now"; errors are logged, never returned
    pub async fn calculate_current_month_debts(&self) -> Option<RunOutcome> {
        let current = BillingMonth::containing(self.clock.now());
        match self.calculate_monthly_debts(current.year(), current.month()).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!(month = %current, error = %e, "Current month debt recalculation failed");
                None
            }
        }
    }

    /// Fire-and-forget variant of [`Self::calculate_current_month_debts`] for mutation handlers
    pub fn trigger_current_month_recalculation(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.calculate_current_month_debts().await;
        })
    }

    /// Run the previous month if it has no debt entries at all
    ///
    /// Only detects a wholly skipped month, not a partially completed one.
    pub async fn check_and_run_catchup_calculation(&self) -> CatchupOutcome {
        let previous = BillingMonth::containing(self.clock.now()).previous();
        let label = previous.label();

        let existing = match self.store.count_debts_for_month(&label).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(month = %label, error = %e, "Catch-up check failed");
                return CatchupOutcome::Failed;
            }
        };

        if existing > 0 {
            tracing::debug!(month = %label, existing, "Previous month already calculated");
            return CatchupOutcome::AlreadyCalculated { month: label };
        }

        tracing::info!(month = %label, "No debt entries for previous month, running catch-up");
        match self
            .calculate_monthly_debts(previous.year(), previous.month())
            .await
        {
            Ok(outcome) => CatchupOutcome::Ran(outcome),
            Err(e) => {
                tracing::error!(month = %label, error = %e, "Catch-up calculation failed");
                CatchupOutcome::Failed
            }
        }
    }
}
