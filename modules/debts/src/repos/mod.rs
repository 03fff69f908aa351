//! Data access for the debt engine
//!
//! The engine talks to its collaborators only through [`DebtStore`]:
//! - **PgDebtStore**: production implementation on PostgreSQL (sqlx)
//! - **InMemoryDebtStore**: dev/test implementation with failure injection

pub mod inmemory_store;
pub mod pg_store;

pub use inmemory_store::InMemoryDebtStore;
pub use pg_store::PgDebtStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    DebtAmounts, DebtEntry, Member, NewDebtEntry, ReservationTotals, Society, SubscriptionType,
};
use crate::period::MonthWindow;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Debt entry not found: {0}")]
    DebtNotFound(Uuid),

    #[error("Duplicate debt entry: member_id={member_id}, month={month}")]
    DuplicateDebt { member_id: Uuid, month: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DebtStore: Send + Sync {
    /// The single society this deployment serves, if one is marked active
    async fn find_active_society(&self) -> StoreResult<Option<Society>>;

    async fn list_active_members(&self, society_id: Uuid) -> StoreResult<Vec<Member>>;

    /// Sum of non-cancelled consumption amounts within the window
    async fn sum_consumptions(
        &self,
        member_id: Uuid,
        society_id: Uuid,
        window: MonthWindow,
    ) -> StoreResult<i64>;

    /// Sum of non-cancelled reservation amounts and count of kitchen uses within the window
    async fn reservation_totals(
        &self,
        member_id: Uuid,
        society_id: Uuid,
        window: MonthWindow,
    ) -> StoreResult<ReservationTotals>;

    /// Subscription type assigned to the member, if any
    async fn find_member_subscription(
        &self,
        member_id: Uuid,
        society_id: Uuid,
    ) -> StoreResult<Option<SubscriptionType>>;

    async fn find_debt(
        &self,
        member_id: Uuid,
        society_id: Uuid,
        month: &str,
    ) -> StoreResult<Option<DebtEntry>>;

    async fn insert_debt(&self, entry: NewDebtEntry) -> StoreResult<DebtEntry>;

    /// Overwrite the four components and the total; status and payment fields are untouched
    async fn update_debt_amounts(&self, debt_id: Uuid, amounts: DebtAmounts)
        -> StoreResult<DebtEntry>;

    /// Number of debt entries (any member, any society) for a month label
    async fn count_debts_for_month(&self, month: &str) -> StoreResult<i64>;

    async fn list_debts_for_month(&self, society_id: Uuid, month: &str)
        -> StoreResult<Vec<DebtEntry>>;

    /// Record a payment against an entry; `paid` once the total is covered, else `partial`
    async fn mark_debt_paid(
        &self,
        debt_id: Uuid,
        paid_amount_minor: i64,
        paid_at: DateTime<Utc>,
    ) -> StoreResult<DebtEntry>;
}
