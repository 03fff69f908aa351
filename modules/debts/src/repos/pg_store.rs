//! PostgreSQL implementation of the DebtStore trait
//!
//! Reads the club's activity ledgers and upserts the `debts` table. Every
//! ledger query is scoped by society and excludes cancelled records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{DebtStore, StoreError, StoreResult};
use crate::models::{
    DebtAmounts, DebtEntry, Member, NewDebtEntry, ReservationTotals, Society, SubscriptionType,
};
use crate::period::MonthWindow;

const DEBT_COLUMNS: &str = r#"
    id,
    member_id,
    society_id,
    month,
    year,
    month_number,
    consumption_amount_minor,
    reservation_amount_minor,
    kitchen_amount_minor,
    subscription_amount_minor,
    total_amount_minor,
    status,
    paid_amount_minor,
    paid_at,
    calculated_at,
    updated_at
"#;

#[derive(Clone)]
pub struct PgDebtStore {
    pool: PgPool,
}

impl PgDebtStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DebtStore for PgDebtStore {
    async fn find_active_society(&self) -> StoreResult<Option<Society>> {
        let society = sqlx::query_as::<_, Society>(
            r#"
            SELECT id, name, is_active, kitchen_fee_per_use_minor
            FROM societies
            WHERE is_active = TRUE
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(society)
    }

    async fn list_active_members(&self, society_id: Uuid) -> StoreResult<Vec<Member>> {
        let members = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, society_id, display_name, is_active, subscription_type_id
            FROM members
            WHERE society_id = $1
              AND is_active = TRUE
            ORDER BY display_name, id
            "#,
        )
        .bind(society_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    async fn sum_consumptions(
        &self,
        member_id: Uuid,
        society_id: Uuid,
        window: MonthWindow,
    ) -> StoreResult<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(amount_minor), 0)::BIGINT
            FROM consumptions
            WHERE member_id = $1
              AND society_id = $2
              AND status <> 'cancelled'
              AND consumed_at >= $3
              AND consumed_at <= $4
            "#,
        )
        .bind(member_id)
        .bind(society_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn reservation_totals(
        &self,
        member_id: Uuid,
        society_id: Uuid,
        window: MonthWindow,
    ) -> StoreResult<ReservationTotals> {
        let totals = sqlx::query_as::<_, ReservationTotals>(
            r#"
            SELECT
                COALESCE(SUM(amount_minor), 0)::BIGINT AS amount_minor,
                COUNT(*) FILTER (WHERE uses_kitchen)::BIGINT AS kitchen_uses
            FROM reservations
            WHERE member_id = $1
              AND society_id = $2
              AND status <> 'cancelled'
              AND reserved_at >= $3
              AND reserved_at <= $4
            "#,
        )
        .bind(member_id)
        .bind(society_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }

    async fn find_member_subscription(
        &self,
        member_id: Uuid,
        society_id: Uuid,
    ) -> StoreResult<Option<SubscriptionType>> {
        let subscription = sqlx::query_as::<_, SubscriptionType>(
            r#"
            SELECT
                st.id,
                st.society_id,
                st.name,
                st.amount_minor,
                st.period,
                st.period_months,
                st.is_active
            FROM members m
            JOIN subscription_types st ON st.id = m.subscription_type_id
            WHERE m.id = $1
              AND m.society_id = $2
            "#,
        )
        .bind(member_id)
        .bind(society_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    async fn find_debt(
        &self,
        member_id: Uuid,
        society_id: Uuid,
        month: &str,
    ) -> StoreResult<Option<DebtEntry>> {
        let sql = format!(
            "SELECT {} FROM debts WHERE member_id = $1 AND society_id = $2 AND month = $3",
            DEBT_COLUMNS
        );
        let debt = sqlx::query_as::<_, DebtEntry>(&sql)
            .bind(member_id)
            .bind(society_id)
            .bind(month)
            .fetch_optional(&self.pool)
            .await?;

        Ok(debt)
    }

    async fn insert_debt(&self, entry: NewDebtEntry) -> StoreResult<DebtEntry> {
        // The unique key guards against a concurrent insert for the same member-month
        let sql = format!(
            r#"
            INSERT INTO debts (
                member_id,
                society_id,
                month,
                year,
                month_number,
                consumption_amount_minor,
                reservation_amount_minor,
                kitchen_amount_minor,
                subscription_amount_minor,
                total_amount_minor,
                status,
                paid_amount_minor,
                calculated_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending', 0, NOW(), NOW())
            ON CONFLICT (member_id, society_id, month) DO NOTHING
            RETURNING {}
            "#,
            DEBT_COLUMNS
        );
        let debt = sqlx::query_as::<_, DebtEntry>(&sql)
            .bind(entry.member_id)
            .bind(entry.society_id)
            .bind(&entry.month)
            .bind(entry.year)
            .bind(entry.month_number)
            .bind(entry.amounts.consumption_minor)
            .bind(entry.amounts.reservation_minor)
            .bind(entry.amounts.kitchen_minor)
            .bind(entry.amounts.subscription_minor)
            .bind(entry.amounts.total_minor())
            .fetch_optional(&self.pool)
            .await?;

        debt.ok_or(StoreError::DuplicateDebt {
            member_id: entry.member_id,
            month: entry.month,
        })
    }

    async fn update_debt_amounts(
        &self,
        debt_id: Uuid,
        amounts: DebtAmounts,
    ) -> StoreResult<DebtEntry> {
        let sql = format!(
            r#"
            UPDATE debts
            SET consumption_amount_minor = $2,
                reservation_amount_minor = $3,
                kitchen_amount_minor = $4,
                subscription_amount_minor = $5,
                total_amount_minor = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            DEBT_COLUMNS
        );
        let debt = sqlx::query_as::<_, DebtEntry>(&sql)
            .bind(debt_id)
            .bind(amounts.consumption_minor)
            .bind(amounts.reservation_minor)
            .bind(amounts.kitchen_minor)
            .bind(amounts.subscription_minor)
            .bind(amounts.total_minor())
            .fetch_optional(&self.pool)
            .await?;

        debt.ok_or(StoreError::DebtNotFound(debt_id))
    }

    async fn count_debts_for_month(&self, month: &str) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM debts WHERE month = $1")
            .bind(month)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn list_debts_for_month(
        &self,
        society_id: Uuid,
        month: &str,
    ) -> StoreResult<Vec<DebtEntry>> {
        let sql = format!(
            "SELECT {} FROM debts WHERE society_id = $1 AND month = $2 ORDER BY total_amount_minor DESC, member_id",
            DEBT_COLUMNS
        );
        let debts = sqlx::query_as::<_, DebtEntry>(&sql)
            .bind(society_id)
            .bind(month)
            .fetch_all(&self.pool)
            .await?;

        Ok(debts)
    }

    async fn mark_debt_paid(
        &self,
        debt_id: Uuid,
        paid_amount_minor: i64,
        paid_at: DateTime<Utc>,
    ) -> StoreResult<DebtEntry> {
        let sql = format!(
            r#"
            UPDATE debts
            SET paid_amount_minor = paid_amount_minor + $2,
                status = CASE
                    WHEN paid_amount_minor + $2 >= total_amount_minor THEN 'paid'::debt_status
                    ELSE 'partial'::debt_status
                END,
                paid_at = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            DEBT_COLUMNS
        );
        let debt = sqlx::query_as::<_, DebtEntry>(&sql)
            .bind(debt_id)
            .bind(paid_amount_minor)
            .bind(paid_at)
            .fetch_optional(&self.pool)
            .await?;

        debt.ok_or(StoreError::DebtNotFound(debt_id))
    }
}
