use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::format_minor;

// ============================================================================
// Society (tenant)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Society {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub kitchen_fee_per_use_minor: i64,
}

// ============================================================================
// Member
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Member {
    pub id: Uuid,
    pub society_id: Uuid,
    pub display_name: String,
    pub is_active: bool,
    pub subscription_type_id: Option<Uuid>,
}

// ============================================================================
// Subscription Type
// ============================================================================

/// Recurrence period matching database recurrence_period
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "recurrence_period", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePeriod {
    Monthly,
    Quarterly,
    Yearly,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubscriptionType {
    pub id: Uuid,
    pub society_id: Uuid,
    pub name: String,
    pub amount_minor: i64,
    pub period: RecurrencePeriod,
    /// Only meaningful for `RecurrencePeriod::Custom`
    pub period_months: Option<i32>,
    pub is_active: bool,
}

// ============================================================================
// Activity ledgers (read-only from the engine's point of view)
// ============================================================================

/// Status shared by consumptions and reservations; only `cancelled` matters here
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Confirmed,
    Closed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ConsumptionRecord {
    pub id: Uuid,
    pub member_id: Uuid,
    pub society_id: Uuid,
    pub amount_minor: i64,
    pub consumed_at: DateTime<Utc>,
    pub status: RecordStatus,
}

#[derive(Debug, Clone)]
pub struct ReservationRecord {
    pub id: Uuid,
    pub member_id: Uuid,
    pub society_id: Uuid,
    pub amount_minor: i64,
    pub reserved_at: DateTime<Utc>,
    pub uses_kitchen: bool,
    pub status: RecordStatus,
}

/// Aggregated reservation figures for one member within one window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct ReservationTotals {
    pub amount_minor: i64,
    pub kitchen_uses: i64,
}

// ============================================================================
// Debt entry
// ============================================================================

/// Debt status enum matching database debt_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "debt_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    Pending,
    Paid,
    Partial,
}

/// The four charge components of one member-month
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebtAmounts {
    pub consumption_minor: i64,
    pub reservation_minor: i64,
    pub kitchen_minor: i64,
    pub subscription_minor: i64,
}

impl DebtAmounts {
    pub fn total_minor(&self) -> i64 {
        self.consumption_minor + self.reservation_minor + self.kitchen_minor + self.subscription_minor
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DebtEntry {
    pub id: Uuid,
    pub member_id: Uuid,
    pub society_id: Uuid,
    /// "YYYY-MM"
    pub month: String,
    pub year: i32,
    pub month_number: i32,
    pub consumption_amount_minor: i64,
    pub reservation_amount_minor: i64,
    pub kitchen_amount_minor: i64,
    pub subscription_amount_minor: i64,
    pub total_amount_minor: i64,
    pub status: DebtStatus,
    pub paid_amount_minor: i64,
    pub paid_at: Option<DateTime<Utc>>,
    pub calculated_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DebtEntry {
    pub fn amounts(&self) -> DebtAmounts {
        DebtAmounts {
            consumption_minor: self.consumption_amount_minor,
            reservation_minor: self.reservation_amount_minor,
            kitchen_minor: self.kitchen_amount_minor,
            subscription_minor: self.subscription_amount_minor,
        }
    }
}

/// Insert payload for a first calculation of a member-month
#[derive(Debug, Clone)]
pub struct NewDebtEntry {
    pub member_id: Uuid,
    pub society_id: Uuid,
    pub month: String,
    pub year: i32,
    pub month_number: i32,
    pub amounts: DebtAmounts,
}

// ============================================================================
// API Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateDebtsRequest {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPaymentRequest {
    /// e.g. "45.50"; at most two decimal places
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtEntryResponse {
    pub id: Uuid,
    pub member_id: Uuid,
    pub society_id: Uuid,
    pub month: String,
    pub year: i32,
    pub month_number: i32,
    pub consumption_amount: String,
    pub reservation_amount: String,
    pub kitchen_amount: String,
    pub subscription_amount: String,
    pub total_amount: String,
    pub status: DebtStatus,
    pub paid_amount: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub calculated_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DebtEntry> for DebtEntryResponse {
    fn from(entry: DebtEntry) -> Self {
        Self {
            id: entry.id,
            member_id: entry.member_id,
            society_id: entry.society_id,
            consumption_amount: format_minor(entry.consumption_amount_minor),
            reservation_amount: format_minor(entry.reservation_amount_minor),
            kitchen_amount: format_minor(entry.kitchen_amount_minor),
            subscription_amount: format_minor(entry.subscription_amount_minor),
            total_amount: format_minor(entry.total_amount_minor),
            paid_amount: format_minor(entry.paid_amount_minor),
            month: entry.month,
            year: entry.year,
            month_number: entry.month_number,
            status: entry.status,
            paid_at: entry.paid_at,
            calculated_at: entry.calculated_at,
            updated_at: entry.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debt_amounts_total() {
        let amounts = DebtAmounts {
            consumption_minor: 4550,
            reservation_minor: 12000,
            kitchen_minor: 300,
            subscription_minor: 0,
        };
        assert_eq!(amounts.total_minor(), 16850);
        assert_eq!(DebtAmounts::default().total_minor(), 0);
    }

    #[test]
    fn test_debt_entry_response_formats_amounts() {
        let now = Utc::now();
        let entry = DebtEntry {
            id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            society_id: Uuid::new_v4(),
            month: "2025-11".to_string(),
            year: 2025,
            month_number: 11,
            consumption_amount_minor: 4550,
            reservation_amount_minor: 12000,
            kitchen_amount_minor: 300,
            subscription_amount_minor: 0,
            total_amount_minor: 16850,
            status: DebtStatus::Pending,
            paid_amount_minor: 0,
            paid_at: None,
            calculated_at: now,
            updated_at: now,
        };

        let response = DebtEntryResponse::from(entry);
        assert_eq!(response.consumption_amount, "45.50");
        assert_eq!(response.total_amount, "168.50");
        assert_eq!(response.subscription_amount, "0.00");
        assert_eq!(response.paid_amount, "0.00");
    }
}
