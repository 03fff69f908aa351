//! Debt API Routes
//!
//! Manual calculation triggers, the real-time recalculation hook, month
//! listings and payment marking.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::models::{
    CalculateDebtsRequest, DebtEntryResponse, ErrorResponse, RecordPaymentRequest,
};
use crate::money::decimal_to_minor;
use crate::period::BillingMonth;
use crate::repos::StoreError;
use crate::services::debt_engine::{DebtError, RunOutcome, RunSummary};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.into(),
        }),
    )
}

fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::DebtNotFound(id) => {
            api_error(StatusCode::NOT_FOUND, "not_found", format!("Debt entry {} not found", id))
        }
        other => {
            tracing::error!(error = %other, "Debt store error");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "database_error", "Debt store operation failed")
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CalculationResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: i32,
    pub month: u32,
}

/// POST /api/debts/calculate - Calculate a month for every active member
pub async fn calculate_debts(
    State(state): State<AppState>,
    Json(req): Json<CalculateDebtsRequest>,
) -> Result<(StatusCode, Json<CalculationResponse>), ApiError> {
    BillingMonth::new(req.year, req.month)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "invalid_period", e.to_string()))?;

    match state.engine.calculate_monthly_debts(req.year, req.month).await {
        Ok(RunOutcome::Completed(summary)) => Ok((
            StatusCode::OK,
            Json(CalculationResponse {
                status: "completed",
                summary: Some(summary),
            }),
        )),
        Ok(RunOutcome::Skipped) => Ok((
            StatusCode::ACCEPTED,
            Json(CalculationResponse {
                status: "skipped",
                summary: None,
            }),
        )),
        Err(DebtError::NoActiveTenant) => Err(api_error(
            StatusCode::CONFLICT,
            "no_active_tenant",
            "No active society is configured",
        )),
        Err(DebtError::InvalidPeriod(e)) => {
            Err(api_error(StatusCode::BAD_REQUEST, "invalid_period", e.to_string()))
        }
        Err(DebtError::Store(e)) => Err(store_error(e)),
    }
}

/// POST /api/debts/recalculate-current - Queue a recalculation of the open month
///
/// Never fails: the recalculation runs in the background and logs its own errors.
pub async fn recalculate_current(
    State(state): State<AppState>,
) -> (StatusCode, Json<CalculationResponse>) {
    state.engine.trigger_current_month_recalculation();
    (
        StatusCode::ACCEPTED,
        Json(CalculationResponse {
            status: "accepted",
            summary: None,
        }),
    )
}

/// GET /api/debts?year=&month= - Ledger rows of the active society for one month
pub async fn list_debts(
    State(state): State<AppState>,
    Query(params): Query<MonthQuery>,
) -> Result<Json<Vec<DebtEntryResponse>>, ApiError> {
    let period = BillingMonth::new(params.year, params.month)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "invalid_period", e.to_string()))?;

    let society = state
        .store
        .find_active_society()
        .await
        .map_err(store_error)?
        .ok_or_else(|| {
            api_error(StatusCode::CONFLICT, "no_active_tenant", "No active society is configured")
        })?;

    let debts = state
        .store
        .list_debts_for_month(society.id, &period.label())
        .await
        .map_err(store_error)?;

    Ok(Json(debts.into_iter().map(DebtEntryResponse::from).collect()))
}

/// POST /api/debts/{debt_id}/payments - Record a payment against an entry
pub async fn record_payment(
    State(state): State<AppState>,
    Path(debt_id): Path<Uuid>,
    Json(req): Json<RecordPaymentRequest>,
) -> Result<Json<DebtEntryResponse>, ApiError> {
    let amount_minor = decimal_to_minor(req.amount)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "invalid_amount", e.to_string()))?;
    if amount_minor == 0 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "invalid_amount",
            "Payment amount must be greater than zero",
        ));
    }

    let debt = state
        .store
        .mark_debt_paid(debt_id, amount_minor, state.engine.now())
        .await
        .map_err(store_error)?;

    tracing::info!(
        debt_id = %debt.id,
        member_id = %debt.member_id,
        month = %debt.month,
        status = ?debt.status,
        "Recorded debt payment"
    );

    Ok(Json(DebtEntryResponse::from(debt)))
}
