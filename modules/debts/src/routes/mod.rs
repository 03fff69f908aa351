pub mod debts;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::health::health;
use crate::repos::DebtStore;
use crate::services::debt_engine::DebtCalculationEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DebtCalculationEngine>,
    pub store: Arc<dyn DebtStore>,
}

pub fn debts_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/debts", get(debts::list_debts))
        .route("/api/debts/calculate", post(debts::calculate_debts))
        .route("/api/debts/recalculate-current", post(debts::recalculate_current))
        .route("/api/debts/{debt_id}/payments", post(debts::record_payment))
        .with_state(state)
}
