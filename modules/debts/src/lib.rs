pub mod clock;
pub mod config;
pub mod db;
pub mod health;
pub mod models;
pub mod money;
pub mod period;
pub mod repos;
pub mod routes;
pub mod services;

pub use services::debt_engine::{
    CatchupOutcome, DebtCalculationEngine, DebtError, EngineConfig, RunOutcome, RunSummary,
};
