pub mod debt_engine;
pub mod run_guard;
pub mod scheduler;
pub mod subscription_charge;
