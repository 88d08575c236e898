// src/core/mod.rs — Session engine: orchestration, sweeps, budget, breaker

pub mod breaker;
pub mod cost;
pub mod ledger;
pub mod script;
pub mod session;
pub mod sweep;
pub mod types;
