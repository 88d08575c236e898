// src/lib.rs — Library root for scrimmage

pub mod cli;
pub mod core;
pub mod infra;
pub mod notify;
pub mod provider;
pub mod scoring;
pub mod store;
