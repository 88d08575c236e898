// src/store/mod.rs — Persistence layer

pub mod schema;
#[allow(clippy::module_inception)]
pub mod store;

pub use store::Store;
