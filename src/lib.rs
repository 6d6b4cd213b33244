//! Interns360 - intern lifecycle administration backend
//!
//! Accounts, role-gated REST resources and dashboard rollups over an
//! embedded SQLite store.

pub mod account;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod federation;
pub mod mailer;
pub mod server;
pub mod store;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use context::AppContext;
pub use error::{ApiError, ApiResult};
