//! HTTP surface for chainpay.
//!
//! Wraps intent creation and on-chain verification in a small JSON API, with
//! intents kept in memory or in a JSON file.
//!
//! # Modules
//!
//! - [`handlers`] - Axum route handlers and router builder
//! - [`error`] - Error responses
//! - [`config`] - Server configuration with environment variable expansion
//! - [`store`] - JSON-file intent store

pub mod config;
pub mod error;
pub mod handlers;
pub mod store;

pub use handlers::{AppState, SharedState, router};
