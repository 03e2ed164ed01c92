//! mailstat - Scheduled delivery-status digest reports for subaccounts
//!
//! This crate fetches per-subaccount message delivery statuses from the
//! provider API, aggregates them into digest reports, and dispatches those
//! reports through the provider's template send endpoint. A durable
//! watermark per subaccount guarantees every status is reported exactly
//! once across runs.

pub mod config;
pub mod domain;
pub mod providers;
pub mod services;
pub mod storage;
