//! Configuration management.
//!
//! This module provides the operator configuration document types, the
//! environment-derived startup configuration, and config file loading.

mod settings;

pub use settings::{
    load, Config, ConfigError, GlobalSettings, ProfileConfig, RecipientConfig, RunConfig,
    SubaccountConfig, DEFAULT_REPORT_DAYS,
};
