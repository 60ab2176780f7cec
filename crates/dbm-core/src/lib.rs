//! # dbm-core
//!
//! Core types shared by the DBM crates.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - The top-level error type and its HTTP/status mapping
//! - Result type aliases
//! - Application configuration (database, logging, query limits)

pub mod config;
pub mod error;

pub use config::{AppConfig, ConfigError, DatabaseConfig, LoggingConfig, QueryConfig};
pub use error::{DbmError, DbmResult};
