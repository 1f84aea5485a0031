//! Core types and shared functionality for the rinkorea caching worker.
//!
//! This crate provides:
//! - Cache registry (versioned partitions) with SQLite backend
//! - Request/response types shared with the worker and its hosts
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod exchange;

pub use cache::{CacheDb, CacheNames, Partition, PartitionKind, PartitionStats};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use exchange::{Destination, StoredResponse, WorkerRequest};
