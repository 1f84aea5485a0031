//! SQLite-backed cache registry.
//!
//! This module provides named, versioned partitions of request -> response
//! entries, persisted in SQLite with async access via tokio-rusqlite. It
//! supports:
//!
//! - Request-addressed keys using SHA-256 hashing of method and URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Whole-partition deletion as the only eviction mechanism

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod names;
pub mod partition;
pub mod registry;

pub use crate::Error;

pub use connection::CacheDb;
pub use names::{CacheNames, PartitionKind};
pub use partition::{EntryKey, Partition};
pub use registry::PartitionStats;
