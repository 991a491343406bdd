//! Data models for the tenant database engine.
//!
//! This module re-exports all model types used throughout the crate.

pub mod record;
pub mod schema;

// Re-export commonly used types
pub use record::{Record, RecordFilter, RecordValue, Row};
pub use schema::{ColumnDescriptor, LiveColumnInfo, TableData, TableDescriptor, TableUsage};
