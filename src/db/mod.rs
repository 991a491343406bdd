//! Database layer.
//!
//! This module provides everything that talks to PostgreSQL:
//! - Per-tenant connection pools
//! - Timed statement execution
//! - Schema introspection
//! - Type classification, record type checks and row decoding
//! - DDL and record CRUD engines

pub mod ddl;
pub mod executor;
pub mod params;
pub mod pool;
pub mod records;
pub mod schema;
pub mod types;

pub use ddl::DdlEngine;
pub use executor::StatementExecutor;
pub use pool::{RegistryConfig, TenantPool, TenantPoolRegistry};
pub use records::RecordAccessEngine;
pub use schema::{DEFAULT_SCHEMA, SchemaIntrospector};
pub use types::{RowToJson, TypeCategory, categorize_type, check_value};
