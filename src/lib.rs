//! Tenant DB Engine Library
//!
//! A multi-tenant schema and record engine over PostgreSQL. Each tenant is its
//! own database; callers define tables and columns at runtime and run generic
//! record CRUD against them through [`TenantEngine`].

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod validate;

pub use config::Config;
pub use engine::TenantEngine;
pub use error::{DbError, DbResult, ErrorResponse};
