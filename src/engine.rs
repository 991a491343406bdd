//! Tenant-scoped entry point.
//!
//! [`TenantEngine`] is what a transport layer (HTTP controller, CLI, job runner)
//! holds. Each operation resolves the tenant's pool from the registry and then
//! delegates to the DDL engine, the record engine or the schema introspector.

use crate::config::Config;
use crate::db::{
    DdlEngine, RecordAccessEngine, RegistryConfig, SchemaIntrospector, StatementExecutor,
    TenantPool, TenantPoolRegistry,
};
use crate::error::{DbError, DbResult};
use crate::models::{
    ColumnDescriptor, LiveColumnInfo, Record, RecordFilter, RecordValue, Row, TableData,
    TableDescriptor, TableUsage,
};
use std::sync::Arc;
use tracing::debug;

/// Schema, DDL and record operations for every tenant on one server.
#[derive(Debug, Clone)]
pub struct TenantEngine {
    registry: Arc<TenantPoolRegistry>,
    introspector: SchemaIntrospector,
    ddl: DdlEngine,
    records: RecordAccessEngine,
}

impl TenantEngine {
    /// Create an engine with a fresh pool registry.
    ///
    /// Must be called inside a Tokio runtime when idle eviction is configured.
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_registry(TenantPoolRegistry::new(config))
    }

    /// Create an engine over an existing registry.
    pub fn with_registry(registry: Arc<TenantPoolRegistry>) -> Self {
        let executor = StatementExecutor::new(registry.statement_timeout())
            .with_acquire_timeout(registry.config().acquire_timeout());
        Self {
            registry,
            introspector: SchemaIntrospector::new(executor),
            ddl: DdlEngine::new(executor),
            records: RecordAccessEngine::new(executor),
        }
    }

    pub fn from_config(config: &Config) -> DbResult<Self> {
        let registry_config = RegistryConfig::from_config(config).map_err(DbError::invalid_input)?;
        Ok(Self::new(registry_config))
    }

    pub fn registry(&self) -> &Arc<TenantPoolRegistry> {
        &self.registry
    }

    async fn pool(&self, tenant: &str) -> DbResult<TenantPool> {
        debug!(tenant = %tenant, "Resolving tenant pool");
        self.registry.get_or_create(tenant).await
    }

    // -------------------------------------------------------------------------
    // Schema
    // -------------------------------------------------------------------------

    pub async fn create_table(&self, tenant: &str, table: &TableDescriptor) -> DbResult<()> {
        let pool = self.pool(tenant).await?;
        self.ddl.create_table(&pool, table).await
    }

    pub async fn get_all_tables_info(&self, tenant: &str) -> DbResult<Vec<TableUsage>> {
        let pool = self.pool(tenant).await?;
        self.introspector.get_all_tables_info(&pool).await
    }

    pub async fn get_table_columns(
        &self,
        tenant: &str,
        schema: &str,
        table: &str,
    ) -> DbResult<Vec<LiveColumnInfo>> {
        let pool = self.pool(tenant).await?;
        self.records.get_columns_list(&pool, schema, table).await
    }

    pub async fn get_table_with_columns_and_data(
        &self,
        tenant: &str,
        schema: &str,
        table: &str,
    ) -> DbResult<TableData> {
        let pool = self.pool(tenant).await?;
        self.records
            .get_table_with_columns_and_data(&pool, schema, table)
            .await
    }

    pub async fn add_column(
        &self,
        tenant: &str,
        table: &str,
        column: &ColumnDescriptor,
    ) -> DbResult<()> {
        let pool = self.pool(tenant).await?;
        self.ddl.add_column(&pool, table, column).await
    }

    pub async fn drop_column(&self, tenant: &str, table: &str, column: &str) -> DbResult<()> {
        let pool = self.pool(tenant).await?;
        self.ddl.drop_column(&pool, table, column).await
    }

    pub async fn rename_column(
        &self,
        tenant: &str,
        table: &str,
        old_name: &str,
        new_name: &str,
    ) -> DbResult<()> {
        let pool = self.pool(tenant).await?;
        self.ddl.rename_column(&pool, table, old_name, new_name).await
    }

    pub async fn alter_column_type(
        &self,
        tenant: &str,
        table: &str,
        column: &str,
        new_type: &str,
    ) -> DbResult<()> {
        let pool = self.pool(tenant).await?;
        self.ddl
            .alter_column_type(&pool, table, column, new_type)
            .await
    }

    // -------------------------------------------------------------------------
    // Records
    // -------------------------------------------------------------------------

    pub async fn insert_record(&self, tenant: &str, table: &str, record: &Record) -> DbResult<Row> {
        let pool = self.pool(tenant).await?;
        self.records.insert(&pool, table, record).await
    }

    pub async fn read_records(
        &self,
        tenant: &str,
        table: &str,
        filter: &RecordFilter,
    ) -> DbResult<Vec<Row>> {
        let pool = self.pool(tenant).await?;
        self.records.read(&pool, table, filter).await
    }

    pub async fn update_record(
        &self,
        tenant: &str,
        table: &str,
        id_column: &str,
        id_value: &RecordValue,
        updates: &Record,
    ) -> DbResult<Option<Row>> {
        let pool = self.pool(tenant).await?;
        self.records
            .update(&pool, table, id_column, id_value, updates)
            .await
    }

    pub async fn delete_record(
        &self,
        tenant: &str,
        table: &str,
        id_column: &str,
        id_value: &RecordValue,
    ) -> DbResult<Option<Row>> {
        let pool = self.pool(tenant).await?;
        self.records.delete(&pool, table, id_column, id_value).await
    }

    /// Close every tenant pool.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}
