// src/catalog/mod.rs

//! The console's catalog resources, all built through the same binder.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::binder::{Binder, ResourceDescriptor, ResourceHandle};
use crate::config::ConsoleConfig;
use crate::error::{BindingError, Result};
use crate::readiness::{ReadinessGate, ReadinessOptions, ReadinessReport};
use crate::structs::{ConglomerateRow, ExplainPlanNode, Params, ResultShape, StatRow, StatementRecord, StatementSqlRow};
use crate::transport::{HttpTransport, Transport};

pub const STATEMENT_ID: &str = "statementId";

pub const STATEMENT_HISTORY_SQL: &str =
    "select * from SYS.SYSSTATEMENTHISTORY order by STARTTIMEMS desc {LIMIT 100}";

pub const STATEMENT_DETAIL_PATH: &str = "/sqlresource/tracedStatements/:statementId";

pub const STATEMENT_SQL_SQL: &str =
    "select STATEMENTSQL from SYS.SYSSTATEMENTHISTORY where STATEMENTID=:statementId";

/// SYS.SYSPRIMARYKEYS (conglomerate 1168) is the last system table created at
/// boot; once it exists the cluster accepts statements.
pub const SENTINEL_SQL: &str =
    "select CONGLOMERATENUMBER from SYS.SYSCONGLOMERATES where CONGLOMERATENUMBER >= 1168 {LIMIT 1}";

pub const REGION_SERVER_STATS_SQL: &str = "call syscs_util.SYSCS_GET_REGION_SERVER_STATS_INFO()";

pub fn statement_history_descriptor() -> Result<ResourceDescriptor, BindingError> {
    ResourceDescriptor::query("statement-history", STATEMENT_HISTORY_SQL, ResultShape::Array)
}

pub fn statement_detail_descriptor() -> Result<ResourceDescriptor, BindingError> {
    ResourceDescriptor::path("statement-detail", STATEMENT_DETAIL_PATH, ResultShape::Single)
}

pub fn statement_sql_descriptor() -> Result<ResourceDescriptor, BindingError> {
    ResourceDescriptor::query("statement-sql", STATEMENT_SQL_SQL, ResultShape::Array)
}

pub fn sentinel_descriptor() -> Result<ResourceDescriptor, BindingError> {
    ResourceDescriptor::query("readiness-sentinel", SENTINEL_SQL, ResultShape::Array)
}

pub fn region_server_stats_descriptor() -> Result<ResourceDescriptor, BindingError> {
    ResourceDescriptor::query("region-server-stats", REGION_SERVER_STATS_SQL, ResultShape::Array)
}

/// Handles for every catalog resource the console reads. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Catalog {
    statement_history: ResourceHandle,
    statement_detail: ResourceHandle,
    statement_sql: ResourceHandle,
    sentinel: ResourceHandle,
    region_server_stats: ResourceHandle,
}

impl Catalog {
    pub fn new(binder: &Binder) -> Result<Self, BindingError> {
        Ok(Self {
            statement_history: binder.bind(statement_history_descriptor()?),
            statement_detail: binder.bind(statement_detail_descriptor()?),
            statement_sql: binder.bind(statement_sql_descriptor()?),
            sentinel: binder.bind(sentinel_descriptor()?),
            region_server_stats: binder.bind(region_server_stats_descriptor()?),
        })
    }

    /// Catalog over HTTP using the server settings in `config`.
    pub fn from_config(config: &ConsoleConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config.server.request_timeout(), config.server.connect_timeout())?;
        let binder = Binder::new(config.server.endpoint_base(), Arc::new(transport) as Arc<dyn Transport>);
        Ok(Self::new(&binder)?)
    }

    pub fn sentinel(&self) -> &ResourceHandle {
        &self.sentinel
    }

    /// One poll of the sentinel, decoded. Empty while the cluster is booting.
    pub async fn sentinel_rows(&self) -> Result<Vec<ConglomerateRow>> {
        self.sentinel.fetch_as(&Params::new()).await
    }

    /// Most recent statements first, at most 100.
    pub async fn statement_history(&self) -> Result<Vec<StatementRecord>> {
        self.statement_history.fetch_as(&Params::new()).await
    }

    pub async fn statement_detail(&self, statement_id: impl fmt::Display) -> Result<ExplainPlanNode> {
        self.statement_detail
            .fetch_as(&Params::new().with(STATEMENT_ID, statement_id))
            .await
    }

    /// SQL text of one statement, `None` when the id is unknown.
    pub async fn statement_sql(&self, statement_id: impl fmt::Display) -> Result<Option<String>> {
        let rows: Vec<StatementSqlRow> = self
            .statement_sql
            .fetch_as(&Params::new().with(STATEMENT_ID, statement_id))
            .await?;
        Ok(rows.into_iter().next().and_then(|row| row.sql))
    }

    pub async fn region_server_stats(&self) -> Result<Vec<StatRow>> {
        self.region_server_stats.fetch_as(&Params::new()).await
    }

    pub async fn await_ready(
        &self,
        gate: &ReadinessGate,
        options: &ReadinessOptions,
        cancel: &CancellationToken,
    ) -> Result<ReadinessReport> {
        Ok(gate.await_ready_with(&self.sentinel, options, cancel).await?)
    }
}
