use async_trait::async_trait;
use sqlx::MySqlPool;
use tracing::info;

use crate::model::audit_log::AuditLogEntry;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Rejected(String),
}

/// Destination for lifecycle audit records. Called after commit; the engine
/// logs and drops whatever error comes back.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: &AuditLogEntry) -> Result<(), AuditError>;
}

/// Writes to the `audit_logs` table.
#[derive(Clone)]
pub struct MySqlAuditSink {
    pool: MySqlPool,
}

impl MySqlAuditSink {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for MySqlAuditSink {
    async fn record(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (action, performed_by, employee_id, leave_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.action)
        .bind(&entry.by)
        .bind(entry.employee_id)
        .bind(entry.leave_id)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Emits audit records as log events only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        info!(
            action = %entry.action,
            by = %entry.by,
            employee_id = entry.employee_id,
            leave_id = entry.leave_id,
            "audit"
        );
        Ok(())
    }
}
