use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One lifecycle transition as handed to the audit sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// `LEAVE_PENDING`, `LEAVE_APPROVED` or `LEAVE_REJECTED`.
    pub action: String,
    pub by: String,
    pub employee_id: u64,
    pub leave_id: u64,
    pub timestamp: DateTime<Utc>,
}
