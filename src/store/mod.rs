//! Transactional store seam for the leave engine.
//!
//! A [`LeaveTx`] is one unit of work. Every read-decide-write sequence on an
//! employee balance happens through the rows it locked, and nothing it wrote
//! is visible until [`LeaveTx::commit`]. Dropping a transaction rolls it back.

use async_trait::async_trait;

use crate::leave::days::DateWindow;
use crate::model::employee::EmployeeLeaveProfile;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType, NewLeaveRequest, StatusUpdate};

pub mod memory;
pub mod mysql;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Unavailable(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether the same unit of work can succeed on another attempt.
    pub fn is_transient(&self) -> bool {
        !matches!(self, StoreError::Corrupt(_))
    }
}

/// Approved requests in `department_id` whose range meets `window`.
#[derive(Debug, Clone, Copy)]
pub struct OverlapQuery {
    pub department_id: u64,
    pub window: DateWindow,
    pub exclude_request_id: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct LeaveListQuery {
    pub window: DateWindow,
    pub status: Option<LeaveStatus>,
    pub leave_type: Option<LeaveType>,
    pub department_id: Option<u64>,
    pub employee_id: Option<u64>,
    pub limit: u64,
    pub offset: u64,
}

#[async_trait]
pub trait LeaveTx: Send {
    /// Reads the employee row and holds its lock until commit/rollback.
    async fn lock_employee(
        &mut self,
        employee_id: u64,
    ) -> Result<Option<EmployeeLeaveProfile>, StoreError>;

    /// Reads the request row and holds its lock until commit/rollback.
    async fn lock_request(&mut self, leave_id: u64) -> Result<Option<LeaveRequest>, StoreError>;

    async fn count_approved_overlaps(&mut self, query: &OverlapQuery) -> Result<u64, StoreError>;

    async fn insert_request(&mut self, new: &NewLeaveRequest) -> Result<LeaveRequest, StoreError>;

    async fn update_request(
        &mut self,
        leave_id: u64,
        update: &StatusUpdate,
    ) -> Result<LeaveRequest, StoreError>;

    async fn write_balance(&mut self, employee_id: u64, balance: f64) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LeaveTx>, StoreError>;

    async fn find_request(&self, leave_id: u64) -> Result<Option<LeaveRequest>, StoreError>;

    async fn find_employee(
        &self,
        employee_id: u64,
    ) -> Result<Option<EmployeeLeaveProfile>, StoreError>;

    async fn count_approved_overlaps(&self, query: &OverlapQuery) -> Result<u64, StoreError>;

    /// Matching page (newest first) and the total match count.
    async fn list_requests(
        &self,
        query: &LeaveListQuery,
    ) -> Result<(Vec<LeaveRequest>, u64), StoreError>;
}
