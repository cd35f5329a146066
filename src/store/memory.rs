use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LeaveListQuery, LeaveStore, LeaveTx, OverlapQuery, StoreError};
use crate::model::employee::EmployeeLeaveProfile;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest, StatusUpdate};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    employees: HashMap<u64, EmployeeLeaveProfile>,
    requests: BTreeMap<u64, LeaveRequest>,
    last_id: u64,
}

impl MemoryState {
    fn count_approved_overlaps(&self, query: &OverlapQuery) -> u64 {
        self.requests
            .values()
            .filter(|r| r.status == LeaveStatus::Approved)
            .filter(|r| Some(r.id) != query.exclude_request_id)
            .filter(|r| query.window.covers(r.start_date, r.end_date))
            .filter(|r| {
                self.employees
                    .get(&r.employee_id)
                    .is_some_and(|e| e.department_id == query.department_id)
            })
            .count() as u64
    }
}

/// In-process store. Transactions take the whole state exclusively and work on
/// a copy that replaces the state only on commit, so concurrent units of work
/// are fully serialized.
#[derive(Debug, Clone, Default)]
pub struct MemoryLeaveStore {
    state: Arc<Mutex<MemoryState>>,
    fail_commits: Arc<AtomicBool>,
}

impl MemoryLeaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_employee(&self, profile: EmployeeLeaveProfile) {
        self.state.lock().await.employees.insert(profile.id, profile);
    }

    pub async fn balance(&self, employee_id: u64) -> Option<f64> {
        self.state
            .lock()
            .await
            .employees
            .get(&employee_id)
            .map(|e| e.leave_balance)
    }

    /// Makes every following commit fail until switched off again.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_commit: Arc<AtomicBool>,
}

#[async_trait]
impl LeaveTx for MemoryTx {
    async fn lock_employee(
        &mut self,
        employee_id: u64,
    ) -> Result<Option<EmployeeLeaveProfile>, StoreError> {
        Ok(self.working.employees.get(&employee_id).cloned())
    }

    async fn lock_request(&mut self, leave_id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        Ok(self.working.requests.get(&leave_id).cloned())
    }

    async fn count_approved_overlaps(&mut self, query: &OverlapQuery) -> Result<u64, StoreError> {
        Ok(self.working.count_approved_overlaps(query))
    }

    async fn insert_request(&mut self, new: &NewLeaveRequest) -> Result<LeaveRequest, StoreError> {
        self.working.last_id += 1;
        let request = LeaveRequest {
            id: self.working.last_id,
            employee_id: new.employee_id,
            leave_type: new.leave_type.clone(),
            start_date: new.start_date,
            end_date: new.end_date,
            status: new.status,
            reason: new.reason.clone(),
            is_paid: None,
            created_at: Utc::now(),
        };
        self.working.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn update_request(
        &mut self,
        leave_id: u64,
        update: &StatusUpdate,
    ) -> Result<LeaveRequest, StoreError> {
        let request = self
            .working
            .requests
            .get_mut(&leave_id)
            .ok_or_else(|| StoreError::Corrupt(format!("leave request {leave_id} vanished")))?;

        request.status = update.status;
        if let Some(reason) = &update.reason {
            request.reason = Some(reason.clone());
        }
        if update.is_paid.is_some() {
            request.is_paid = update.is_paid;
        }
        Ok(request.clone())
    }

    async fn write_balance(&mut self, employee_id: u64, balance: f64) -> Result<(), StoreError> {
        let employee = self
            .working
            .employees
            .get_mut(&employee_id)
            .ok_or_else(|| StoreError::Corrupt(format!("employee {employee_id} vanished")))?;
        employee.leave_balance = balance;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("commit rejected".into()));
        }
        let MemoryTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}

#[async_trait]
impl LeaveStore for MemoryLeaveStore {
    async fn begin(&self) -> Result<Box<dyn LeaveTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            fail_commit: self.fail_commits.clone(),
        }))
    }

    async fn find_request(&self, leave_id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        Ok(self.state.lock().await.requests.get(&leave_id).cloned())
    }

    async fn find_employee(
        &self,
        employee_id: u64,
    ) -> Result<Option<EmployeeLeaveProfile>, StoreError> {
        Ok(self.state.lock().await.employees.get(&employee_id).cloned())
    }

    async fn count_approved_overlaps(&self, query: &OverlapQuery) -> Result<u64, StoreError> {
        Ok(self.state.lock().await.count_approved_overlaps(query))
    }

    async fn list_requests(
        &self,
        query: &LeaveListQuery,
    ) -> Result<(Vec<LeaveRequest>, u64), StoreError> {
        let state = self.state.lock().await;

        let matching: Vec<&LeaveRequest> = state
            .requests
            .values()
            .rev()
            .filter(|r| query.window.covers(r.start_date, r.end_date))
            .filter(|r| query.status.is_none_or(|s| r.status == s))
            .filter(|r| query.leave_type.as_ref().is_none_or(|t| &r.leave_type == t))
            .filter(|r| query.employee_id.is_none_or(|id| r.employee_id == id))
            .filter(|r| {
                query.department_id.is_none_or(|dept| {
                    state
                        .employees
                        .get(&r.employee_id)
                        .is_some_and(|e| e.department_id == dept)
                })
            })
            .collect();

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }
}
