use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::auto_approval::AutoApprovalPolicy;
use super::days::{DateRange, DateWindow};
use super::error::LeaveError;
use super::ledger;
use super::overlap::{self, DEFAULT_OVERLAP_THRESHOLD, OverlapPolicy};
use super::transition::{BalanceEffect, balance_effect};
use crate::audit::AuditSink;
use crate::model::audit_log::AuditLogEntry;
use crate::model::employee::EmployeeLeaveProfile;
use crate::model::leave_request::{
    LeaveRequest, LeaveStatus, LeaveType, NewLeaveRequest, StatusUpdate,
};
use crate::store::{LeaveListQuery, LeaveStore, StoreError};

pub const DEFAULT_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Used by approvals that don't pass their own threshold.
    pub approval_overlap_threshold: u32,
    pub auto_approval_overlap_threshold: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            approval_overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            auto_approval_overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateLeaveCommand {
    pub employee_id: u64,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransitionCommand {
    pub leave_id: u64,
    pub next: LeaveStatus,
    /// Approver/rejector comment. Replaces the stored reason when present.
    pub reason: Option<String>,
    /// Approvals only; ignored when rejecting.
    pub is_paid: Option<bool>,
    pub overlap_threshold: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct LeaveQuery {
    pub window: DateWindow,
    pub status: Option<LeaveStatus>,
    pub leave_type: Option<LeaveType>,
    pub department_id: Option<u64>,
    pub employee_id: Option<u64>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaveOutcome {
    pub request: LeaveRequest,
    /// Stored status before a transition; absent on creation.
    pub previous_status: Option<LeaveStatus>,
    /// Employee balance after the ledger moved, absent when it didn't.
    pub balance_after: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeavePage {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: u64,
}

/// Leave lifecycle engine: creation with auto-approval, approve/reject
/// transitions and the balance ledger, each call one store transaction.
#[derive(Clone)]
pub struct LeaveEngine {
    store: Arc<dyn LeaveStore>,
    audit: Arc<dyn AuditSink>,
    settings: EngineSettings,
}

impl LeaveEngine {
    pub fn new(
        store: Arc<dyn LeaveStore>,
        audit: Arc<dyn AuditSink>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            audit,
            settings,
        }
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    pub async fn create(
        &self,
        cmd: CreateLeaveCommand,
        by: &str,
    ) -> Result<LeaveOutcome, LeaveError> {
        let leave_type = cmd.leave_type.trim();
        if leave_type.is_empty() {
            return Err(LeaveError::Validation("leave_type is required".to_string()));
        }
        let range = DateRange::new(cmd.start_date, cmd.end_date).ok_or_else(|| {
            LeaveError::Validation("start_date cannot be after end_date".to_string())
        })?;
        let days = range.days();
        let auto_approval = AutoApprovalPolicy::new(OverlapPolicy::new(
            self.settings.auto_approval_overlap_threshold,
        ));

        let mut tx = self.store.begin().await?;

        let employee = tx.lock_employee(cmd.employee_id).await?;
        let status = match &employee {
            Some(e) => {
                let overlaps =
                    overlap::count_approved_overlaps_in(&mut *tx, e.department_id, range, None)
                        .await?;
                auto_approval.decide(Some(e), days, overlaps)
            }
            None => {
                warn!(employee_id = cmd.employee_id, "Employee not found, leave left pending");
                LeaveStatus::Pending
            }
        };

        let request = tx
            .insert_request(&NewLeaveRequest {
                employee_id: cmd.employee_id,
                leave_type: LeaveType::from(leave_type.to_string()),
                start_date: range.start,
                end_date: range.end,
                status,
                reason: non_blank(cmd.reason),
            })
            .await?;

        let balance_after = if status == LeaveStatus::Approved {
            Some(ledger::debit(&mut *tx, cmd.employee_id, days).await?)
        } else {
            None
        };

        tx.commit().await?;

        info!(
            leave_id = request.id,
            employee_id = request.employee_id,
            status = %request.status,
            days,
            "Leave request created"
        );
        self.record_audit(&request, by).await;

        Ok(LeaveOutcome {
            request,
            previous_status: None,
            balance_after,
        })
    }

    pub async fn transition(
        &self,
        cmd: TransitionCommand,
        by: &str,
    ) -> Result<LeaveOutcome, LeaveError> {
        if cmd.next == LeaveStatus::Pending {
            return Err(LeaveError::Validation(
                "status must be approved or rejected".to_string(),
            ));
        }
        let policy = OverlapPolicy::new(
            cmd.overlap_threshold
                .unwrap_or(self.settings.approval_overlap_threshold),
        );

        let mut tx = self.store.begin().await?;

        let before = tx
            .lock_request(cmd.leave_id)
            .await?
            .ok_or_else(|| LeaveError::leave_not_found(cmd.leave_id))?;
        let effect = balance_effect(before.status, cmd.next)?;
        let range = DateRange::new(before.start_date, before.end_date).ok_or_else(|| {
            StoreError::Corrupt(format!("leave {} ends before it starts", before.id))
        })?;

        // only approvals write is_paid
        let mut is_paid = None;
        if cmd.next == LeaveStatus::Approved {
            let employee = tx
                .lock_employee(before.employee_id)
                .await?
                .ok_or_else(|| LeaveError::employee_not_found(before.employee_id))?;

            let overlaps = overlap::count_approved_overlaps_in(
                &mut *tx,
                employee.department_id,
                range,
                Some(before.id),
            )
            .await?;
            if let Err(e) = policy.check(overlaps) {
                warn!(
                    leave_id = before.id,
                    department_id = employee.department_id,
                    overlaps,
                    threshold = policy.threshold,
                    "Approval blocked by department overlap"
                );
                return Err(e);
            }

            // a retry without a flag keeps whatever was recorded before
            is_paid = cmd.is_paid.or_else(|| {
                before
                    .is_paid
                    .is_none()
                    .then(|| before.leave_type.is_paid_by_default())
            });
        }

        let updated = tx
            .update_request(
                before.id,
                &StatusUpdate {
                    status: cmd.next,
                    reason: non_blank(cmd.reason),
                    is_paid,
                },
            )
            .await?;

        let days = range.days();
        let balance_after = match effect {
            BalanceEffect::Debit => Some(ledger::debit(&mut *tx, before.employee_id, days).await?),
            BalanceEffect::Credit => Some(ledger::credit(&mut *tx, before.employee_id, days).await?),
            BalanceEffect::None => None,
        };

        tx.commit().await?;

        info!(
            leave_id = updated.id,
            employee_id = updated.employee_id,
            from = %before.status,
            to = %updated.status,
            balance_moved = balance_after.is_some(),
            "Leave request transitioned"
        );
        self.record_audit(&updated, by).await;

        Ok(LeaveOutcome {
            request: updated,
            previous_status: Some(before.status),
            balance_after,
        })
    }

    /// Approved requests in `department_id` meeting `[start, end]`, minus `exclude_leave_id`.
    pub async fn count_approved_overlaps(
        &self,
        department_id: u64,
        start: NaiveDate,
        end: NaiveDate,
        exclude_leave_id: Option<u64>,
    ) -> Result<u64, LeaveError> {
        let range = DateRange::new(start, end).ok_or_else(|| {
            LeaveError::Validation("start_date cannot be after end_date".to_string())
        })?;
        overlap::count_approved_overlaps(self.store.as_ref(), department_id, range, exclude_leave_id)
            .await
    }

    pub async fn employee_balance(
        &self,
        employee_id: u64,
    ) -> Result<EmployeeLeaveProfile, LeaveError> {
        self.store
            .find_employee(employee_id)
            .await?
            .ok_or_else(|| LeaveError::employee_not_found(employee_id))
    }

    pub async fn get(&self, leave_id: u64) -> Result<LeaveRequest, LeaveError> {
        self.store
            .find_request(leave_id)
            .await?
            .ok_or_else(|| LeaveError::leave_not_found(leave_id))
    }

    pub async fn list(&self, query: LeaveQuery) -> Result<LeavePage, LeaveError> {
        if query.window.is_inverted() {
            return Err(LeaveError::Validation(
                "from cannot be after to".to_string(),
            ));
        }

        // -------------------------
        // Pagination
        // -------------------------
        let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        let page = query.page.unwrap_or(1).max(1);
        let offset = (page - 1).saturating_mul(per_page);

        let (data, total) = self
            .store
            .list_requests(&LeaveListQuery {
                window: query.window,
                status: query.status,
                leave_type: query.leave_type,
                department_id: query.department_id,
                employee_id: query.employee_id,
                limit: per_page,
                offset,
            })
            .await?;

        Ok(LeavePage {
            data,
            page,
            per_page,
            total,
        })
    }

    /// Best effort: a failing sink never undoes a committed transition.
    async fn record_audit(&self, request: &LeaveRequest, by: &str) {
        let entry = AuditLogEntry {
            action: request.status.audit_action().to_string(),
            by: by.to_string(),
            employee_id: request.employee_id,
            leave_id: request.id,
            timestamp: Utc::now(),
        };

        if let Err(e) = self.audit.record(&entry).await {
            warn!(error = %e, action = %entry.action, leave_id = entry.leave_id, "Failed to record audit entry");
        }
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditError;
    use crate::store::memory::MemoryLeaveStore;
    use std::sync::Mutex;

    const ENG: u64 = 10;
    const OPS: u64 = 20;

    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<AuditLogEntry>>,
    }

    #[async_trait::async_trait]
    impl AuditSink for RecordingSink {
        async fn record(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait::async_trait]
    impl AuditSink for FailingSink {
        async fn record(&self, _entry: &AuditLogEntry) -> Result<(), AuditError> {
            Err(AuditError::Rejected("sink offline".into()))
        }
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn setup(employees: &[(u64, u64, f64)]) -> (MemoryLeaveStore, Arc<RecordingSink>, LeaveEngine) {
        let store = MemoryLeaveStore::new();
        for &(id, department_id, leave_balance) in employees {
            store
                .upsert_employee(EmployeeLeaveProfile { id, department_id, leave_balance })
                .await;
        }
        let sink = Arc::new(RecordingSink::default());
        let engine = LeaveEngine::new(
            Arc::new(store.clone()),
            sink.clone(),
            EngineSettings::default(),
        );
        (store, sink, engine)
    }

    fn create_cmd(employee_id: u64, start: &str, end: &str) -> CreateLeaveCommand {
        CreateLeaveCommand {
            employee_id,
            leave_type: "Annual".into(),
            start_date: d(start),
            end_date: d(end),
            reason: Some("trip".into()),
        }
    }

    fn decide(leave_id: u64, next: LeaveStatus) -> TransitionCommand {
        TransitionCommand {
            leave_id,
            next,
            reason: None,
            is_paid: None,
            overlap_threshold: None,
        }
    }

    #[tokio::test]
    async fn auto_approves_and_debits_in_same_call() {
        let (store, sink, engine) = setup(&[(1, ENG, 10.0)]).await;

        let out = engine.create(create_cmd(1, "2024-01-01", "2024-01-03"), "alice").await.unwrap();

        assert_eq!(out.request.status, LeaveStatus::Approved);
        assert_eq!(out.balance_after, Some(7.0));
        assert_eq!(out.request.is_paid, None);
        assert_eq!(engine.employee_balance(1).await.unwrap().leave_balance, 7.0);
        assert_eq!(sink.entries.lock().unwrap()[0].action, "LEAVE_APPROVED");
    }

    #[tokio::test]
    async fn short_balance_stays_pending_without_debit() {
        let (store, sink, engine) = setup(&[(1, ENG, 2.0)]).await;

        let out = engine.create(create_cmd(1, "2024-01-01", "2024-01-03"), "alice").await.unwrap();

        assert_eq!(out.request.status, LeaveStatus::Pending);
        assert_eq!(out.balance_after, None);
        assert_eq!(store.balance(1).await, Some(2.0));
        assert_eq!(sink.entries.lock().unwrap()[0].action, "LEAVE_PENDING");
    }

    #[tokio::test]
    async fn unknown_employee_fails_open_to_pending() {
        let (_store, _sink, engine) = setup(&[]).await;

        let out = engine.create(create_cmd(99, "2024-01-01", "2024-01-01"), "alice").await.unwrap();

        assert_eq!(out.request.status, LeaveStatus::Pending);
        assert_eq!(out.request.employee_id, 99);
    }

    #[tokio::test]
    async fn create_validates_before_touching_store() {
        let (store, _sink, engine) = setup(&[(1, ENG, 10.0)]).await;

        let err = engine
            .create(create_cmd(1, "2024-01-05", "2024-01-01"), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::Validation(_)));

        let mut blank = create_cmd(1, "2024-01-01", "2024-01-01");
        blank.leave_type = "  ".into();
        assert!(matches!(engine.create(blank, "alice").await, Err(LeaveError::Validation(_))));

        assert_eq!(store.balance(1).await, Some(10.0));
    }

    #[tokio::test]
    async fn repeated_approval_debits_once() {
        let (store, _sink, engine) = setup(&[(1, ENG, 1.0)]).await;
        let id = engine.create(create_cmd(1, "2024-03-04", "2024-03-05"), "alice").await.unwrap().request.id;
        store.upsert_employee(EmployeeLeaveProfile { id: 1, department_id: ENG, leave_balance: 5.0 }).await;

        let first = engine.transition(decide(id, LeaveStatus::Approved), "hr").await.unwrap();
        assert_eq!(first.previous_status, Some(LeaveStatus::Pending));
        assert_eq!(first.balance_after, Some(3.0));

        let mut again = decide(id, LeaveStatus::Approved);
        again.reason = Some("approved, enjoy".into());
        again.is_paid = Some(false);
        let second = engine.transition(again, "hr").await.unwrap();

        assert_eq!(second.previous_status, Some(LeaveStatus::Approved));
        assert_eq!(second.balance_after, None);
        assert_eq!(second.request.reason.as_deref(), Some("approved, enjoy"));
        assert_eq!(second.request.is_paid, Some(false));
        assert_eq!(store.balance(1).await, Some(3.0));
    }

    #[tokio::test]
    async fn approval_records_paid_heuristic_when_not_given() {
        let (_store, _sink, engine) = setup(&[(1, ENG, 0.0)]).await;
        let mut cmd = create_cmd(1, "2024-03-04", "2024-03-04");
        cmd.leave_type = "unpaid".into();
        let id = engine.create(cmd, "alice").await.unwrap().request.id;

        let out = engine.transition(decide(id, LeaveStatus::Approved), "hr").await.unwrap();

        assert_eq!(out.request.is_paid, Some(false));
        // debit still happens, clamped at zero
        assert_eq!(out.balance_after, Some(0.0));
    }

    #[tokio::test]
    async fn approval_retry_without_flag_keeps_recorded_paid_choice() {
        let (_store, _sink, engine) = setup(&[(1, ENG, 0.0)]).await;
        let id = engine.create(create_cmd(1, "2024-03-04", "2024-03-05"), "alice").await.unwrap().request.id;

        let mut unpaid = decide(id, LeaveStatus::Approved);
        unpaid.is_paid = Some(false);
        let first = engine.transition(unpaid, "hr").await.unwrap();
        assert_eq!(first.request.is_paid, Some(false));

        let retry = engine.transition(decide(id, LeaveStatus::Approved), "hr").await.unwrap();
        assert_eq!(retry.request.is_paid, Some(false));
        assert_eq!(engine.get(id).await.unwrap().is_paid, Some(false));
    }

    #[tokio::test]
    async fn rejection_never_writes_paid_flag() {
        let (_store, _sink, engine) = setup(&[(1, ENG, 0.0)]).await;
        let id = engine.create(create_cmd(1, "2024-03-04", "2024-03-05"), "alice").await.unwrap().request.id;

        let mut reject = decide(id, LeaveStatus::Rejected);
        reject.is_paid = Some(true);
        let out = engine.transition(reject, "hr").await.unwrap();

        assert_eq!(out.request.status, LeaveStatus::Rejected);
        assert_eq!(out.request.is_paid, None);
        assert_eq!(engine.get(id).await.unwrap().is_paid, None);
    }

    #[tokio::test]
    async fn reject_restores_approved_balance() {
        let (store, sink, engine) = setup(&[(1, ENG, 10.0)]).await;
        let id = engine.create(create_cmd(1, "2024-01-01", "2024-01-03"), "alice").await.unwrap().request.id;
        assert_eq!(store.balance(1).await, Some(7.0));

        let mut reject = decide(id, LeaveStatus::Rejected);
        reject.reason = Some("coverage gap".into());
        let out = engine.transition(reject, "hr").await.unwrap();

        assert_eq!(out.request.status, LeaveStatus::Rejected);
        assert_eq!(out.request.reason.as_deref(), Some("coverage gap"));
        assert_eq!(store.balance(1).await, Some(10.0));

        let again = engine.transition(decide(id, LeaveStatus::Rejected), "hr").await.unwrap();
        assert_eq!(again.balance_after, None);
        assert_eq!(again.request.reason.as_deref(), Some("coverage gap"));
        assert_eq!(store.balance(1).await, Some(10.0));

        let actions: Vec<String> = sink.entries.lock().unwrap().iter().map(|e| e.action.clone()).collect();
        assert_eq!(actions, ["LEAVE_APPROVED", "LEAVE_REJECTED", "LEAVE_REJECTED"]);
    }

    #[tokio::test]
    async fn rejecting_pending_leaves_balance_alone() {
        let (store, _sink, engine) = setup(&[(1, ENG, 1.0)]).await;
        let id = engine.create(create_cmd(1, "2024-01-01", "2024-01-03"), "alice").await.unwrap().request.id;

        let out = engine.transition(decide(id, LeaveStatus::Rejected), "hr").await.unwrap();

        assert_eq!(out.balance_after, None);
        assert_eq!(store.balance(1).await, Some(1.0));
    }

    #[tokio::test]
    async fn rejected_leave_cannot_be_approved() {
        let (store, _sink, engine) = setup(&[(1, ENG, 10.0)]).await;
        let id = engine.create(create_cmd(1, "2024-01-01", "2024-01-03"), "alice").await.unwrap().request.id;
        engine.transition(decide(id, LeaveStatus::Rejected), "hr").await.unwrap();

        let err = engine.transition(decide(id, LeaveStatus::Approved), "hr").await.unwrap_err();

        assert!(matches!(err, LeaveError::InvalidTransition { .. }));
        assert_eq!(store.balance(1).await, Some(10.0));
        assert_eq!(engine.get(id).await.unwrap().status, LeaveStatus::Rejected);
    }

    #[tokio::test]
    async fn missing_request_is_not_found() {
        let (_store, _sink, engine) = setup(&[]).await;

        let err = engine.transition(decide(404, LeaveStatus::Approved), "hr").await.unwrap_err();
        assert!(matches!(err, LeaveError::NotFound(_)));
        assert!(matches!(engine.get(404).await, Err(LeaveError::NotFound(_))));
        assert!(matches!(engine.employee_balance(404).await, Err(LeaveError::NotFound(_))));
    }

    #[tokio::test]
    async fn pending_target_is_a_validation_error() {
        let (_store, _sink, engine) = setup(&[(1, ENG, 10.0)]).await;
        let id = engine.create(create_cmd(1, "2024-01-01", "2024-01-01"), "alice").await.unwrap().request.id;

        let err = engine.transition(decide(id, LeaveStatus::Pending), "hr").await.unwrap_err();
        assert!(matches!(err, LeaveError::Validation(_)));
    }

    #[tokio::test]
    async fn overlap_gate_blocks_third_approval_only_when_overlapping() {
        let (store, _sink, engine) = setup(&[(1, ENG, 30.0), (2, ENG, 30.0), (3, ENG, 0.0), (4, OPS, 30.0)]).await;
        engine.create(create_cmd(1, "2024-05-06", "2024-05-08"), "a").await.unwrap();
        engine.create(create_cmd(2, "2024-05-07", "2024-05-10"), "b").await.unwrap();
        // other departments never count
        engine.create(create_cmd(4, "2024-05-07", "2024-05-07"), "d").await.unwrap();

        let blocked = engine.create(create_cmd(3, "2024-05-07", "2024-05-07"), "c").await.unwrap().request;
        let clear = engine.create(create_cmd(3, "2024-05-20", "2024-05-20"), "c").await.unwrap().request;
        assert_eq!(blocked.status, LeaveStatus::Pending);
        assert_eq!(clear.status, LeaveStatus::Pending);

        let err = engine.transition(decide(blocked.id, LeaveStatus::Approved), "hr").await.unwrap_err();
        assert!(matches!(err, LeaveError::Conflict { overlaps: 2, threshold: 2 }));
        assert_eq!(engine.get(blocked.id).await.unwrap().status, LeaveStatus::Pending);
        assert_eq!(store.balance(3).await, Some(0.0));

        assert_eq!(engine.count_approved_overlaps(ENG, d("2024-05-07"), d("2024-05-07"), None).await.unwrap(), 2);
        assert_eq!(engine.count_approved_overlaps(ENG, d("2024-05-09"), d("2024-05-30"), None).await.unwrap(), 1);

        let ok = engine.transition(decide(clear.id, LeaveStatus::Approved), "hr").await.unwrap();
        assert_eq!(ok.request.status, LeaveStatus::Approved);

        let mut raised = decide(blocked.id, LeaveStatus::Approved);
        raised.overlap_threshold = Some(3);
        let forced = engine.transition(raised, "hr").await.unwrap();
        assert_eq!(forced.request.status, LeaveStatus::Approved);
    }

    #[tokio::test]
    async fn failed_commit_leaves_nothing_behind() {
        let (store, _sink, engine) = setup(&[(1, ENG, 10.0)]).await;
        store.fail_commits(true);

        let err = engine.create(create_cmd(1, "2024-01-01", "2024-01-03"), "alice").await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(store.balance(1).await, Some(10.0));
        store.fail_commits(false);
        let page = engine.list(LeaveQuery::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn failed_transition_commit_keeps_status_and_balance() {
        let (store, _sink, engine) = setup(&[(1, ENG, 10.0)]).await;
        let id = engine.create(create_cmd(1, "2024-01-01", "2024-01-03"), "alice").await.unwrap().request.id;
        store.fail_commits(true);

        let err = engine.transition(decide(id, LeaveStatus::Rejected), "hr").await.unwrap_err();

        assert!(matches!(err, LeaveError::Infrastructure(_)));
        store.fail_commits(false);
        assert_eq!(engine.get(id).await.unwrap().status, LeaveStatus::Approved);
        assert_eq!(store.balance(1).await, Some(7.0));
    }

    #[tokio::test]
    async fn audit_failure_does_not_fail_transition() {
        let store = MemoryLeaveStore::new();
        store.upsert_employee(EmployeeLeaveProfile { id: 1, department_id: ENG, leave_balance: 10.0 }).await;
        let engine = LeaveEngine::new(Arc::new(store.clone()), Arc::new(FailingSink), EngineSettings::default());

        let out = engine.create(create_cmd(1, "2024-01-01", "2024-01-02"), "alice").await.unwrap();
        engine.transition(decide(out.request.id, LeaveStatus::Rejected), "hr").await.unwrap();

        assert_eq!(store.balance(1).await, Some(10.0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_approvals_for_one_employee_do_not_lose_updates() {
        let (store, _sink, engine) = setup(&[(1, ENG, 0.0)]).await;
        let mut ids = Vec::new();
        for day in 1..=8 {
            let date = format!("2024-06-{day:02}");
            ids.push(engine.create(create_cmd(1, &date, &date), "alice").await.unwrap().request.id);
        }
        store.upsert_employee(EmployeeLeaveProfile { id: 1, department_id: ENG, leave_balance: 20.0 }).await;

        let mut handles = Vec::new();
        for id in ids {
            for _ in 0..2 {
                let engine = engine.clone();
                handles.push(tokio::spawn(async move {
                    let mut cmd = decide(id, LeaveStatus::Approved);
                    cmd.overlap_threshold = Some(100);
                    engine.transition(cmd, "hr").await
                }));
            }
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // eight one-day leaves, each approved twice, debited once each
        assert_eq!(store.balance(1).await, Some(12.0));
    }

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let (_store, _sink, engine) = setup(&[(1, ENG, 30.0), (2, OPS, 0.0)]).await;
        engine.create(create_cmd(1, "2024-01-01", "2024-01-03"), "a").await.unwrap();
        engine.create(create_cmd(1, "2024-02-01", "2024-02-02"), "a").await.unwrap();
        let mut sick = create_cmd(2, "2024-01-02", "2024-01-02");
        sick.leave_type = "sick".into();
        engine.create(sick, "b").await.unwrap();

        let january = engine
            .list(LeaveQuery {
                window: DateWindow { from: Some(d("2024-01-03")), to: Some(d("2024-01-31")) },
                ..LeaveQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(january.total, 1);
        assert_eq!(january.data[0].start_date, d("2024-01-01"));

        let pending_ops = engine
            .list(LeaveQuery {
                status: Some(LeaveStatus::Pending),
                department_id: Some(OPS),
                leave_type: Some(LeaveType::Sick),
                ..LeaveQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(pending_ops.total, 1);
        assert_eq!(pending_ops.data[0].employee_id, 2);

        let second_page = engine
            .list(LeaveQuery {
                employee_id: Some(1),
                page: Some(2),
                per_page: Some(1),
                ..LeaveQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(second_page.total, 2);
        assert_eq!(second_page.data.len(), 1);
        // newest first, so page two holds the older request
        assert_eq!(second_page.data[0].start_date, d("2024-01-01"));

        let clamped = engine
            .list(LeaveQuery { per_page: Some(0), page: Some(0), ..LeaveQuery::default() })
            .await
            .unwrap();
        assert_eq!((clamped.page, clamped.per_page), (1, 1));
    }

    #[tokio::test]
    async fn inverted_list_window_is_rejected() {
        let (_store, _sink, engine) = setup(&[]).await;
        let err = engine
            .list(LeaveQuery {
                window: DateWindow { from: Some(d("2024-02-01")), to: Some(d("2024-01-01")) },
                ..LeaveQuery::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::Validation(_)));
    }
}
