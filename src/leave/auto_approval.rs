use super::overlap::OverlapPolicy;
use crate::model::employee::EmployeeLeaveProfile;
use crate::model::leave_request::LeaveStatus;

/// Decides whether a new request skips manual review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoApprovalPolicy {
    pub overlap: OverlapPolicy,
}

impl AutoApprovalPolicy {
    pub fn new(overlap: OverlapPolicy) -> Self {
        Self { overlap }
    }

    /// `Approved` iff the balance covers `days` and the department is under
    /// the overlap threshold. Unknown employees always go to review.
    pub fn decide(
        &self,
        employee: Option<&EmployeeLeaveProfile>,
        days: f64,
        overlaps: u64,
    ) -> LeaveStatus {
        let Some(employee) = employee else {
            return LeaveStatus::Pending;
        };

        if employee.leave_balance >= days && self.overlap.allow(overlaps) {
            LeaveStatus::Approved
        } else {
            LeaveStatus::Pending
        }
    }
}
