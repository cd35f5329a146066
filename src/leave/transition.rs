use super::error::LeaveError;
use crate::model::leave_request::LeaveStatus;

/// What a transition does to the employee balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceEffect {
    None,
    Debit,
    Credit,
}

/// Balance effect of moving a request from its stored status `before` to `next`.
///
/// The effect depends only on the stored status, so retrying a transition
/// that already landed never moves the balance twice.
pub fn balance_effect(before: LeaveStatus, next: LeaveStatus) -> Result<BalanceEffect, LeaveError> {
    use LeaveStatus::*;

    match (before, next) {
        (_, Pending) => Err(LeaveError::Validation(
            "status must be approved or rejected".to_string(),
        )),
        (Pending, Approved) => Ok(BalanceEffect::Debit),
        (Approved, Approved) => Ok(BalanceEffect::None),
        (Rejected, Approved) => Err(LeaveError::InvalidTransition {
            from: Rejected,
            to: Approved,
        }),
        (Approved, Rejected) => Ok(BalanceEffect::Credit),
        (Pending | Rejected, Rejected) => Ok(BalanceEffect::None),
    }
}
