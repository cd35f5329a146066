//! Balance ledger: the only writer of `employees.leave_balance`.
//!
//! Both operations run inside the caller's transaction against the employee
//! row it locked, so two transitions for the same employee cannot both read
//! the pre-debit balance.

use tracing::debug;

use super::error::LeaveError;
use crate::store::LeaveTx;

/// `max(0, balance - days)`.
pub fn debited(balance: f64, days: f64) -> f64 {
    (balance - days).max(0.0)
}

/// `balance + days`, no upper clamp.
pub fn credited(balance: f64, days: f64) -> f64 {
    balance + days
}

pub async fn debit(tx: &mut dyn LeaveTx, employee_id: u64, days: f64) -> Result<f64, LeaveError> {
    let employee = tx
        .lock_employee(employee_id)
        .await?
        .ok_or_else(|| LeaveError::employee_not_found(employee_id))?;

    let balance = debited(employee.leave_balance, days);
    tx.write_balance(employee_id, balance).await?;

    debug!(employee_id, days, before = employee.leave_balance, after = balance, "Leave balance debited");
    Ok(balance)
}

pub async fn credit(tx: &mut dyn LeaveTx, employee_id: u64, days: f64) -> Result<f64, LeaveError> {
    let employee = tx
        .lock_employee(employee_id)
        .await?
        .ok_or_else(|| LeaveError::employee_not_found(employee_id))?;

    let balance = credited(employee.leave_balance, days);
    tx.write_balance(employee_id, balance).await?;

    debug!(employee_id, days, before = employee.leave_balance, after = balance, "Leave balance credited");
    Ok(balance)
}
