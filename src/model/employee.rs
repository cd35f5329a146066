use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Leave-relevant projection of an employee record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1000,
        "department_id": 10,
        "leave_balance": 12.0
    })
)]
pub struct EmployeeLeaveProfile {
    #[schema(example = 1000)]
    pub id: u64,

    /// Grouping key for the department overlap policy.
    #[schema(example = 10)]
    pub department_id: u64,

    /// Remaining entitled leave days, never negative.
    #[schema(example = 12.0)]
    pub leave_balance: f64,
}
