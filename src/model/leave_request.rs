use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

/// Lifecycle state of a leave request, stored lowercase.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }

    /// Audit action name, e.g. `LEAVE_APPROVED`.
    pub fn audit_action(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "LEAVE_PENDING",
            LeaveStatus::Approved => "LEAVE_APPROVED",
            LeaveStatus::Rejected => "LEAVE_REJECTED",
        }
    }
}

/// Leave category. Known categories drive the paid/unpaid heuristic,
/// anything else is carried through as a free-form tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LeaveType {
    Annual,
    Sick,
    Casual,
    Maternity,
    Paternity,
    Unpaid,
    Other(String),
}

impl LeaveType {
    pub fn as_str(&self) -> &str {
        match self {
            LeaveType::Annual => "annual",
            LeaveType::Sick => "sick",
            LeaveType::Casual => "casual",
            LeaveType::Maternity => "maternity",
            LeaveType::Paternity => "paternity",
            LeaveType::Unpaid => "unpaid",
            LeaveType::Other(tag) => tag,
        }
    }

    pub fn is_paid_by_default(&self) -> bool {
        !matches!(self, LeaveType::Unpaid)
    }
}

impl FromStr for LeaveType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        Ok(match tag.to_ascii_lowercase().as_str() {
            "annual" => LeaveType::Annual,
            "sick" => LeaveType::Sick,
            "casual" => LeaveType::Casual,
            "maternity" => LeaveType::Maternity,
            "paternity" => LeaveType::Paternity,
            "unpaid" => LeaveType::Unpaid,
            _ => LeaveType::Other(tag.to_string()),
        })
    }
}

impl From<String> for LeaveType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(t) => t,
            Err(never) => match never {},
        }
    }
}

impl From<LeaveType> for String {
    fn from(value: LeaveType) -> Self {
        match value {
            LeaveType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for LeaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "leave_type": "annual",
    "start_date": "2026-01-01",
    "end_date": "2026-01-03",
    "status": "approved",
    "reason": "family trip",
    "is_paid": null,
    "created_at": "2026-01-01T00:00:00Z"
}))]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, example = "annual")]
    pub leave_type: LeaveType,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub status: LeaveStatus,
    /// Employee reason, overwritten by the approver/rejector comment when one is given.
    pub reason: Option<String>,
    /// Unset until an approval records it.
    pub is_paid: Option<bool>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

/// Row to insert; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub employee_id: u64,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: LeaveStatus,
    pub reason: Option<String>,
}

/// Status write applied by a transition.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: LeaveStatus,
    /// `None` keeps the stored reason.
    pub reason: Option<String>,
    /// `None` keeps the stored flag.
    pub is_paid: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Approved".parse::<LeaveStatus>().unwrap(), LeaveStatus::Approved);
        assert_eq!(LeaveStatus::Rejected.to_string(), "rejected");
        assert_eq!(LeaveStatus::Approved.as_str(), "approved");
        assert!("cancelled".parse::<LeaveStatus>().is_err());
    }

    #[test]
    fn leave_type_keeps_unknown_tags() {
        assert_eq!(LeaveType::from("Annual".to_string()), LeaveType::Annual);
        let study = LeaveType::from("Study Leave".to_string());
        assert_eq!(study, LeaveType::Other("Study Leave".into()));
        assert_eq!(String::from(study), "Study Leave");
    }

    #[test]
    fn only_unpaid_is_unpaid_by_default() {
        assert!(!LeaveType::Unpaid.is_paid_by_default());
        assert!(LeaveType::Sick.is_paid_by_default());
        assert!(LeaveType::Other("bereavement".into()).is_paid_by_default());
    }
}
