use crate::auth::auth::AuthUser;
use crate::leave::days::DateWindow;
use crate::leave::{
    CreateLeaveCommand, LeaveEngine, LeaveError, LeaveOutcome, LeavePage, LeaveQuery,
    TransitionCommand,
};
use crate::model::employee::EmployeeLeaveProfile;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    /// Target employee; HR/Admin only. Defaults to the caller's own record.
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    #[schema(example = "annual")]
    pub leave_type: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: Option<NaiveDate>,
    #[schema(example = "family trip")]
    pub reason: Option<String>,
}

#[derive(Deserialize, Default, ToSchema)]
pub struct LeaveDecision {
    /// Approver/rejector comment, replaces the stored reason
    #[schema(example = "enjoy")]
    pub reason: Option<String>,
    #[schema(example = true)]
    pub is_paid: Option<bool>,
    /// Overrides the configured department overlap threshold
    #[schema(example = 2)]
    pub overlap_threshold: Option<u32>,
}

#[derive(Deserialize, ToSchema)]
pub struct LeaveTransition {
    #[schema(example = "approved")]
    pub status: Option<String>,
    pub reason: Option<String>,
    /// Recorded on approval, ignored on rejection
    pub is_paid: Option<bool>,
    pub overlap_threshold: Option<u32>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Only leaves covering a day on or after this date
    #[param(value_type = Option<String>)]
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub from: Option<NaiveDate>,
    /// Only leaves covering a day on or before this date
    #[param(value_type = Option<String>)]
    #[schema(example = "2026-01-31", format = "date", value_type = String)]
    pub to: Option<NaiveDate>,
    #[schema(example = "pending")]
    /// Filter by leave status
    pub status: Option<String>,
    #[schema(example = "sick")]
    /// Filter by leave type
    pub leave_type: Option<String>,
    #[schema(example = 10)]
    /// Filter by department ID
    pub department_id: Option<u64>,
    #[schema(example = 123)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>, // 1-based
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>, // items per page
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, LeaveError> {
    value.ok_or_else(|| LeaveError::Validation(format!("{field} is required")))
}

fn parse_status(raw: &str) -> Result<LeaveStatus, LeaveError> {
    raw.parse()
        .map_err(|_| LeaveError::Validation(format!("unknown status {raw:?}")))
}

impl LeaveFilter {
    fn into_query(self) -> Result<LeaveQuery, LeaveError> {
        Ok(LeaveQuery {
            window: DateWindow {
                from: self.from,
                to: self.to,
            },
            status: self.status.as_deref().map(parse_status).transpose()?,
            leave_type: self.leave_type.map(LeaveType::from),
            department_id: self.department_id,
            employee_id: self.employee_id,
            page: self.page,
            per_page: self.per_page,
        })
    }
}

/* =========================
Create leave request
========================= */
/// Swagger doc for create_leave endpoint
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request stored, auto-approved or pending", body = LeaveOutcome),
        (status = 400, description = "Missing or malformed field"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 503, description = "Store unavailable, retry")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();
    let employee_id = auth.leave_subject(payload.employee_id)?;

    let cmd = CreateLeaveCommand {
        employee_id,
        leave_type: required(payload.leave_type, "leave_type")?,
        start_date: required(payload.start_date, "start_date")?,
        end_date: required(payload.end_date, "end_date")?,
        reason: payload.reason,
    };

    let outcome = engine.create(cmd, &auth.audit_name()).await?;

    Ok(HttpResponse::Created().json(outcome))
}

/* =========================
Approve leave (HR/Admin)
========================= */
/// Swagger doc for approve_leave endpoint
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    request_body = LeaveDecision,
    responses(
        (status = 200, description = "Leave approved (repeat approvals are no-ops on the balance)", body = LeaveOutcome),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Too many overlapping leaves in department", body = Object, example = json!({
            "message": "too many overlapping leaves in department (2/2)",
            "retryable": false
        })),
        (status = 422, description = "Rejected leave cannot be approved"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
    body: Option<web::Json<LeaveDecision>>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let decision = body.map(|b| b.into_inner()).unwrap_or_default();
    let outcome = engine
        .transition(
            TransitionCommand {
                leave_id: path.into_inner(),
                next: LeaveStatus::Approved,
                reason: decision.reason,
                is_paid: decision.is_paid,
                overlap_threshold: decision.overlap_threshold,
            },
            &auth.audit_name(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(outcome))
}

/* =========================
Reject leave (HR/Admin)
========================= */
/// Swagger doc for reject_leave endpoint
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    request_body = LeaveDecision,
    responses(
        (status = 200, description = "Leave rejected, balance restored if it was approved", body = LeaveOutcome),
        (status = 404, description = "Leave request not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
    body: Option<web::Json<LeaveDecision>>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let decision = body.map(|b| b.into_inner()).unwrap_or_default();
    let outcome = engine
        .transition(
            TransitionCommand {
                leave_id: path.into_inner(),
                next: LeaveStatus::Rejected,
                reason: decision.reason,
                is_paid: None,
                overlap_threshold: None,
            },
            &auth.audit_name(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(outcome))
}

/// Generic status transition
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/status",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request")
    ),
    request_body = LeaveTransition,
    responses(
        (status = 200, description = "Leave transitioned", body = LeaveOutcome),
        (status = 400, description = "Missing or unknown status"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Too many overlapping leaves in department"),
        (status = 422, description = "Unsupported transition")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn transition_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
    body: web::Json<LeaveTransition>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let body = body.into_inner();
    let status = required(body.status, "status")?;
    let outcome = engine
        .transition(
            TransitionCommand {
                leave_id: path.into_inner(),
                next: parse_status(&status)?,
                reason: body.reason,
                is_paid: body.is_paid,
                overlap_threshold: body.overlap_threshold,
            },
            &auth.audit_name(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(outcome))
}

/// Leave balance of an employee
#[utoipa::path(
    get,
    path = "/api/leave/balance/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Current leave balance", body = EmployeeLeaveProfile),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_balance(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    if !auth.role.can_decide_leave() && auth.employee_id != Some(employee_id) {
        return Err(actix_web::error::ErrorForbidden("HR/Admin only"));
    }

    let profile = engine.employee_balance(employee_id).await?;

    Ok(HttpResponse::Ok().json(profile))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "leave request 7 not found",
            "retryable": false
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let leave = engine.get(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(leave))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeavePage),
        (status = 400, description = "Bad filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let page = engine.list(query.into_inner().into_query()?).await?;

    Ok(HttpResponse::Ok().json(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_maps_to_query() {
        let filter = LeaveFilter {
            from: NaiveDate::from_ymd_opt(2026, 1, 1),
            to: None,
            status: Some("Approved".into()),
            leave_type: Some("sick".into()),
            department_id: Some(10),
            employee_id: None,
            page: Some(2),
            per_page: None,
        };

        let query = filter.into_query().unwrap();
        assert_eq!(query.status, Some(LeaveStatus::Approved));
        assert_eq!(query.leave_type, Some(LeaveType::Sick));
        assert_eq!(query.window.from, NaiveDate::from_ymd_opt(2026, 1, 1));
        assert_eq!(query.page, Some(2));
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        assert!(matches!(parse_status("archived"), Err(LeaveError::Validation(_))));
        assert!(matches!(required::<u64>(None, "status"), Err(LeaveError::Validation(m)) if m == "status is required"));
    }
}
