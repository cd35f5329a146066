use crate::api::leave_request::{CreateLeave, LeaveDecision, LeaveFilter, LeaveTransition};
use crate::leave::{LeaveOutcome, LeavePage};
use crate::model::employee::EmployeeLeaveProfile;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Leave API",
        version = "1.0.0",
        description = r#"
## Leave Lifecycle

Leave requests, approvals and the per-employee leave balance.

### 🔹 Behaviour
- **Create**: a request is auto-approved when the employee's balance covers it
  and fewer than the configured number of approved leaves in the department
  overlap it; otherwise it waits as `pending`.
- **Approve / Reject**: approving debits the balance once, no matter how many
  times it is repeated. Rejecting an approved leave restores the balance.
  A rejected leave cannot be approved again.
- **List**: date-window, status, type, department and employee filters with pagination.

### 🔐 Security
Endpoints require a JWT **Bearer** access token. Approve, reject, get and list
are limited to **Admin** and **HR**.
"#,
    ),
    paths(
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::transition_leave,
        crate::api::leave_request::leave_balance,
    ),
    components(
        schemas(
            CreateLeave,
            LeaveDecision,
            LeaveTransition,
            LeaveFilter,
            LeaveRequest,
            LeaveStatus,
            LeaveOutcome,
            LeavePage,
            EmployeeLeaveProfile
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave management APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
