use crate::auth::middleware::AuthRejection;
use crate::model::role::Role;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

/// Reads the caller that `auth_middleware` stored; routes outside the
/// middleware get 401.
impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| AuthRejection::MissingHeader.into()),
        )
    }
}

impl AuthUser {
    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if self.role.can_decide_leave() {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("HR/Admin only"))
        }
    }

    /// Employee the caller may file leave for: anyone for HR/Admin, otherwise
    /// only their own linked employee record.
    pub fn leave_subject(&self, requested: Option<u64>) -> actix_web::Result<u64> {
        match (requested, self.employee_id) {
            (Some(id), _) if self.role.can_decide_leave() => Ok(id),
            (Some(id), Some(own)) if id == own => Ok(id),
            (None, Some(own)) => Ok(own),
            (Some(_), Some(_)) => Err(actix_web::error::ErrorForbidden(
                "Cannot file leave for another employee",
            )),
            (_, None) => Err(actix_web::error::ErrorForbidden("No employee profile")),
        }
    }

    /// Name recorded as `by` in the audit trail.
    pub fn audit_name(&self) -> String {
        format!("{}#{}", self.username, self.user_id)
    }
}
