use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use actix_web::http::StatusCode;
use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use tracing::debug;

/// Why a caller was turned away before reaching a leave handler.
#[derive(Debug, thiserror::Error)]
pub enum AuthRejection {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Authorization header must carry a Bearer token")]
    NotBearer,

    #[error("Invalid or expired token")]
    InvalidToken(String),

    #[error("Token carries unknown role {0}")]
    UnknownRole(u8),
}

impl ResponseError for AuthRejection {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Unauthorized().json(json!({
            "message": self.to_string(),
            "retryable": false,
        }))
    }
}

/// Resolves the caller from `Authorization: Bearer <access token>`.
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthUser, AuthRejection> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthRejection::MissingHeader)?;
    let token = header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthRejection::NotBearer)?;

    let claims = verify_token(token, secret).map_err(AuthRejection::InvalidToken)?;
    let role = Role::from_id(claims.role).ok_or(AuthRejection::UnknownRole(claims.role))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
        employee_id: claims.employee_id,
    })
}

/// Only place bearer tokens are verified. Handlers read the resulting
/// [`AuthUser`] from request extensions.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let secret = req
        .app_data::<Data<Config>>()
        .map(|config| config.jwt_secret.clone())
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    match authenticate(req.headers(), &secret) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.call(req).await
        }
        Err(rejection) => {
            debug!(reason = ?rejection, path = %req.path(), "Request rejected");
            Ok(req.into_response(rejection.error_response()))
        }
    }
}
