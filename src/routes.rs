use crate::{
    api::leave_request,
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

/// Token-bucket limiter refilling `requests_per_min` per minute.
fn build_limiter(requests_per_min: u32) -> Option<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()?;
    Some(Governor::new(&cfg))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let leave_scope = web::scope("/leave")
        // /leave
        .service(
            web::resource("")
                .route(web::get().to(leave_request::leave_list))
                .route(web::post().to(leave_request::create_leave)),
        )
        // /leave/balance/{employee_id}
        .service(
            web::resource("/balance/{employee_id}")
                .route(web::get().to(leave_request::leave_balance)),
        )
        // /leave/{id}
        .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
        // /leave/{id}/approve
        .service(
            web::resource("/{id}/approve").route(web::put().to(leave_request::approve_leave)),
        )
        // /leave/{id}/reject
        .service(web::resource("/{id}/reject").route(web::put().to(leave_request::reject_leave)))
        // /leave/{id}/status
        .service(
            web::resource("/{id}/status").route(web::put().to(leave_request::transition_leave)),
        );

    // Protected routes
    let protected = web::scope(&config.api_prefix)
        .wrap(from_fn(auth_middleware)) // authentication
        .service(leave_scope);

    match build_limiter(config.rate_protected_per_min) {
        Some(limiter) => cfg.service(protected.wrap(limiter)), // rate limiting
        None => {
            tracing::warn!(
                rate = config.rate_protected_per_min,
                "Invalid rate limit settings, protected routes run unlimited"
            );
            cfg.service(protected)
        }
    };
}

// API REQUEST
//  └─ Authorization: Bearer access_token
//       └─ auth_middleware verifies, handlers read AuthUser
