use crate::{
    api::{admin, attendance},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes. /auth/me carries its own token check through the
    // AuthUser extractor.
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter)
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/me")
                    .wrap(login_limiter)
                    .route(web::get().to(handlers::me)),
            ),
    );

    // Employee routes
    cfg.service(
        web::scope("/attendance")
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter.clone()) // rate limiting
            .service(web::resource("/status").route(web::get().to(attendance::status)))
            .service(web::resource("/punch-in").route(web::post().to(attendance::punch_in)))
            .service(web::resource("/punch-out").route(web::post().to(attendance::punch_out)))
            .service(
                web::resource("/cancel-punch/{attendanceId}")
                    .route(web::delete().to(attendance::cancel_punch)),
            )
            .service(web::resource("/history").route(web::get().to(attendance::history)))
            .service(
                web::resource("/summary/daily").route(web::get().to(attendance::daily_summary)),
            )
            .service(
                web::resource("/summary/weekly").route(web::get().to(attendance::weekly_summary)),
            ),
    );

    // Admin routes; role checking happens in the handlers
    cfg.service(
        web::scope("/admin")
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            // one segment either way: uid for GET, punch id for PUT/DELETE
            .service(
                web::resource("/punches/{id}")
                    .route(web::get().to(admin::employee_punches))
                    .route(web::put().to(admin::edit_punch))
                    .route(web::delete().to(admin::delete_punch)),
            )
            .service(web::resource("/schedule/{uid}").route(web::put().to(admin::assign_schedule)))
            .service(web::resource("/reports/daily").route(web::get().to(admin::daily_reports)))
            .service(web::resource("/reports/weekly").route(web::get().to(admin::weekly_reports))),
    );
}
