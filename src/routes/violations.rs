use actix_web::web;

use crate::handlers::{explanations, violations};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/violations")
            .route("", web::get().to(violations::list_violations))
            .route("/dashboard", web::get().to(violations::my_dashboard))
            .route(
                "/dashboard/manager",
                web::get().to(violations::manager_dashboard),
            )
            .route(
                "/dashboard/user/{user_id}",
                web::get().to(violations::user_dashboard),
            )
            .route("/statistics", web::get().to(violations::violation_statistics))
            .route("/{id}", web::get().to(violations::get_violation))
            .route("/{id}/resolve", web::post().to(violations::resolve_violation))
            .route("/{id}/escalate", web::post().to(violations::escalate_violation))
            .route(
                "/{id}/explanations",
                web::post().to(explanations::submit_explanation),
            )
            .route(
                "/{id}/explanations/latest",
                web::get().to(explanations::latest_for_violation),
            ),
    );
}
