use actix_web::web;

use crate::handlers::{evidence, explanations};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/explanations")
            .route("/my", web::get().to(explanations::my_explanations))
            .route("/pending", web::get().to(explanations::pending_review))
            .route("/overdue", web::get().to(explanations::overdue_for_review))
            .route("/{id}", web::get().to(explanations::get_explanation))
            .route("/{id}", web::put().to(explanations::edit_explanation))
            .route("/{id}", web::delete().to(explanations::delete_explanation))
            .route("/{id}/review", web::post().to(explanations::start_review))
            .route("/{id}/approve", web::post().to(explanations::approve_explanation))
            .route("/{id}/reject", web::post().to(explanations::reject_explanation))
            .route(
                "/{id}/request-info",
                web::post().to(explanations::request_more_info),
            )
            .route("/{id}/evidence", web::post().to(evidence::upload_evidence))
            .route("/{id}/evidence", web::get().to(evidence::list_evidence)),
    );
}
