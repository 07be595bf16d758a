use actix_web::web;

use crate::handlers::evidence;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/evidence")
            .route("/unverified", web::get().to(evidence::list_unverified))
            .route("/{id}/download", web::get().to(evidence::download_url))
            .route("/{id}/verify", web::post().to(evidence::verify_evidence))
            .route("/{id}", web::delete().to(evidence::delete_evidence)),
    );
}
