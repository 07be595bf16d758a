use actix_web::web;

use crate::handlers::detection;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/detection")
            .route("/run", web::post().to(detection::run_detection))
            .route("/reprocess", web::post().to(detection::reprocess_range))
            .route("/user/{user_id}", web::post().to(detection::detect_for_user)),
    );
}
