use actix_web::web;

use crate::handlers::attendance;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/attendance")
            .route("", web::post().to(attendance::record_attendance))
            .route("/check-in", web::post().to(attendance::check_in))
            .route("/check-out", web::post().to(attendance::check_out))
            .route(
                "/user/{user_id}",
                web::get().to(attendance::list_user_attendance),
            )
            .route("/{id}", web::get().to(attendance::get_attendance_log)),
    );
}
