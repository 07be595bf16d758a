use actix_web::web;

use crate::handlers::shifts;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/shifts")
            .route("", web::post().to(shifts::create_shift))
            .route("/scheduled", web::get().to(shifts::scheduled_shifts))
            .route("/{id}", web::get().to(shifts::get_shift))
            .route("/{id}/deactivate", web::post().to(shifts::deactivate_shift)),
    )
    .service(
        web::scope("/shift-assignments")
            .route("", web::post().to(shifts::create_assignment))
            .route("/user/{user_id}", web::get().to(shifts::list_user_assignments))
            .route(
                "/{id}/deactivate",
                web::post().to(shifts::deactivate_assignment),
            ),
    );
}
