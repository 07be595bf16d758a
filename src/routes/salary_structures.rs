use actix_web::web;

use crate::handlers::salary_structures;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/salary-structures")
            .route("", web::post().to(salary_structures::create_structure))
            .route(
                "/user/{user_id}",
                web::get().to(salary_structures::list_user_structures),
            )
            .route(
                "/user/{user_id}/active",
                web::get().to(salary_structures::active_structure),
            )
            .route("/{id}", web::get().to(salary_structures::get_structure))
            .route(
                "/{id}/deactivate",
                web::post().to(salary_structures::deactivate_structure),
            ),
    );
}
