use actix_web::web;

use crate::handlers::payrolls;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payrolls")
            .route("", web::get().to(payrolls::list_payrolls))
            .route("/calculate", web::post().to(payrolls::calculate_payroll))
            .route("/calculate/bulk", web::post().to(payrolls::bulk_calculate))
            .route("/approve/bulk", web::post().to(payrolls::bulk_approve))
            .route("/statistics", web::get().to(payrolls::statistics))
            .route("/departments", web::get().to(payrolls::department_summary))
            .route("/top-earners", web::get().to(payrolls::top_earners))
            .route("/compare", web::get().to(payrolls::compare_periods))
            .route("/trends", web::get().to(payrolls::trends))
            .route(
                "/user/{user_id}/attendance-summary",
                web::get().to(payrolls::attendance_summary),
            )
            .route("/user/{user_id}/yearly", web::get().to(payrolls::yearly_summary))
            .route("/{id}", web::get().to(payrolls::get_payroll))
            .route("/{id}/recalculate", web::post().to(payrolls::recalculate_payroll))
            .route("/{id}/validate", web::get().to(payrolls::validate_payroll))
            .route("/{id}/approve", web::post().to(payrolls::approve_payroll))
            .route("/{id}/pay", web::post().to(payrolls::mark_paid))
            .route("/{id}/cancel", web::post().to(payrolls::cancel_payroll)),
    );
}
