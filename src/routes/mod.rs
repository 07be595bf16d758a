use actix_web::web;

pub mod attendance;
pub mod detection;
pub mod evidence;
pub mod explanations;
pub mod payrolls;
pub mod salary_structures;
pub mod shifts;
pub mod violations;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(shifts::configure)
            .configure(attendance::configure)
            .configure(detection::configure)
            .configure(violations::configure)
            .configure(explanations::configure)
            .configure(evidence::configure)
            .configure(salary_structures::configure)
            .configure(payrolls::configure),
    );
}
