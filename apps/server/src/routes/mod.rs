use actix_web::web;

mod health;
mod jobs;

pub use jobs::json_config;

/// Register every HTTP route of the server
pub fn routes(cfg: &mut web::ServiceConfig) {
    health::routes(cfg);
    jobs::routes(cfg);
}
