use actix_web::{HttpResponse, delete, get, post, web};
use datacat_service::{NewJob, Orchestrator};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::owner::Owner;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_job)
        .service(list_jobs)
        .service(job_status)
        .service(job_active)
        .service(pause_job)
        .service(restart_job)
        .service(delete_job);
}

#[derive(Debug, Deserialize)]
struct JobQuery {
    id: Option<i64>,
}

#[post("/jobs")]
async fn create_job(
    orchestrator: web::Data<Orchestrator>,
    owner: Owner,
    body: web::Json<NewJob>,
) -> Result<HttpResponse, ApiError> {
    let created = orchestrator.create(owner.0, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "id": created.id,
        "name": created.name,
        "url": created.url,
    })))
}

/// One job with `?id=`, all of the caller's jobs otherwise
#[get("/jobs")]
async fn list_jobs(
    orchestrator: web::Data<Orchestrator>,
    owner: Owner,
    query: web::Query<JobQuery>,
) -> Result<HttpResponse, ApiError> {
    let body = match query.id {
        Some(id) => json!({ "success": true, "job": orchestrator.get_one(id, owner.0).await? }),
        None => json!({ "success": true, "jobs": orchestrator.get_all(owner.0).await? }),
    };
    Ok(HttpResponse::Ok().json(body))
}

#[get("/jobs/{id}/status")]
async fn job_status(
    orchestrator: web::Data<Orchestrator>,
    owner: Owner,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let status = orchestrator.get_status(id.into_inner(), owner.0).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "status": status })))
}

#[get("/jobs/{id}/active")]
async fn job_active(
    orchestrator: web::Data<Orchestrator>,
    owner: Owner,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let active = orchestrator.get_active(id.into_inner(), owner.0).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "active": active })))
}

#[post("/jobs/{id}/pause")]
async fn pause_job(
    orchestrator: web::Data<Orchestrator>,
    owner: Owner,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    orchestrator.pause(id.into_inner(), owner.0).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[post("/jobs/{id}/restart")]
async fn restart_job(
    orchestrator: web::Data<Orchestrator>,
    owner: Owner,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    orchestrator.restart(id.into_inner(), owner.0).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[delete("/jobs/{id}")]
async fn delete_job(
    orchestrator: web::Data<Orchestrator>,
    owner: Owner,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    orchestrator.delete(id.into_inner(), owner.0).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// Malformed JSON bodies get the same error shape as everything else
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(format!("invalid request body: {err}")).into())
}
