use actix_web::{
    get, http::StatusCode, post, put, web, HttpMessage, HttpRequest, HttpResponse, ResponseError,
};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::AppConfig,
    error::AppError,
    models::{
        session::Session,
        work_permit::{StatusCounts, WorkPermit, WorkPermitPatch, WorkPermitRequest},
        work_permit_query::{WorkPermitListParams, WorkPermitListQuery},
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct PageCountParams {
    pub query: Option<String>,
}

fn session_of(req: &HttpRequest) -> Option<Session> {
    req.extensions().get::<Session>().cloned()
}

fn parse_id(work_permit_id: &str) -> Result<ObjectId, HttpResponse> {
    work_permit_id
        .parse()
        .map_err(|_| HttpResponse::BadRequest().json(json!({ "message": "INVALID_ID" })))
}

#[get("/api/work-permit")]
pub async fn get_work_permits(
    params: web::Query<WorkPermitListParams>,
    config: web::Data<AppConfig>,
) -> HttpResponse {
    let list: WorkPermitListQuery = params.into_inner().into();

    match WorkPermit::list_filtered(&list, config.site.offset()).await {
        Ok(permits) => HttpResponse::Ok().json(permits),
        Err(error) => {
            tracing::error!(%error, "listing work permits failed");
            HttpResponse::InternalServerError()
                .json(json!({ "error": "Failed to fetch work permits" }))
        }
    }
}
#[get("/api/work-permit/pages")]
pub async fn get_work_permit_pages(
    params: web::Query<PageCountParams>,
    config: web::Data<AppConfig>,
) -> HttpResponse {
    let query = params.into_inner().query.unwrap_or_default();

    match WorkPermit::count_pages(&query, config.site.offset()).await {
        Ok(total_pages) => HttpResponse::Ok().json(json!({ "total_pages": total_pages })),
        Err(error) => {
            tracing::error!(%error, "counting work permit pages failed");
            error.error_response()
        }
    }
}
#[get("/api/work-permit/counts")]
pub async fn get_work_permit_counts() -> HttpResponse {
    match StatusCounts::fetch().await {
        Ok(counts) => HttpResponse::Ok().json(counts),
        Err(error) => {
            tracing::error!(%error, "counting work permits by status failed");
            error.error_response()
        }
    }
}
#[get("/api/work-permit/latest")]
pub async fn get_latest_work_permits(config: web::Data<AppConfig>) -> HttpResponse {
    match WorkPermit::list_latest(config.site.offset()).await {
        Ok(permits) => HttpResponse::Ok().json(permits),
        Err(error) => {
            tracing::error!(%error, "listing latest work permits failed");
            error.error_response()
        }
    }
}
#[get("/api/work-permit/{work_permit_id}")]
pub async fn get_work_permit(
    work_permit_id: web::Path<String>,
    config: web::Data<AppConfig>,
) -> HttpResponse {
    let work_permit_id = match parse_id(&work_permit_id) {
        Ok(work_permit_id) => work_permit_id,
        Err(response) => return response,
    };

    match WorkPermit::find_detail(&work_permit_id, config.site.offset()).await {
        Ok(Some(permit)) => HttpResponse::Ok().json(permit),
        Ok(None) => AppError::NotFound("WORK_PERMIT").error_response(),
        Err(error) => {
            tracing::error!(%error, "loading work permit failed");
            error.error_response()
        }
    }
}
fn create_rejected(status: StatusCode) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "message": "Failed to create work permit." }))
}

#[post("/api/work-permit")]
pub async fn create_work_permit(
    body: web::Bytes,
    config: web::Data<AppConfig>,
    req: HttpRequest,
) -> HttpResponse {
    let session = match session_of(&req) {
        Some(session) => session,
        None => return AppError::Unauthorized.error_response(),
    };
    let payload: WorkPermitRequest = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::warn!(%error, "work permit body rejected");
            return create_rejected(StatusCode::BAD_REQUEST);
        }
    };

    match WorkPermit::create(payload, &session, config.site.offset()).await {
        Ok(saved) => HttpResponse::Created().json(saved),
        Err(error) => match error {
            AppError::Validation(_) | AppError::NotFound(_) => {
                tracing::warn!(%error, "work permit rejected");
                create_rejected(StatusCode::BAD_REQUEST)
            }
            _ => {
                tracing::error!(%error, "creating work permit failed");
                create_rejected(StatusCode::INTERNAL_SERVER_ERROR)
            }
        },
    }
}
#[put("/api/work-permit/{work_permit_id}")]
pub async fn update_work_permit(
    work_permit_id: web::Path<String>,
    payload: web::Json<WorkPermitPatch>,
    config: web::Data<AppConfig>,
    req: HttpRequest,
) -> HttpResponse {
    let session = match session_of(&req) {
        Some(session) => session,
        None => return AppError::Unauthorized.error_response(),
    };
    let work_permit_id = match parse_id(&work_permit_id) {
        Ok(work_permit_id) => work_permit_id,
        Err(response) => return response,
    };

    match WorkPermit::update_by_id(
        &work_permit_id,
        payload.into_inner(),
        &session,
        config.site.offset(),
    )
    .await
    {
        Ok(saved) => HttpResponse::Ok().json(saved),
        Err(error) => {
            match error {
                AppError::Validation(_)
                | AppError::NotFound(_)
                | AppError::InvalidTransition { .. } => {
                    tracing::warn!(%error, "work permit update rejected")
                }
                _ => tracing::error!(%error, "updating work permit failed"),
            }
            error.error_response()
        }
    }
}
