use actix_web::{get, post, web, HttpResponse};
use serde_json::json;

use crate::{
    error::AppResult,
    models::{
        session::{Session, SessionKeys},
        user::{User, UserLoginRequest, UserLoginResponse},
    },
};

async fn login_session(
    payload: &UserLoginRequest,
    keys: &SessionKeys,
) -> AppResult<Option<UserLoginResponse>> {
    let user = match User::find_with_roles(&payload.email).await? {
        Some(user) => user,
        None => return Ok(None),
    };
    let role = match user.active_role(&payload.role) {
        Some(assigned) => assigned.role_name.clone(),
        None => return Ok(None),
    };

    let session = Session {
        user_id: user._id.to_hex(),
        username: user.user_name.clone(),
        role,
    };
    let token = keys.issue(&session)?;

    Ok(Some(UserLoginResponse {
        user_id: session.user_id,
        username: session.username,
        role: session.role,
        token,
    }))
}

#[post("/api/login")]
pub async fn login(
    payload: web::Json<UserLoginRequest>,
    keys: web::Data<SessionKeys>,
) -> HttpResponse {
    let payload: UserLoginRequest = payload.into_inner();

    match login_session(&payload, &keys).await {
        Ok(Some(response)) => {
            tracing::info!(username = %response.username, role = %response.role, "user signed in");
            HttpResponse::Ok().json(response)
        }
        Ok(None) => {
            tracing::warn!(email = %payload.email, role = %payload.role, "login rejected");
            HttpResponse::NotFound().json(json!({ "message": "User not found" }))
        }
        Err(error) => {
            tracing::error!(%error, "login failed");
            HttpResponse::InternalServerError().json(json!({ "message": "Internal server error" }))
        }
    }
}
#[get("/api/workers")]
pub async fn get_workers() -> HttpResponse {
    match User::find_workers().await {
        Ok(workers) => HttpResponse::Ok().json(workers),
        Err(error) => {
            tracing::error!(%error, "loading workers failed");
            HttpResponse::InternalServerError().json(json!({ "message": error.code() }))
        }
    }
}
