use crate::error::AppError;
use crate::services::auth::ADMIN_SESSION_COOKIE;
use crate::state::AppState;
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct AdminLoginRequest {
    pub password: String,
}

pub async fn admin_login(
    state: web::Data<AppState>,
    request: web::Json<AdminLoginRequest>,
) -> Result<HttpResponse, AppError> {
    let token = state.auth.admin_login(&request.password)?;

    let cookie = Cookie::build(ADMIN_SESSION_COOKIE, token.clone())
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(state.auth.admin_session_seconds()))
        .finish();

    Ok(HttpResponse::Ok().cookie(cookie).json(json!({ "token": token })))
}

pub async fn admin_logout() -> HttpResponse {
    let mut cookie = Cookie::new(ADMIN_SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie.make_removal();

    HttpResponse::Ok().cookie(cookie).json(json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/admin/login", web::post().to(admin_login))
            .route("/admin/logout", web::post().to(admin_logout)),
    );
}
