use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::models::OnboardRequest;
use crate::state::AppState;
use actix_web::{web, HttpResponse};

pub async fn onboard(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    request: web::Json<OnboardRequest>,
) -> Result<HttpResponse, AppError> {
    let profile = state.users().onboard(user.id, request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn me(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    let profile = state.users().profile(user.id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("/onboard", web::post().to(onboard))
            .route("/me", web::get().to(me)),
    );
}
