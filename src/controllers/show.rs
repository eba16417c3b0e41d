use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::models::{CreateShowRequest, UpdateShowRequest};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ShowSearchQuery {
    pub q: Option<String>,
}

pub async fn list_shows(
    state: web::Data<AppState>,
    query: web::Query<ShowSearchQuery>,
) -> Result<HttpResponse, AppError> {
    let shows = state.shows().list_upcoming(query.q.as_deref()).await?;
    Ok(HttpResponse::Ok().json(shows))
}

pub async fn get_show(
    state: web::Data<AppState>,
    user: Option<AuthenticatedUser>,
    show_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let viewer = user.map(|u| u.viewer());
    let details = state.shows().get_show(show_id.into_inner(), viewer).await?;
    Ok(HttpResponse::Ok().json(details))
}

pub async fn my_shows(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    let shows = state.shows().list_mine(user.id).await?;
    Ok(HttpResponse::Ok().json(shows))
}

pub async fn create_show(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    request: web::Json<CreateShowRequest>,
) -> Result<HttpResponse, AppError> {
    let creator = state.users().require_approved_creator(user.id).await?;
    let details = state.shows().create_show(&creator, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(details))
}

pub async fn update_show(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    show_id: web::Path<Uuid>,
    request: web::Json<UpdateShowRequest>,
) -> Result<HttpResponse, AppError> {
    let details = state
        .shows()
        .update_show(user.id, show_id.into_inner(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(details))
}

pub async fn delete_show(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    show_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state.shows().delete_show(user.viewer(), show_id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/shows")
            .route("", web::get().to(list_shows))
            .route("", web::post().to(create_show))
            // before /{show_id} so "mine" is not parsed as an id
            .route("/mine", web::get().to(my_shows))
            .route("/{show_id}", web::get().to(get_show))
            .route("/{show_id}", web::put().to(update_show))
            .route("/{show_id}", web::delete().to(delete_show)),
    );
}
