use crate::error::AppError;
use crate::middleware::{require_admin, AuthenticatedUser};
use crate::models::{AdminShowUpdate, ApprovalStatus, FeeSlabInput};
use crate::services::admin::ResolveAction;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreatorFilter {
    pub status: Option<ApprovalStatus>,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

/// `{"percent": null}` clears the override.
#[derive(Debug, Deserialize)]
pub struct PlatformFeeRequest {
    pub percent: Option<BigDecimal>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub action: ResolveAction,
}

pub async fn list_creators(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    filter: web::Query<CreatorFilter>,
) -> Result<HttpResponse, AppError> {
    require_admin(&user)?;
    let creators = state.admin().list_creators(filter.status).await?;
    Ok(HttpResponse::Ok().json(creators))
}

pub async fn approve_creator(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    creator_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_admin(&user)?;
    let (creator, record) = state.admin().approve_creator(user.id, creator_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "user": creator, "record": record })))
}

pub async fn reject_creator(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    creator_id: web::Path<Uuid>,
    request: web::Json<RejectRequest>,
) -> Result<HttpResponse, AppError> {
    require_admin(&user)?;
    let (creator, record) = state
        .admin()
        .reject_creator(user.id, creator_id.into_inner(), &request.reason)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "user": creator, "record": record })))
}

pub async fn approval_history(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    creator_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_admin(&user)?;
    let history = state.admin().approval_history(creator_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(history))
}

pub async fn set_creator_platform_fee(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    creator_id: web::Path<Uuid>,
    request: web::Json<PlatformFeeRequest>,
) -> Result<HttpResponse, AppError> {
    require_admin(&user)?;
    let update = state
        .admin()
        .set_creator_platform_fee(creator_id.into_inner(), request.into_inner().percent)
        .await?;
    Ok(HttpResponse::Ok().json(update))
}

pub async fn set_show_platform_fee(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    show_id: web::Path<Uuid>,
    request: web::Json<PlatformFeeRequest>,
) -> Result<HttpResponse, AppError> {
    require_admin(&user)?;
    let show = state
        .admin()
        .set_show_platform_fee(show_id.into_inner(), request.into_inner().percent)
        .await?;
    Ok(HttpResponse::Ok().json(show))
}

pub async fn moderate_show(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    show_id: web::Path<Uuid>,
    request: web::Json<AdminShowUpdate>,
) -> Result<HttpResponse, AppError> {
    require_admin(&user)?;
    let show = state.admin().moderate_show(show_id.into_inner(), request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(show))
}

pub async fn show_payout(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    show_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_admin(&user)?;
    let payout = state.admin().payout(show_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(payout))
}

pub async fn resolve_booking(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    booking_id: web::Path<Uuid>,
    request: web::Json<ResolveRequest>,
) -> Result<HttpResponse, AppError> {
    require_admin(&user)?;
    let booking = state
        .admin()
        .resolve_booking(booking_id.into_inner(), request.action)
        .await?;
    Ok(HttpResponse::Ok().json(booking))
}

pub async fn get_fee_slabs(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    require_admin(&user)?;
    let slabs = state.admin().fee_slabs().await?;
    Ok(HttpResponse::Ok().json(slabs))
}

pub async fn replace_fee_slabs(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    request: web::Json<Vec<FeeSlabInput>>,
) -> Result<HttpResponse, AppError> {
    require_admin(&user)?;
    let slabs = state.admin().replace_fee_slabs(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(slabs))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            // Creators
            .route("/creators", web::get().to(list_creators))
            .route("/creators/{id}/approve", web::post().to(approve_creator))
            .route("/creators/{id}/reject", web::post().to(reject_creator))
            .route("/creators/{id}/history", web::get().to(approval_history))
            .route("/creators/{id}/platform-fee", web::put().to(set_creator_platform_fee))
            // Shows
            .route("/shows/{id}", web::patch().to(moderate_show))
            .route("/shows/{id}/platform-fee", web::put().to(set_show_platform_fee))
            .route("/shows/{id}/payout", web::get().to(show_payout))
            // Bookings
            .route("/bookings/{id}/resolve", web::post().to(resolve_booking))
            // Fees
            .route("/fees/slabs", web::get().to(get_fee_slabs))
            .route("/fees/slabs", web::put().to(replace_fee_slabs)),
    );
}
