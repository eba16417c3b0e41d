use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::services::booking::CreateBookingRequest;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct BookingQuery {
    pub show_id: Option<Uuid>,
}

pub async fn create_booking(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    request: web::Json<CreateBookingRequest>,
) -> Result<HttpResponse, AppError> {
    let created = state.bookings().create_booking(user.id, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

pub async fn list_bookings(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<BookingQuery>,
) -> Result<HttpResponse, AppError> {
    let bookings = state.bookings().list_bookings(user.id, query.show_id).await?;
    Ok(HttpResponse::Ok().json(bookings))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bookings")
            .route("", web::post().to(create_booking))
            .route("", web::get().to(list_bookings)),
    );
}
