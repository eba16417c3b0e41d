use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

pub const SIGNATURE_HEADER: &str = "X-Razorpay-Signature";
pub const EVENT_ID_HEADER: &str = "X-Razorpay-Event-Id";

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Gateway callback. Unauthenticated; the signature is the credential.
pub async fn payment_webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    state
        .webhooks()
        .handle(&body, header(&req, SIGNATURE_HEADER), header(&req, EVENT_ID_HEADER))
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/webhooks").route("/payment", web::post().to(payment_webhook)));
}
