use std::sync::Arc;

use rocket::http::Status;
use rocket::serde::json::{self, Json};
use rocket::State;
use serde_json::{json, Value};

use crate::delivery::{DeliveryRequest, DeliveryService, Outcome, Rejection};
use crate::security::ClientIp;

// ── Send confirmation code ─────────────────────────────

/// Any Content-Type is accepted; a body that isn't the expected JSON shape is
/// answered like a request with missing fields.
#[post("/send-code", data = "<form>")]
pub async fn send_code(
    service: &State<Arc<DeliveryService>>,
    client_ip: ClientIp,
    form: Result<Json<DeliveryRequest>, json::Error<'_>>,
) -> (Status, Json<Value>) {
    let request = match form {
        Ok(form) => form.into_inner(),
        Err(e) => {
            log::debug!("[delivery] unreadable request body: {:?}", e);
            return rejected(Rejection::MissingField);
        }
    };

    match service.handle(&request, &client_ip.hashed()).await {
        Outcome::Delivered { simulated: true } => {
            (Status::Ok, Json(json!({"ok": true, "simulated": true})))
        }
        Outcome::Delivered { simulated: false } => (Status::Ok, Json(json!({"ok": true}))),
        Outcome::Queued => (
            Status::Accepted,
            Json(json!({"ok": false, "message": "Queued for retry"})),
        ),
        Outcome::Rejected(reason) => rejected(reason),
    }
}

fn rejected(reason: Rejection) -> (Status, Json<Value>) {
    let status = match reason {
        Rejection::MissingField => Status::BadRequest,
        Rejection::RateLimited => Status::TooManyRequests,
    };
    (status, Json(json!({"ok": false, "message": reason.message()})))
}

// ── Health ─────────────────────────────────────────────

#[get("/health")]
pub fn health(service: &State<Arc<DeliveryService>>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "simulated": service.is_simulated(),
        "queued": service.queue().len(),
        "rateLimitKeys": service.limiter().ledger().tracked_keys(),
    }))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![send_code, health]
}
