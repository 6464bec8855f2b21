#[macro_use]
extern crate rocket;

use std::process;
use std::sync::Arc;

use rocket::figment::Figment;
use rocket::serde::json::Json;
use rocket::{Build, Rocket};
use serde_json::{json, Value};

mod clock;
mod config;
mod delivery;
mod mailer;
mod rate_limit;
mod routes;
mod security;
mod tasks;

use config::Settings;
use delivery::{DeliveryService, Rejection};
use mailer::Transport;

#[catch(400)]
fn bad_request() -> Json<Value> {
    Json(json!({"ok": false, "message": Rejection::MissingField.message()}))
}

#[catch(404)]
fn not_found() -> Json<Value> {
    Json(json!({"ok": false, "message": "Not found"}))
}

#[catch(422)]
fn unprocessable() -> Json<Value> {
    Json(json!({"ok": false, "message": Rejection::MissingField.message()}))
}

#[catch(500)]
fn server_error() -> Json<Value> {
    Json(json!({"ok": false, "message": "Internal server error"}))
}

/// Assemble the app around an already-chosen transport.
pub fn build(figment: Figment, settings: &Settings, transport: Arc<dyn Transport>) -> Rocket<Build> {
    let service = Arc::new(DeliveryService::from_settings(settings, transport));

    rocket::custom(figment)
        .manage(service)
        .attach(tasks::BackgroundTasks {
            requeue_interval: settings.delivery.requeue_interval(),
            sweep_interval: settings.delivery.ledger_sweep_interval(),
        })
        .mount("/api", routes::api::routes())
        .register(
            "/",
            catchers![bad_request, not_found, unprocessable, server_error],
        )
}

#[launch]
fn rocket() -> _ {
    env_logger::init();

    let figment = config::figment();
    let settings = match config::load(&figment) {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("[config] {}", e);
            process::exit(1);
        }
    };

    let transport = match mailer::from_config(&settings.mailer) {
        Ok(transport) => transport,
        Err(e) => {
            log::error!("[mailer] {}", e);
            process::exit(1);
        }
    };

    build(figment, &settings, transport)
}
