use axum::response::Response;
use serde::Serialize;

use crate::utils::response::success;

pub mod account;
pub mod admin;
pub mod requests;
pub mod tournaments;
pub mod vouchers;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "pokerclub-api",
    };

    success(payload, "Health check successful")
}
