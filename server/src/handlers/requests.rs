//! Member-initiated charge and withdrawal requests.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct ChargeRequest {
    pub amount: i64,
    pub depositor_name: String,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalRequest {
    pub amount: i64,
    pub destination: String,
}

pub async fn request_charge<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
    Json(body): Json<ChargeRequest>,
) -> Result<Response, AppError> {
    let record = state
        .ledger
        .request_charge(user.id, body.amount, body.depositor_name)
        .await?;
    info!(transaction_id = %record.id, user_id = %user.id, amount = record.amount, "Charge requested");
    Ok(created(record, "Charge request submitted"))
}

pub async fn request_withdrawal<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
    Json(body): Json<WithdrawalRequest>,
) -> Result<Response, AppError> {
    let record = state
        .ledger
        .request_withdrawal(user.id, body.amount, body.destination)
        .await?;
    info!(transaction_id = %record.id, user_id = %user.id, amount = record.amount, "Withdrawal requested");
    Ok(created(record, "Withdrawal request submitted"))
}

pub async fn cancel_request<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
    Path(transaction_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let record = state.ledger.cancel_request(transaction_id, user.id).await?;
    info!(transaction_id = %record.id, user_id = %user.id, "Request cancelled");
    Ok(success(record, "Request cancelled"))
}
