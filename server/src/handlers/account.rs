use axum::extract::State;
use axum::response::Response;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::{MemberRole, PricingTier};
use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Serialize)]
struct ProfilePayload {
    id: Uuid,
    name: String,
    email: String,
    role: MemberRole,
    tier: PricingTier,
    balance: i64,
}

pub async fn me(AuthUser(user): AuthUser) -> Response {
    let payload = ProfilePayload {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        tier: user.role.pricing_tier(),
        balance: user.balance,
    };
    success(payload, "Profile loaded")
}

pub async fn my_transactions<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
) -> Result<Response, AppError> {
    let records = state
        .ledger
        .store()
        .list_transactions(Some(user.id), None)
        .await?;
    Ok(success(records, "Transactions loaded"))
}

pub async fn my_point_logs<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
) -> Result<Response, AppError> {
    let logs = state.ledger.store().list_point_logs(user.id).await?;
    Ok(success(logs, "Point log loaded"))
}

pub async fn my_vouchers<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
) -> Result<Response, AppError> {
    let vouchers = state.ledger.vouchers(user.id, Utc::now()).await?;
    Ok(success(vouchers, "Vouchers loaded"))
}

/// Active prices for the caller's own tier.
pub async fn pricing<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
) -> Result<Response, AppError> {
    let policies = state.ledger.price_list(user.role.pricing_tier()).await?;
    Ok(success(policies, "Pricing loaded"))
}
