use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::auth::AuthUser;
use crate::models::ItemType;
use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::response::created;

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub voucher_type: ItemType,
    pub quantity: u32,
}

pub async fn purchase<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
    Json(body): Json<PurchaseRequest>,
) -> Result<Response, AppError> {
    let receipt = state
        .ledger
        .purchase_vouchers(
            user.id,
            user.role.pricing_tier(),
            body.voucher_type,
            body.quantity,
        )
        .await?;
    info!(
        transaction_id = %receipt.transaction.id,
        user_id = %user.id,
        quantity = body.quantity,
        balance = receipt.balance,
        "Vouchers purchased"
    );
    Ok(created(receipt, "Vouchers purchased"))
}
