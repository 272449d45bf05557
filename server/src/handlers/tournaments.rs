use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::ItemType;
use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub entry_type: ItemType,
    /// Pays with this voucher instead of points.
    #[serde(default)]
    pub voucher_id: Option<Uuid>,
}

pub async fn list<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(_): AuthUser,
) -> Result<Response, AppError> {
    let tournaments = state.ledger.store().list_tournaments().await?;
    Ok(success(tournaments, "Tournaments loaded"))
}

pub async fn enter<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(user): AuthUser,
    Path(tournament_id): Path<Uuid>,
    Json(body): Json<EntryRequest>,
) -> Result<Response, AppError> {
    match body.voucher_id {
        Some(voucher_id) => {
            let entry = state
                .ledger
                .enter_tournament_with_voucher(user.id, tournament_id, body.entry_type, voucher_id)
                .await?;
            info!(entry_id = %entry.id, %tournament_id, user_id = %user.id, %voucher_id, "Tournament entry paid with voucher");
            Ok(created(entry, "Tournament entry recorded"))
        }
        None => {
            let receipt = state
                .ledger
                .enter_tournament_with_points(
                    user.id,
                    user.role.pricing_tier(),
                    tournament_id,
                    body.entry_type,
                )
                .await?;
            info!(
                transaction_id = %receipt.transaction.id,
                %tournament_id,
                user_id = %user.id,
                balance = receipt.balance,
                "Tournament entry paid with points"
            );
            Ok(created(receipt, "Tournament entry recorded"))
        }
    }
}
