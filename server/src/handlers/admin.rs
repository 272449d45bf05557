//! Routes behind [`AdminUser`].

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::models::{
    ItemType, MemberRole, PricingPolicy, PricingTier, Tournament, TransactionStatus, User,
};
use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub role: MemberRole,
}

#[derive(Debug, Deserialize)]
pub struct TransactionFilter {
    pub status: Option<TransactionStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub amount: i64,
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct PricingUpdate {
    pub item_type: ItemType,
    pub tier: PricingTier,
    pub price: i64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreateTournamentRequest {
    pub name: String,
    pub starts_at: DateTime<Utc>,
}

pub async fn create_user<S: Store>(
    State(state): State<AppState<S>>,
    AdminUser(admin): AdminUser,
    Json(body): Json<CreateUserRequest>,
) -> Result<Response, AppError> {
    let name = body.name.trim();
    let email = body.email.trim().to_lowercase();
    if name.is_empty() {
        return Err(AppError::ValidationError("name is required".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::ValidationError(
            "a valid email is required".to_string(),
        ));
    }

    let user = User::new(name, email, body.role);
    state.ledger.store().create_user(&user).await?;
    info!(user_id = %user.id, admin_id = %admin.id, role = ?user.role, "Member registered");
    Ok(created(user, "Member registered"))
}

pub async fn list_transactions<S: Store>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
    Query(filter): Query<TransactionFilter>,
) -> Result<Response, AppError> {
    let records = state
        .ledger
        .store()
        .list_transactions(None, filter.status)
        .await?;
    Ok(success(records, "Transactions loaded"))
}

pub async fn confirm<S: Store>(
    State(state): State<AppState<S>>,
    AdminUser(admin): AdminUser,
    Path(transaction_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let receipt = state.ledger.confirm(transaction_id, admin.id).await?;
    info!(
        %transaction_id,
        admin_id = %admin.id,
        user_id = %receipt.transaction.user_id,
        balance = receipt.balance,
        "Transaction confirmed"
    );
    Ok(success(receipt, "Transaction confirmed"))
}

pub async fn reject<S: Store>(
    state: State<AppState<S>>,
    admin: AdminUser,
    transaction_id: Path<Uuid>,
    body: Option<Json<ReviewRequest>>,
) -> Result<Response, AppError> {
    close(state, admin, transaction_id, body, TransactionStatus::Cancelled).await
}

pub async fn fail<S: Store>(
    state: State<AppState<S>>,
    admin: AdminUser,
    transaction_id: Path<Uuid>,
    body: Option<Json<ReviewRequest>>,
) -> Result<Response, AppError> {
    close(state, admin, transaction_id, body, TransactionStatus::Failed).await
}

async fn close<S: Store>(
    State(state): State<AppState<S>>,
    AdminUser(admin): AdminUser,
    Path(transaction_id): Path<Uuid>,
    body: Option<Json<ReviewRequest>>,
    status: TransactionStatus,
) -> Result<Response, AppError> {
    let note = body.map(|Json(review)| review).unwrap_or_default().note;
    let record = state
        .ledger
        .reject(transaction_id, admin.id, status, note)
        .await?;
    info!(%transaction_id, admin_id = %admin.id, status = ?record.status, "Transaction closed");
    Ok(success(record, "Transaction closed"))
}

pub async fn adjust<S: Store>(
    State(state): State<AppState<S>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<AdjustRequest>,
) -> Result<Response, AppError> {
    let receipt = state
        .ledger
        .adjust(admin.id, user_id, body.amount, body.note)
        .await?;
    info!(
        %user_id,
        admin_id = %admin.id,
        amount = body.amount,
        balance = receipt.balance,
        "Balance adjusted"
    );
    Ok(success(receipt, "Balance adjusted"))
}

pub async fn list_pricing<S: Store>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
) -> Result<Response, AppError> {
    let policies = state.ledger.store().list_pricing().await?;
    Ok(success(policies, "Pricing loaded"))
}

pub async fn update_pricing<S: Store>(
    State(state): State<AppState<S>>,
    AdminUser(admin): AdminUser,
    Json(body): Json<PricingUpdate>,
) -> Result<Response, AppError> {
    if body.price <= 0 {
        return Err(AppError::ValidationError(
            "price must be positive".to_string(),
        ));
    }
    let mut policy = PricingPolicy::new(body.item_type, body.tier, body.price);
    policy.active = body.active;
    state.ledger.store().upsert_pricing(&policy).await?;
    info!(admin_id = %admin.id, item_type = ?policy.item_type, tier = ?policy.tier, price = policy.price, active = policy.active, "Pricing updated");
    Ok(success(policy, "Pricing updated"))
}

pub async fn create_tournament<S: Store>(
    State(state): State<AppState<S>>,
    AdminUser(admin): AdminUser,
    Json(body): Json<CreateTournamentRequest>,
) -> Result<Response, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::ValidationError(
            "tournament name is required".to_string(),
        ));
    }
    let tournament = Tournament::new(body.name.trim(), body.starts_at);
    state.ledger.store().create_tournament(&tournament).await?;
    info!(tournament_id = %tournament.id, admin_id = %admin.id, "Tournament created");
    Ok(created(tournament, "Tournament created"))
}
