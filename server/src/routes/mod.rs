use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, with_security_headers, Config};
use crate::handlers::{account, admin, health_check, requests, tournaments, vouchers};
use crate::state::AppState;
use crate::store::Store;

pub fn create_routes<S: Store>(state: AppState<S>, config: &Config) -> Router {
    let member = Router::new()
        .route("/api/me", get(account::me))
        .route("/api/me/transactions", get(account::my_transactions::<S>))
        .route("/api/me/point-logs", get(account::my_point_logs::<S>))
        .route("/api/me/vouchers", get(account::my_vouchers::<S>))
        .route("/api/pricing", get(account::pricing::<S>))
        .route("/api/charges", post(requests::request_charge::<S>))
        .route("/api/withdrawals", post(requests::request_withdrawal::<S>))
        .route(
            "/api/transactions/:id/cancel",
            post(requests::cancel_request::<S>),
        )
        .route("/api/vouchers/purchase", post(vouchers::purchase::<S>))
        .route("/api/tournaments", get(tournaments::list::<S>))
        .route("/api/tournaments/:id/entries", post(tournaments::enter::<S>));

    let admin = Router::new()
        .route("/api/admin/users", post(admin::create_user::<S>))
        .route("/api/admin/users/:id/adjust", post(admin::adjust::<S>))
        .route("/api/admin/transactions", get(admin::list_transactions::<S>))
        .route(
            "/api/admin/transactions/:id/confirm",
            post(admin::confirm::<S>),
        )
        .route("/api/admin/transactions/:id/reject", post(admin::reject::<S>))
        .route("/api/admin/transactions/:id/fail", post(admin::fail::<S>))
        .route(
            "/api/admin/pricing",
            get(admin::list_pricing::<S>).put(admin::update_pricing::<S>),
        )
        .route("/api/admin/tournaments", post(admin::create_tournament::<S>));

    let router = Router::new()
        .route("/health", get(health_check))
        .merge(member.merge(admin).with_state(state));

    with_security_headers(router, config.production)
        .layer(create_cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}
