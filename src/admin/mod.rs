//! Operator API under `/faucet-swap/admin`, guarded by a bearer key.

pub mod auth;
pub mod handlers;

use axum::routing::{get, post};
use axum::{middleware, Router};
use std::sync::Arc;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::chain::ContractGateway;
use crate::config::AdminConfig;
use crate::http::server::AppState;
use crate::ledger::Store;

pub fn setup_admin_router<G: ContractGateway, S: Store>(config: &AdminConfig) -> Router<AppState<G, S>> {
    let api_key: Arc<str> = Arc::from(config.api_key.as_str());

    Router::new()
        .route("/faucet-swap/admin/status", get(get_status::<G, S>))
        .route("/faucet-swap/admin/set-rate", post(set_rate::<G, S>))
        .route("/faucet-swap/admin/set-faucet-amount", post(set_faucet_amount::<G, S>))
        .route("/faucet-swap/admin/fund", post(fund::<G, S>))
        .route("/faucet-swap/admin/withdraw-eth", post(withdraw_eth::<G, S>))
        .route("/faucet-swap/admin/withdraw-token", post(withdraw_token::<G, S>))
        .route("/faucet-swap/admin/accept-answer", post(accept_answer::<G, S>))
        .route_layer(middleware::from_fn_with_state(api_key, admin_auth_middleware))
}
