//! Public and account-scoped handlers.
//!
//! Claim and swap run on their own task: once a payout transfer is
//! broadcast, a dropped connection or request timeout must not abort the
//! flow before it is recorded.

use alloy::primitives::{Address, U256};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::chain::types::QuestionRecord;
use crate::chain::ContractGateway;
use crate::http::auth::AuthenticatedAccount;
use crate::http::response::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::ledger::Store;
use crate::relay::service::{format_token, parse_wallet};
use crate::relay::{
    BalanceView, ClaimStatus, FaucetInfo, FaucetReceipt, SwapHistoryItem, SwapQuote, SwapReceipt,
};

#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteQuery {
    pub eth_amount: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub wallet_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub tx_hash: Option<String>,
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub chain_id: Option<u64>,
    pub block_number: Option<u64>,
    pub backend_wallet: Address,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositAddress {
    pub deposit_address: Address,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeBalance {
    pub address: Address,
    pub balance: String,
    pub balance_formatted: String,
}

/// Question with amounts as decimal strings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: u64,
    pub asker: Address,
    pub token: Address,
    pub bounty: String,
    pub deadline: u64,
    pub uri: String,
    pub answered: bool,
}

impl From<QuestionRecord> for QuestionView {
    fn from(q: QuestionRecord) -> Self {
        Self {
            id: q.id,
            asker: q.asker,
            token: q.token,
            bounty: q.bounty.to_string(),
            deadline: q.deadline,
            uri: q.uri,
            answered: q.answered,
        }
    }
}

/// Reports node reachability; 503 when the chain cannot be read.
pub async fn health<G: ContractGateway, S: Store>(State(state): State<AppState<G, S>>) -> impl IntoResponse {
    let network = state.relay.network().await.ok();
    let status = if network.is_some() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    let body = HealthResponse {
        status: if network.is_some() { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        chain_id: network.map(|n| n.chain_id),
        block_number: network.map(|n| n.block_number),
        backend_wallet: state.relay.backend_address(),
    };
    (status, Json(body))
}

pub async fn info<G: ContractGateway, S: Store>(State(state): State<AppState<G, S>>) -> ApiResult<Json<FaucetInfo>> {
    Ok(Json(state.relay.info().await?))
}

pub async fn balance<G: ContractGateway, S: Store>(
    State(state): State<AppState<G, S>>,
    query: Result<Query<AddressQuery>, QueryRejection>,
) -> ApiResult<Json<BalanceView>> {
    let Query(query) = query?;
    let address = parse_wallet(query.address.as_deref())?;
    Ok(Json(state.relay.token_balance(address).await))
}

pub async fn claim_status<G: ContractGateway, S: Store>(
    State(state): State<AppState<G, S>>,
    AuthenticatedAccount(account_id): AuthenticatedAccount,
) -> ApiResult<Json<ClaimStatus>> {
    Ok(Json(state.relay.claim_status(account_id).await?))
}

pub async fn claim<G: ContractGateway, S: Store>(
    State(state): State<AppState<G, S>>,
    AuthenticatedAccount(account_id): AuthenticatedAccount,
    payload: Result<Json<ClaimRequest>, JsonRejection>,
) -> ApiResult<Json<FaucetReceipt>> {
    let Json(request) = payload?;
    let wallet = request.wallet_address;

    let relay = state.relay.clone();
    let receipt = tokio::spawn(async move { relay.claim_faucet(account_id, wallet.as_deref()).await })
        .await
        .map_err(|e| ApiError::Internal(format!("claim task failed: {}", e)))??;
    Ok(Json(receipt))
}

pub async fn quote<G: ContractGateway, S: Store>(
    State(state): State<AppState<G, S>>,
    query: Result<Query<QuoteQuery>, QueryRejection>,
) -> ApiResult<Json<SwapQuote>> {
    let Query(query) = query?;
    let eth_amount = query
        .eth_amount
        .ok_or_else(|| ApiError::BadRequest("ethAmount is required".to_string()))?;
    Ok(Json(state.relay.quote(&eth_amount).await?))
}

pub async fn deposit_address<G: ContractGateway, S: Store>(State(state): State<AppState<G, S>>) -> Json<DepositAddress> {
    Json(DepositAddress {
        deposit_address: state.relay.deposit_address(),
    })
}

pub async fn swap<G: ContractGateway, S: Store>(
    State(state): State<AppState<G, S>>,
    AuthenticatedAccount(account_id): AuthenticatedAccount,
    payload: Result<Json<SwapRequest>, JsonRejection>,
) -> ApiResult<Json<SwapReceipt>> {
    let Json(request) = payload?;
    let (Some(tx_hash), Some(wallet)) = (request.tx_hash, request.wallet_address) else {
        return Err(ApiError::BadRequest("txHash and walletAddress are required".to_string()));
    };

    let relay = state.relay.clone();
    let receipt = tokio::spawn(async move { relay.swap(account_id, &tx_hash, &wallet).await })
        .await
        .map_err(|e| ApiError::Internal(format!("swap task failed: {}", e)))??;
    Ok(Json(receipt))
}

pub async fn swap_history<G: ContractGateway, S: Store>(
    State(state): State<AppState<G, S>>,
    AuthenticatedAccount(account_id): AuthenticatedAccount,
) -> ApiResult<Json<Vec<SwapHistoryItem>>> {
    Ok(Json(state.relay.swap_history(account_id).await?))
}

pub async fn list_questions<G: ContractGateway, S: Store>(
    State(state): State<AppState<G, S>>,
) -> Json<Vec<QuestionView>> {
    let questions = state.relay.reader().list_all_questions().await;
    Json(questions.into_iter().map(QuestionView::from).collect())
}

pub async fn get_question<G: ContractGateway, S: Store>(
    State(state): State<AppState<G, S>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<QuestionView>> {
    state
        .relay
        .reader()
        .question(id)
        .await
        .map(|q| Json(q.into()))
        .ok_or_else(|| ApiError::NotFound(format!("Question {} not found", id)))
}

pub async fn native_balance<G: ContractGateway, S: Store>(
    State(state): State<AppState<G, S>>,
    query: Result<Query<AddressQuery>, QueryRejection>,
) -> ApiResult<Json<NativeBalance>> {
    let Query(query) = query?;
    let address = parse_wallet(query.address.as_deref())?;
    let balance: U256 = state.relay.reader().native_balance(address).await;
    Ok(Json(NativeBalance {
        address,
        balance: balance.to_string(),
        balance_formatted: format!("{} ETH", format_token(balance)),
    }))
}
