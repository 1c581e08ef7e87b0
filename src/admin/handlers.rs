use alloy::primitives::U256;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::chain::ContractGateway;
use crate::http::response::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::ledger::Store;
use crate::relay::{AdminReceipt, AdminStatus, RewardReceipt};

#[derive(Debug, Deserialize)]
pub struct SetRateRequest {
    pub rate: Option<u64>,
}

/// Decimal token amount, e.g. `"100"` or `"0.5"`.
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptAnswerRequest {
    pub account_id: Option<u64>,
    pub question_id: Option<u64>,
    pub answer_id: Option<u64>,
}

fn required<T>(value: Option<T>, field: &str) -> ApiResult<T> {
    value.ok_or_else(|| ApiError::BadRequest(format!("{} is required", field)))
}

pub async fn get_status<G: ContractGateway, S: Store>(State(state): State<AppState<G, S>>) -> ApiResult<Json<AdminStatus>> {
    Ok(Json(state.relay.admin_status().await?))
}

pub async fn set_rate<G: ContractGateway, S: Store>(
    State(state): State<AppState<G, S>>,
    payload: Result<Json<SetRateRequest>, JsonRejection>,
) -> ApiResult<Json<AdminReceipt>> {
    let Json(request) = payload?;
    let rate = required(request.rate, "rate")?;
    Ok(Json(state.relay.set_swap_rate(U256::from(rate)).await?))
}

pub async fn set_faucet_amount<G: ContractGateway, S: Store>(
    State(state): State<AppState<G, S>>,
    payload: Result<Json<AmountRequest>, JsonRejection>,
) -> ApiResult<Json<AdminReceipt>> {
    let Json(request) = payload?;
    let amount = required(request.amount, "amount")?;
    Ok(Json(state.relay.set_faucet_amount(&amount).await?))
}

pub async fn fund<G: ContractGateway, S: Store>(
    State(state): State<AppState<G, S>>,
    payload: Result<Json<AmountRequest>, JsonRejection>,
) -> ApiResult<Json<AdminReceipt>> {
    let Json(request) = payload?;
    let amount = required(request.amount, "amount")?;
    Ok(Json(state.relay.fund_pool(&amount).await?))
}

pub async fn withdraw_eth<G: ContractGateway, S: Store>(State(state): State<AppState<G, S>>) -> ApiResult<Json<AdminReceipt>> {
    Ok(Json(state.relay.withdraw_native().await?))
}

pub async fn withdraw_token<G: ContractGateway, S: Store>(
    State(state): State<AppState<G, S>>,
    payload: Result<Json<AmountRequest>, JsonRejection>,
) -> ApiResult<Json<AdminReceipt>> {
    let Json(request) = payload?;
    let amount = required(request.amount, "amount")?;
    Ok(Json(state.relay.withdraw_token(&amount).await?))
}

pub async fn accept_answer<G: ContractGateway, S: Store>(
    State(state): State<AppState<G, S>>,
    payload: Result<Json<AcceptAnswerRequest>, JsonRejection>,
) -> ApiResult<Json<RewardReceipt>> {
    let Json(request) = payload?;
    let account_id = required(request.account_id, "accountId")?;
    let question_id = required(request.question_id, "questionId")?;
    let answer_id = required(request.answer_id, "answerId")?;

    let relay = state.relay.clone();
    let receipt = tokio::spawn(async move { relay.accept_answer_with_reward(account_id, question_id, answer_id).await })
        .await
        .map_err(|e| ApiError::Internal(format!("accept task failed: {}", e)))??;
    Ok(Json(receipt))
}
