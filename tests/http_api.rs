//! HTTP API tests against a server on an ephemeral port.

use alloy::primitives::U256;
use reqwest::StatusCode;
use serde_json::{json, Value};

use bounty_relay::chain::mock::{MockFailure, MockGateway};
use bounty_relay::chain::ContractGateway;

mod common;
use common::{deposit, fixture, question, spawn_server, tokens, ADMIN_KEY, WALLET};

#[tokio::test]
async fn test_health_reports_network() {
    let f = fixture(MockGateway::new()).await;
    let server = spawn_server(f.relay.clone(), false).await;

    let res = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["chainId"], 31337);

    f.mock.set_fail_reads(true).await;
    let res = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_claim_requires_identity() {
    let f = fixture(MockGateway::new()).await;
    let server = spawn_server(f.relay.clone(), false).await;

    let res = server
        .client
        .post(server.url("/faucet-swap/claim"))
        .json(&json!({ "walletAddress": WALLET }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
    assert!(f.mock.transfers().await.is_empty());
}

#[tokio::test]
async fn test_claim_flow() {
    let f = fixture(MockGateway::new()).await;
    let server = spawn_server(f.relay.clone(), false).await;
    let claim = || {
        server
            .client
            .post(server.url("/faucet-swap/claim"))
            .header("X-Account-Id", "1")
            .json(&json!({ "walletAddress": WALLET }))
    };

    let res = claim().send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["amount"], "100.0000");
    assert_eq!(body["walletAddress"].as_str().unwrap().to_lowercase(), WALLET);

    let res = claim().send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "already_claimed");

    let status: Value = server
        .client
        .get(server.url("/faucet-swap/claim-status"))
        .header("X-Account-Id", "1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["hasClaimed"], true);
    assert_eq!(status["canClaim"], false);
}

#[tokio::test]
async fn test_claim_validation_errors() {
    let f = fixture(MockGateway::new()).await;
    let server = spawn_server(f.relay.clone(), false).await;

    let res = server
        .client
        .post(server.url("/faucet-swap/claim"))
        .header("X-Account-Id", "77")
        .json(&json!({ "walletAddress": WALLET }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server
        .client
        .post(server.url("/faucet-swap/claim"))
        .header("X-Account-Id", "1")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .post(server.url("/faucet-swap/claim"))
        .header("X-Account-Id", "1")
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_swap_and_history() {
    let f = fixture(MockGateway::new()).await;
    let hash = deposit(&f.mock, 0x31, 4).await;
    let server = spawn_server(f.relay.clone(), false).await;
    let swap = || {
        server
            .client
            .post(server.url("/faucet-swap/swap"))
            .header("X-Account-Id", "2")
            .json(&json!({ "txHash": hash, "walletAddress": WALLET }))
    };

    let res = swap().send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["swapRate"], "1000");
    assert_eq!(body["depositTxHash"], hash);

    let res = swap().send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let history: Value = server
        .client
        .get(server.url("/faucet-swap/swap-history"))
        .header("X-Account-Id", "2")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = history.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["ethAmount"], "4");
    assert_eq!(items[0]["txHash"], hash);
}

#[tokio::test]
async fn test_unconfirmed_swap_is_not_repeated() {
    let f = fixture(MockGateway::new()).await;
    let hash = deposit(&f.mock, 0x32, 4).await;
    f.mock.set_failure(Some(MockFailure::ConfirmationTimeout)).await;
    let server = spawn_server(f.relay.clone(), false).await;
    let swap = || {
        server
            .client
            .post(server.url("/faucet-swap/swap"))
            .header("X-Account-Id", "2")
            .json(&json!({ "txHash": hash, "walletAddress": WALLET }))
    };

    let res = swap().send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "transfer_pending");

    f.mock.set_failure(None).await;
    let res = swap().send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert!(f.mock.transfers().await.is_empty());
}

#[tokio::test]
async fn test_swap_requires_fields() {
    let f = fixture(MockGateway::new()).await;
    let server = spawn_server(f.relay.clone(), false).await;

    let res = server
        .client
        .post(server.url("/faucet-swap/swap"))
        .header("X-Account-Id", "2")
        .json(&json!({ "walletAddress": WALLET }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_public_views() {
    let f = fixture(MockGateway::new()).await;
    f.mock.set_token_balance(WALLET.parse().unwrap(), tokens(3)).await;
    f.mock.insert_question(question(1, U256::from(500))).await;
    let server = spawn_server(f.relay.clone(), false).await;

    let info: Value = server.client.get(server.url("/faucet-swap/info")).send().await.unwrap().json().await.unwrap();
    assert_eq!(info["faucetAmount"], "100.0000");
    assert_eq!(info["swapRate"], "1000");

    let balance: Value = server
        .client
        .get(server.url(&format!("/faucet-swap/balance?address={WALLET}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(balance["balanceFormatted"], "3.0000 BRAIN");

    let res = server
        .client
        .get(server.url("/faucet-swap/balance?address=nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let quote: Value = server
        .client
        .get(server.url("/faucet-swap/quote?ethAmount=7"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(quote["tokenAmount"], "7000");

    let res = server.client.get(server.url("/faucet-swap/quote")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let deposit: Value = server
        .client
        .get(server.url("/faucet-swap/deposit-address"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        deposit["depositAddress"].as_str().unwrap().to_lowercase(),
        f.mock.backend().to_string().to_lowercase()
    );

    let questions: Value = server.client.get(server.url("/chain/questions")).send().await.unwrap().json().await.unwrap();
    assert_eq!(questions.as_array().unwrap().len(), 1);
    assert_eq!(questions[0]["bounty"], "500");

    let res = server.client.get(server.url("/chain/questions/9")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_routes_absent_when_disabled() {
    let f = fixture(MockGateway::new()).await;
    let server = spawn_server(f.relay.clone(), false).await;

    let res = server
        .client
        .get(server.url("/faucet-swap/admin/status"))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_requires_key() {
    let f = fixture(MockGateway::new()).await;
    let server = spawn_server(f.relay.clone(), true).await;

    let res = server
        .client
        .post(server.url("/faucet-swap/admin/set-rate"))
        .json(&json!({ "rate": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .post(server.url("/faucet-swap/admin/set-rate"))
        .bearer_auth("wrong")
        .json(&json!({ "rate": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(f.mock.submitted().await.is_empty());
}

#[tokio::test]
async fn test_admin_operations() {
    let f = fixture(MockGateway::new()).await;
    let server = spawn_server(f.relay.clone(), true).await;
    let admin = |path: &str| server.client.post(server.url(&format!("/faucet-swap/admin/{path}"))).bearer_auth(ADMIN_KEY);

    let res = admin("set-rate").json(&json!({ "rate": 2500 })).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert!(body["txHash"].as_str().unwrap().starts_with("0x"));
    assert_eq!(f.mock.swap_rate().await.unwrap(), U256::from(2500));

    let res = admin("set-rate").json(&json!({ "rate": 0 })).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = admin("set-faucet-amount").json(&json!({ "amount": "25" })).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(f.mock.faucet_amount().await.unwrap(), tokens(25));

    let res = admin("fund").json(&json!({ "amount": "1000" })).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(f.mock.swap_pool_balance().await.unwrap(), tokens(1000));

    let status: Value = server
        .client
        .get(server.url("/faucet-swap/admin/status"))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["swapRate"], "2500");
    assert_eq!(status["chainId"], 31337);
}

#[tokio::test]
async fn test_accept_answer_twice_maps_revert() {
    let f = fixture(MockGateway::new()).await;
    f.mock.insert_question(question(1, tokens(10))).await;
    f.relay.signer().answer_question(1, "ipfs://a".into()).await.unwrap();
    let server = spawn_server(f.relay.clone(), true).await;

    let accept = || {
        server
            .client
            .post(server.url("/faucet-swap/admin/accept-answer"))
            .bearer_auth(ADMIN_KEY)
            .json(&json!({ "accountId": 3, "questionId": 1, "answerId": 1 }))
    };

    let res = accept().send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["bounty"], "10.0000");

    let res = accept().send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "already_accepted");
}
