// HTTP surface tests: the router is driven in-process with tower's oneshot.

use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use polymini_amm::{router, AppState, Config, ManualClock};

const START: u64 = 1_700_000_000;
const CLOSE: u64 = START + 3_600;

fn app() -> (Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START));
    let state = AppState::new(Config::default(), clock.clone()).unwrap();
    (router(Arc::new(Mutex::new(state))), clock)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(body)).await
}

/// Create a market as the resolver and return (id, custody address)
async fn create_market(app: &Router) -> (String, String) {
    let (status, body) = post(
        app,
        "/markets",
        json!({ "caller": "resolver", "question": "Will BTC be above $100,000?", "close_time": CLOSE }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["market_id"].as_str().unwrap().to_string();
    let custody = body["market"]["custody"].as_str().unwrap().to_string();
    (id, custody)
}

async fn fund(app: &Router, account: &str, custody: &str, amount: u64) {
    let (status, _) = post(app, "/collateral/faucet", json!({ "account": account, "amount": amount })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post(
        app,
        "/collateral/approve",
        json!({ "owner": account, "spender": custody, "amount": amount }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, _) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_full_market_flow() {
    let (app, clock) = app();
    let (id, custody) = create_market(&app).await;
    fund(&app, "resolver", &custody, 1_000).await;
    fund(&app, "alice", &custody, 100).await;

    let (status, body) = post(&app, &format!("/markets/{}/liquidity", id), json!({ "caller": "resolver", "amount": 1000 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["market"]["price_yes"], "0.5");

    let (status, body) = post(
        &app,
        &format!("/markets/{}/buy", id),
        json!({ "caller": "alice", "outcome": "yes", "collateral_in": 100, "min_total_out": 191 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["total_out"], 191);
    assert_eq!(body["market"]["yes_reserve"], 909);
    assert_eq!(body["market"]["no_reserve"], 1100);
    assert_eq!(body["market"]["collateral_held"], 1100);

    let (_, position) = get(&app, &format!("/markets/{}/positions/alice", id)).await;
    assert_eq!(position["yes"], 191);
    assert_eq!(position["no"], 0);

    let (status, body) = post(&app, &format!("/markets/{}/resolve", id), json!({ "caller": "resolver", "outcome": 1 })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CloseTimeNotReached");

    clock.set(CLOSE);
    let (status, body) = post(&app, &format!("/markets/{}/resolve", id), json!({ "caller": "resolver", "outcome": 1 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "yes");
    assert_eq!(body["market"]["winning_outcome"], "yes");

    let (status, body) = post(&app, &format!("/markets/{}/redeem", id), json!({ "caller": "alice" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], 191);

    let (_, balance) = get(&app, "/collateral/alice").await;
    assert_eq!(balance["balance"], 191);
    assert_eq!(balance["symbol"], "mUSDC");

    let (status, body) = post(
        &app,
        &format!("/markets/{}/redeem-pool", id),
        json!({ "caller": "resolver", "to": "treasury" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], 909);
    assert_eq!(body["market"]["collateral_held"], 0);

    let (_, events) = get(&app, "/events").await;
    let kinds: Vec<&str> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["type"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec!["market_created", "liquidity_added", "bought", "resolved", "redeemed", "pool_redeemed"]
    );

    let (_, tail) = get(&app, "/events?since=5").await;
    assert_eq!(tail.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_split_swap_merge() {
    let (app, _) = app();
    let (id, custody) = create_market(&app).await;
    fund(&app, "resolver", &custody, 1_000).await;
    fund(&app, "bob", &custody, 300).await;
    post(&app, &format!("/markets/{}/liquidity", id), json!({ "caller": "resolver", "amount": 1000 })).await;

    let (status, _) = post(&app, &format!("/markets/{}/split", id), json!({ "caller": "bob", "amount": 200 })).await;
    assert_eq!(status, StatusCode::OK);

    let (_, quote) = get(&app, &format!("/markets/{}/quote/swap?outcome=no&amount=100", id)).await;
    assert_eq!(quote["amount_out"], 91);

    let (status, body) = post(
        &app,
        &format!("/markets/{}/swap", id),
        json!({ "caller": "bob", "outcome_in": "no", "amount_in": 100, "min_out": 91 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["amount_out"], 91);

    let (status, body) = post(&app, &format!("/markets/{}/merge", id), json!({ "caller": "bob", "amount": 150 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InsufficientBalance");

    let (status, _) = post(&app, &format!("/markets/{}/merge", id), json!({ "caller": "bob", "amount": 100 })).await;
    assert_eq!(status, StatusCode::OK);

    let (_, position) = get(&app, &format!("/markets/{}/positions/bob", id)).await;
    assert_eq!(position["yes"], 191);
    assert_eq!(position["no"], 0);
    let (_, balance) = get(&app, "/collateral/bob").await;
    assert_eq!(balance["balance"], 200);
}

#[tokio::test]
async fn test_error_mapping() {
    let (app, _) = app();
    let (id, custody) = create_market(&app).await;

    // non-owner cannot create
    let (status, body) = post(&app, "/markets", json!({ "caller": "mallory", "question": "?", "close_time": CLOSE })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Unauthorized");

    // close time in the past
    let (status, body) = post(&app, "/markets", json!({ "caller": "resolver", "question": "?", "close_time": START })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidCloseTime");

    // malformed and unknown ids
    let (status, _) = get(&app, "/markets/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = get(&app, "/markets/00000000-0000-0000-0000-000000000000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "MarketNotFound");

    // no allowance
    post(&app, "/collateral/faucet", json!({ "account": "carol", "amount": 50 })).await;
    let (status, body) = post(&app, &format!("/markets/{}/split", id), json!({ "caller": "carol", "amount": 50 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InsufficientAllowance");

    // empty pool
    fund(&app, "carol", &custody, 50).await;
    let (status, body) = post(
        &app,
        &format!("/markets/{}/buy", id),
        json!({ "caller": "carol", "outcome": "no", "collateral_in": 10 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "PoolEmpty");

    // slippage
    fund(&app, "resolver", &custody, 1_000).await;
    post(&app, &format!("/markets/{}/liquidity", id), json!({ "caller": "resolver", "amount": 1000 })).await;
    let (status, body) = post(
        &app,
        &format!("/markets/{}/buy", id),
        json!({ "caller": "carol", "outcome": "no", "collateral_in": 10, "min_total_out": 1000 }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "SlippageExceeded");

    // bad outcome code
    let (status, _) = post(&app, &format!("/markets/{}/resolve", id), json!({ "caller": "resolver", "outcome": 7 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // redeem before resolution
    let (status, body) = post(&app, &format!("/markets/{}/redeem", id), json!({ "caller": "carol" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "NotResolved");
}

#[tokio::test]
async fn test_market_paging() {
    let (app, _) = app();
    let (first, _) = create_market(&app).await;
    let (second, _) = create_market(&app).await;

    let (_, page) = get(&app, "/markets").await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["markets"][0]["id"], first.as_str());
    assert_eq!(page["markets"][1]["id"], second.as_str());

    let (_, page) = get(&app, "/markets?start=1&count=5").await;
    assert_eq!(page["markets"].as_array().unwrap().len(), 1);

    let (status, page) = get(&app, "/markets?start=2").await;
    assert_eq!(status, StatusCode::OK);
    assert!(page["markets"].as_array().unwrap().is_empty());

    let (status, body) = get(&app, "/markets?start=3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "OutOfRange");
}

#[tokio::test]
async fn test_collateral_endpoints() {
    let (app, _) = app();

    let (status, body) = post(&app, "/collateral/faucet", json!({ "account": "dave" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], 10_000_000_000u64);
    assert_eq!(body["display"], "10000");

    post(&app, "/collateral/approve", json!({ "owner": "dave", "spender": "0xmarket", "amount": 25 })).await;
    let (_, allowance) = get(&app, "/collateral/dave/allowance/0xmarket").await;
    assert_eq!(allowance["allowance"], 25);

    let (_, empty) = get(&app, "/collateral/nobody").await;
    assert_eq!(empty["balance"], 0);
}
