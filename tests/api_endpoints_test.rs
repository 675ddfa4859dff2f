use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use junket_ledger::{
    api::{self, AppState},
    config::Config,
    db::init_db,
    Decimal, Repository,
};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: Router,
    _temp: TempDir,
}

async fn setup_test_app() -> TestApp {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("test.db").to_string_lossy().to_string();
    let pool = init_db(&db_path).await.unwrap();
    let repo = Arc::new(Repository::new(pool));

    let config = Config {
        port: 0,
        database_path: db_path,
        default_rolling_commission_rate: Decimal::from_str("0.014").unwrap(),
        reconcile_interval_secs: 0,
    };
    repo.seed_rolling_commission_rate(config.default_rolling_commission_rate)
        .await
        .unwrap();

    let state = AppState::new(repo, config);
    TestApp {
        app: api::create_router(state),
        _temp: temp,
    }
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

fn num(v: &Value) -> f64 {
    v.as_f64().unwrap_or_else(|| panic!("expected number, got {v}"))
}

#[tokio::test]
async fn test_health_and_ready() {
    let t = setup_test_app().await;
    let (status, body) = get(&t.app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get(&t.app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_full_trip_flow_over_http() {
    let t = setup_test_app().await;

    let (status, trip) = post(&t.app, "/v1/trips", json!({"name": "Macau May", "status": "active"})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(trip["consistency"]["status"], "synced");
    let trip_id = trip["record"]["id"].as_i64().unwrap();

    let (status, agent) = post(&t.app, "/v1/agents", json!({"name": "Agent K", "commissionRate": "30"})).await;
    assert_eq!(status, StatusCode::CREATED);
    let agent_id = agent["id"].as_i64().unwrap();

    let (_, a) = post(&t.app, "/v1/customers", json!({"name": "A", "agentId": agent_id})).await;
    let (_, b) = post(&t.app, "/v1/customers", json!({"name": "B"})).await;
    let a_id = a["id"].as_i64().unwrap();
    let b_id = b["id"].as_i64().unwrap();

    for customer_id in [a_id, b_id] {
        let (status, joined) = post(
            &t.app,
            &format!("/v1/trips/{trip_id}/customers"),
            json!({"customerId": customer_id}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(joined["consistency"]["status"], "synced");
    }

    let (status, tx) = post(
        &t.app,
        &format!("/v1/trips/{trip_id}/transactions"),
        json!({"customerId": a_id, "amount": "1000", "type": "buy-in"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tx["record"]["status"], "completed");
    assert_eq!(tx["consistency"]["status"], "synced");

    let (status, _) = post(
        &t.app,
        &format!("/v1/trips/{trip_id}/transactions"),
        json!({"customerId": b_id, "amount": 800, "type": "cash-out"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, stats) = get(&t.app, &format!("/v1/trips/{trip_id}/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(num(&stats["stats"]["totalWinLoss"]), 200.0);
    assert_eq!(stats["customers"].as_array().unwrap().len(), 2);

    let (status, sharing) = get(&t.app, &format!("/v1/trips/{trip_id}/sharing")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(num(&sharing["netResult"]), 200.0);
    // only A is assigned to the agent
    assert_eq!(num(&sharing["totalAgentShare"]), 300.0);
    assert_eq!(num(&sharing["companyShare"]), -100.0);

    let (status, summaries) = get(&t.app, &format!("/v1/trips/{trip_id}/agent-summaries")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(num(&summaries[0]["agentProfitShare"]), 300.0);

    let (status, totals) = get(&t.app, &format!("/v1/customers/{a_id}/totals")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(num(&totals["totals"]["totalWinLoss"]), 1000.0);

    let (status, agent) = get(&t.app, &format!("/v1/agents/{agent_id}/totals")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(num(&agent["totals"]["totalProfitShare"]), 300.0);
    assert_eq!(agent["totals"]["totalTrips"], 1);

    let (status, recalculated) = post(&t.app, &format!("/v1/trips/{trip_id}/recalculate"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(num(&recalculated["sharing"]["netResult"]), 200.0);
    assert!(recalculated["failedAgents"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_agent_can_be_removed_from_trip() {
    let t = setup_test_app().await;
    let (_, trip) = post(&t.app, "/v1/trips", json!({"name": "Macau"})).await;
    let trip_id = trip["record"]["id"].as_i64().unwrap();
    let (_, agent) = post(&t.app, "/v1/agents", json!({"name": "Agent K", "commissionRate": "25"})).await;
    let agent_id = agent["id"].as_i64().unwrap();
    let (_, customer) = post(&t.app, "/v1/customers", json!({"name": "A", "agentId": agent_id})).await;
    post(
        &t.app,
        &format!("/v1/trips/{trip_id}/customers"),
        json!({"customerId": customer["id"]}),
    )
    .await;
    post(
        &t.app,
        &format!("/v1/trips/{trip_id}/transactions"),
        json!({"customerId": customer["id"], "amount": "1000", "type": "buy-in"}),
    )
    .await;

    let uri = format!("/v1/trips/{trip_id}/agents/{agent_id}");
    let (status, removed) = send(&t.app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["consistency"]["status"], "synced");
    assert_eq!(removed["record"]["totals"]["totalTrips"], 0);

    let (_, sharing) = get(&t.app, &format!("/v1/trips/{trip_id}/sharing")).await;
    assert_eq!(num(&sharing["totalAgentShare"]), 0.0);

    let (status, _) = send(&t.app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_member_transaction_conflicts() {
    let t = setup_test_app().await;
    let (_, trip) = post(&t.app, "/v1/trips", json!({"name": "Macau"})).await;
    let trip_id = trip["record"]["id"].as_i64().unwrap();
    let (_, customer) = post(&t.app, "/v1/customers", json!({"name": "Outsider"})).await;

    let (status, body) = post(
        &t.app,
        &format!("/v1/trips/{trip_id}/transactions"),
        json!({"customerId": customer["id"], "amount": "10", "type": "buy-in"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("not a member"));
}

#[tokio::test]
async fn test_invalid_input_is_rejected() {
    let t = setup_test_app().await;
    let (_, trip) = post(&t.app, "/v1/trips", json!({"name": "Macau"})).await;
    let trip_id = trip["record"]["id"].as_i64().unwrap();
    let (_, customer) = post(&t.app, "/v1/customers", json!({"name": "Guest"})).await;
    post(
        &t.app,
        &format!("/v1/trips/{trip_id}/customers"),
        json!({"customerId": customer["id"]}),
    )
    .await;

    let (status, _) = post(
        &t.app,
        &format!("/v1/trips/{trip_id}/transactions"),
        json!({"customerId": customer["id"], "amount": "-5", "type": "buy-in"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &t.app,
        &format!("/v1/trips/{trip_id}/transactions"),
        json!({"customerId": customer["id"], "amount": "5", "type": "marker"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &t.app,
        &format!("/v1/trips/{trip_id}/expenses"),
        json!({"expenseType": "hotel", "amount": "100", "expenseDate": "05/01/2024"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(&t.app, "/v1/agents", json!({"name": "Greedy", "commissionRate": "150"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        Method::PUT,
        "/v1/settings/rolling-commission-rate",
        Some(json!({"rate": "1.5"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_entities_return_not_found() {
    let t = setup_test_app().await;

    let (status, _) = get(&t.app, "/v1/trips/999/stats").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&t.app, "/v1/customers/999/totals").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&t.app, Method::DELETE, "/v1/expenses/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(&t.app, "/v1/trips/999/customers", json!({"customerId": 1})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rolling_rate_setting_round_trip() {
    let t = setup_test_app().await;

    let (status, body) = get(&t.app, "/v1/settings/rolling-commission-rate").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(num(&body["rate"]), 0.014);

    let (status, body) = send(
        &t.app,
        Method::PUT,
        "/v1/settings/rolling-commission-rate",
        Some(json!({"rate": "0.02"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(num(&body["rate"]), 0.02);

    let (_, trip) = post(&t.app, "/v1/trips", json!({"name": "Macau"})).await;
    let trip_id = trip["record"]["id"].as_i64().unwrap();
    let (_, customer) = post(&t.app, "/v1/customers", json!({"name": "Guest"})).await;
    post(
        &t.app,
        &format!("/v1/trips/{trip_id}/customers"),
        json!({"customerId": customer["id"]}),
    )
    .await;

    let (status, rolling) = post(
        &t.app,
        &format!("/v1/trips/{trip_id}/rolling"),
        json!({"customerId": customer["id"], "gameType": "baccarat", "rollingAmount": "10000"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(num(&rolling["record"]["commissionEarned"]), 200.0);
}
