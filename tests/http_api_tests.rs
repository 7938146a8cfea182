//! End-to-end checks of the HTTP API over a real socket.

mod harness;

use harness::server::TestServer;
use kastia::domain::Permission;
use kastia::testkit::world::PASSWORD;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn body(response: reqwest::Response) -> Value {
    response.json().await.expect("json body")
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[tokio::test]
async fn health_reports_ok() {
    let server = TestServer::start("http-health").await;
    let response = server.get("/health").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await, json!({"status": "ok"}));
    server.stop().await;
}

#[tokio::test]
async fn register_login_and_me() {
    let server = TestServer::start("http-login").await;

    let response = server
        .post("/register")
        .json(&json!({"username": "kate", "email": "kate@example.com", "password": PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let user = body(response).await;
    assert_eq!(user["username"], "kate");
    assert_eq!(user["profile"]["is_banned"], false);

    let response = server
        .post("/login")
        .json(&json!({"username": "kate", "password": PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token = body(response).await["token"].as_str().unwrap().to_string();

    let me = server
        .get("/users/me")
        .header("Authorization", format!("Token {token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(body(me).await["username"], "kate");

    let anonymous = server.get("/users/me").send().await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(anonymous).await["code"], "authentication_failed");

    let wrong = server
        .post("/login")
        .json(&json!({"username": "kate", "password": "nope-nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    server.stop().await;
}

#[tokio::test]
async fn market_trade_and_resolution_flow() {
    let server = TestServer::start("http-market-flow").await;
    server.world.user("creator").await;
    server.world.user("trader").await;
    server
        .world
        .user_with("resolver", &[Permission::ResolveMarket])
        .await;
    let creator = server.world.token("creator").await;
    let trader = server.world.token("trader").await;
    let resolver = server.world.token("resolver").await;

    let response = server
        .post("/markets")
        .header("Authorization", bearer(&creator))
        .json(&json!({
            "title": "Will it snow?",
            "description": "Resolves YES on any snowfall.",
            "category": "Culture",
            "end_date": "2030-01-01T00:00:00Z",
            "outcomes": [{"label": "Yes", "probability": 30.0}, {"label": "No"}]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let market = body(response).await;
    assert_eq!(market["status"], "OPEN");
    let market_id = market["id"].as_i64().unwrap();
    let yes = market["outcomes"][0]["id"].as_i64().unwrap();

    let response = server
        .post("/trades")
        .header("Authorization", bearer(&trader))
        .json(&json!({
            "market_id": market_id,
            "outcome_id": yes,
            "shares": "10",
            "price": "0.3"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let positions = body(
        server
            .get("/positions")
            .header("Authorization", bearer(&trader))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(positions.as_array().unwrap().len(), 1);
    assert_eq!(positions[0]["outcome_label"], "Yes");

    let sod = server
        .post(&format!("/markets/{market_id}/resolve"))
        .header("Authorization", bearer(&creator))
        .json(&json!({"winner_id": yes}))
        .send()
        .await
        .unwrap();
    assert_eq!(sod.status(), StatusCode::FORBIDDEN);

    let resolved = server
        .post(&format!("/markets/{market_id}/resolve"))
        .header("Authorization", bearer(&resolver))
        .json(&json!({"winner_id": yes}))
        .send()
        .await
        .unwrap();
    assert_eq!(resolved.status(), StatusCode::OK);
    let resolved = body(resolved).await;
    assert_eq!(resolved["status"], "RESOLVED");
    assert_eq!(resolved["winner_id"], yes);

    let again = server
        .post(&format!("/markets/{market_id}/resolve"))
        .header("Authorization", bearer(&resolver))
        .json(&json!({"winner_id": yes}))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(again).await["code"], "invalid_state");

    let late = server
        .post("/trades")
        .header("Authorization", bearer(&trader))
        .json(&json!({"market_id": market_id, "outcome_id": yes, "shares": "1", "price": "0.5"}))
        .send()
        .await
        .unwrap();
    assert_eq!(late.status(), StatusCode::BAD_REQUEST);
    server.stop().await;
}

#[tokio::test]
async fn malformed_bodies_are_validation_errors() {
    let server = TestServer::start("http-malformed").await;
    server.world.user("creator").await;
    let token = server.world.token("creator").await;

    let response = server
        .post("/markets")
        .header("Authorization", bearer(&token))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(response).await["code"], "validation_error");

    let response = server
        .post("/markets")
        .header("Authorization", bearer(&token))
        .json(&json!({"title": "No outcomes", "end_date": "2030-01-01T00:00:00Z"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let missing = server.get("/markets/424242").send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    server.stop().await;
}

#[tokio::test]
async fn group_access_flow_over_http() {
    let server = TestServer::start("http-groups").await;
    server.world.user("owner").await;
    server.world.user("joiner").await;
    let owner = server.world.token("owner").await;
    let joiner = server.world.token("joiner").await;

    let group = body(
        server
            .post("/groups")
            .header("Authorization", bearer(&owner))
            .json(&json!({"name": "Insiders", "privacy": "INVITE"}))
            .send()
            .await
            .unwrap(),
    )
    .await;
    let group_id = group["id"].as_i64().unwrap();

    let response = server
        .post(&format!("/groups/{group_id}/request_access"))
        .header("Authorization", bearer(&joiner))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let request_id = body(response).await["id"].as_i64().unwrap();

    let duplicate = server
        .post(&format!("/groups/{group_id}/request_access"))
        .header("Authorization", bearer(&joiner))
        .json(&json!({"message": "please"}))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(duplicate).await["code"], "duplicate_request");

    let forbidden = server
        .post(&format!("/groups/{group_id}/approve_access"))
        .header("Authorization", bearer(&joiner))
        .json(&json!({"request_id": request_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let approved = server
        .post(&format!("/groups/{group_id}/approve_access"))
        .header("Authorization", bearer(&owner))
        .json(&json!({"request_id": request_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(approved.status(), StatusCode::OK);
    let approved = body(approved).await;
    assert_eq!(approved["request"]["status"], "APPROVED");
    assert_eq!(approved["member_count"], 2);

    let detail = body(
        server
            .get(&format!("/groups/{group_id}"))
            .header("Authorization", bearer(&joiner))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(detail["is_member"], true);
    assert!(detail.get("pending_requests").is_none());
    server.stop().await;
}

#[tokio::test]
async fn audit_log_endpoint_is_restricted() {
    let server = TestServer::start("http-audit").await;
    server.world.user("plain").await;
    server.world.admin("root").await;
    let plain = server.world.token("plain").await;
    let root = server.world.token("root").await;

    let denied = server
        .get("/audit-logs")
        .header("Authorization", bearer(&plain))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    server
        .post("/groups")
        .header("Authorization", bearer(&root))
        .json(&json!({"name": "Audited"}))
        .send()
        .await
        .unwrap();
    let entries = body(
        server
            .get("/audit-logs?action=CREATE_GROUP&limit=10")
            .header("Authorization", bearer(&root))
            .header("X-Forwarded-For", "203.0.113.9")
            .send()
            .await
            .unwrap(),
    )
    .await;
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["target"], "Group: Audited");
    server.stop().await;
}

#[tokio::test]
async fn audit_entries_record_the_client_ip() {
    let server = TestServer::start("http-audit-ip").await;
    server.world.admin("root").await;
    let root = server.world.token("root").await;

    server
        .post("/groups")
        .header("Authorization", bearer(&root))
        .header("X-Forwarded-For", "198.51.100.4, 10.0.0.1")
        .json(&json!({"name": "Traced"}))
        .send()
        .await
        .unwrap();
    let entries = body(
        server
            .get("/audit-logs")
            .header("Authorization", bearer(&root))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(entries[0]["ip_address"], "198.51.100.4");
    server.stop().await;
}

#[tokio::test]
async fn ban_endpoint_blocks_the_target() {
    let server = TestServer::start("http-ban").await;
    server.world.admin("root").await;
    let target = server.world.user("spammer").await;
    let root = server.world.token("root").await;
    let spammer = server.world.token("spammer").await;

    let response = server
        .post(&format!("/users/{}/ban", target.user_id))
        .header("Authorization", bearer(&root))
        .json(&json!({"reason": "spam"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ban = body(response).await;
    assert_eq!(ban["profile"]["is_banned"], true);
    assert_eq!(ban["profile"]["ban_reason"], "spam");

    let blocked = server
        .get("/users/me")
        .header("Authorization", bearer(&spammer))
        .send()
        .await
        .unwrap();
    assert_eq!(blocked.status(), StatusCode::FORBIDDEN);
    assert_eq!(body(blocked).await["code"], "user_banned");

    let response = server
        .post(&format!("/users/{}/unban", target.user_id))
        .header("Authorization", bearer(&root))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    server.stop().await;
}
