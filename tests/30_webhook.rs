mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

// The email provider disables webhook endpoints that answer non-200, so the
// sink acknowledges everything. These run against an unreachable database to
// prove the acknowledgement does not depend on the store succeeding.

#[tokio::test]
async fn delivery_event_is_acknowledged() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/webhooks/email", server.base_url))
        .json(&json!({
            "type": "email.delivered",
            "data": {
                "email_id": "msg_01",
                "to": ["person@example.com"]
            }
        }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body.get("success").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        body.pointer("/data/received").and_then(|v| v.as_bool()),
        Some(true),
        "body: {}",
        body
    );
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_still_acknowledged() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/webhooks/email", server.base_url))
        .header("content-type", "application/json")
        .body("this is not json {{{")
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body.get("success").and_then(|v| v.as_bool()), Some(true));
    Ok(())
}

#[tokio::test]
async fn empty_object_is_still_acknowledged() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/webhooks/email", server.base_url))
        .json(&json!({}))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn webhook_does_not_accept_get() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/webhooks/email", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    Ok(())
}
