mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn root_describes_the_service() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(&server.base_url).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert!(
        body.get("success").and_then(|v| v.as_bool()).unwrap_or(false),
        "success flag false or missing: {}",
        body
    );
    assert_eq!(
        body.pointer("/data/name").and_then(|v| v.as_str()),
        Some("Compass API"),
        "unexpected banner: {}",
        body
    );
    assert!(
        body.pointer("/data/version").and_then(|v| v.as_str()).is_some(),
        "missing version: {}",
        body
    );
    assert!(
        body.pointer("/data/endpoints").map(|v| v.is_object()).unwrap_or(false),
        "endpoints should be an object: {}",
        body
    );

    Ok(())
}

#[tokio::test]
async fn health_reports_database_state() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await?;

    // The harness points at an unreachable database, so degraded is the
    // expected answer; a real database in the environment would give 200.
    let status = res.status();
    assert!(
        status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        status
    );

    let body = res.json::<serde_json::Value>().await?;
    match status {
        StatusCode::OK => {
            assert_eq!(
                body.pointer("/data/status").and_then(|v| v.as_str()),
                Some("ok"),
                "body: {}",
                body
            );
        }
        _ => {
            assert_eq!(
                body.get("success").and_then(|v| v.as_bool()),
                Some(false),
                "body: {}",
                body
            );
            assert_eq!(
                body.get("code").and_then(|v| v.as_str()),
                Some("SERVICE_UNAVAILABLE"),
                "body: {}",
                body
            );
            assert_eq!(
                body.pointer("/data/status").and_then(|v| v.as_str()),
                Some("degraded"),
                "body: {}",
                body
            );
        }
    }

    Ok(())
}

#[tokio::test]
async fn unknown_route_answers_enveloped_404() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/no-such-route", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body.get("success").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        body.get("code").and_then(|v| v.as_str()),
        Some("NOT_FOUND"),
        "body: {}",
        body
    );

    Ok(())
}

#[tokio::test]
async fn known_route_rejects_wrong_method() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .delete(format!("{}/health", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    Ok(())
}
