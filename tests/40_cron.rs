mod common;

use anyhow::Result;
use reqwest::StatusCode;

async fn trigger(path: &str, secret: Option<&str>) -> Result<reqwest::Response> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let mut req = client.post(format!("{}{}", server.base_url, path));
    if let Some(secret) = secret {
        req = req.bearer_auth(secret);
    }
    Ok(req.send().await?)
}

#[tokio::test]
async fn cron_rejects_missing_secret() -> Result<()> {
    let res = trigger("/internal/cron/weekly-report", None).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(
        body.get("code").and_then(|v| v.as_str()),
        Some("UNAUTHORIZED"),
        "body: {}",
        body
    );
    Ok(())
}

#[tokio::test]
async fn cron_rejects_wrong_secret() -> Result<()> {
    let res = trigger("/internal/cron/weekly-report", Some("guessed-secret")).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn weekly_report_is_gated_by_feature_flag() -> Result<()> {
    // The secret matches, but jobs default to disabled outside production.
    let res = trigger(
        "/internal/cron/weekly-report",
        Some(common::TEST_CRON_SECRET),
    )
    .await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body.get("success").and_then(|v| v.as_bool()), Some(false));
    let message = body.get("error").and_then(|v| v.as_str()).unwrap_or("");
    assert!(
        message.contains("not enabled"),
        "expected a feature-flag rejection, got: {}",
        body
    );
    Ok(())
}

#[tokio::test]
async fn okr_analysis_is_gated_by_feature_flag() -> Result<()> {
    let res = trigger(
        "/internal/cron/okr-analysis",
        Some(common::TEST_CRON_SECRET),
    )
    .await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = res.json::<serde_json::Value>().await?;
    let message = body.get("error").and_then(|v| v.as_str()).unwrap_or("");
    assert!(
        message.contains("not enabled"),
        "expected a feature-flag rejection, got: {}",
        body
    );
    Ok(())
}

#[tokio::test]
async fn cron_routes_only_accept_post() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/internal/cron/weekly-report", server.base_url))
        .bearer_auth(common::TEST_CRON_SECRET)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    Ok(())
}

#[tokio::test]
async fn jwt_is_not_a_cron_secret() -> Result<()> {
    // A valid user token must not open the internal routes.
    let token = common::mint_token(uuid::Uuid::new_v4(), "ops@example.com");
    let res = trigger("/internal/cron/weekly-report", Some(&token)).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
