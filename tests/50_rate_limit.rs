mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn quota_exhaustion_returns_429_on_credential_routes() -> Result<()> {
    // Own server with a small quota so the test stays fast
    let server = common::isolated_server(&[
        ("API_RATE_LIMIT_REQUESTS", "5"),
        ("API_RATE_LIMIT_WINDOW_SECS", "60"),
    ])
    .await?;
    let client = reqwest::Client::new();

    // The quota admits exactly five requests; their 401s are the handler's
    // business, not the limiter's
    for attempt in 1..=5 {
        let res = client
            .post(format!("{}/api/v1/auth/token", server.base_url))
            .form(&[("username", "ghost"), ("password", "wrong-password")])
            .send()
            .await?;
        assert_eq!(
            res.status(),
            StatusCode::UNAUTHORIZED,
            "attempt {} should reach the handler",
            attempt
        );
    }

    let res = client
        .post(format!("{}/api/v1/auth/token", server.base_url))
        .form(&[("username", "ghost"), ("password", "wrong-password")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "RATE_LIMITED");
    Ok(())
}

#[tokio::test]
async fn unlimited_routes_are_not_throttled() -> Result<()> {
    let server = common::isolated_server(&[
        ("API_RATE_LIMIT_REQUESTS", "2"),
        ("API_RATE_LIMIT_WINDOW_SECS", "60"),
    ])
    .await?;
    let client = reqwest::Client::new();

    for _ in 0..10 {
        let res = client.get(format!("{}/health", server.base_url)).send().await?;
        assert_eq!(res.status(), StatusCode::OK);
    }
    Ok(())
}
