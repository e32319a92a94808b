// Not every test binary uses every helper
#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub base_url: String,
    child: Child,
}

impl TestServer {
    /// Spawn the built server binary on a free port with extra environment
    /// overrides. Used directly by tests that need their own quota or
    /// ceiling; everything else shares the [`ensure_server`] instance.
    pub fn spawn_with_env(vars: &[(&str, &str)]) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_crud-api-rust"));
        cmd.env("PORT", port.to_string())
            .env("SECRET_KEY", "integration-suite-secret-0123456789abcdef")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        for (key, value) in vars {
            cmd.env(key, value);
        }

        let child = cmd.spawn().context("failed to spawn server binary")?;
        Ok(Self { base_url, child })
    }

    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK
                    || resp.status() == StatusCode::SERVICE_UNAVAILABLE
                {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!(
            "server did not become ready on {} within {:?}",
            self.base_url,
            timeout
        )
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

/// Shared server for tests that only need default configuration.
pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER
        .get_or_init(|| TestServer::spawn_with_env(&[]).expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Spawn an isolated server, ready to serve, with environment overrides.
pub async fn isolated_server(vars: &[(&str, &str)]) -> Result<TestServer> {
    let server = TestServer::spawn_with_env(vars)?;
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Register a user and return the response.
pub async fn register(
    client: &reqwest::Client,
    base_url: &str,
    username: &str,
    email: &str,
    password: &str,
) -> Result<reqwest::Response> {
    let resp = client
        .post(format!("{}/api/v1/auth/register", base_url))
        .json(&serde_json::json!({
            "username": username,
            "email": email,
            "password": password,
        }))
        .send()
        .await?;
    Ok(resp)
}

/// Log in and return the bearer token, asserting success.
pub async fn login(
    client: &reqwest::Client,
    base_url: &str,
    username: &str,
    password: &str,
) -> Result<String> {
    let resp = client
        .post(format!("{}/api/v1/auth/token", base_url))
        .form(&[("username", username), ("password", password)])
        .send()
        .await?;
    anyhow::ensure!(
        resp.status() == StatusCode::OK,
        "login failed with {}",
        resp.status()
    );
    let body = resp.json::<serde_json::Value>().await?;
    let token = body["access_token"]
        .as_str()
        .context("missing access_token")?
        .to_string();
    anyhow::ensure!(!token.is_empty(), "empty access token");
    Ok(token)
}
