// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `catalog-relay` binary and
//! exercise its HTTP and WebSocket surfaces.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message};

use catalog_relay_specs::RelayProcess;

const TIMEOUT: Duration = Duration::from_secs(10);

async fn health(relay: &RelayProcess) -> anyhow::Result<serde_json::Value> {
    Ok(reqwest::get(format!("{}/api/v1/health", relay.base_url())).await?.json().await?)
}

// -- Startup ------------------------------------------------------------------

#[tokio::test]
async fn starts_without_reachable_upstream() -> anyhow::Result<()> {
    let relay = RelayProcess::start()?;
    relay.wait_healthy(TIMEOUT).await?;

    let resp = health(&relay).await?;
    assert_eq!(resp["status"], "running");
    assert_eq!(resp["connections"], 0);
    assert_eq!(resp["credential"]["status"], "failed");
    assert_eq!(resp["requests"]["published"], 0);
    Ok(())
}

#[tokio::test]
async fn missing_client_credentials_exit_with_usage_error() -> anyhow::Result<()> {
    let mut relay = RelayProcess::build().without_credentials().spawn()?;
    let status = relay.wait_exit(TIMEOUT).await?;
    assert_eq!(status.code(), Some(2));
    Ok(())
}

#[tokio::test]
async fn invalid_log_format_exits_with_usage_error() -> anyhow::Result<()> {
    let mut relay = RelayProcess::build().arg("--log-format").arg("yaml").spawn()?;
    let status = relay.wait_exit(TIMEOUT).await?;
    assert_eq!(status.code(), Some(2));
    Ok(())
}

// -- WebSocket ----------------------------------------------------------------

#[tokio::test]
async fn ws_name_shows_in_presence() -> anyhow::Result<()> {
    let relay = RelayProcess::start()?;
    relay.wait_healthy(TIMEOUT).await?;

    let (mut ws, _) = tokio_tungstenite::connect_async(relay.ws_url()).await?;
    let frame = serde_json::json!({"event": "user:name", "data": {"name": "smoke"}});
    ws.send(Message::Text(frame.to_string().into())).await?;

    let url = format!("{}/api/v1/presence", relay.base_url());
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("presence never showed the named client");
        }
        let list: Vec<serde_json::Value> = reqwest::get(&url).await?.json().await?;
        if list.iter().any(|p| p["name"] == "smoke" && p["status"] == "online") {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn ws_request_with_unreachable_upstream_publishes_nothing() -> anyhow::Result<()> {
    let relay = RelayProcess::start()?;
    relay.wait_healthy(TIMEOUT).await?;

    let (mut ws, _) = tokio_tungstenite::connect_async(relay.ws_url()).await?;
    for frame in [
        serde_json::json!({"event": "user:name", "data": {"name": "smoke"}}),
        serde_json::json!({
            "event": "HJBV_SpotifyRequest",
            "data": {"type": 1, "value": {"albumId": "abc123"}},
        }),
    ] {
        ws.send(Message::Text(frame.to_string().into())).await?;
    }

    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("request never recorded as failed");
        }
        let resp = health(&relay).await?;
        if resp["requests"]["upstream_failed"] == 1 {
            assert_eq!(resp["requests"]["published"], 0);
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert!(tokio::time::timeout(Duration::from_millis(200), ws.next()).await.is_err());
    Ok(())
}

// -- Auth ---------------------------------------------------------------------

#[tokio::test]
async fn auth_token_guards_presence_and_ws() -> anyhow::Result<()> {
    let relay = RelayProcess::build().auth_token("smoke-token").spawn()?;
    relay.wait_healthy(TIMEOUT).await?;

    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/presence", relay.base_url());
    assert_eq!(client.get(&url).send().await?.status().as_u16(), 401);
    assert!(client.get(&url).bearer_auth("smoke-token").send().await?.status().is_success());

    match tokio_tungstenite::connect_async(relay.ws_url()).await {
        Err(tungstenite::Error::Http(resp)) => assert_eq!(resp.status().as_u16(), 401),
        Err(e) => anyhow::bail!("expected 401, got {e}"),
        Ok(_) => anyhow::bail!("expected 401, connection was accepted"),
    }
    let url = format!("{}?token=smoke-token", relay.ws_url());
    tokio_tungstenite::connect_async(url).await?;
    Ok(())
}
