// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Spawns the real `catalog-relay` binary as a subprocess and exercises it
//! over HTTP and WebSocket. The upstream endpoints point at a closed port,
//! so every catalog call fails at the transport.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Once;
use std::time::Duration;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Resolve the path to the compiled `catalog-relay` binary.
pub fn relay_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("catalog-relay")
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// A running relay process that is killed on drop.
pub struct RelayProcess {
    child: Child,
    port: u16,
}

/// Builder for the relay's command line.
#[derive(Default)]
pub struct RelayBuilder {
    auth_token: Option<String>,
    credentials: Option<(String, String)>,
    extra: Vec<String>,
}

impl RelayBuilder {
    /// Require a bearer token on the API and `?token=` on `/ws`.
    pub fn auth_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_owned());
        self
    }

    /// Leave out the upstream client id and secret.
    pub fn without_credentials(mut self) -> Self {
        self.credentials = Some((String::new(), String::new()));
        self
    }

    /// Append raw arguments.
    pub fn arg(mut self, arg: &str) -> Self {
        self.extra.push(arg.to_owned());
        self
    }

    pub fn spawn(self) -> anyhow::Result<RelayProcess> {
        ensure_crypto();
        let binary = relay_binary();
        anyhow::ensure!(binary.exists(), "relay binary not found at {}", binary.display());

        let port = free_port()?;
        let dead = format!("http://127.0.0.1:{}", free_port()?);

        let mut args: Vec<String> = vec![
            "--host".into(),
            "127.0.0.1".into(),
            "--port".into(),
            port.to_string(),
            "--token-url".into(),
            format!("{dead}/api/token"),
            "--api-base".into(),
            dead,
            "--upstream-timeout-ms".into(),
            "2000".into(),
            "--log-level".into(),
            "warn".into(),
        ];
        let (id, secret) =
            self.credentials.unwrap_or_else(|| ("spec-client".into(), "spec-secret".into()));
        if !id.is_empty() {
            args.extend(["--client-id".into(), id, "--client-secret".into(), secret]);
        }
        if let Some(token) = self.auth_token {
            args.extend(["--auth-token".into(), token]);
        }
        args.extend(self.extra);

        let child = Command::new(&binary)
            .args(&args)
            .env_remove("RELAY_CLIENT_ID")
            .env_remove("RELAY_CLIENT_SECRET")
            .env_remove("RELAY_AUTH_TOKEN")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(RelayProcess { child, port })
    }
}

impl RelayProcess {
    pub fn build() -> RelayBuilder {
        RelayBuilder::default()
    }

    /// Spawn with dummy upstream credentials and no API auth.
    pub fn start() -> anyhow::Result<Self> {
        Self::build().spawn()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    /// Poll health until responsive.
    pub async fn wait_healthy(&self, timeout: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let client = reqwest::Client::new();
        let url = format!("{}/api/v1/health", self.base_url());
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("relay did not become healthy within {timeout:?}");
            }
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Wait for the process to exit within `timeout`.
    pub async fn wait_exit(
        &mut self,
        timeout: Duration,
    ) -> anyhow::Result<std::process::ExitStatus> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("relay did not exit within {timeout:?}");
            }
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for RelayProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
