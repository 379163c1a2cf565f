use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

/// A single push notification addressed by device token.
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
}

/// Push delivery sink. Failures are non-fatal to callers; the
/// dispatcher logs them per-resident and moves on.
#[async_trait]
pub trait PushSink: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<()>;
}

/// FCM-style HTTP push gateway.
///
/// Configured from `GTRACK_PUSH_URL` and `GTRACK_PUSH_KEY`; the key is
/// sent as a bearer token. Credentials come from the environment, never
/// from code.
pub struct HttpPush {
    client: reqwest::Client,
    endpoint: String,
    server_key: String,
}

impl HttpPush {
    pub fn new(endpoint: impl Into<String>, server_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            server_key: server_key.into(),
        }
    }

    /// Build from environment variables, or `None` when unconfigured.
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("GTRACK_PUSH_URL").ok()?;
        let server_key = std::env::var("GTRACK_PUSH_KEY").ok()?;
        Some(Self::new(endpoint, server_key))
    }
}

#[async_trait]
impl PushSink for HttpPush {
    async fn send(&self, message: &PushMessage) -> Result<()> {
        let payload = serde_json::json!({
            "message": {
                "token": message.token,
                "notification": {
                    "title": message.title,
                    "body": message.body,
                },
            },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.server_key)
            .json(&payload)
            .send()
            .await
            .context("push gateway request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("push gateway returned {status}: {body}");
        }

        Ok(())
    }
}

/// Fallback sink used when no push gateway is configured. Every send
/// fails, which the dispatcher records the same way as a transport
/// error.
pub struct DisabledPush;

#[async_trait]
impl PushSink for DisabledPush {
    async fn send(&self, _message: &PushMessage) -> Result<()> {
        anyhow::bail!("push delivery is not configured (set GTRACK_PUSH_URL and GTRACK_PUSH_KEY)")
    }
}
