use anyhow::{Context, Result};
use async_trait::async_trait;

/// SMS delivery sink for OTP codes.
#[async_trait]
pub trait SmsSink: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<()>;
}

/// Twilio-style SMS gateway: form POST with basic auth.
///
/// Configured from `GTRACK_SMS_ACCOUNT_SID`, `GTRACK_SMS_AUTH_TOKEN`
/// and `GTRACK_SMS_FROM`.
pub struct TwilioSms {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioSms {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
        }
    }

    /// Build from environment variables, or `None` when unconfigured.
    pub fn from_env() -> Option<Self> {
        let account_sid = std::env::var("GTRACK_SMS_ACCOUNT_SID").ok()?;
        let auth_token = std::env::var("GTRACK_SMS_AUTH_TOKEN").ok()?;
        let from_number = std::env::var("GTRACK_SMS_FROM").ok()?;
        Some(Self::new(account_sid, auth_token, from_number))
    }
}

#[async_trait]
impl SmsSink for TwilioSms {
    async fn send(&self, to: &str, body: &str) -> Result<()> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", &self.from_number), ("Body", body)])
            .send()
            .await
            .context("SMS gateway request failed")?;

        let status = response.status();
        if !status.is_success() {
            let response_body = response.text().await.unwrap_or_default();
            anyhow::bail!("SMS gateway returned {status}: {response_body}");
        }

        Ok(())
    }
}

/// Fallback sink used when no SMS gateway is configured. Sends fail,
/// which surfaces to recovery callers as a delivery failure.
pub struct DisabledSms;

#[async_trait]
impl SmsSink for DisabledSms {
    async fn send(&self, _to: &str, _body: &str) -> Result<()> {
        anyhow::bail!(
            "SMS delivery is not configured (set GTRACK_SMS_ACCOUNT_SID, GTRACK_SMS_AUTH_TOKEN, GTRACK_SMS_FROM)"
        )
    }
}
