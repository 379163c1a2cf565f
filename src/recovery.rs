//! OTP-based account recovery and login.
//!
//! Three-step flow per `(username, user_type)`: locate the user, issue
//! a 6-digit code over SMS, then verify the code and update the
//! password. A direct login check for residents lives here too since it
//! shares the directory access and failure taxonomy.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use thiserror::Error;

use crate::db::Database;
use crate::delivery::SmsSink;
use crate::models::{ResidentProfile, User, UserType};

/// Typed failures surfaced synchronously to recovery/login callers.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Missing or malformed input, rejected before any directory access.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("no matching user")]
    NotFound,
    #[error("user has no phone number on file")]
    MissingContact,
    /// No outstanding code, or the submitted code does not match.
    #[error("invalid or missing code")]
    InvalidCode,
    /// The code matched but its validity window has passed.
    #[error("code has expired")]
    Expired,
    #[error("incorrect password")]
    Unauthenticated,
    /// SMS transport failure where the send was the call's sole purpose.
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Tunables for the recovery flow. Tests shorten the TTL instead of
/// mocking a clock.
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// How long an issued code stays valid.
    pub otp_ttl: Duration,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            otp_ttl: Duration::from_secs(5 * 60),
        }
    }
}

pub struct RecoveryService {
    db: Database,
    sms: Arc<dyn SmsSink>,
    config: RecoveryConfig,
}

impl RecoveryService {
    pub fn new(db: Database, sms: Arc<dyn SmsSink>, config: RecoveryConfig) -> Self {
        Self { db, sms, config }
    }

    /// Upfront validation before the client shows the phone-entry step.
    /// Read-only; mutates nothing.
    pub fn verify_user_for_reset(
        &self,
        username: &str,
        user_type: UserType,
    ) -> Result<(), RecoveryError> {
        let user = self.locate(username, user_type)?;
        if user.phone.as_deref().unwrap_or("").is_empty() {
            return Err(RecoveryError::MissingContact);
        }
        Ok(())
    }

    /// Issue a fresh OTP and send it over SMS. Overwrites any prior
    /// outstanding code; only the latest is valid. The code is never
    /// returned to the caller.
    pub async fn send_otp(
        &self,
        username: &str,
        user_type: UserType,
    ) -> Result<(), RecoveryError> {
        let user = self.locate(username, user_type)?;
        let phone = match user.phone.as_deref() {
            Some(phone) if !phone.is_empty() => phone.to_string(),
            _ => return Err(RecoveryError::MissingContact),
        };

        let code = generate_otp();
        let now_ms = Utc::now().timestamp_millis();
        self.db
            .set_reset_state(user_type, user.id, &code, now_ms)?;

        let body = format!("Your G-Track password reset code is {code}. It expires in 5 minutes.");
        self.sms
            .send(&phone, &body)
            .await
            .map_err(|err| {
                tracing::warn!(username = %username, error = %err, "OTP SMS delivery failed");
                RecoveryError::Delivery(err.to_string())
            })?;

        tracing::info!(username = %username, "OTP issued");
        Ok(())
    }

    /// Verify the submitted code and replace the password.
    ///
    /// The expiry check runs only after the code matches: an
    /// expired-but-correct code reports `Expired`, a wrong code is
    /// always `InvalidCode` regardless of age. Success clears both
    /// transient fields together, so a replay of the same code fails.
    pub fn verify_otp_and_update_password(
        &self,
        username: &str,
        user_type: UserType,
        otp: &str,
        new_password: &str,
    ) -> Result<(), RecoveryError> {
        if otp.is_empty() {
            return Err(RecoveryError::InvalidArgument("otp is required"));
        }
        if new_password.is_empty() {
            return Err(RecoveryError::InvalidArgument("new_password is required"));
        }

        let user = self.locate(username, user_type)?;

        let (Some(stored_code), Some(issued_at_ms)) = (&user.reset_code, user.reset_timestamp_ms)
        else {
            return Err(RecoveryError::InvalidCode);
        };
        if stored_code != otp {
            return Err(RecoveryError::InvalidCode);
        }

        let age_ms = Utc::now().timestamp_millis() - issued_at_ms;
        if age_ms > self.config.otp_ttl.as_millis() as i64 {
            return Err(RecoveryError::Expired);
        }

        self.db
            .complete_password_reset(user_type, user.id, new_password)?;
        tracing::info!(username = %username, "password reset completed");
        Ok(())
    }

    /// Direct equality check against the stored password. Returns the
    /// profile projection on success; the caller never learns more than
    /// the NotFound / Unauthenticated distinction on failure.
    pub fn verify_resident_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<ResidentProfile, RecoveryError> {
        if password.is_empty() {
            return Err(RecoveryError::InvalidArgument("password is required"));
        }

        let user = self.locate(username, UserType::Resident)?;
        if user.password != password {
            return Err(RecoveryError::Unauthenticated);
        }

        Ok(user.into())
    }

    fn locate(&self, username: &str, user_type: UserType) -> Result<User, RecoveryError> {
        if username.is_empty() {
            return Err(RecoveryError::InvalidArgument("username is required"));
        }
        self.db
            .find_user_by_username(user_type, username)?
            .ok_or(RecoveryError::NotFound)
    }
}

/// 6-digit numeric code: `100000 + random(0..900000)`, matching the
/// fixed generation rule of the original flow.
fn generate_otp() -> String {
    let n: u32 = 100_000 + rand::thread_rng().gen_range(0..900_000);
    n.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..1000 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().unwrap();
            assert!((100_000..1_000_000).contains(&n));
        }
    }
}
