use crate::database::sqlite::SqliteDatabase;
use crate::errors::{AppError, Result};
use crate::models::kyc::{OtpChallenge, OtpChannel};
use crate::utils::sms::{self, SmsConfig};
use crate::utils::validation::Validator;
use chrono::{Duration, Utc};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use rand::Rng;
use std::sync::Arc;
use uuid::Uuid;

const CODE_TTL_MINUTES: i64 = 5;

/// Outcome of issuing a code. `debug_code` is only populated when no
/// transport is configured for the channel, so the code can still complete a
/// verification during out-of-band testing.
#[derive(Debug)]
pub struct OtpIssue {
    pub channel: OtpChannel,
    pub expires_in_secs: i64,
    pub debug_code: Option<String>,
}

pub struct OtpService {
    database: Arc<SqliteDatabase>,
}

impl OtpService {
    pub fn new(database: Arc<SqliteDatabase>) -> Self {
        Self { database }
    }

    /// Issue a 6-digit code bound to a normalized target value, valid for
    /// five minutes. Re-issuing replaces the previous challenge for that
    /// channel and clears its verified flag.
    pub async fn send_code(
        &self,
        user_id: &Uuid,
        channel: OtpChannel,
        value: &str,
    ) -> Result<OtpIssue> {
        let bound_value = match channel {
            OtpChannel::Email => {
                Validator::validate_email(value.trim())?;
                normalize_email(value)
            }
            OtpChannel::Phone => {
                Validator::validate_phone(value)?;
                normalize_phone(value)
            }
        };

        let code = generate_code();
        let now = Utc::now();
        let challenge = OtpChallenge {
            user_id: *user_id,
            channel,
            code: code.clone(),
            bound_value,
            expires_at: now + Duration::minutes(CODE_TTL_MINUTES),
            verified_at: None,
            created_at: now,
        };
        self.database.upsert_otp_challenge(&challenge).await?;

        let delivered = match channel {
            OtpChannel::Email => self.deliver_email(value.trim(), &code)?,
            OtpChannel::Phone => self.deliver_sms(&challenge.bound_value, &code).await?,
        };

        tracing::info!(
            action = "otp_issued",
            user_id = %user_id,
            channel = channel.as_str(),
            delivered = delivered,
        );

        Ok(OtpIssue {
            channel,
            expires_in_secs: CODE_TTL_MINUTES * 60,
            debug_code: if delivered { None } else { Some(code) },
        })
    }

    /// Check a submitted code against the stored challenge. Expired codes,
    /// target mismatches and wrong codes all share one error message so the
    /// caller learns nothing about which check failed.
    pub async fn verify_code(
        &self,
        user_id: &Uuid,
        channel: OtpChannel,
        value: &str,
        code: &str,
    ) -> Result<()> {
        let invalid = || AppError::ValidationError("Invalid or expired code".to_string());

        let challenge = self
            .database
            .get_otp_challenge(user_id, channel)
            .await?
            .ok_or_else(invalid)?;

        if Utc::now() > challenge.expires_at {
            return Err(invalid());
        }

        let submitted_value = match channel {
            OtpChannel::Email => normalize_email(value),
            OtpChannel::Phone => normalize_phone(value),
        };
        if submitted_value != challenge.bound_value {
            return Err(invalid());
        }

        if code.trim() != challenge.code {
            return Err(invalid());
        }

        self.database.mark_otp_verified(user_id, channel).await?;
        tracing::info!(action = "otp_verified", user_id = %user_id, channel = channel.as_str());
        Ok(())
    }

    /// Returns true when the email was handed to an SMTP relay, false when
    /// no relay is configured. A configured relay that refuses the message
    /// is a transport error (5xx at the boundary).
    fn deliver_email(&self, to: &str, code: &str) -> Result<bool> {
        let Ok(host) = std::env::var("SMTP_HOST") else {
            return Ok(false);
        };
        let port: u16 = std::env::var("SMTP_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(587);
        let username = std::env::var("SMTP_USERNAME").unwrap_or_default();
        let password = std::env::var("SMTP_PASSWORD").unwrap_or_default();
        let from = std::env::var("FROM_EMAIL").unwrap_or_else(|_| "noreply@dhansetu.app".to_string());

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| AppError::TransportError(format!("From parse error: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| AppError::TransportError(format!("To parse error: {}", e)))?)
            .subject("Your DhanSetu verification code")
            .body(format!(
                "Your verification code is {}. It expires in {} minutes.",
                code, CODE_TTL_MINUTES
            ))
            .map_err(|e| AppError::TransportError(format!("Message build error: {}", e)))?;

        let mailer = SmtpTransport::starttls_relay(&host)
            .map_err(|e| AppError::TransportError(format!("SMTP relay error: {}", e)))?
            .port(port)
            .credentials(Credentials::new(username, password))
            .build();

        mailer
            .send(&email)
            .map_err(|e| AppError::TransportError(format!("SMTP send failed: {}", e)))?;
        Ok(true)
    }

    async fn deliver_sms(&self, to: &str, code: &str) -> Result<bool> {
        let Some(config) = SmsConfig::from_env() else {
            return Ok(false);
        };
        let message = format!(
            "Your DhanSetu verification code is {}. It expires in {} minutes.",
            code, CODE_TTL_MINUTES
        );
        sms::send_sms_infobip(&config, to, &message).await?;
        Ok(true)
    }
}

fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000))
}

fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

fn normalize_phone(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Asha@Example.COM "), "asha@example.com");
    }

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone("+91 98765-43210"), "+919876543210");
    }
}
