use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    Pending,
    Verified,
}

impl KycStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::Pending => "pending",
            KycStatus::Verified => "verified",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "verified" => KycStatus::Verified,
            _ => KycStatus::Pending,
        }
    }
}

/// One row per applicant. The integer `id` is the internal identifier the
/// banker lookup accepts as a bare number; `kyc_id` is the derived public
/// identifier, set exactly once when the record is finalized.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct KycRecord {
    pub id: i64,
    pub user_id: Uuid,
    pub kyc_id: Option<String>,
    pub status: KycStatus,
    pub name: Option<String>,
    pub dob: Option<String>,
    pub gov_id_type: Option<String>,
    pub gov_id_last4: Option<String>,
    pub address: Option<String>,
    pub selfie_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

/// Append-only issuance record; the most recent row for a kyc_id wins.
/// `qr_payload_hash` is the signature embedded in the certificate's QR code.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct KycPdf {
    pub id: i64,
    pub kyc_id: String,
    pub pdf_url: String,
    pub pdf_checksum: String,
    pub qr_payload_hash: String,
    pub signed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OtpChannel {
    Email,
    Phone,
}

impl OtpChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpChannel::Email => "email",
            OtpChannel::Phone => "phone",
        }
    }
}

/// One in-flight challenge per (user, channel). Replaced on re-send,
/// stamped on successful verification, deleted when finalize consumes it.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    pub user_id: Uuid,
    pub channel: OtpChannel,
    pub code: String,
    pub bound_value: String,
    pub expires_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
