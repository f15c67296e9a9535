use crate::database::sqlite::{KycFinalizeUpdate, KycPdfInsert, SqliteDatabase};
use crate::errors::{AppError, Result};
use crate::models::kyc::{KycPdf, KycRecord, KycStatus, OtpChannel};
use crate::services::certificate::{CertificateFields, CertificateRenderer};
use crate::services::identity::{IdentitySigner, SignedPayload};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Identity fields submitted at finalize time. Only name, dob and gov_id
/// feed the identifier; the rest is printed on the certificate for the
/// record.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FinalizeSubmission {
    pub name: String,
    pub dob: String,
    pub gov_id: String,
    #[serde(default)]
    pub gov_id_type: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub id_issuer: Option<String>,
    #[serde(default)]
    pub id_expiry: Option<String>,
}

#[derive(Debug)]
pub struct FinalizeOutcome {
    pub kyc_id: String,
    pub pdf_url: String,
}

/// Result of a banker QR verification. `checksum_ok` is informational: a
/// mismatch flags the record as suspicious without blocking the lookup.
#[derive(Debug)]
pub struct ScanOutcome {
    pub checksum_ok: bool,
    pub record: KycRecord,
    pub stored_checksum: String,
}

pub struct KycService {
    database: Arc<SqliteDatabase>,
    signer: IdentitySigner,
    storage_dir: PathBuf,
}

impl KycService {
    pub fn new(database: Arc<SqliteDatabase>, signer: IdentitySigner, storage_dir: PathBuf) -> Self {
        Self {
            database,
            signer,
            storage_dir,
        }
    }

    pub fn from_env(database: Arc<SqliteDatabase>) -> Self {
        let storage_dir = std::env::var("STORAGE_DIR").unwrap_or_else(|_| "storage".to_string());
        Self::new(database, IdentitySigner::from_env(), PathBuf::from(storage_dir))
    }

    pub fn signer(&self) -> &IdentitySigner {
        &self.signer
    }

    /// Open a KYC record for the caller. Requires an eligible loan draft;
    /// idempotent when a record already exists.
    pub async fn start(&self, user_id: &Uuid) -> Result<(KycRecord, bool)> {
        if let Some(existing) = self.database.get_kyc_by_user(user_id).await? {
            return Ok((existing, true));
        }

        if !self.database.has_eligible_draft(user_id).await? {
            return Err(AppError::ValidationError(
                "An eligible loan draft is required before starting KYC".to_string(),
            ));
        }

        let record = self.database.create_kyc_record(user_id).await?;
        tracing::info!(action = "kyc_started", user_id = %user_id, internal_id = record.id);
        Ok((record, false))
    }

    /// Close out a pending record: derive the identifier, run the two-stage
    /// certificate render, persist the artifact, and flip the status with a
    /// conditional update so a concurrent finalize cannot issue a second
    /// signed document.
    pub async fn finalize(
        &self,
        user_id: &Uuid,
        submission: &FinalizeSubmission,
    ) -> Result<FinalizeOutcome> {
        let record = self
            .database
            .get_kyc_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::ValidationError("KYC not started".to_string()))?;

        if record.status == KycStatus::Verified {
            return Err(AppError::ConflictError("KYC already finalized".to_string()));
        }

        if !self
            .database
            .is_otp_verified(user_id, OtpChannel::Email)
            .await?
        {
            return Err(AppError::ValidationError("Email not verified".to_string()));
        }
        if !self
            .database
            .is_otp_verified(user_id, OtpChannel::Phone)
            .await?
        {
            return Err(AppError::ValidationError("Phone not verified".to_string()));
        }

        let name = submission.name.trim().to_string();
        let dob = submission.dob.trim().to_string();
        let gov_id = submission.gov_id.trim().to_string();
        crate::utils::validation::Validator::validate_person_name(&name)?;
        crate::utils::validation::Validator::validate_dob(&dob)?;
        crate::utils::validation::Validator::validate_gov_id(&gov_id)?;

        let kyc_id = self.signer.derive_kyc_id(&name, &dob, &gov_id);
        let gov_id_type = submission
            .gov_id_type
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "generic".to_string());
        let gov_id_last4 = last4(&gov_id);
        let address = submission.address.clone().unwrap_or_default();

        let verified_at = Utc::now();
        let issued_at = issued_at_string(verified_at);

        let fields = certificate_fields(&kyc_id, &name, &dob, &gov_id_type, &gov_id_last4, submission);

        // Stage one: the QR cannot carry a checksum of bytes that do not
        // exist yet, so it goes in with an empty one.
        let mut payload = SignedPayload {
            kyc_id: kyc_id.clone(),
            issued_at,
            pdf_checksum: String::new(),
        };
        let provisional_sig = self.signer.sign(&payload);
        let provisional =
            CertificateRenderer::render_provisional(&fields, &self.signer.qr_text(&payload, &provisional_sig))?;

        // Stage two: fold the provisional checksum into the payload, re-sign,
        // re-render. The stored checksum is the signed one the QR carries.
        payload.pdf_checksum = provisional.checksum.clone();
        let signature = self.signer.sign(&payload);
        let rendered =
            CertificateRenderer::render_final(&fields, &self.signer.qr_text(&payload, &signature))?;

        std::fs::create_dir_all(&self.storage_dir)?;
        let pdf_path = self.storage_dir.join(format!("kyc_{}.pdf", kyc_id));
        std::fs::write(&pdf_path, &rendered.bytes)?;
        let pdf_url = pdf_path.to_string_lossy().to_string();

        self.database
            .finalize_kyc(
                user_id,
                &KycFinalizeUpdate {
                    kyc_id: &kyc_id,
                    name: &name,
                    dob: &dob,
                    gov_id_type: &gov_id_type,
                    gov_id_last4: &gov_id_last4,
                    address: &address,
                    verified_at,
                },
                &KycPdfInsert {
                    kyc_id: &kyc_id,
                    pdf_url: &pdf_url,
                    pdf_checksum: &payload.pdf_checksum,
                    qr_payload_hash: &signature,
                    signed_at: verified_at,
                },
            )
            .await?;

        let _ = self
            .database
            .insert_access_log(
                "user",
                Some(&user_id.to_string()),
                "kyc",
                &kyc_id,
                "finalize",
                None,
            )
            .await;

        tracing::info!(action = "kyc_finalized", user_id = %user_id, kyc_id = %kyc_id);
        Ok(FinalizeOutcome { kyc_id, pdf_url })
    }

    pub async fn my_kyc(&self, user_id: &Uuid) -> Result<Option<KycRecord>> {
        self.database.get_kyc_by_user(user_id).await
    }

    /// Latest issued certificate for the caller, as raw bytes.
    pub async fn my_pdf(&self, user_id: &Uuid) -> Result<(String, Vec<u8>)> {
        let record = self
            .database
            .get_kyc_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFoundError("No KYC PDF".to_string()))?;
        let kyc_id = record
            .kyc_id
            .ok_or_else(|| AppError::NotFoundError("No KYC PDF".to_string()))?;
        let pdf = self
            .database
            .latest_kyc_pdf(&kyc_id)
            .await?
            .ok_or_else(|| AppError::NotFoundError("No KYC PDF".to_string()))?;

        let bytes = std::fs::read(&pdf.pdf_url)
            .map_err(|e| AppError::NotFoundError(format!("KYC PDF unreadable: {}", e)))?;
        Ok((format!("kyc_{}.pdf", kyc_id), bytes))
    }

    /// Resolve a free-form banker-entered identifier. Bare digits are tried
    /// as the internal numeric id first; anything else is normalized to the
    /// external identifier's alphabet.
    pub async fn resolve_record(&self, raw: &str) -> Result<KycRecord> {
        let mut norm: String = raw
            .trim()
            .chars()
            .filter(|c| *c != ' ' && *c != '-')
            .collect::<String>()
            .to_uppercase();

        if norm.is_empty() {
            return Err(AppError::ValidationError("Invalid KYC ID".to_string()));
        }

        if norm.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(internal_id) = norm.parse::<i64>() {
                if let Some(record) = self.database.get_kyc_by_internal_id(internal_id).await? {
                    if let Some(kyc_id) = &record.kyc_id {
                        norm = kyc_id.clone();
                    } else {
                        return Ok(record);
                    }
                }
            }
        }

        self.database
            .get_kyc_by_kyc_id(&norm)
            .await?
            .ok_or_else(|| AppError::NotFoundError("KYC not found".to_string()))
    }

    pub async fn latest_pdf_for(&self, record: &KycRecord) -> Result<KycPdf> {
        let kyc_id = record
            .kyc_id
            .as_deref()
            .ok_or_else(|| AppError::NotFoundError("KYC PDF not found".to_string()))?;
        self.database
            .latest_kyc_pdf(kyc_id)
            .await?
            .ok_or_else(|| AppError::NotFoundError("KYC PDF not found".to_string()))
    }

    /// Fresh signature over the stored issuance triple, for the lookup
    /// response. Matches the certificate's embedded signature because both
    /// use `verified_at` as the issuance instant.
    pub fn lookup_signature(&self, record: &KycRecord, pdf: &KycPdf) -> (SignedPayload, String) {
        let payload = SignedPayload {
            kyc_id: record.kyc_id.clone().unwrap_or_default(),
            issued_at: record.verified_at.map(issued_at_string).unwrap_or_default(),
            pdf_checksum: pdf.pdf_checksum.clone(),
        };
        let signature = self.signer.sign(&payload);
        (payload, signature)
    }

    /// Server-side confirmation of a scanned QR payload.
    pub async fn verify_scanned(
        &self,
        payload: &SignedPayload,
        signature: &str,
        expected_checksum: Option<&str>,
    ) -> Result<ScanOutcome> {
        if !self.signer.verify(payload, signature) {
            return Err(AppError::SignatureError);
        }

        let record = self
            .database
            .get_kyc_by_kyc_id(&payload.kyc_id)
            .await?
            .ok_or_else(|| AppError::NotFoundError("KYC not found".to_string()))?;

        let pdf = self.latest_pdf_for(&record).await?;

        // Compared against storage, not against the signed payload: a signed
        // but stale or substituted checksum shows up as suspicious here.
        let supplied = expected_checksum.unwrap_or(&payload.pdf_checksum);
        let checksum_ok = supplied == pdf.pdf_checksum;

        Ok(ScanOutcome {
            checksum_ok,
            record,
            stored_checksum: pdf.pdf_checksum,
        })
    }
}

fn last4(gov_id: &str) -> String {
    let chars: Vec<char> = gov_id.chars().collect();
    if chars.len() >= 4 {
        chars[chars.len() - 4..].iter().collect()
    } else {
        gov_id.to_string()
    }
}

fn issued_at_string(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

fn certificate_fields(
    kyc_id: &str,
    name: &str,
    dob: &str,
    gov_id_type: &str,
    gov_id_last4: &str,
    submission: &FinalizeSubmission,
) -> CertificateFields {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    vec![
        ("KYC ID".to_string(), kyc_id.to_string()),
        ("Name".to_string(), name.to_string()),
        ("DOB".to_string(), dob.to_string()),
        ("Gov ID Type".to_string(), gov_id_type.to_string()),
        ("Gov ID (last4)".to_string(), gov_id_last4.to_string()),
        ("Email".to_string(), opt(&submission.email)),
        ("Phone".to_string(), opt(&submission.phone)),
        ("Address".to_string(), opt(&submission.address)),
        ("Address 2".to_string(), opt(&submission.address2)),
        ("City".to_string(), opt(&submission.city)),
        ("State".to_string(), opt(&submission.state)),
        ("Pincode".to_string(), opt(&submission.pincode)),
        ("ID Issuer".to_string(), opt(&submission.id_issuer)),
        ("ID Expiry".to_string(), opt(&submission.id_expiry)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last4_handles_short_ids() {
        assert_eq!(last4("ABCD1234"), "1234");
        assert_eq!(last4("123"), "123");
    }

    #[test]
    fn issued_at_has_micros_and_z() {
        let t = DateTime::parse_from_rfc3339("2026-01-15T10:30:00.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(issued_at_string(t), "2026-01-15T10:30:00.123456Z");
    }
}
