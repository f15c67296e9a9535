use base32::Alphabet;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;

/// Number of base32 characters kept from the digest. 12 characters of a
/// 5-bit alphabet carry 60 bits, short enough to read over the phone and
/// wide enough that a collision is a storage-layer conflict, not a design
/// expectation.
const KYC_ID_LEN: usize = 12;

/// Issuance payload embedded in the certificate QR code and re-derived at
/// verification time. Never persisted as-is; the trust anchor is the
/// signature over its three fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SignedPayload {
    pub kyc_id: String,
    pub issued_at: String,
    pub pdf_checksum: String,
}

/// Keyed signer for KYC identifiers and issuance payloads. Holding the salt
/// and secret on the struct keeps every derivation pinned to one key pair
/// for the life of the process.
#[derive(Debug, Clone)]
pub struct IdentitySigner {
    salt: String,
    secret: String,
}

impl IdentitySigner {
    pub fn new(salt: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            salt: salt.into(),
            secret: secret.into(),
        }
    }

    pub fn from_env() -> Self {
        let salt = std::env::var("SERVER_SALT").unwrap_or_else(|_| "change-me".to_string());
        let secret =
            std::env::var("SERVER_SIGNING_SECRET").unwrap_or_else(|_| "change-me".to_string());
        Self::new(salt, secret)
    }

    /// Derive the public KYC identifier from the applicant's identity triple.
    ///
    /// The same `(name, dob, gov_id)` always maps to the same identifier, so
    /// a re-registration is detected by the unique constraint without ever
    /// storing the full government ID.
    pub fn derive_kyc_id(&self, name: &str, dob_iso: &str, gov_id: &str) -> String {
        let norm = format!(
            "{}|{}|{}",
            name.trim().to_lowercase(),
            dob_iso.trim(),
            gov_id.trim()
        );
        let digest = Sha256::digest(format!("{}|{}", norm, self.salt).as_bytes());
        let encoded = base32::encode(Alphabet::RFC4648 { padding: false }, &digest);
        encoded[..KYC_ID_LEN].to_string()
    }

    /// sign = hex(sha256(secret || kyc_id || "|" || issued_at || "|" || pdf_checksum))
    pub fn sign(&self, payload: &SignedPayload) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(payload.kyc_id.as_bytes());
        hasher.update(b"|");
        hasher.update(payload.issued_at.as_bytes());
        hasher.update(b"|");
        hasher.update(payload.pdf_checksum.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Recompute and compare in constant time. Callers translate `false`
    /// into a signature-mismatch error without naming the differing field.
    pub fn verify(&self, payload: &SignedPayload, signature: &str) -> bool {
        let expected = self.sign(payload);
        constant_time_eq(expected.as_bytes(), signature.as_bytes())
    }

    /// QR text: the payload plus its signature as one JSON document.
    pub fn qr_text(&self, payload: &SignedPayload, signature: &str) -> String {
        serde_json::json!({ "payload": payload, "sig": signature }).to_string()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> IdentitySigner {
        IdentitySigner::new("test-salt", "test-secret")
    }

    fn payload() -> SignedPayload {
        SignedPayload {
            kyc_id: "ABC123DEF456".to_string(),
            issued_at: "2026-01-15T10:30:00.000000Z".to_string(),
            pdf_checksum: "deadbeef".repeat(8),
        }
    }

    #[test]
    fn kyc_id_is_deterministic() {
        let s = signer();
        let a = s.derive_kyc_id("Asha Rao", "1990-04-21", "PAN123456789");
        let b = s.derive_kyc_id("Asha Rao", "1990-04-21", "PAN123456789");
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn kyc_id_normalizes_name_case_and_whitespace() {
        let s = signer();
        let a = s.derive_kyc_id("  Asha Rao ", "1990-04-21", "PAN123456789");
        let b = s.derive_kyc_id("asha rao", "1990-04-21", "PAN123456789");
        assert_eq!(a, b);
    }

    #[test]
    fn kyc_id_changes_with_any_input() {
        let s = signer();
        let base = s.derive_kyc_id("Asha Rao", "1990-04-21", "PAN123456789");
        assert_ne!(base, s.derive_kyc_id("Asha Rai", "1990-04-21", "PAN123456789"));
        assert_ne!(base, s.derive_kyc_id("Asha Rao", "1990-04-22", "PAN123456789"));
        assert_ne!(base, s.derive_kyc_id("Asha Rao", "1990-04-21", "PAN123456780"));
    }

    #[test]
    fn kyc_id_depends_on_salt() {
        let a = IdentitySigner::new("salt-a", "x").derive_kyc_id("Asha", "1990-04-21", "P1");
        let b = IdentitySigner::new("salt-b", "x").derive_kyc_id("Asha", "1990-04-21", "P1");
        assert_ne!(a, b);
    }

    #[test]
    fn sign_verify_roundtrip() {
        let s = signer();
        let p = payload();
        let sig = s.sign(&p);
        assert!(s.verify(&p, &sig));
    }

    #[test]
    fn verify_rejects_any_mutated_field() {
        let s = signer();
        let p = payload();
        let sig = s.sign(&p);

        let mut tampered = p.clone();
        tampered.kyc_id = "XYZ123DEF456".to_string();
        assert!(!s.verify(&tampered, &sig));

        let mut tampered = p.clone();
        tampered.issued_at = "2026-01-15T10:30:01.000000Z".to_string();
        assert!(!s.verify(&tampered, &sig));

        let mut tampered = p.clone();
        tampered.pdf_checksum = "cafebabe".repeat(8);
        assert!(!s.verify(&tampered, &sig));
    }

    #[test]
    fn verify_rejects_wrong_length_signature() {
        let s = signer();
        let p = payload();
        assert!(!s.verify(&p, "abc"));
        assert!(!s.verify(&p, ""));
    }

    #[test]
    fn signature_depends_on_secret() {
        let p = payload();
        let sig = IdentitySigner::new("s", "secret-a").sign(&p);
        assert!(!IdentitySigner::new("s", "secret-b").verify(&p, &sig));
    }

    #[test]
    fn qr_text_roundtrips_through_json() {
        let s = signer();
        let p = payload();
        let sig = s.sign(&p);
        let text = s.qr_text(&p, &sig);

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let decoded: SignedPayload =
            serde_json::from_value(value.get("payload").unwrap().clone()).unwrap();
        let decoded_sig = value.get("sig").unwrap().as_str().unwrap();
        assert_eq!(decoded, p);
        assert!(s.verify(&decoded, decoded_sig));
    }
}
