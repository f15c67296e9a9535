use chrono::{Duration, Utc};
use dhansetu_backend::database::sqlite::SqliteDatabase;
use dhansetu_backend::errors::AppError;
use dhansetu_backend::models::kyc::{KycStatus, OtpChallenge, OtpChannel};
use dhansetu_backend::models::loan::{EmploymentType, LoanDraft, ResidenceType};
use dhansetu_backend::models::user::User;
use dhansetu_backend::services::eligibility;
use dhansetu_backend::services::identity::{IdentitySigner, SignedPayload};
use dhansetu_backend::services::kyc::{FinalizeSubmission, KycService};
use dhansetu_backend::services::otp::OtpService;
use std::sync::Arc;
use uuid::Uuid;

struct TestEnv {
    db: Arc<SqliteDatabase>,
    kyc: KycService,
    otp: OtpService,
    // Held so the storage dir outlives the test body.
    _storage: tempfile::TempDir,
}

async fn setup() -> TestEnv {
    let db = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
    let storage = tempfile::tempdir().unwrap();
    let signer = IdentitySigner::new("test-salt", "test-signing-secret");
    let kyc = KycService::new(db.clone(), signer, storage.path().to_path_buf());
    let otp = OtpService::new(db.clone());
    TestEnv {
        db,
        kyc,
        otp,
        _storage: storage,
    }
}

async fn create_user(db: &SqliteDatabase, email: &str) -> Uuid {
    let user = User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        password_hash: "irrelevant-for-service-tests".to_string(),
        name: Some("Asha Rao".to_string()),
        phone: Some("+919876543210".to_string()),
        email_verified_at: None,
        created_at: Utc::now(),
    };
    db.create_user(&user).await.unwrap();
    user.id
}

fn eligible_draft() -> LoanDraft {
    LoanDraft {
        amount: 150_000.0,
        term_months: 24,
        income: 80_000.0,
        existing_emi: 4_000.0,
        credit_score: 780,
        age: 33,
        employment_type: EmploymentType::Salaried,
        residence_type: ResidenceType::Owned,
        purpose: Some("home improvement".to_string()),
        full_name: Some("Asha Rao".to_string()),
        email: Some("asha@example.com".to_string()),
    }
}

fn ineligible_draft() -> LoanDraft {
    LoanDraft {
        amount: 5_000_000.0,
        income: 10_000.0,
        credit_score: 550,
        employment_type: EmploymentType::Student,
        residence_type: ResidenceType::Rented,
        ..eligible_draft()
    }
}

async fn save_draft(db: &SqliteDatabase, user_id: &Uuid, draft: &LoanDraft) {
    let decision = eligibility::evaluate(draft);
    db.insert_loan_draft(user_id, draft, decision.prediction())
        .await
        .unwrap();
}

async fn pass_otp(env: &TestEnv, user_id: &Uuid, channel: OtpChannel, value: &str) {
    // No SMTP/SMS transport is configured in tests, so the code comes back
    // in the issue result.
    let issue = env.otp.send_code(user_id, channel, value).await.unwrap();
    let code = issue.debug_code.expect("no transport configured, code expected");
    env.otp
        .verify_code(user_id, channel, value, &code)
        .await
        .unwrap();
}

fn submission() -> FinalizeSubmission {
    FinalizeSubmission {
        name: "Asha Rao".to_string(),
        dob: "1990-04-21".to_string(),
        gov_id: "PAN9876543210".to_string(),
        gov_id_type: Some("pan".to_string()),
        address: Some("14 Lake Road".to_string()),
        email: Some("asha@example.com".to_string()),
        phone: Some("+919876543210".to_string()),
        address2: None,
        city: Some("Pune".to_string()),
        state: Some("MH".to_string()),
        pincode: Some("411001".to_string()),
        id_issuer: None,
        id_expiry: None,
    }
}

async fn finalize_verified_user(env: &TestEnv, email: &str) -> (Uuid, String) {
    let user_id = create_user(&env.db, email).await;
    save_draft(&env.db, &user_id, &eligible_draft()).await;
    env.kyc.start(&user_id).await.unwrap();
    pass_otp(env, &user_id, OtpChannel::Email, email).await;
    pass_otp(env, &user_id, OtpChannel::Phone, "+919876543210").await;
    let outcome = env.kyc.finalize(&user_id, &submission()).await.unwrap();
    (user_id, outcome.kyc_id)
}

#[tokio::test]
async fn start_requires_an_eligible_draft() {
    let env = setup().await;
    let user_id = create_user(&env.db, "a@example.com").await;

    let err = env.kyc.start(&user_id).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    save_draft(&env.db, &user_id, &ineligible_draft()).await;
    let err = env.kyc.start(&user_id).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    save_draft(&env.db, &user_id, &eligible_draft()).await;
    let (record, existing) = env.kyc.start(&user_id).await.unwrap();
    assert!(!existing);
    assert_eq!(record.status, KycStatus::Pending);
    assert!(record.kyc_id.is_none());
}

#[tokio::test]
async fn start_is_idempotent() {
    let env = setup().await;
    let user_id = create_user(&env.db, "b@example.com").await;
    save_draft(&env.db, &user_id, &eligible_draft()).await;

    let (first, _) = env.kyc.start(&user_id).await.unwrap();
    let (second, existing) = env.kyc.start(&user_id).await.unwrap();
    assert!(existing);
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn finalize_names_the_first_unmet_precondition() {
    let env = setup().await;
    let user_id = create_user(&env.db, "c@example.com").await;

    // Not started yet.
    let err = env.kyc.finalize(&user_id, &submission()).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(ref m) if m.contains("not started")));

    save_draft(&env.db, &user_id, &eligible_draft()).await;
    env.kyc.start(&user_id).await.unwrap();

    let err = env.kyc.finalize(&user_id, &submission()).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(ref m) if m.contains("Email")));

    pass_otp(&env, &user_id, OtpChannel::Email, "c@example.com").await;
    let err = env.kyc.finalize(&user_id, &submission()).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(ref m) if m.contains("Phone")));
}

#[tokio::test]
async fn finalize_issues_a_verifiable_certificate() {
    let env = setup().await;
    let (user_id, kyc_id) = finalize_verified_user(&env, "d@example.com").await;
    assert_eq!(kyc_id.len(), 12);

    let record = env.kyc.my_kyc(&user_id).await.unwrap().unwrap();
    assert_eq!(record.status, KycStatus::Verified);
    assert_eq!(record.kyc_id.as_deref(), Some(kyc_id.as_str()));
    assert!(record.verified_at.is_some());
    // Only the last four digits of the government ID are retained.
    assert_eq!(record.gov_id_last4.as_deref(), Some("3210"));

    let pdf = env.db.latest_kyc_pdf(&kyc_id).await.unwrap().unwrap();
    let (filename, bytes) = env.kyc.my_pdf(&user_id).await.unwrap();
    assert_eq!(filename, format!("kyc_{}.pdf", kyc_id));
    assert!(bytes.starts_with(b"%PDF"));

    // The stored signature re-verifies against the stored issuance triple.
    let (payload, signature) = env.kyc.lookup_signature(&record, &pdf);
    assert!(env.kyc.signer().verify(&payload, &signature));
    // The certificate's embedded signature is the same one, because both
    // sides sign the verified_at instant and the stored checksum.
    assert_eq!(signature, pdf.qr_payload_hash);
}

#[tokio::test]
async fn finalize_twice_is_a_conflict() {
    let env = setup().await;
    let (user_id, _) = finalize_verified_user(&env, "e@example.com").await;

    // Even with fresh OTP confirmations, a verified record stays closed.
    pass_otp(&env, &user_id, OtpChannel::Email, "e@example.com").await;
    pass_otp(&env, &user_id, OtpChannel::Phone, "+919876543210").await;
    let err = env.kyc.finalize(&user_id, &submission()).await.unwrap_err();
    assert!(matches!(err, AppError::ConflictError(_)));

    let record = env.kyc.my_kyc(&user_id).await.unwrap().unwrap();
    assert_eq!(record.status, KycStatus::Verified);
}

#[tokio::test]
async fn otp_flags_are_consumed_by_finalize() {
    let env = setup().await;
    let (user_id, _) = finalize_verified_user(&env, "f@example.com").await;
    assert!(!env
        .db
        .is_otp_verified(&user_id, OtpChannel::Email)
        .await
        .unwrap());
    assert!(!env
        .db
        .is_otp_verified(&user_id, OtpChannel::Phone)
        .await
        .unwrap());
}

#[tokio::test]
async fn otp_rejects_expired_mismatched_and_wrong_codes() {
    let env = setup().await;
    let user_id = create_user(&env.db, "g@example.com").await;

    // Wrong code.
    let issue = env
        .otp
        .send_code(&user_id, OtpChannel::Email, "g@example.com")
        .await
        .unwrap();
    let code = issue.debug_code.unwrap();
    let wrong = if code == "000000" { "000001" } else { "000000" };
    let err = env
        .otp
        .verify_code(&user_id, OtpChannel::Email, "g@example.com", wrong)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    // Bound-value mismatch.
    let err = env
        .otp
        .verify_code(&user_id, OtpChannel::Email, "other@example.com", &code)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    // Same code, right value, still inside the window: accepted.
    env.otp
        .verify_code(&user_id, OtpChannel::Email, "G@Example.com ", &code)
        .await
        .unwrap();

    // Expired challenge.
    let expired = OtpChallenge {
        user_id,
        channel: OtpChannel::Phone,
        code: "123456".to_string(),
        bound_value: "+919876543210".to_string(),
        expires_at: Utc::now() - Duration::minutes(1),
        verified_at: None,
        created_at: Utc::now() - Duration::minutes(6),
    };
    env.db.upsert_otp_challenge(&expired).await.unwrap();
    let err = env
        .otp
        .verify_code(&user_id, OtpChannel::Phone, "+919876543210", "123456")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn banker_lookup_resolves_internal_and_external_ids() {
    let env = setup().await;
    let (user_id, kyc_id) = finalize_verified_user(&env, "h@example.com").await;
    let record = env.kyc.my_kyc(&user_id).await.unwrap().unwrap();

    // External id, with the whitespace/dash/casing a scanner might add.
    let sloppy = format!(
        " {}-{} ",
        kyc_id[..6].to_lowercase(),
        &kyc_id[6..]
    );
    let found = env.kyc.resolve_record(&sloppy).await.unwrap();
    assert_eq!(found.id, record.id);

    // Bare internal numeric id.
    let found = env.kyc.resolve_record(&record.id.to_string()).await.unwrap();
    assert_eq!(found.kyc_id.as_deref(), Some(kyc_id.as_str()));

    let err = env.kyc.resolve_record("NOSUCHID9999").await.unwrap_err();
    assert!(matches!(err, AppError::NotFoundError(_)));
}

#[tokio::test]
async fn qr_scan_verifies_and_flags_checksum_mismatches() {
    let env = setup().await;
    let (user_id, kyc_id) = finalize_verified_user(&env, "i@example.com").await;
    let record = env.kyc.my_kyc(&user_id).await.unwrap().unwrap();
    let pdf = env.db.latest_kyc_pdf(&kyc_id).await.unwrap().unwrap();
    let (payload, signature) = env.kyc.lookup_signature(&record, &pdf);

    // Honest scan: signature good, checksum matches storage.
    let outcome = env
        .kyc
        .verify_scanned(&payload, &signature, None)
        .await
        .unwrap();
    assert!(outcome.checksum_ok);
    assert_eq!(outcome.stored_checksum, pdf.pdf_checksum);

    // Tampered checksum that was validly re-signed: the signature holds but
    // the storage comparison flags it.
    let tampered = SignedPayload {
        pdf_checksum: "0".repeat(64),
        ..payload.clone()
    };
    let tampered_sig = env.kyc.signer().sign(&tampered);
    let outcome = env
        .kyc
        .verify_scanned(&tampered, &tampered_sig, None)
        .await
        .unwrap();
    assert!(!outcome.checksum_ok);
    assert_eq!(outcome.stored_checksum, pdf.pdf_checksum);

    // Tampered payload with the original signature: hard failure.
    let err = env
        .kyc
        .verify_scanned(&tampered, &signature, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SignatureError));

    // Unknown identifier with a valid signature: not found.
    let ghost = SignedPayload {
        kyc_id: "AAAAAAAAAAAA".to_string(),
        ..payload
    };
    let ghost_sig = env.kyc.signer().sign(&ghost);
    let err = env
        .kyc
        .verify_scanned(&ghost, &ghost_sig, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFoundError(_)));
}

#[tokio::test]
async fn reregistration_derives_the_same_identifier() {
    let env = setup().await;
    let (_, kyc_id) = finalize_verified_user(&env, "j@example.com").await;

    let sub = submission();
    let rederived = env
        .kyc
        .signer()
        .derive_kyc_id(&sub.name, &sub.dob, &sub.gov_id);
    assert_eq!(rederived, kyc_id);

    // A second user presenting the same identity collides on the unique
    // identifier instead of silently overwriting.
    let other = create_user(&env.db, "k@example.com").await;
    save_draft(&env.db, &other, &eligible_draft()).await;
    env.kyc.start(&other).await.unwrap();
    pass_otp(&env, &other, OtpChannel::Email, "k@example.com").await;
    pass_otp(&env, &other, OtpChannel::Phone, "+919876543210").await;
    let err = env.kyc.finalize(&other, &submission()).await.unwrap_err();
    assert!(matches!(err, AppError::ConflictError(_)));
}

#[tokio::test]
async fn stored_checksum_is_the_signed_provisional_checksum() {
    let env = setup().await;
    let (_, kyc_id) = finalize_verified_user(&env, "l@example.com").await;
    let pdf = env.db.latest_kyc_pdf(&kyc_id).await.unwrap().unwrap();

    // 64 hex chars of sha256, and it is exactly the value the signature
    // covers (checked via lookup_signature equality elsewhere).
    assert_eq!(pdf.pdf_checksum.len(), 64);
    assert!(pdf.pdf_checksum.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(pdf.qr_payload_hash.len(), 64);
}
