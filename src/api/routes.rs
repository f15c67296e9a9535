use crate::api::types::*;
use crate::database::sqlite::{SqliteDatabase, GLOBAL_DB};
use crate::errors::{AppError, Result};
use crate::models::loan::{LoanApplication, LoanDraft};
use crate::services::auth::{AuthService, TOKEN_TTL_SECS};
use crate::services::eligibility;
use crate::services::kyc::{FinalizeSubmission, KycService};
use crate::services::otp::OtpService;
use crate::utils::validation::Validator;
use axum::body::Body;
use axum::extract::{FromRequestParts, Path, Query};
use axum::http::{header::AUTHORIZATION, request::Parts, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

// Bearer token extractor for Authorization: Bearer ...
pub struct AuthBearer(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthBearer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        if let Some(auth) = parts.headers.get(AUTHORIZATION) {
            if let Ok(auth_str) = auth.to_str() {
                if let Some(token) = auth_str.strip_prefix("Bearer ") {
                    return Ok(AuthBearer(token.to_string()));
                }
            }
        }
        Err(AppError::AuthenticationError(
            "Missing or invalid Authorization header".to_string(),
        ))
    }
}

fn db() -> Arc<SqliteDatabase> {
    GLOBAL_DB.get().expect("database not initialized").clone()
}

fn auth_service() -> AuthService {
    AuthService::new(db())
}

fn kyc_service() -> KycService {
    KycService::from_env(db())
}

// ------------------------------------------------------------------- auth

pub fn auth_router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/banker/register", post(banker_register))
        .route("/banker/login", post(banker_login))
        .route("/banker/logout", post(logout))
}

#[utoipa::path(post, path = "/api/auth/register", request_body = RegisterRequest, responses((status = 201, body = RegisterResponse), (status = 400), (status = 409)))]
pub async fn register(
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let email = req.email.trim().to_lowercase();
    Validator::validate_email(&email)?;
    Validator::validate_password(&req.password)?;
    if let Some(phone) = &req.phone {
        Validator::validate_phone(phone)?;
    }

    let password_hash = crate::utils::crypto::PasswordManager::hash_password(&req.password)?;
    let user = crate::models::user::User {
        id: Uuid::new_v4(),
        email: email.clone(),
        password_hash,
        name: req.name,
        phone: req.phone,
        email_verified_at: None,
        created_at: Utc::now(),
    };
    db().create_user(&user).await?;

    info!(action = "register_success", user = %email);
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            message: "Registered successfully".to_string(),
        }),
    ))
}

#[utoipa::path(post, path = "/api/auth/login", request_body = LoginRequest, responses((status = 200, body = LoginResponse), (status = 401)))]
pub async fn login(Json(req): Json<LoginRequest>) -> Result<Json<LoginResponse>> {
    let token = auth_service().login_user(&req.email, &req.password).await?;
    info!(action = "login_success", user = %req.email);
    Ok(Json(LoginResponse {
        token,
        expires_in: TOKEN_TTL_SECS,
    }))
}

#[utoipa::path(post, path = "/api/auth/logout", responses((status = 200, body = MessageResponse), (status = 401)))]
pub async fn logout(AuthBearer(token): AuthBearer) -> Result<Json<MessageResponse>> {
    auth_service().logout(&token).await?;
    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

#[utoipa::path(post, path = "/api/auth/banker/register", request_body = RegisterRequest, responses((status = 201, body = RegisterResponse), (status = 400), (status = 409)))]
pub async fn banker_register(
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let email = req.email.trim().to_lowercase();
    Validator::validate_email(&email)?;
    Validator::validate_password(&req.password)?;

    let password_hash = crate::utils::crypto::PasswordManager::hash_password(&req.password)?;
    let banker = crate::models::user::BankerUser {
        id: Uuid::new_v4(),
        email: email.clone(),
        password_hash,
        role: "banker".to_string(),
        created_at: Utc::now(),
    };
    db().create_banker(&banker).await?;

    info!(action = "banker_register_success", user = %email);
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: banker.id,
            message: "Banker registered".to_string(),
        }),
    ))
}

#[utoipa::path(post, path = "/api/auth/banker/login", request_body = LoginRequest, responses((status = 200, body = BankerLoginResponse), (status = 401)))]
pub async fn banker_login(Json(req): Json<LoginRequest>) -> Result<Json<BankerLoginResponse>> {
    let (token, banker) = auth_service().login_banker(&req.email, &req.password).await?;
    info!(action = "banker_login_success", user = %req.email);
    Ok(Json(BankerLoginResponse {
        token,
        expires_in: TOKEN_TTL_SECS,
        role: banker.role,
    }))
}

// ------------------------------------------------------------------- loan

pub fn loan_router() -> Router {
    Router::new()
        .route("/save-draft", post(save_draft))
        .route("/my", get(my_loans))
}

fn validate_draft(draft: &LoanDraft) -> Result<()> {
    if draft.amount < 0.0 || draft.income < 0.0 || draft.existing_emi < 0.0 {
        return Err(AppError::ValidationError(
            "Amounts cannot be negative".to_string(),
        ));
    }
    if draft.term_months > 600 {
        return Err(AppError::ValidationError(
            "Term cannot exceed 600 months".to_string(),
        ));
    }
    if draft.age > 130 {
        return Err(AppError::ValidationError("Invalid age".to_string()));
    }
    if let Some(email) = &draft.email {
        if !email.trim().is_empty() {
            Validator::validate_email(email.trim())?;
        }
    }
    Ok(())
}

#[utoipa::path(post, path = "/api/loan/save-draft", request_body = SaveDraftRequest, responses((status = 200, body = SaveDraftResponse), (status = 400), (status = 404)))]
pub async fn save_draft(
    AuthBearer(token): AuthBearer,
    Json(req): Json<SaveDraftRequest>,
) -> Result<Json<SaveDraftResponse>> {
    let (principal, _user) = auth_service().require_user(&token).await?;
    validate_draft(&req.data)?;

    let decision = eligibility::evaluate(&req.data);
    let prediction = decision.prediction();

    let application = match req.id {
        Some(id) => {
            let existing = db()
                .get_loan_by_id(id)
                .await?
                .filter(|loan| loan.user_id == principal.subject_id)
                .ok_or_else(|| AppError::NotFoundError("Loan draft not found".to_string()))?;
            db().update_loan_draft(existing.id, &req.data, prediction).await?;
            db().get_loan_by_id(existing.id)
                .await?
                .ok_or_else(|| AppError::NotFoundError("Loan draft not found".to_string()))?
        }
        None => db().insert_loan_draft(&principal.subject_id, &req.data, prediction).await?,
    };

    info!(
        action = "loan_draft_saved",
        user_id = %principal.subject_id,
        loan_id = application.id,
        prediction = prediction,
    );
    Ok(Json(SaveDraftResponse {
        id: application.id,
        status: application.status,
        data: application.draft,
        prediction: application.prediction,
    }))
}

fn loan_summary(loan: &LoanApplication) -> LoanSummary {
    LoanSummary {
        id: loan.id,
        status: loan.status.clone(),
        created_at: loan.created_at.to_rfc3339(),
        amount: loan.draft.amount,
        term: loan.draft.term_months,
        purpose: loan.draft.purpose.clone(),
        prediction: loan.prediction.clone(),
    }
}

#[utoipa::path(get, path = "/api/loan/my", responses((status = 200, body = LoanListResponse), (status = 401)))]
pub async fn my_loans(AuthBearer(token): AuthBearer) -> Result<Json<LoanListResponse>> {
    let (principal, _user) = auth_service().require_user(&token).await?;
    let loans = db().get_user_loans(&principal.subject_id).await?;
    Ok(Json(LoanListResponse {
        items: loans.iter().map(loan_summary).collect(),
    }))
}

// -------------------------------------------------------------------- kyc

pub fn kyc_router() -> Router {
    Router::new()
        .route("/start", post(kyc_start))
        .route("/finalize", post(kyc_finalize))
        .route("/me", get(kyc_me))
        .route("/me/pdf", get(kyc_my_pdf))
        .route("/otp/send", post(otp_send))
        .route("/otp/verify", post(otp_verify))
}

#[utoipa::path(post, path = "/api/kyc/start", responses((status = 200, body = KycStartResponse), (status = 400), (status = 401)))]
pub async fn kyc_start(AuthBearer(token): AuthBearer) -> Result<Json<KycStartResponse>> {
    let (principal, _user) = auth_service().require_user(&token).await?;
    let (record, already_started) = kyc_service().start(&principal.subject_id).await?;
    Ok(Json(KycStartResponse {
        message: if already_started {
            "KYC already started".to_string()
        } else {
            "KYC started".to_string()
        },
        kyc_id: record.id,
        status: record.status.as_str().to_string(),
    }))
}

#[utoipa::path(post, path = "/api/kyc/finalize", request_body = FinalizeSubmission, responses((status = 200, body = KycFinalizeResponse), (status = 400), (status = 409)))]
pub async fn kyc_finalize(
    AuthBearer(token): AuthBearer,
    Json(req): Json<FinalizeSubmission>,
) -> Result<Json<KycFinalizeResponse>> {
    let (principal, _user) = auth_service().require_user(&token).await?;
    let outcome = kyc_service().finalize(&principal.subject_id, &req).await?;
    Ok(Json(KycFinalizeResponse {
        message: "KYC finalized".to_string(),
        kyc_id: outcome.kyc_id,
        pdf_url: outcome.pdf_url,
    }))
}

#[utoipa::path(get, path = "/api/kyc/me", responses((status = 200, body = KycMeResponse), (status = 401)))]
pub async fn kyc_me(AuthBearer(token): AuthBearer) -> Result<Json<KycMeResponse>> {
    let (principal, _user) = auth_service().require_user(&token).await?;
    let record = kyc_service().my_kyc(&principal.subject_id).await?;
    Ok(Json(match record {
        None => KycMeResponse {
            exists: false,
            kyc_id: None,
            status: None,
            verified_at: None,
        },
        Some(record) => KycMeResponse {
            exists: true,
            kyc_id: record.kyc_id,
            status: Some(record.status.as_str().to_string()),
            verified_at: record.verified_at.map(|t| t.to_rfc3339()),
        },
    }))
}

fn pdf_response(filename: &str, bytes: Vec<u8>) -> Result<Response> {
    Response::builder()
        .header("Content-Type", "application/pdf")
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::InternalError(format!("Failed to build PDF response: {}", e)))
}

#[utoipa::path(get, path = "/api/kyc/me/pdf", responses((status = 200, description = "Certificate bytes"), (status = 404)))]
pub async fn kyc_my_pdf(AuthBearer(token): AuthBearer) -> Result<Response> {
    let (principal, _user) = auth_service().require_user(&token).await?;
    let (filename, bytes) = kyc_service().my_pdf(&principal.subject_id).await?;
    pdf_response(&filename, bytes)
}

#[utoipa::path(post, path = "/api/kyc/otp/send", request_body = OtpSendRequest, responses((status = 200, body = OtpSendResponse), (status = 400), (status = 500)))]
pub async fn otp_send(
    AuthBearer(token): AuthBearer,
    Json(req): Json<OtpSendRequest>,
) -> Result<Json<OtpSendResponse>> {
    let (principal, _user) = auth_service().require_user(&token).await?;
    let issue = OtpService::new(db())
        .send_code(&principal.subject_id, req.channel, &req.value)
        .await?;
    Ok(Json(OtpSendResponse {
        message: format!("Code sent via {}", issue.channel.as_str()),
        expires_in_secs: issue.expires_in_secs,
        debug_code: issue.debug_code,
    }))
}

#[utoipa::path(post, path = "/api/kyc/otp/verify", request_body = OtpVerifyRequest, responses((status = 200, body = OtpVerifyResponse), (status = 400)))]
pub async fn otp_verify(
    AuthBearer(token): AuthBearer,
    Json(req): Json<OtpVerifyRequest>,
) -> Result<Json<OtpVerifyResponse>> {
    let (principal, _user) = auth_service().require_user(&token).await?;
    OtpService::new(db())
        .verify_code(&principal.subject_id, req.channel, &req.value, &req.code)
        .await?;
    Ok(Json(OtpVerifyResponse {
        success: true,
        message: format!("{} verified", req.channel.as_str()),
    }))
}

// ----------------------------------------------------------------- banker

pub fn banker_router() -> Router {
    Router::new()
        .route("/me", get(banker_me))
        .route("/kyc/qr-scan", post(banker_qr_scan))
        .route("/kyc/:kyc_id", get(banker_lookup))
        .route("/kyc/:kyc_id/pdf", get(banker_pdf))
        .route("/analytics/summary", get(analytics_summary))
        .route("/analytics/series", get(analytics_series))
        .route("/analytics/recent-kyc", get(recent_kyc))
        .route("/analytics/recent-loans", get(recent_loans))
        .route("/applications", get(applications_tracker))
}

#[utoipa::path(get, path = "/api/banker/me", responses((status = 200, body = BankerMeResponse), (status = 401)))]
pub async fn banker_me(AuthBearer(token): AuthBearer) -> Result<Json<BankerMeResponse>> {
    let principal = auth_service().require_banker(&token).await?;
    Ok(Json(BankerMeResponse {
        banker_id: principal.subject_id,
        banker_email: principal.email,
        banker_role: principal.role,
    }))
}

#[utoipa::path(get, path = "/api/banker/kyc/{kyc_id}", params(("kyc_id" = String, Path, description = "External KYC id or internal numeric id")), responses((status = 200, body = BankerLookupResponse), (status = 400), (status = 404)))]
pub async fn banker_lookup(
    AuthBearer(token): AuthBearer,
    Path(kyc_id): Path<String>,
) -> Result<Json<BankerLookupResponse>> {
    let principal = auth_service().require_banker(&token).await?;
    let service = kyc_service();

    let record = service.resolve_record(&kyc_id).await?;
    let pdf = service.latest_pdf_for(&record).await?;
    let (_payload, signature) = service.lookup_signature(&record, &pdf);

    let external_id = record.kyc_id.clone().unwrap_or_default();
    let _ = db()
        .insert_access_log(
            "banker",
            Some(&principal.subject_id.to_string()),
            "kyc",
            &external_id,
            "lookup",
            None,
        )
        .await;

    info!(action = "banker_lookup", banker_id = %principal.subject_id, kyc_id = %external_id);
    Ok(Json(BankerLookupResponse {
        kyc_id: external_id,
        name: record.name.clone(),
        dob: record.dob.clone(),
        status: record.status.as_str().to_string(),
        verified: record.status == crate::models::kyc::KycStatus::Verified,
        pdf_checksum: pdf.pdf_checksum,
        verification_signature: signature,
    }))
}

#[utoipa::path(get, path = "/api/banker/kyc/{kyc_id}/pdf", params(("kyc_id" = String, Path, description = "External KYC id")), responses((status = 200, description = "Certificate bytes"), (status = 404)))]
pub async fn banker_pdf(
    AuthBearer(token): AuthBearer,
    Path(kyc_id): Path<String>,
) -> Result<Response> {
    let principal = auth_service().require_banker(&token).await?;
    let service = kyc_service();

    let record = service.resolve_record(&kyc_id).await?;
    let pdf = service.latest_pdf_for(&record).await?;
    let bytes = std::fs::read(&pdf.pdf_url)
        .map_err(|e| AppError::NotFoundError(format!("KYC PDF unreadable: {}", e)))?;

    let _ = db()
        .insert_access_log(
            "banker",
            Some(&principal.subject_id.to_string()),
            "kyc_pdf",
            &pdf.kyc_id,
            "download",
            None,
        )
        .await;

    pdf_response(&format!("kyc_{}.pdf", pdf.kyc_id), bytes)
}

#[utoipa::path(post, path = "/api/banker/kyc/qr-scan", request_body = QrScanRequest, responses((status = 200, body = QrScanResponse), (status = 400), (status = 404)))]
pub async fn banker_qr_scan(
    AuthBearer(token): AuthBearer,
    Json(req): Json<QrScanRequest>,
) -> Result<Json<QrScanResponse>> {
    let principal = auth_service().require_banker(&token).await?;
    let outcome = kyc_service()
        .verify_scanned(&req.payload, &req.sig, req.expected_checksum.as_deref())
        .await?;

    let external_id = outcome.record.kyc_id.clone().unwrap_or_default();
    let _ = db()
        .insert_access_log(
            "banker",
            Some(&principal.subject_id.to_string()),
            "kyc",
            &external_id,
            "verify",
            None,
        )
        .await;

    if !outcome.checksum_ok {
        error!(action = "qr_scan_checksum_mismatch", kyc_id = %external_id);
    }
    Ok(Json(QrScanResponse {
        ok: true,
        checksum_ok: outcome.checksum_ok,
        kyc: QrScanKyc {
            kyc_id: external_id,
            name: outcome.record.name.clone(),
            status: outcome.record.status.as_str().to_string(),
        },
        pdf_checksum: outcome.stored_checksum,
    }))
}

#[utoipa::path(get, path = "/api/banker/analytics/summary", responses((status = 200, body = AnalyticsSummaryResponse), (status = 401)))]
pub async fn analytics_summary(
    AuthBearer(token): AuthBearer,
) -> Result<Json<AnalyticsSummaryResponse>> {
    auth_service().require_banker(&token).await?;
    let db = db();
    Ok(Json(AnalyticsSummaryResponse {
        total_kyc: db.count_kyc_total().await?,
        verified_kyc: db.count_kyc_verified().await?,
        total_loans: db.count_loans_total().await?,
        approved_loans: db.count_loans_approved().await?,
    }))
}

#[utoipa::path(get, path = "/api/banker/analytics/series", responses((status = 200, body = AnalyticsSeriesResponse), (status = 401)))]
pub async fn analytics_series(
    AuthBearer(token): AuthBearer,
) -> Result<Json<AnalyticsSeriesResponse>> {
    auth_service().require_banker(&token).await?;
    let db = db();

    let days = 14;
    let today = Utc::now().date_naive();
    let start = today - Duration::days(days - 1);
    let start_ts = Utc.from_utc_datetime(&start.and_time(NaiveTime::MIN));

    let mut kyc_counts: HashMap<NaiveDate, i64> = HashMap::new();
    for ts in db.kyc_created_since(start_ts).await? {
        *kyc_counts.entry(ts.date_naive()).or_insert(0) += 1;
    }
    let mut loan_counts: HashMap<NaiveDate, i64> = HashMap::new();
    for ts in db.loans_created_since(start_ts).await? {
        *loan_counts.entry(ts.date_naive()).or_insert(0) += 1;
    }

    let mut series = Vec::with_capacity(days as usize);
    let mut day = start;
    while day <= today {
        series.push(SeriesPoint {
            date: day.to_string(),
            kyc: kyc_counts.get(&day).copied().unwrap_or(0),
            loans: loan_counts.get(&day).copied().unwrap_or(0),
        });
        day += Duration::days(1);
    }

    Ok(Json(AnalyticsSeriesResponse { series }))
}

#[utoipa::path(get, path = "/api/banker/analytics/recent-kyc", responses((status = 200, body = RecentKycResponse), (status = 401)))]
pub async fn recent_kyc(AuthBearer(token): AuthBearer) -> Result<Json<RecentKycResponse>> {
    auth_service().require_banker(&token).await?;
    let rows = db().recent_kyc(10).await?;
    Ok(Json(RecentKycResponse {
        items: rows
            .into_iter()
            .map(|k| RecentKycItem {
                kyc_id: k.kyc_id,
                name: k.name,
                status: k.status.as_str().to_string(),
                created_at: k.created_at.to_rfc3339(),
            })
            .collect(),
    }))
}

#[utoipa::path(get, path = "/api/banker/analytics/recent-loans", responses((status = 200, body = RecentLoansResponse), (status = 401)))]
pub async fn recent_loans(AuthBearer(token): AuthBearer) -> Result<Json<RecentLoansResponse>> {
    auth_service().require_banker(&token).await?;
    let rows = db().recent_loans(10).await?;
    Ok(Json(RecentLoansResponse {
        items: rows
            .into_iter()
            .map(|a| RecentLoanItem {
                id: a.id,
                status: a.status,
                created_at: a.created_at.to_rfc3339(),
            })
            .collect(),
    }))
}

fn parse_filter_date(value: &str, end_of_day: bool) -> Option<chrono::DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if value.len() == 10 {
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
        let time = if end_of_day {
            date.and_hms_opt(23, 59, 59)?
        } else {
            date.and_hms_opt(0, 0, 0)?
        };
        return Some(Utc.from_utc_datetime(&time));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| Utc.from_utc_datetime(&dt))
}

#[utoipa::path(get, path = "/api/banker/applications", responses((status = 200, body = ApplicationsResponse), (status = 401)))]
pub async fn applications_tracker(
    AuthBearer(token): AuthBearer,
    Query(query): Query<ApplicationsQuery>,
) -> Result<Json<ApplicationsResponse>> {
    auth_service().require_banker(&token).await?;

    let status = query
        .status
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let from = query.from.as_deref().and_then(|v| parse_filter_date(v, false));
    let to = query.to.as_deref().and_then(|v| parse_filter_date(v, true));

    let rows = db().loans_filtered(status.as_deref(), from, to, 100).await?;
    Ok(Json(ApplicationsResponse {
        items: rows
            .into_iter()
            .map(|a| ApplicationItem {
                id: a.id,
                status: a.status,
                created_at: a.created_at.to_rfc3339(),
                amount: a.draft.amount,
                term: a.draft.term_months,
                email: a.draft.email,
                full_name: a.draft.full_name,
            })
            .collect(),
    }))
}

// ------------------------------------------------------------------- chat

#[utoipa::path(post, path = "/api/chat", request_body = ChatRequest, responses((status = 200, body = ChatResponse)))]
pub async fn chat(Json(req): Json<ChatRequest>) -> Json<ChatResponse> {
    let msg = req
        .message
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    let reply = |text: &str| {
        Json(ChatResponse {
            reply: text.to_string(),
        })
    };

    if msg.is_empty() {
        return reply("Hello! Ask me about loans, KYC, eligibility, documents, or interest rates.");
    }

    let any = |keys: &[&str]| keys.iter().any(|k| msg.contains(k));

    if any(&["hi", "hello", "hey", "namaste", "good morning", "good evening", "good afternoon"]) {
        return reply("Hello! I'm your DhanSetu assistant. I can help with interest rates, documents, KYC steps, eligibility and how to apply. How can I help?");
    }
    if any(&["rate", "interest", "apr"]) {
        return reply("Our example personal loan APR typically ranges from 12%-18% depending on profile. Use the eligibility tool on the Loan page for a quick check.");
    }
    if any(&["document", "docs", "kyc doc", "kyc documents"]) {
        return reply("Basic KYC requires a government ID (Aadhaar/PAN/Passport), address proof, and DOB. Submit via the KYC page; a PDF is generated with a secure checksum.");
    }
    if any(&["kyc", "verify", "verification"]) {
        return reply("Start KYC on the KYC page. After you finalize, a KYC ID is generated and sent to the banker dashboard for authentication.");
    }
    if any(&["eligibility", "eligible", "emi", "calculate"]) {
        return reply("Use the Loan page to estimate EMI and eligibility. Enter amount, term, and income; we compare your capacity vs required EMI.");
    }
    if any(&["apply", "loan", "how to"]) {
        return reply("Go to the Loan page to start an application. Save a draft, then complete KYC to proceed for banker review.");
    }

    reply("I can help with: interest rates, required documents, KYC steps, eligibility, and how to apply. How can I assist?")
}
