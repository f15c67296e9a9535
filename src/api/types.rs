use crate::models::kyc::OtpChannel;
use crate::models::loan::LoanDraft;
use crate::services::identity::SignedPayload;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ------------------------------------------------------------------- auth

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BankerLoginResponse {
    pub token: String,
    pub expires_in: u64,
    pub role: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

// ------------------------------------------------------------------- loan

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveDraftRequest {
    #[serde(default)]
    pub id: Option<i64>,
    pub data: LoanDraft,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaveDraftResponse {
    pub id: i64,
    pub status: String,
    pub data: LoanDraft,
    pub prediction: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoanSummary {
    pub id: i64,
    pub status: String,
    pub created_at: String,
    pub amount: f64,
    pub term: u32,
    pub purpose: Option<String>,
    pub prediction: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoanListResponse {
    pub items: Vec<LoanSummary>,
}

// -------------------------------------------------------------------- kyc

#[derive(Debug, Serialize, ToSchema)]
pub struct KycStartResponse {
    pub message: String,
    pub kyc_id: i64,
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct KycFinalizeResponse {
    pub message: String,
    pub kyc_id: String,
    pub pdf_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct KycMeResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kyc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OtpSendRequest {
    pub channel: OtpChannel,
    pub value: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OtpSendResponse {
    pub message: String,
    pub expires_in_secs: i64,
    /// Present only when no delivery transport is configured; lets the
    /// verification flow complete during out-of-band testing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_code: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OtpVerifyRequest {
    pub channel: OtpChannel,
    pub value: String,
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OtpVerifyResponse {
    pub success: bool,
    pub message: String,
}

// ----------------------------------------------------------------- banker

#[derive(Debug, Serialize, ToSchema)]
pub struct BankerMeResponse {
    pub banker_id: Uuid,
    pub banker_email: String,
    pub banker_role: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BankerLookupResponse {
    pub kyc_id: String,
    pub name: Option<String>,
    pub dob: Option<String>,
    pub status: String,
    pub verified: bool,
    pub pdf_checksum: String,
    pub verification_signature: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct QrScanRequest {
    pub payload: SignedPayload,
    pub sig: String,
    #[serde(default)]
    pub expected_checksum: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QrScanKyc {
    pub kyc_id: String,
    pub name: Option<String>,
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QrScanResponse {
    pub ok: bool,
    pub checksum_ok: bool,
    pub kyc: QrScanKyc,
    pub pdf_checksum: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyticsSummaryResponse {
    pub total_kyc: i64,
    pub verified_kyc: i64,
    pub total_loans: i64,
    pub approved_loans: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeriesPoint {
    pub date: String,
    pub kyc: i64,
    pub loans: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyticsSeriesResponse {
    pub series: Vec<SeriesPoint>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecentKycItem {
    pub kyc_id: Option<String>,
    pub name: Option<String>,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecentKycResponse {
    pub items: Vec<RecentKycItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecentLoanItem {
    pub id: i64,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecentLoansResponse {
    pub items: Vec<RecentLoanItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApplicationItem {
    pub id: i64,
    pub status: String,
    pub created_at: String,
    pub amount: f64,
    pub term: u32,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApplicationsResponse {
    pub items: Vec<ApplicationItem>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplicationsQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

// ------------------------------------------------------------------- chat

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    pub reply: String,
}
