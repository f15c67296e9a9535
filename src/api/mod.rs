use crate::database::sqlite::{SqliteDatabase, GLOBAL_DB};
use crate::utils::middleware::{global_rate_limiter, request_id_middleware};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use hyper::Method;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{Modify, OpenApi};
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

pub mod routes;
pub mod types;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::register,
        routes::login,
        routes::logout,
        routes::banker_register,
        routes::banker_login,
        routes::save_draft,
        routes::my_loans,
        routes::kyc_start,
        routes::kyc_finalize,
        routes::kyc_me,
        routes::kyc_my_pdf,
        routes::otp_send,
        routes::otp_verify,
        routes::banker_me,
        routes::banker_lookup,
        routes::banker_pdf,
        routes::banker_qr_scan,
        routes::analytics_summary,
        routes::analytics_series,
        routes::recent_kyc,
        routes::recent_loans,
        routes::applications_tracker,
        routes::chat,
    ),
    components(
        schemas(
            types::RegisterRequest,
            types::RegisterResponse,
            types::LoginRequest,
            types::LoginResponse,
            types::BankerLoginResponse,
            types::MessageResponse,
            types::SaveDraftRequest,
            types::SaveDraftResponse,
            types::LoanSummary,
            types::LoanListResponse,
            types::KycStartResponse,
            types::KycFinalizeResponse,
            types::KycMeResponse,
            types::OtpSendRequest,
            types::OtpSendResponse,
            types::OtpVerifyRequest,
            types::OtpVerifyResponse,
            types::BankerMeResponse,
            types::BankerLookupResponse,
            types::QrScanRequest,
            types::QrScanKyc,
            types::QrScanResponse,
            types::AnalyticsSummaryResponse,
            types::SeriesPoint,
            types::AnalyticsSeriesResponse,
            types::RecentKycItem,
            types::RecentKycResponse,
            types::RecentLoanItem,
            types::RecentLoansResponse,
            types::ApplicationItem,
            types::ApplicationsResponse,
            types::ChatRequest,
            types::ChatResponse,
            crate::models::loan::LoanDraft,
            crate::models::loan::EmploymentType,
            crate::models::loan::ResidenceType,
            crate::models::kyc::OtpChannel,
            crate::services::identity::SignedPayload,
            crate::services::kyc::FinalizeSubmission,
        )
    ),
    tags(
        (name = "Auth", description = "User and banker authentication"),
        (name = "Loan", description = "Loan questionnaire drafts and eligibility"),
        (name = "KYC", description = "KYC workflow, OTP confirmation, certificates. Most endpoints require a Bearer token."),
        (name = "Banker", description = "Banker dashboard: lookups, QR verification, analytics"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
        openapi.security = Some(vec![utoipa::openapi::security::SecurityRequirement::new(
            "bearerAuth",
            Vec::<String>::new(),
        )]);
    }
}

/// Main entry point for the DhanSetu API server.
pub async fn start_http_server() {
    let openapi = ApiDoc::openapi();

    let database_path =
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| "dhansetu.db".to_string());
    let db = Arc::new(
        SqliteDatabase::new(&database_path)
            .await
            .expect("failed to open database"),
    );
    GLOBAL_DB.set(db).expect("database already initialized");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api/auth", routes::auth_router())
        .nest("/api/loan", routes::loan_router())
        .nest("/api/kyc", routes::kyc_router())
        .nest("/api/banker", routes::banker_router())
        .route("/api/chat", post(routes::chat))
        .route("/api", get(api_index))
        .route("/health", get(health_check))
        .route("/docs/openapi.json", get(openapi_json))
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", openapi.clone()))
        .merge(Redoc::with_url("/api/redoc", openapi))
        .layer(cors)
        .layer(axum::middleware::from_fn(global_rate_limiter))
        .layer(axum::middleware::from_fn(request_id_middleware));

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr: SocketAddr = format!("0.0.0.0:{}", port)
        .parse()
        .expect("invalid PORT value");

    tracing::info!(action = "http_server_started", addr = %addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr)
            .await
            .expect("failed to bind listener"),
        app,
    )
    .await
    .expect("server error");
}

async fn health_check() -> impl IntoResponse {
    "OK"
}

async fn api_index() -> Json<Value> {
    Json(serde_json::json!({
        "name": "dhansetu-backend",
        "status": "ok",
        "endpoints": [
            "/api/auth/register", "/api/auth/login", "/api/auth/logout",
            "/api/auth/banker/login", "/api/auth/banker/register",
            "/api/loan/save-draft", "/api/loan/my",
            "/api/kyc/start", "/api/kyc/finalize", "/api/kyc/me", "/api/kyc/me/pdf",
            "/api/kyc/otp/send", "/api/kyc/otp/verify",
            "/api/banker/kyc/<kyc_id>", "/api/banker/kyc/qr-scan",
            "/api/banker/analytics/summary", "/api/chat"
        ]
    }))
}

async fn openapi_json() -> Json<Value> {
    let openapi = ApiDoc::openapi();
    Json(serde_json::to_value(openapi).unwrap_or_default())
}
