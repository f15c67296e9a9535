use crate::errors::{AppError, Result};
use crate::models::kyc::{KycPdf, KycRecord, KycStatus, OtpChallenge, OtpChannel};
use crate::models::loan::{
    EmploymentType, LoanApplication, LoanDraft, ResidenceType, DRAFT_SCHEMA_VERSION,
};
use crate::models::user::{BankerUser, User};
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

pub static GLOBAL_DB: OnceCell<Arc<SqliteDatabase>> = OnceCell::new();

#[derive(Debug)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

/// Finalize-time identity fields, applied only while the record is pending.
pub struct KycFinalizeUpdate<'a> {
    pub kyc_id: &'a str,
    pub name: &'a str,
    pub dob: &'a str,
    pub gov_id_type: &'a str,
    pub gov_id_last4: &'a str,
    pub address: &'a str,
    pub verified_at: DateTime<Utc>,
}

pub struct KycPdfInsert<'a> {
    pub kyc_id: &'a str,
    pub pdf_url: &'a str,
    pub pdf_checksum: &'a str,
    pub qr_payload_hash: &'a str,
    pub signed_at: DateTime<Utc>,
}

impl SqliteDatabase {
    pub async fn new(database_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(database_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::DatabaseError(format!("Failed to create database directory: {}", e))
            })?;
        }

        if !Path::new(database_path).exists() {
            std::fs::File::create(database_path).map_err(|e| {
                AppError::DatabaseError(format!("Failed to create database file: {}", e))
            })?;
        }
        let database_url = format!("sqlite:{}", database_path);

        let pool = SqlitePool::connect(&database_url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to database: {}", e)))?;

        let db = Self { pool };
        db.create_tables().await?;

        tracing::info!(action = "database_connected", path = %database_path);
        Ok(db)
    }

    /// Single-connection in-memory database for tests.
    pub async fn new_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to open in-memory db: {}", e)))?;
        let db = Self { pool };
        db.create_tables().await?;
        Ok(db)
    }

    async fn create_tables(&self) -> Result<()> {
        let query = r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                name TEXT,
                phone TEXT,
                email_verified_at TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS banker_users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'banker',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS user_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                token_id TEXT UNIQUE NOT NULL,
                token_hash TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                is_active BOOLEAN DEFAULT TRUE
            );

            CREATE TABLE IF NOT EXISTS loan_applications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                amount REAL NOT NULL,
                term_months INTEGER NOT NULL,
                income REAL NOT NULL,
                existing_emi REAL NOT NULL DEFAULT 0,
                credit_score INTEGER NOT NULL DEFAULT 0,
                age INTEGER NOT NULL,
                employment_type TEXT NOT NULL,
                residence_type TEXT NOT NULL,
                purpose TEXT,
                full_name TEXT,
                email TEXT,
                schema_version INTEGER NOT NULL DEFAULT 1,
                status TEXT NOT NULL DEFAULT 'draft',
                prediction TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS kyc_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT UNIQUE NOT NULL,
                kyc_id TEXT UNIQUE,
                status TEXT NOT NULL DEFAULT 'pending',
                name TEXT,
                dob TEXT,
                gov_id_type TEXT,
                gov_id_last4 TEXT,
                address TEXT,
                selfie_ref TEXT,
                created_at TEXT NOT NULL,
                verified_at TEXT,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS kyc_pdfs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kyc_id TEXT NOT NULL,
                pdf_url TEXT NOT NULL,
                pdf_checksum TEXT NOT NULL,
                qr_payload_hash TEXT NOT NULL,
                signed_at TEXT NOT NULL,
                FOREIGN KEY (kyc_id) REFERENCES kyc_records (kyc_id)
            );

            CREATE TABLE IF NOT EXISTS otp_challenges (
                user_id TEXT NOT NULL,
                channel TEXT NOT NULL,
                code TEXT NOT NULL,
                bound_value TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                verified_at TEXT,
                created_at TEXT NOT NULL,
                PRIMARY KEY (user_id, channel)
            );

            CREATE TABLE IF NOT EXISTS access_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                actor TEXT NOT NULL,
                actor_id TEXT,
                resource_type TEXT NOT NULL,
                resource_id TEXT NOT NULL,
                action TEXT NOT NULL,
                ip TEXT,
                ts TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
            CREATE INDEX IF NOT EXISTS idx_bankers_email ON banker_users(email);
            CREATE INDEX IF NOT EXISTS idx_tokens_token_id ON user_tokens(token_id);
            CREATE INDEX IF NOT EXISTS idx_tokens_active ON user_tokens(is_active);
            CREATE INDEX IF NOT EXISTS idx_loans_user_id ON loan_applications(user_id);
            CREATE INDEX IF NOT EXISTS idx_loans_status ON loan_applications(status);
            CREATE INDEX IF NOT EXISTS idx_loans_created_at ON loan_applications(created_at);
            CREATE INDEX IF NOT EXISTS idx_kyc_user_id ON kyc_records(user_id);
            CREATE INDEX IF NOT EXISTS idx_kyc_kyc_id ON kyc_records(kyc_id);
            CREATE INDEX IF NOT EXISTS idx_kyc_pdfs_kyc_id ON kyc_pdfs(kyc_id);
            CREATE INDEX IF NOT EXISTS idx_access_logs_resource ON access_logs(resource_type, resource_id);
        "#;

        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create tables: {}", e)))?;

        Ok(())
    }

    fn parse_ts(value: &str, column: &str) -> Result<DateTime<Utc>> {
        chrono::DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AppError::DatabaseError(format!("Invalid {} date: {}", column, e)))
    }

    fn parse_opt_ts(value: Option<String>) -> Option<DateTime<Utc>> {
        value.and_then(|s| {
            chrono::DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        })
    }

    // ---------------------------------------------------------------- users

    pub async fn create_user(&self, user: &User) -> Result<()> {
        let query = r#"
            INSERT INTO users (id, email, password_hash, name, phone, email_verified_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#;

        sqlx::query(query)
            .bind(user.id.to_string())
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .bind(&user.phone)
            .bind(user.email_verified_at.map(|t| t.to_rfc3339()))
            .bind(user.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if e.to_string().contains("UNIQUE constraint failed") {
                    AppError::ConflictError("Email already registered".to_string())
                } else {
                    AppError::DatabaseError(format!("Failed to create user: {}", e))
                }
            })?;

        Ok(())
    }

    fn map_user_row(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
        Ok(User {
            id: Uuid::parse_str(&row.get::<String, _>("id"))
                .map_err(|e| AppError::DatabaseError(format!("Invalid user ID: {}", e)))?,
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            name: row.get("name"),
            phone: row.get("phone"),
            email_verified_at: Self::parse_opt_ts(row.get("email_verified_at")),
            created_at: Self::parse_ts(&row.get::<String, _>("created_at"), "created_at")?,
        })
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch user by email: {}", e)))?;

        row.as_ref().map(Self::map_user_row).transpose()
    }

    pub async fn get_user_by_id(&self, user_id: &Uuid) -> Result<User> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?1")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch user: {}", e)))?
            .ok_or_else(|| AppError::NotFoundError("User not found".to_string()))?;

        Self::map_user_row(&row)
    }

    // -------------------------------------------------------------- bankers

    pub async fn create_banker(&self, banker: &BankerUser) -> Result<()> {
        let query = r#"
            INSERT INTO banker_users (id, email, password_hash, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
        "#;

        sqlx::query(query)
            .bind(banker.id.to_string())
            .bind(&banker.email)
            .bind(&banker.password_hash)
            .bind(&banker.role)
            .bind(banker.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if e.to_string().contains("UNIQUE constraint failed") {
                    AppError::ConflictError("Email already registered".to_string())
                } else {
                    AppError::DatabaseError(format!("Failed to create banker: {}", e))
                }
            })?;

        Ok(())
    }

    fn map_banker_row(row: &sqlx::sqlite::SqliteRow) -> Result<BankerUser> {
        Ok(BankerUser {
            id: Uuid::parse_str(&row.get::<String, _>("id"))
                .map_err(|e| AppError::DatabaseError(format!("Invalid banker ID: {}", e)))?,
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            role: row.get("role"),
            created_at: Self::parse_ts(&row.get::<String, _>("created_at"), "created_at")?,
        })
    }

    pub async fn get_banker_by_email(&self, email: &str) -> Result<Option<BankerUser>> {
        let row = sqlx::query("SELECT * FROM banker_users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch banker: {}", e)))?;

        row.as_ref().map(Self::map_banker_row).transpose()
    }

    // --------------------------------------------------------------- tokens

    pub async fn store_user_token(
        &self,
        user_id: &Uuid,
        token_id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let query = r#"
            INSERT INTO user_tokens (user_id, token_id, token_hash, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
        "#;

        sqlx::query(query)
            .bind(user_id.to_string())
            .bind(token_id)
            .bind(token_hash)
            .bind(Utc::now().to_rfc3339())
            .bind(expires_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to store token: {}", e)))?;

        Ok(())
    }

    pub async fn is_token_valid(&self, token_id: &str) -> Result<bool> {
        let query = r#"
            SELECT COUNT(*) as count FROM user_tokens
            WHERE token_id = ?1 AND is_active = TRUE AND expires_at > ?2
        "#;

        let row = sqlx::query(query)
            .bind(token_id)
            .bind(Utc::now().to_rfc3339())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to validate token: {}", e)))?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    pub async fn revoke_token(&self, token_id: &str) -> Result<()> {
        sqlx::query("UPDATE user_tokens SET is_active = FALSE WHERE token_id = ?1")
            .bind(token_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to revoke token: {}", e)))?;
        Ok(())
    }

    pub async fn cleanup_expired_tokens(&self) -> Result<()> {
        sqlx::query("DELETE FROM user_tokens WHERE expires_at <= ?1")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to clean up tokens: {}", e)))?;
        Ok(())
    }

    // ---------------------------------------------------------------- loans

    fn map_loan_row(row: &sqlx::sqlite::SqliteRow) -> Result<LoanApplication> {
        Ok(LoanApplication {
            id: row.get("id"),
            user_id: Uuid::parse_str(&row.get::<String, _>("user_id"))
                .map_err(|e| AppError::DatabaseError(format!("Invalid user ID: {}", e)))?,
            draft: LoanDraft {
                amount: row.get("amount"),
                term_months: row.get::<i64, _>("term_months") as u32,
                income: row.get("income"),
                existing_emi: row.get("existing_emi"),
                credit_score: row.get::<i64, _>("credit_score") as u32,
                age: row.get::<i64, _>("age") as u32,
                employment_type: EmploymentType::parse(&row.get::<String, _>("employment_type")),
                residence_type: ResidenceType::parse(&row.get::<String, _>("residence_type")),
                purpose: row.get("purpose"),
                full_name: row.get("full_name"),
                email: row.get("email"),
            },
            schema_version: row.get("schema_version"),
            status: row.get("status"),
            prediction: row.get("prediction"),
            created_at: Self::parse_ts(&row.get::<String, _>("created_at"), "created_at")?,
        })
    }

    pub async fn insert_loan_draft(
        &self,
        user_id: &Uuid,
        draft: &LoanDraft,
        prediction: &str,
    ) -> Result<LoanApplication> {
        let query = r#"
            INSERT INTO loan_applications
                (user_id, amount, term_months, income, existing_emi, credit_score, age,
                 employment_type, residence_type, purpose, full_name, email,
                 schema_version, status, prediction, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 'draft', ?14, ?15)
            RETURNING *
        "#;

        let row = sqlx::query(query)
            .bind(user_id.to_string())
            .bind(draft.amount)
            .bind(draft.term_months as i64)
            .bind(draft.income)
            .bind(draft.existing_emi)
            .bind(draft.credit_score as i64)
            .bind(draft.age as i64)
            .bind(draft.employment_type.as_str())
            .bind(draft.residence_type.as_str())
            .bind(&draft.purpose)
            .bind(&draft.full_name)
            .bind(&draft.email)
            .bind(DRAFT_SCHEMA_VERSION)
            .bind(prediction)
            .bind(Utc::now().to_rfc3339())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to save loan draft: {}", e)))?;

        Self::map_loan_row(&row)
    }

    pub async fn update_loan_draft(
        &self,
        id: i64,
        draft: &LoanDraft,
        prediction: &str,
    ) -> Result<()> {
        let query = r#"
            UPDATE loan_applications SET
                amount = ?1, term_months = ?2, income = ?3, existing_emi = ?4,
                credit_score = ?5, age = ?6, employment_type = ?7, residence_type = ?8,
                purpose = ?9, full_name = ?10, email = ?11, schema_version = ?12,
                status = 'draft', prediction = ?13
            WHERE id = ?14
        "#;

        sqlx::query(query)
            .bind(draft.amount)
            .bind(draft.term_months as i64)
            .bind(draft.income)
            .bind(draft.existing_emi)
            .bind(draft.credit_score as i64)
            .bind(draft.age as i64)
            .bind(draft.employment_type.as_str())
            .bind(draft.residence_type.as_str())
            .bind(&draft.purpose)
            .bind(&draft.full_name)
            .bind(&draft.email)
            .bind(DRAFT_SCHEMA_VERSION)
            .bind(prediction)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to update loan draft: {}", e)))?;

        Ok(())
    }

    pub async fn get_loan_by_id(&self, id: i64) -> Result<Option<LoanApplication>> {
        let row = sqlx::query("SELECT * FROM loan_applications WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch loan: {}", e)))?;

        row.as_ref().map(Self::map_loan_row).transpose()
    }

    pub async fn get_user_loans(&self, user_id: &Uuid) -> Result<Vec<LoanApplication>> {
        let rows = sqlx::query(
            "SELECT * FROM loan_applications WHERE user_id = ?1 ORDER BY created_at DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch loans: {}", e)))?;

        rows.iter().map(Self::map_loan_row).collect()
    }

    pub async fn has_eligible_draft(&self, user_id: &Uuid) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM loan_applications WHERE user_id = ?1 AND prediction = 'eligible'",
        )
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to check eligibility: {}", e)))?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    // ------------------------------------------------------------------ kyc

    fn map_kyc_row(row: &sqlx::sqlite::SqliteRow) -> Result<KycRecord> {
        Ok(KycRecord {
            id: row.get("id"),
            user_id: Uuid::parse_str(&row.get::<String, _>("user_id"))
                .map_err(|e| AppError::DatabaseError(format!("Invalid user ID: {}", e)))?,
            kyc_id: row.get("kyc_id"),
            status: KycStatus::parse(&row.get::<String, _>("status")),
            name: row.get("name"),
            dob: row.get("dob"),
            gov_id_type: row.get("gov_id_type"),
            gov_id_last4: row.get("gov_id_last4"),
            address: row.get("address"),
            selfie_ref: row.get("selfie_ref"),
            created_at: Self::parse_ts(&row.get::<String, _>("created_at"), "created_at")?,
            verified_at: Self::parse_opt_ts(row.get("verified_at")),
        })
    }

    pub async fn create_kyc_record(&self, user_id: &Uuid) -> Result<KycRecord> {
        let query = r#"
            INSERT INTO kyc_records (user_id, status, created_at)
            VALUES (?1, 'pending', ?2)
            RETURNING *
        "#;

        let row = sqlx::query(query)
            .bind(user_id.to_string())
            .bind(Utc::now().to_rfc3339())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if e.to_string().contains("UNIQUE constraint failed") {
                    AppError::ConflictError("KYC already started".to_string())
                } else {
                    AppError::DatabaseError(format!("Failed to create KYC record: {}", e))
                }
            })?;

        Self::map_kyc_row(&row)
    }

    pub async fn get_kyc_by_user(&self, user_id: &Uuid) -> Result<Option<KycRecord>> {
        let row = sqlx::query("SELECT * FROM kyc_records WHERE user_id = ?1")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch KYC record: {}", e)))?;

        row.as_ref().map(Self::map_kyc_row).transpose()
    }

    pub async fn get_kyc_by_internal_id(&self, id: i64) -> Result<Option<KycRecord>> {
        let row = sqlx::query("SELECT * FROM kyc_records WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch KYC record: {}", e)))?;

        row.as_ref().map(Self::map_kyc_row).transpose()
    }

    pub async fn get_kyc_by_kyc_id(&self, kyc_id: &str) -> Result<Option<KycRecord>> {
        let row = sqlx::query("SELECT * FROM kyc_records WHERE kyc_id = ?1")
            .bind(kyc_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch KYC record: {}", e)))?;

        row.as_ref().map(Self::map_kyc_row).transpose()
    }

    /// Finalize in one transaction: a conditional pending -> verified update
    /// (losing a concurrent race surfaces as a conflict, never a second
    /// signed document), the append-only pdf row, and consumption of the
    /// one-time-code flags.
    pub async fn finalize_kyc(
        &self,
        user_id: &Uuid,
        update: &KycFinalizeUpdate<'_>,
        pdf: &KycPdfInsert<'_>,
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        let result = sqlx::query(
            r#"
            UPDATE kyc_records SET
                kyc_id = ?1, name = ?2, dob = ?3, gov_id_type = ?4, gov_id_last4 = ?5,
                address = ?6, status = 'verified', verified_at = ?7
            WHERE user_id = ?8 AND status = 'pending'
            "#,
        )
        .bind(update.kyc_id)
        .bind(update.name)
        .bind(update.dob)
        .bind(update.gov_id_type)
        .bind(update.gov_id_last4)
        .bind(update.address)
        .bind(update.verified_at.to_rfc3339())
        .bind(user_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                AppError::ConflictError("KYC identifier already registered".to_string())
            } else {
                AppError::DatabaseError(format!("Failed to finalize KYC record: {}", e))
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::ConflictError(
                "KYC record is not in a pending state".to_string(),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO kyc_pdfs (kyc_id, pdf_url, pdf_checksum, qr_payload_hash, signed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(pdf.kyc_id)
        .bind(pdf.pdf_url)
        .bind(pdf.pdf_checksum)
        .bind(pdf.qr_payload_hash)
        .bind(pdf.signed_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to store KYC PDF: {}", e)))?;

        sqlx::query("DELETE FROM otp_challenges WHERE user_id = ?1")
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to clear OTP state: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit finalize: {}", e)))?;

        Ok(())
    }

    fn map_pdf_row(row: &sqlx::sqlite::SqliteRow) -> Result<KycPdf> {
        Ok(KycPdf {
            id: row.get("id"),
            kyc_id: row.get("kyc_id"),
            pdf_url: row.get("pdf_url"),
            pdf_checksum: row.get("pdf_checksum"),
            qr_payload_hash: row.get("qr_payload_hash"),
            signed_at: Self::parse_ts(&row.get::<String, _>("signed_at"), "signed_at")?,
        })
    }

    pub async fn latest_kyc_pdf(&self, kyc_id: &str) -> Result<Option<KycPdf>> {
        let row = sqlx::query(
            "SELECT * FROM kyc_pdfs WHERE kyc_id = ?1 ORDER BY signed_at DESC, id DESC LIMIT 1",
        )
        .bind(kyc_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch KYC PDF: {}", e)))?;

        row.as_ref().map(Self::map_pdf_row).transpose()
    }

    // ------------------------------------------------------------------ otp

    pub async fn upsert_otp_challenge(&self, challenge: &OtpChallenge) -> Result<()> {
        let query = r#"
            INSERT INTO otp_challenges (user_id, channel, code, bound_value, expires_at, verified_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6)
            ON CONFLICT (user_id, channel) DO UPDATE SET
                code = excluded.code,
                bound_value = excluded.bound_value,
                expires_at = excluded.expires_at,
                verified_at = NULL,
                created_at = excluded.created_at
        "#;

        sqlx::query(query)
            .bind(challenge.user_id.to_string())
            .bind(challenge.channel.as_str())
            .bind(&challenge.code)
            .bind(&challenge.bound_value)
            .bind(challenge.expires_at.to_rfc3339())
            .bind(challenge.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to store OTP challenge: {}", e)))?;

        Ok(())
    }

    pub async fn get_otp_challenge(
        &self,
        user_id: &Uuid,
        channel: OtpChannel,
    ) -> Result<Option<OtpChallenge>> {
        let row = sqlx::query("SELECT * FROM otp_challenges WHERE user_id = ?1 AND channel = ?2")
            .bind(user_id.to_string())
            .bind(channel.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch OTP challenge: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(OtpChallenge {
            user_id: *user_id,
            channel,
            code: row.get("code"),
            bound_value: row.get("bound_value"),
            expires_at: Self::parse_ts(&row.get::<String, _>("expires_at"), "expires_at")?,
            verified_at: Self::parse_opt_ts(row.get("verified_at")),
            created_at: Self::parse_ts(&row.get::<String, _>("created_at"), "created_at")?,
        }))
    }

    pub async fn mark_otp_verified(&self, user_id: &Uuid, channel: OtpChannel) -> Result<()> {
        sqlx::query(
            "UPDATE otp_challenges SET verified_at = ?1 WHERE user_id = ?2 AND channel = ?3",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(user_id.to_string())
        .bind(channel.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to mark OTP verified: {}", e)))?;
        Ok(())
    }

    pub async fn is_otp_verified(&self, user_id: &Uuid, channel: OtpChannel) -> Result<bool> {
        let challenge = self.get_otp_challenge(user_id, channel).await?;
        Ok(challenge.map(|c| c.verified_at.is_some()).unwrap_or(false))
    }

    // ---------------------------------------------------------- access logs

    pub async fn insert_access_log(
        &self,
        actor: &str,
        actor_id: Option<&str>,
        resource_type: &str,
        resource_id: &str,
        action: &str,
        ip: Option<&str>,
    ) -> Result<()> {
        let query = r#"
            INSERT INTO access_logs (actor, actor_id, resource_type, resource_id, action, ip, ts)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#;

        sqlx::query(query)
            .bind(actor)
            .bind(actor_id)
            .bind(resource_type)
            .bind(resource_id)
            .bind(action)
            .bind(ip)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to write access log: {}", e)))?;

        Ok(())
    }

    // ------------------------------------------------------------ analytics

    async fn count_where(&self, query: &str) -> Result<i64> {
        let row = sqlx::query(query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to run count query: {}", e)))?;
        Ok(row.get("count"))
    }

    pub async fn count_kyc_total(&self) -> Result<i64> {
        self.count_where("SELECT COUNT(*) as count FROM kyc_records").await
    }

    pub async fn count_kyc_verified(&self) -> Result<i64> {
        self.count_where("SELECT COUNT(*) as count FROM kyc_records WHERE status = 'verified'")
            .await
    }

    pub async fn count_loans_total(&self) -> Result<i64> {
        self.count_where("SELECT COUNT(*) as count FROM loan_applications").await
    }

    pub async fn count_loans_approved(&self) -> Result<i64> {
        self.count_where("SELECT COUNT(*) as count FROM loan_applications WHERE status = 'approved'")
            .await
    }

    pub async fn kyc_created_since(&self, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>> {
        let rows = sqlx::query("SELECT created_at FROM kyc_records WHERE created_at >= ?1")
            .bind(since.to_rfc3339())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch KYC series: {}", e)))?;

        rows.iter()
            .map(|row| Self::parse_ts(&row.get::<String, _>("created_at"), "created_at"))
            .collect()
    }

    pub async fn loans_created_since(&self, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>> {
        let rows = sqlx::query("SELECT created_at FROM loan_applications WHERE created_at >= ?1")
            .bind(since.to_rfc3339())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch loan series: {}", e)))?;

        rows.iter()
            .map(|row| Self::parse_ts(&row.get::<String, _>("created_at"), "created_at"))
            .collect()
    }

    pub async fn recent_kyc(&self, limit: i64) -> Result<Vec<KycRecord>> {
        let rows = sqlx::query("SELECT * FROM kyc_records ORDER BY created_at DESC LIMIT ?1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch recent KYC: {}", e)))?;

        rows.iter().map(Self::map_kyc_row).collect()
    }

    pub async fn recent_loans(&self, limit: i64) -> Result<Vec<LoanApplication>> {
        let rows = sqlx::query("SELECT * FROM loan_applications ORDER BY created_at DESC LIMIT ?1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch recent loans: {}", e)))?;

        rows.iter().map(Self::map_loan_row).collect()
    }

    pub async fn loans_filtered(
        &self,
        status: Option<&str>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<LoanApplication>> {
        let mut sql = String::from("SELECT * FROM loan_applications WHERE 1 = 1");
        if status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if from.is_some() {
            sql.push_str(" AND created_at >= ?");
        }
        if to.is_some() {
            sql.push_str(" AND created_at <= ?");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ?");

        let mut query = sqlx::query(&sql);
        if let Some(status) = status {
            query = query.bind(status.to_string());
        }
        if let Some(from) = from {
            query = query.bind(from.to_rfc3339());
        }
        if let Some(to) = to {
            query = query.bind(to.to_rfc3339());
        }
        query = query.bind(limit);

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch applications: {}", e)))?;

        rows.iter().map(Self::map_loan_row).collect()
    }
}
