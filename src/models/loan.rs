use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Version of the typed draft record. Bump when fields are added or change
/// meaning so old rows remain interpretable.
pub const DRAFT_SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    Salaried,
    SelfEmployed,
    Student,
    Retired,
    Other,
}

impl EmploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentType::Salaried => "salaried",
            EmploymentType::SelfEmployed => "self_employed",
            EmploymentType::Student => "student",
            EmploymentType::Retired => "retired",
            EmploymentType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "salaried" => EmploymentType::Salaried,
            "self_employed" => EmploymentType::SelfEmployed,
            "student" => EmploymentType::Student,
            "retired" => EmploymentType::Retired,
            _ => EmploymentType::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResidenceType {
    Owned,
    Rented,
    Parental,
    Other,
}

impl ResidenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResidenceType::Owned => "owned",
            ResidenceType::Rented => "rented",
            ResidenceType::Parental => "parental",
            ResidenceType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "owned" => ResidenceType::Owned,
            "rented" => ResidenceType::Rented,
            "parental" => ResidenceType::Parental,
            _ => ResidenceType::Other,
        }
    }
}

/// Typed loan questionnaire record, validated at the API boundary.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDraft {
    pub amount: f64,
    pub term_months: u32,
    pub income: f64,
    #[serde(default)]
    pub existing_emi: f64,
    #[serde(default)]
    pub credit_score: u32,
    pub age: u32,
    pub employment_type: EmploymentType,
    pub residence_type: ResidenceType,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanApplication {
    pub id: i64,
    pub user_id: Uuid,
    pub draft: LoanDraft,
    pub schema_version: i64,
    pub status: String,
    pub prediction: Option<String>,
    pub created_at: DateTime<Utc>,
}
