use chrono::{DateTime, Utc};
use serde::Serialize;

/// Audit trail row for reads and writes against KYC resources.
#[derive(Debug, Clone, Serialize)]
pub struct AccessLog {
    pub id: i64,
    pub actor: String,
    pub actor_id: Option<String>,
    pub resource_type: String,
    pub resource_id: String,
    pub action: String,
    pub ip: Option<String>,
    pub ts: DateTime<Utc>,
}
