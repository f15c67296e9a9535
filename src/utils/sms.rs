use crate::errors::{AppError, Result};
use reqwest::Client;
use serde_json::json;
use std::env;

/// Infobip SMS config pulled from the environment; `None` when the deployment
/// has no SMS provider wired up.
pub struct SmsConfig {
    pub api_key: String,
    pub base_url: String,
    pub sender: String,
}

impl SmsConfig {
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("INFOBIP_API_KEY").ok()?;
        let base_url = env::var("INFOBIP_BASE_URL").ok()?;
        let sender = env::var("INFOBIP_SENDER").ok()?;
        Some(Self {
            api_key,
            base_url,
            sender,
        })
    }
}

pub async fn send_sms_infobip(config: &SmsConfig, to: &str, message: &str) -> Result<()> {
    let url = format!("https://{}/sms/2/text/advanced", config.base_url);

    let payload = json!({
        "messages": [{
            "from": config.sender,
            "destinations": [{ "to": to }],
            "text": message
        }]
    });

    let client = Client::new();
    let res = client
        .post(&url)
        .header("Authorization", format!("App {}", config.api_key))
        .header("Content-Type", "application/json")
        .json(&payload)
        .send()
        .await
        .map_err(|e| AppError::TransportError(format!("SMS request failed: {}", e)))?;

    if res.status().is_success() {
        Ok(())
    } else {
        let body = res.text().await.unwrap_or_default();
        Err(AppError::TransportError(format!(
            "Failed to send SMS: {}",
            body
        )))
    }
}
