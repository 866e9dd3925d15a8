use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use relaycore::{EmailAdapter, EmailError, EmailReceipt, EmailRequest};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

const GMAIL_SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

/// Sends mail through the Gmail REST API with the user's stored OAuth
/// token. A 401 maps to `AuthExpired` so callers route the user through
/// re-authorization instead of retrying.
pub struct GmailAdapter {
    http: Client,
}

impl GmailAdapter {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }
}

impl Default for GmailAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

#[async_trait]
impl EmailAdapter for GmailAdapter {
    async fn send(&self, request: &EmailRequest) -> Result<EmailReceipt, EmailError> {
        let message = [
            format!("To: {}", request.to),
            format!("Subject: {}", request.subject),
            "Content-Type: text/html; charset=utf-8".to_string(),
            "MIME-Version: 1.0".to_string(),
            String::new(),
            request.body.clone(),
        ]
        .join("\n");

        let raw = URL_SAFE_NO_PAD.encode(message);

        let response = self
            .http
            .post(GMAIL_SEND_URL)
            .bearer_auth(&request.credential.access_token)
            .json(&json!({ "raw": raw }))
            .send()
            .await
            .map_err(|e| EmailError::Send(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(EmailError::AuthExpired),
            status if !status.is_success() => {
                let detail = response.text().await.unwrap_or_default();
                Err(EmailError::Send(format!("HTTP {}: {}", status, detail)))
            }
            _ => {
                let parsed: SendResponse = response
                    .json()
                    .await
                    .map_err(|e| EmailError::Send(e.to_string()))?;
                Ok(EmailReceipt {
                    message_id: parsed.id,
                })
            }
        }
    }
}
