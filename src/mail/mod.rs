use serde::Serialize;
use serde_json::{Value, json};

use crate::config::MailConfig;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("outbound mail is not configured")]
    Disabled,

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("mail API rejected the message ({status}): {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: Value,
}

/// A "contact us" message from a restaurant's dashboard.
#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub restaurant_name: String,
    pub from_name: String,
    pub from_email: String,
    pub message: String,
}

impl ContactMessage {
    pub fn template_params(&self) -> Value {
        json!({
            "from_name": self.from_name,
            "from_email": self.from_email,
            "message": self.message,
            "subject": format!("Message from {}", self.restaurant_name),
        })
    }
}

/// Client for the hosted transactional-email API.
#[derive(Debug, Clone)]
pub struct MailClient {
    http: reqwest::Client,
    config: Option<MailConfig>,
}

impl MailClient {
    pub fn new(config: Option<MailConfig>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    pub async fn send_contact(&self, message: &ContactMessage) -> Result<(), MailError> {
        let config = self.config.as_ref().ok_or(MailError::Disabled)?;
        self.send(config, &config.contact_template_id, message.template_params())
            .await?;
        tracing::info!(from = %message.from_email, "contact message sent");
        Ok(())
    }

    pub async fn send_password_reset(&self, to: &str, link: &str) -> Result<(), MailError> {
        let config = self.config.as_ref().ok_or(MailError::Disabled)?;
        let params = json!({
            "to_email": to,
            "reset_link": link,
        });
        self.send(config, &config.reset_template_id, params).await?;
        tracing::info!(to = to, "password reset link sent");
        Ok(())
    }

    async fn send(
        &self,
        config: &MailConfig,
        template_id: &str,
        template_params: Value,
    ) -> Result<(), MailError> {
        let request = SendRequest {
            service_id: &config.service_id,
            template_id,
            user_id: &config.user_id,
            template_params,
        };

        let response = self.http.post(&config.api_url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected { status, body });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_params_carry_restaurant_subject() {
        let message = ContactMessage {
            restaurant_name: "Chez Rust".into(),
            from_name: "Ana".into(),
            from_email: "ana@example.com".into(),
            message: "Hello".into(),
        };

        let params = message.template_params();
        assert_eq!(params["subject"], "Message from Chez Rust");
        assert_eq!(params["from_email"], "ana@example.com");
        assert_eq!(params["message"], "Hello");
    }

    #[tokio::test]
    async fn disabled_client_refuses_to_send() {
        let client = MailClient::new(None);
        assert!(!client.is_enabled());

        let err = client
            .send_password_reset("a@example.com", "http://localhost/reset")
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::Disabled));
    }
}
