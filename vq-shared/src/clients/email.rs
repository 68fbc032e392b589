use reqwest::Client;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email send failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email API error ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Thin client for a Resend-compatible transactional email API.
#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_url: String,
    api_key: String,
    from_email: String,
    from_name: String,
}

#[derive(Debug, Serialize)]
struct SendRequest {
    from: String,
    to: Vec<String>,
    subject: String,
    html: String,
}

impl EmailClient {
    pub fn new(api_url: &str, api_key: &str, from_email: &str, from_name: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
        }
    }

    pub async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError> {
        let request = SendRequest {
            from: format!("{} <{}>", self.from_name, self.from_email),
            to: vec![to.to_string()],
            subject: subject.to_string(),
            html: html.to_string(),
        };

        let response = self.client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected { status, body });
        }

        tracing::debug!(subject = %subject, "email sent");
        Ok(())
    }

    pub async fn send_password_reset_link(&self, to: &str, link: &str) -> Result<(), EmailError> {
        self.send_email(to, "Reset your password", &password_reset_body(link)).await
    }

    pub async fn send_verification_link(&self, to: &str, link: &str) -> Result<(), EmailError> {
        self.send_email(to, "Verify your email", &verification_body(link)).await
    }
}

fn password_reset_body(link: &str) -> String {
    format!(r#"Visit <a href="{link}">{link}</a> to change your password"#)
}

fn verification_body(link: &str) -> String {
    format!(r#"Click the link below to verify your email.<br><br><a href="{link}">{link}</a>"#)
}
