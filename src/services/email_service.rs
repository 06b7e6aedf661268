use reqwest::Client;
use serde::Serialize;

use crate::{
    config::Config,
    error::{AppError, Result},
};

#[derive(Debug, Clone)]
pub struct EmailService {
    client: Client,
    api_key: String,
    from_email: String,
    from_name: String,
}

#[derive(Debug, Serialize)]
struct SendGridEmail {
    personalizations: Vec<Personalization>,
    from: EmailAddress,
    subject: String,
    content: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Personalization {
    to: Vec<EmailAddress>,
}

#[derive(Debug, Serialize)]
struct EmailAddress {
    email: String,
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: String,
    value: String,
}

impl EmailService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.sendgrid_api_key.clone().unwrap_or_default(),
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        }
    }

    pub async fn send_email(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<()> {
        tracing::info!("Sending email to {}", to_email);

        let email = SendGridEmail {
            personalizations: vec![Personalization {
                to: vec![EmailAddress {
                    email: to_email.to_string(),
                    name: to_name.map(|s| s.to_string()),
                }],
            }],
            from: EmailAddress {
                email: self.from_email.clone(),
                name: Some(self.from_name.clone()),
            },
            subject: subject.to_string(),
            content: vec![
                Content {
                    content_type: "text/plain".to_string(),
                    value: text_content.to_string(),
                },
                Content {
                    content_type: "text/html".to_string(),
                    value: html_content.to_string(),
                },
            ],
        };

        let response = self
            .client
            .post("https://api.sendgrid.com/v3/mail/send")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&email)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("SendGrid API error: {}", error_text);
            return Err(AppError::Internal(format!(
                "SendGrid API error: {}",
                error_text
            )));
        }

        tracing::info!("Email sent successfully to {}", to_email);

        Ok(())
    }

    pub async fn send_verification_email(
        &self,
        to_email: &str,
        username: &str,
        verification_token: &str,
        base_url: &str,
    ) -> Result<()> {
        let verify_url = format!("{}/verify-email?token={}", base_url, verification_token);

        let subject = "Verify your UBlog email";
        let text = format!(
            "Hi {},\n\n\
             Please verify your email address by clicking the link below:\n\
             {}\n\n\
             This link expires in 15 minutes.",
            username, verify_url
        );
        let html = build_html_email(
            "Verify your email",
            &format!(
                "Hi <b>{}</b>, confirm your email to activate your account. \
                 This link expires in <b>15 minutes</b>.",
                username
            ),
            "Verify email",
            &verify_url,
        );

        self.send_email(to_email, Some(username), subject, &html, &text)
            .await
    }

    pub async fn send_password_reset_email(
        &self,
        to_email: &str,
        username: &str,
        reset_token: &str,
        base_url: &str,
    ) -> Result<()> {
        let reset_url = format!("{}/reset-password?token={}", base_url, reset_token);

        let subject = "Reset your UBlog password";
        let text = format!(
            "Hi {},\n\n\
             Click the link below to reset your password:\n\
             {}\n\n\
             This link expires in 15 minutes.",
            username, reset_url
        );
        let html = build_html_email(
            "Reset your password",
            &format!(
                "Hi <b>{}</b>, click the button below to set a new password. \
                 The link expires in <b>15 minutes</b>.",
                username
            ),
            "Change password",
            &reset_url,
        );

        self.send_email(to_email, Some(username), subject, &html, &text)
            .await
    }
}

// Single-card HTML layout, inline styles only for email client support
fn build_html_email(title: &str, intro: &str, button_text: &str, button_url: &str) -> String {
    let primary = "#00c5ff";
    let bg = "#f8f9fa";
    let text = "#111827";
    let card = "#ffffff";
    let border = "#e0e0e0";

    format!(
        r#"<!doctype html>
<html>
  <body style="margin:0;padding:0;background:{bg};font-family:Inter,Segoe UI,Roboto,Arial,sans-serif;color:{text};">
    <table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="padding:24px 0;">
      <tr>
        <td align="center">
          <table role="presentation" width="560" cellpadding="0" cellspacing="0"
                 style="background:{card};border:1px solid {border};border-radius:12px;padding:24px">
            <tr><td align="center" style="font-weight:800;font-size:22px;letter-spacing:.02em;padding-bottom:8px">UBlog</td></tr>
            <tr><td style="font-size:18px;font-weight:700;padding-bottom:8px">{title}</td></tr>
            <tr><td style="font-size:15px;line-height:1.6;padding-bottom:18px">{intro}</td></tr>
            <tr>
              <td align="center" style="padding-bottom:18px">
                <a href="{button_url}"
                   style="display:inline-block;background:{primary};color:#ffffff;text-decoration:none;
                          padding:10px 16px;border-radius:8px;font-weight:700;">{button_text}</a>
              </td>
            </tr>
            <tr><td style="font-size:12px;color:#475569">If the button doesn't work, copy and paste this link:<br>
              <span style="word-break:break-all">{button_url}</span></td></tr>
          </table>
        </td>
      </tr>
    </table>
  </body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_email_contains_button_and_fallback_link() {
        let html = build_html_email(
            "Verify your email",
            "Hi <b>alice</b>, confirm your email.",
            "Verify email",
            "https://ublog.app/verify-email?token=abc123",
        );

        assert!(html.contains("Verify your email"));
        assert!(html.contains(">Verify email</a>"));
        // Once in the button, once in the copy-paste fallback
        assert_eq!(
            html.matches("https://ublog.app/verify-email?token=abc123").count(),
            2
        );
    }

    #[test]
    fn html_email_carries_the_brand_header() {
        let html = build_html_email("Title", "Intro", "Go", "https://example.com");
        assert!(html.contains("UBlog"));
        assert!(html.contains("#00c5ff"));
    }
}
