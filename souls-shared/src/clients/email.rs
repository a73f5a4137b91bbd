use reqwest::Client;
use serde::Serialize;

#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_key: String,
    from_email: String,
    from_name: String,
}

#[derive(Debug, Serialize)]
struct ResendRequest {
    from: String,
    to: Vec<String>,
    subject: String,
    html: String,
}

/// Everything we know about a failed profile-code attempt, for the
/// alert email sent to the account owner.
#[derive(Debug, Clone)]
pub struct IntruderReport {
    pub username: String,
    pub ip: String,
    pub country: String,
    pub region: String,
    pub city: String,
    pub org: String,
    pub user_agent: String,
    pub referer: String,
    pub language: String,
    pub page: String,
    pub attempt_time: String,
    pub entered_code: String,
}

impl EmailClient {
    pub fn new(api_key: &str, from_email: &str, from_name: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
        }
    }

    pub async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<(), String> {
        let request = ResendRequest {
            from: format!("{} <{}>", self.from_name, self.from_email),
            to: vec![to.to_string()],
            subject: subject.to_string(),
            html: html.to_string(),
        };

        let response = self.client
            .post("https://api.resend.com/emails")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("email send failed: {e}"))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("email API error: {body}"));
        }

        tracing::debug!(to = %to, subject = %subject, "email sent");
        Ok(())
    }

    /// Deliver a tunnel OTP to the invited party.
    pub async fn send_tunnel_otp(
        &self,
        to: &str,
        recipient_name: &str,
        initiator_name: &str,
        code: &str,
    ) -> Result<(), String> {
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <h2 style="color: #7c3aed;">SOULS - Private Tunnel Invitation</h2>
            <p>Hello {recipient_name},</p>
            <p><strong>{initiator_name}</strong> wants to open a private tunnel with you. Your access code is:</p>
            <div style="background: #1a1a2e; color: #7c3aed; font-size: 32px; font-weight: bold; text-align: center; padding: 20px; border-radius: 8px; letter-spacing: 8px;">{code}</div>
            <p style="color: #666; margin-top: 20px;">This code expires in 5 minutes.</p>
            </div>"#
        );

        self.send_email(to, "SOULS - Private Tunnel Access Code", &html).await
    }

    /// Alert the account owner that a wrong profile code was entered.
    pub async fn send_intruder_alert(&self, to: &str, report: &IntruderReport) -> Result<(), String> {
        let html = render_intruder_alert(report);
        self.send_email(to, "SOULS - Security Alert: Wrong Profile Code Attempt", &html).await
    }
}

pub fn render_intruder_alert(r: &IntruderReport) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
        <h2 style="color: #d32f2f;">Security Alert: Unauthorized Access Attempt</h2>
        <p>We detected an attempt to unlock your archived messages using an incorrect profile code.</p>
        <table style="width: 100%; border-collapse: collapse;">
          <tr><td style="padding: 8px; background: #f5f5f5; font-weight: bold;">Username</td><td style="padding: 8px;">{username}</td></tr>
          <tr><td style="padding: 8px; background: #f5f5f5; font-weight: bold;">IP Address</td><td style="padding: 8px;">{ip}</td></tr>
          <tr><td style="padding: 8px; background: #f5f5f5; font-weight: bold;">Location</td><td style="padding: 8px;">{city}, {region}, {country}</td></tr>
          <tr><td style="padding: 8px; background: #f5f5f5; font-weight: bold;">ISP / Org</td><td style="padding: 8px;">{org}</td></tr>
          <tr><td style="padding: 8px; background: #f5f5f5; font-weight: bold;">Browser / Device</td><td style="padding: 8px;">{user_agent}</td></tr>
          <tr><td style="padding: 8px; background: #f5f5f5; font-weight: bold;">Page</td><td style="padding: 8px;">{page}</td></tr>
          <tr><td style="padding: 8px; background: #f5f5f5; font-weight: bold;">Referer</td><td style="padding: 8px;">{referer}</td></tr>
          <tr><td style="padding: 8px; background: #f5f5f5; font-weight: bold;">Language</td><td style="padding: 8px;">{language}</td></tr>
          <tr><td style="padding: 8px; background: #f5f5f5; font-weight: bold;">Time</td><td style="padding: 8px;">{attempt_time}</td></tr>
          <tr><td style="padding: 8px; background: #f5f5f5; font-weight: bold;">Entered Code</td><td style="padding: 8px;">{entered_code}</td></tr>
        </table>
        <p style="color: #d32f2f; margin-top: 20px;">If this wasn't you, please change your password and review your account activity immediately.</p>
        <p style="color: #666; font-size: 0.9em;">This is an automated security alert. Please do not reply.</p>
        </div>"#,
        username = r.username,
        ip = r.ip,
        city = r.city,
        region = r.region,
        country = r.country,
        org = r.org,
        user_agent = r.user_agent,
        page = r.page,
        referer = r.referer,
        language = r.language,
        attempt_time = r.attempt_time,
        entered_code = r.entered_code,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> IntruderReport {
        IntruderReport {
            username: "amara".into(),
            ip: "203.0.113.9".into(),
            country: "RW".into(),
            region: "Kigali City".into(),
            city: "Kigali".into(),
            org: "AS12345 Example ISP".into(),
            user_agent: "Mozilla/5.0".into(),
            referer: "Unknown referer".into(),
            language: "en-US".into(),
            page: "/tunnels/abc/unlock".into(),
            attempt_time: "2025-01-01 12:00:00".into(),
            entered_code: "X9-AA-BB".into(),
        }
    }

    #[test]
    fn alert_carries_intruder_details() {
        let html = render_intruder_alert(&report());
        assert!(html.contains("203.0.113.9"));
        assert!(html.contains("Kigali, Kigali City, RW"));
        assert!(html.contains("X9-AA-BB"));
        assert!(html.contains("Mozilla/5.0"));
    }

    #[test]
    fn alert_is_html() {
        let html = render_intruder_alert(&report());
        assert!(html.starts_with("<div"));
        assert!(html.contains("Security Alert"));
    }
}
