//! Notification and confirmation email bodies

use crate::leads::Lead;
use crate::validation::{format_phone, ProjectType};
use chrono::{DateTime, Utc};

/// Lead fields rendered into emails
#[derive(Debug, Clone, PartialEq)]
pub struct LeadEmailData {
    pub lead_id: Option<String>,
    pub name: String,
    pub practice_name: String,
    pub email: String,
    pub phone: String,
    pub website: Option<String>,
    pub project_type: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl From<&Lead> for LeadEmailData {
    fn from(lead: &Lead) -> Self {
        Self {
            lead_id: Some(lead.id.clone()),
            name: lead.name.clone(),
            practice_name: lead.practice_name.clone(),
            email: lead.email.clone(),
            phone: lead.phone.clone(),
            website: lead.website.clone(),
            project_type: lead.project_type.clone(),
            submitted_at: lead.created_at,
        }
    }
}

impl LeadEmailData {
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    fn project_label(&self) -> Option<String> {
        self.project_type.as_deref().map(|raw| {
            raw.parse::<ProjectType>()
                .map(|p| p.label().to_string())
                .unwrap_or_else(|_| raw.to_string())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Escape text for HTML element content and quoted attributes
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, header: &str, body: &str, footer: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, 'Segoe UI', Roboto, Arial, sans-serif; background-color: #f4f4f5;">
  <table role="presentation" style="width: 100%; border-collapse: collapse;">
    <tr><td style="padding: 40px 20px;">
      <table role="presentation" style="max-width: 600px; margin: 0 auto; background-color: #ffffff; border-radius: 12px; overflow: hidden;">
        <tr><td style="background: #0d3b66; padding: 32px 40px; text-align: center; color: #ffffff;">{header}</td></tr>
        <tr><td style="padding: 40px; color: #3f3f46; font-size: 16px; line-height: 1.6;">{body}</td></tr>
        <tr><td style="background-color: #f4f4f5; padding: 24px 40px; text-align: center; color: #71717a; font-size: 12px;">{footer}</td></tr>
      </table>
    </td></tr>
  </table>
</body>
</html>"#
    )
}

fn detail_row(label: &str, value_html: &str) -> String {
    format!(
        r#"<tr><td style="padding: 12px 0; border-bottom: 1px solid #e4e4e7;"><span style="color: #71717a; font-size: 12px; text-transform: uppercase;">{label}</span><p style="margin: 4px 0 0; color: #18181b;">{value_html}</p></td></tr>"#
    )
}

/// Internal notification sent to the agency inbox
pub fn client_notification(lead: &LeadEmailData) -> EmailContent {
    let submitted = lead
        .submitted_at
        .format("%A, %B %-d, %Y at %-I:%M %p UTC")
        .to_string();
    let phone = format_phone(&lead.phone);
    let project = lead
        .project_label()
        .unwrap_or_else(|| "Not specified".to_string());
    let email = escape_html(&lead.email);

    let website_html = match &lead.website {
        Some(site) => {
            let site = escape_html(site);
            format!(r#"<a href="{site}" style="color: #0891b2;">{site}</a>"#)
        }
        None => "Not provided".to_string(),
    };

    let rows = [
        detail_row("Contact Name", &escape_html(&lead.name)),
        detail_row(
            "Email",
            &format!(r#"<a href="mailto:{email}" style="color: #0891b2;">{email}</a>"#),
        ),
        detail_row(
            "Phone",
            &format!(
                r#"<a href="tel:{}" style="color: #0891b2;">{}</a>"#,
                escape_html(&lead.phone),
                escape_html(&phone)
            ),
        ),
        detail_row("Current Website", &website_html),
        detail_row("Project Type", &escape_html(&project)),
    ]
    .concat();

    let body = format!(
        r#"<h2 style="margin: 0 0 24px; color: #0d3b66;">{}</h2><table role="presentation" style="width: 100%; border-collapse: collapse;">{}</table>"#,
        escape_html(&lead.practice_name),
        rows
    );
    let lead_id_line = lead
        .lead_id
        .as_deref()
        .map(|id| format!("Lead ID: {}", id))
        .unwrap_or_default();

    let html = layout(
        "New Lead Notification",
        &format!(
            r#"<h1 style="margin: 0; font-size: 24px;">New Lead Received</h1><p style="margin: 8px 0 0;">{}</p>"#,
            escape_html(&submitted)
        ),
        &body,
        &format!(
            "<p style=\"margin: 0;\">{}</p><p style=\"margin: 8px 0 0;\">SERPreme SEO Lead Notification System</p>",
            escape_html(&lead_id_line)
        ),
    );

    let text = format!(
        "NEW LEAD RECEIVED\n{submitted}\n\nPractice: {}\nContact: {}\nEmail: {}\nPhone: {}\nWebsite: {}\nProject Type: {}\n{}\n\n---\nSERPreme SEO Lead Notification System",
        lead.practice_name,
        lead.name,
        lead.email,
        phone,
        lead.website.as_deref().unwrap_or("Not provided"),
        project,
        lead_id_line,
    );

    EmailContent {
        subject: format!("New Lead: {}", lead.practice_name),
        html,
        text,
    }
}

/// Confirmation sent to the person who submitted the form
pub fn lead_confirmation(lead: &LeadEmailData) -> EmailContent {
    let first_name = lead.first_name();
    let phone = format_phone(&lead.phone);
    let project = lead.project_label();

    let mut summary = format!(
        "<tr><td>Practice:</td><td>{}</td></tr><tr><td>Email:</td><td>{}</td></tr><tr><td>Phone:</td><td>{}</td></tr>",
        escape_html(&lead.practice_name),
        escape_html(&lead.email),
        escape_html(&phone),
    );
    if let Some(project) = &project {
        summary.push_str(&format!(
            "<tr><td>Interest:</td><td>{}</td></tr>",
            escape_html(project)
        ));
    }

    let body = format!(
        r#"<p>Hi {first},</p>
<p>Thank you for your interest in partnering with SERPreme SEO for your practice's web presence. We're excited to learn more about <strong>{practice}</strong> and how we can help you attract more patients with a beautiful, high-performing website.</p>
<h3 style="color: #0d3b66;">What happens next?</h3>
<ul>
  <li>Our team will review your inquiry within 1 business day</li>
  <li>We'll reach out to schedule a free consultation call</li>
  <li>We'll discuss your goals and create a customized proposal</li>
</ul>
<p>In the meantime, if you have any questions, feel free to reply to this email or give us a call.</p>
<h4 style="color: #0d3b66; text-transform: uppercase;">Your Submission Summary</h4>
<table role="presentation" style="width: 100%; font-size: 14px;">{summary}</table>
<p>Looking forward to speaking with you,<br><strong>The SERPreme SEO Team</strong></p>"#,
        first = escape_html(first_name),
        practice = escape_html(&lead.practice_name),
    );

    let html = layout(
        "Thank You for Your Inquiry",
        r#"<h1 style="margin: 0; font-size: 28px;">Thank You!</h1><p style="margin: 12px 0 0;">We've received your inquiry and will be in touch soon.</p>"#,
        &body,
        "<p style=\"margin: 0;\">SERPreme SEO</p><p style=\"margin: 8px 0 0;\">This email was sent because you submitted an inquiry on our website.</p>",
    );

    let interest_line = project
        .map(|p| format!("Interest: {}\n", p))
        .unwrap_or_default();
    let text = format!(
        "Hi {first_name},\n\nThank you for your interest in partnering with SERPreme SEO for your practice's web presence. We're excited to learn more about {practice} and how we can help you attract more patients with a beautiful, high-performing website.\n\nWHAT HAPPENS NEXT?\n- Our team will review your inquiry within 1 business day\n- We'll reach out to schedule a free consultation call\n- We'll discuss your goals and create a customized proposal\n\nIn the meantime, if you have any questions, feel free to reply to this email or give us a call.\n\nYOUR SUBMISSION SUMMARY\nPractice: {practice}\nEmail: {email}\nPhone: {phone}\n{interest_line}\nLooking forward to speaking with you,\nThe SERPreme SEO Team\n\n---\nSERPreme SEO\nThis email was sent because you submitted an inquiry on our website.",
        practice = lead.practice_name,
        email = lead.email,
    );

    EmailContent {
        subject: format!(
            "Thanks for reaching out, {}! We've received your inquiry",
            first_name
        ),
        html,
        text,
    }
}
