use chrono::NaiveDate;

use super::super::domain::{User, WinnerPosition};
use super::super::repository::OutboundEmail;

const BRAND_COLOR: &str = "#083D77";

/// Build the congratulation mail for one winner: an HTML certificate plus a
/// plain-text alternative carrying the same facts.
pub fn compose_certificate(
    user: &User,
    event_title: &str,
    position: WinnerPosition,
    awarded_on: NaiveDate,
    organizer: &str,
) -> OutboundEmail {
    let awarded = awarded_on.format("%B %d, %Y").to_string();
    let name = escape_html(&user.name);
    let title = escape_html(event_title);
    let signer = escape_html(organizer);
    let color = position.color();
    let class = position.css_class();
    let rank = position.as_str();

    let html_body = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Achievement Certificate</title>
<style>
.first-place {{ color: #FFD700 !important; }}
.second-place {{ color: #C0C0C0 !important; }}
.third-place {{ color: #CD7F32 !important; }}
</style>
</head>
<body>
<div style="font-family: Arial, sans-serif;">
<p>Dear {name},</p>
<p>We are delighted to inform you that you have secured the <strong>{rank} place</strong> in <strong>{title}</strong>. Congratulations on your outstanding achievement!</p>
<div style="max-width: 650px; margin: 30px auto; border: 20px solid {BRAND_COLOR};">
<div style="background-color: {BRAND_COLOR}; color: white; padding: 10px; text-align: center;"><h2 style="margin: 0;">CERTIFICATE OF ACHIEVEMENT</h2></div>
<div style="background-color: #F5F5F5; padding: 20px; text-align: center;">
<div style="font-size: 18px; color: #555;">This certificate is proudly presented to</div>
<div style="font-size: 28px; font-weight: bold; margin: 20px 0;">{name}</div>
<div style="font-size: 18px;">For achieving <span class="{class}" style="font-weight: bold; color: {color};">{label}</span> {icon}</div>
<div style="font-size: 22px; font-weight: bold; margin-top: 10px;">{title}</div>
<div style="margin: 30px 0 10px;">Awarded on {awarded}</div>
<div style="margin: 40px auto 20px; border-top: 2px solid #ccc; width: 60%; padding-top: 10px;">{signer}</div>
</div>
</div>
<p>We appreciate your participation and hope to see you at future events.</p>
<p>Best regards,<br>{signer}</p>
</div>
</body>
</html>
"#,
        label = position.label(),
        icon = position.icon(),
    );

    let text_body = format!(
        "Dear {user_name},\n\n\
         CERTIFICATE OF ACHIEVEMENT\n\n\
         This certificate is proudly presented to\n{user_name}\n\n\
         For achieving {label} in {event_title}\n\n\
         Awarded on {awarded}\n\n\
         We appreciate your participation and hope to see you at future events.\n\n\
         Best regards,\n{organizer}\n",
        user_name = user.name,
        label = position.label(),
    );

    OutboundEmail {
        to_email: user.email.clone(),
        to_name: user.name.clone(),
        subject: format!("Congratulations - {event_title} {}", position.icon()),
        html_body,
        text_body,
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
