use crate::error::SyncError;
use serde::Serialize;

/// Longest message tail sent to the webhook, in characters.
pub const MAX_MESSAGE_CHARS: usize = 3500;

#[derive(Debug, Serialize)]
struct WebhookBody<'a> {
    text: &'a str,
}

/// Last `n` characters of `s`, on char boundaries.
pub fn tail_chars(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    match s.char_indices().nth(count - n) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

/// Slack text: bold title, then the message tail in a code block.
pub fn format_text(title: &str, message: &str) -> String {
    format!(
        "*{title}*\n```{}```",
        tail_chars(message, MAX_MESSAGE_CHARS)
    )
}

pub async fn post_message(
    http: &reqwest::Client,
    webhook_url: &str,
    title: &str,
    message: &str,
) -> Result<(), SyncError> {
    let text = format_text(title, message);
    let resp = http
        .post(webhook_url)
        .json(&WebhookBody { text: &text })
        .send()
        .await
        .map_err(|e| SyncError::DeliveryFailure(format!("webhook unreachable: {}", e.without_url())))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(SyncError::DeliveryFailure(format!(
            "webhook returned HTTP {}",
            status.as_u16()
        )));
    }
    Ok(())
}
