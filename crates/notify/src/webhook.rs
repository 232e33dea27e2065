use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use suzu_core::notify::entity::WebhookRequest;
use suzu_core::notify::error::NotifyError;
use suzu_core::notify::port::WebhookSender;

/// # Summary
/// Generic webhook sender over `reqwest`.
///
/// # Invariants
/// * A non-2xx response is a failure; its body is included in the error.
/// * A JSON reply with a non-zero `code` (or `StatusCode`) is a failure too.
pub struct HttpWebhookSender {
    client: Client,
}

impl HttpWebhookSender {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WebhookSender for HttpWebhookSender {
    /// # Summary
    /// Delivers one webhook request.
    ///
    /// # Returns
    /// * `Err(NotifyError::InvalidConfig)` for an unknown HTTP method.
    /// * `Err(NotifyError::DeliveryFailed)` on transport error or non-success status.
    async fn send_webhook(&self, request: &WebhookRequest) -> Result<(), NotifyError> {
        let method = reqwest::Method::from_bytes(request.http_method.as_bytes()).map_err(|e| {
            NotifyError::InvalidConfig(format!("invalid HTTP method {}: {}", request.http_method, e))
        })?;

        let response = self
            .client
            .request(method, &request.url)
            .header(CONTENT_TYPE, &request.content_type)
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(NotifyError::DeliveryFailed(format!(
                "webhook returned {}: {}",
                status, body
            )));
        }

        check_reply(&body)
    }
}

// 飞书机器人以 200 + 非零 code 拒收消息（关键词、签名、卡片格式等）
fn check_reply(body: &str) -> Result<(), NotifyError> {
    let Ok(reply) = serde_json::from_str::<serde_json::Value>(body) else {
        return Ok(());
    };
    let code = reply
        .get("code")
        .or_else(|| reply.get("StatusCode"))
        .and_then(|c| c.as_i64());
    match code {
        Some(code) if code != 0 => {
            let msg = reply
                .get("msg")
                .or_else(|| reply.get("StatusMessage"))
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            Err(NotifyError::DeliveryFailed(format!(
                "webhook error code {}: {}",
                code, msg
            )))
        }
        _ => Ok(()),
    }
}
