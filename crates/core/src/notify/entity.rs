use crate::notify::error::NotifyError;

/// # Summary
/// 交给 Webhook 发送器的一次投递请求。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRequest {
    // 目标地址
    pub url: String,
    // HTTP 方法，例如 POST
    pub http_method: String,
    // Content-Type 头
    pub content_type: String,
    // 已序列化的消息体
    pub body: String,
}

impl WebhookRequest {
    /// 构造一个 `POST application/json` 请求
    pub fn post_json(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http_method: "POST".to_string(),
            content_type: "application/json".to_string(),
            body: body.into(),
        }
    }
}

/// # Summary
/// 带有非致命诊断信息的成功结果。
///
/// # Invariants
/// - `warnings` 中只出现 `NotifyError::is_soft` 为真的错误。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report<T> {
    pub value: T,
    pub warnings: Vec<NotifyError>,
}

impl<T> Report<T> {
    /// 结果是否未经任何降级
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
