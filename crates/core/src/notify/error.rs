use thiserror::Error;

/// # Summary
/// 通知服务错误枚举。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - `UploadFailed`、`MentionResolutionFailed`、`TemplateRenderFailed` 为非致命错误，
///   只降级消息内容，以告警形式出现在 `Report::warnings` 中。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// 配置缺失或非法 (如缺少 AppID)
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// 单张图片上传失败
    #[error("Image upload failed for {path}: {reason}")]
    UploadFailed { path: String, reason: String },

    /// @ 用户解析失败
    #[error("Mention resolution failed: {0}")]
    MentionResolutionFailed(String),

    /// 模板渲染失败
    #[error("Template render failed: {0}")]
    TemplateRenderFailed(String),

    /// 消息体序列化失败
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    /// Webhook 投递失败
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// 图片存储读取失败
    #[error("Image store error: {0}")]
    ImageStore(String),

    /// 网络连接或传输错误
    #[error("Network error: {0}")]
    Network(String),

    /// 推送平台返回的错误 (如非零 code)
    #[error("Platform error: {0}")]
    Platform(String),
}

impl NotifyError {
    /// 是否为只降级内容、不阻断投递的错误
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            NotifyError::UploadFailed { .. }
                | NotifyError::MentionResolutionFailed(_)
                | NotifyError::TemplateRenderFailed(_)
        )
    }
}
