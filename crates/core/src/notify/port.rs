use crate::alert::entity::{Alert, Image};
use crate::alert::template::TemplateData;
use crate::notify::entity::{Report, WebhookRequest};
use crate::notify::error::NotifyError;
use async_trait::async_trait;
use std::path::Path;

/// # Summary
/// 发送告警通知到外部系统的接口定义。
///
/// # Invariants
/// - 实现必须是 `Send` 和 `Sync` 以支持并发调用。
/// - 每次调用互相独立，不保留跨调用状态 (令牌缓存除外)。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 接收器名称，用于日志。
    fn name(&self) -> &str;

    /// 是否在告警恢复时发送通知。
    fn send_resolved(&self) -> bool;

    /// # Summary
    /// 发送一批告警。
    ///
    /// # Logic
    /// 1. 渲染标题与正文。
    /// 2. 根据目标平台要求构造消息体。
    /// 3. 通过 Webhook 发送器投递。
    ///
    /// # Returns
    /// * 成功返回带降级诊断的 `Report`。
    /// * 致命错误 (序列化、投递) 返回 `Err(NotifyError)`。
    async fn notify(&self, alerts: &[Alert]) -> Result<Report<()>, NotifyError>;
}

/// # Summary
/// 通用 Webhook 发送器。
#[async_trait]
pub trait WebhookSender: Send + Sync {
    /// 按请求中的方法与 Content-Type 投递消息体，非成功响应视为失败。
    async fn send_webhook(&self, request: &WebhookRequest) -> Result<(), NotifyError>;
}

/// # Summary
/// 告警模板引擎。
///
/// # Invariants
/// - 渲染失败不应中断通知，调用方记录告警后继续使用返回的文本。
pub trait TemplateRenderer: Send + Sync {
    /// 使用渲染上下文展开模板文本。
    fn render(&self, template: &str, data: &TemplateData) -> Result<String, NotifyError>;
}

/// # Summary
/// 告警截图存储。
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// # Summary
    /// 按令牌获取图片。
    ///
    /// # Returns
    /// * 找到返回 `Some(Image)`，不存在返回 `None`。
    async fn get_image(&self, token: &str) -> Result<Option<Image>, NotifyError>;
}

/// # Summary
/// 将本地图片上传到推送平台，换取可嵌入消息的图片句柄。
#[async_trait]
pub trait ImageUploader: Send + Sync {
    /// 上传失败一律返回 `NotifyError::UploadFailed`。
    async fn upload_image(&self, path: &Path) -> Result<String, NotifyError>;
}

/// # Summary
/// 推送平台上的一条用户查询结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    // 查询使用的邮箱
    pub email: String,
    // 平台用户 ID，未找到时为空
    pub user_id: Option<String>,
}

/// # Summary
/// 推送平台用户目录，批量将邮箱解析为用户 ID。
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// # Summary
    /// 一次请求解析全部邮箱。
    ///
    /// # Returns
    /// * 返回平台给出的记录，顺序不保证与输入一致。
    async fn lookup_user_ids(&self, emails: &[String]) -> Result<Vec<UserRecord>, NotifyError>;
}
