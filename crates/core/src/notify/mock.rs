//! 测试替身：供下游 crate 的集成测试注入。

use crate::alert::entity::Image;
use crate::notify::entity::WebhookRequest;
use crate::notify::error::NotifyError;
use crate::notify::port::{ImageStore, WebhookSender};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// # Summary
/// 记录所有投递请求的 Webhook 发送器，可配置为始终失败。
#[derive(Default)]
pub struct RecordingWebhookSender {
    requests: Mutex<Vec<WebhookRequest>>,
    failure: Option<NotifyError>,
}

impl RecordingWebhookSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次投递都返回给定错误
    pub fn failing(error: NotifyError) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            failure: Some(error),
        }
    }

    /// 已收到的请求快照
    pub async fn requests(&self) -> Vec<WebhookRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl WebhookSender for RecordingWebhookSender {
    async fn send_webhook(&self, request: &WebhookRequest) -> Result<(), NotifyError> {
        self.requests.lock().await.push(request.clone());
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

/// # Summary
/// 基于固定映射的图片存储。
#[derive(Default)]
pub struct StaticImageStore {
    images: HashMap<String, Image>,
}

impl StaticImageStore {
    pub fn new(images: impl IntoIterator<Item = Image>) -> Self {
        Self {
            images: images
                .into_iter()
                .map(|image| (image.token.clone(), image))
                .collect(),
        }
    }
}

#[async_trait]
impl ImageStore for StaticImageStore {
    async fn get_image(&self, token: &str) -> Result<Option<Image>, NotifyError> {
        Ok(self.images.get(token).cloned())
    }
}
