use crate::mention::resolve_mentions;
use crate::payload::{MessageContent, Payload};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use std::path::Path;
use std::sync::Arc;
use suzu_core::alert::entity::{Alert, BatchStatus};
use suzu_core::alert::template::TemplateData;
use suzu_core::common::time::TimeProvider;
use suzu_core::config::FeishuConfig;
use suzu_core::notify::entity::{Report, WebhookRequest};
use suzu_core::notify::error::NotifyError;
use suzu_core::notify::image::stored_images;
use suzu_core::notify::port::{
    ImageStore, ImageUploader, Notifier, TemplateRenderer, UserDirectory, WebhookSender,
};
use tracing::{error, info, warn};

/// Path of the alert list, relative to the external URL.
const ALERT_LIST_PATH: &str = "/alerting/list";

/// # Summary
/// Receiver-level settings of one Feishu integration.
#[derive(Debug, Clone)]
pub struct Receiver {
    pub name: String,
    pub disable_resolve_message: bool,
    /// Public base URL of the alerting UI; enables the alert-list link.
    pub external_url: Option<String>,
    pub config: FeishuConfig,
}

/// # Summary
/// Injected collaborators of a `FeishuNotifier`.
pub struct Collaborators {
    pub sender: Arc<dyn WebhookSender>,
    pub renderer: Arc<dyn TemplateRenderer>,
    pub images: Arc<dyn ImageStore>,
    pub uploader: Arc<dyn ImageUploader>,
    pub directory: Arc<dyn UserDirectory>,
    pub clock: Arc<dyn TimeProvider>,
}

/// # Summary
/// A notifier that posts alert batches to a Feishu bot webhook.
///
/// # Invariants
/// - Stateless between calls; the only shared state lives behind the uploader's token cache.
/// - Image, mention and template failures degrade the message but never block delivery.
pub struct FeishuNotifier {
    name: String,
    disable_resolve_message: bool,
    config: FeishuConfig,
    external_url: String,
    alert_list_url: Option<String>,
    deps: Collaborators,
}

impl FeishuNotifier {
    /// # Summary
    /// Creates a new `FeishuNotifier`.
    ///
    /// # Logic
    /// Derives the alert-list link from the external URL; an unparsable URL is
    /// logged and the link is omitted.
    pub fn new(receiver: Receiver, deps: Collaborators) -> Self {
        let external_url = receiver.external_url.unwrap_or_default();
        let alert_list_url = join_url_path(&external_url, ALERT_LIST_PATH);
        Self {
            name: receiver.name,
            disable_resolve_message: receiver.disable_resolve_message,
            config: receiver.config,
            external_url,
            alert_list_url,
            deps,
        }
    }

    // 渲染失败时记录告警并使用空文本
    fn render(&self, template: &str, data: &TemplateData, warnings: &mut Vec<NotifyError>) -> String {
        match self.deps.renderer.render(template, data) {
            Ok(text) => text,
            Err(e) => {
                warn!(receiver = %self.name, "failed to template Feishu message: {e}");
                warnings.push(match e {
                    NotifyError::TemplateRenderFailed(_) => e,
                    other => NotifyError::TemplateRenderFailed(other.to_string()),
                });
                String::new()
            }
        }
    }

    /// # Summary
    /// Uploads every stored image of the batch, skipping failures.
    async fn upload_images(&self, alerts: &[Alert], warnings: &mut Vec<NotifyError>) -> Vec<String> {
        let mut image_keys = Vec::new();
        for (index, image) in stored_images(self.deps.images.as_ref(), alerts).await {
            let Some(path) = image.path.as_deref() else {
                warn!(receiver = %self.name, "image {} of alert {index} has no local path", image.token);
                warnings.push(NotifyError::UploadFailed {
                    path: image.token.clone(),
                    reason: "image has no local path".to_string(),
                });
                continue;
            };
            match self.deps.uploader.upload_image(path).await {
                Ok(key) => image_keys.push(key),
                Err(e) => {
                    error!(
                        receiver = %self.name,
                        path = %path.display(),
                        url = image.url.as_deref().unwrap_or_default(),
                        "failed to upload image: {e}"
                    );
                    warnings.push(as_upload_failure(e, path));
                }
            }
        }
        image_keys
    }

    /// Resolves the configured mentions; a failure drops them all.
    async fn mentions(&self, warnings: &mut Vec<NotifyError>) -> Vec<String> {
        match resolve_mentions(self.deps.directory.as_ref(), &self.config.mention_users).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(receiver = %self.name, "omitting mentions: {e}");
                warnings.push(e);
                Vec::new()
            }
        }
    }

    /// # Summary
    /// Assembles and serializes the message document.
    ///
    /// # Logic
    /// 1. Uploads stored images best-effort.
    /// 2. Resolves mentions best-effort.
    /// 3. Builds the payload for the configured format.
    ///
    /// # Returns
    /// * The JSON body with upload and mention warnings.
    /// * `Err(NotifyError::EncodingFailed)` if serialization fails.
    async fn build_body(
        &self,
        alerts: &[Alert],
        title: String,
        text: String,
        now: DateTime<Utc>,
    ) -> Result<Report<String>, NotifyError> {
        let mut warnings = Vec::new();
        let image_keys = self.upload_images(alerts, &mut warnings).await;
        let mentions = self.mentions(&mut warnings).await;

        let content = MessageContent {
            title,
            text,
            image_keys,
            link: self.alert_list_url.clone(),
            mentions,
            status: BatchStatus::of(alerts, now),
        };
        let body = Payload::build(self.config.format, &content).to_json()?;
        Ok(Report {
            value: body,
            warnings,
        })
    }
}

#[async_trait]
impl Notifier for FeishuNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn send_resolved(&self) -> bool {
        !self.disable_resolve_message
    }

    /// # Summary
    /// Sends one alert batch.
    ///
    /// # Logic
    /// 1. Renders title and message.
    /// 2. Builds the body (uploads, mentions, payload).
    /// 3. Posts the body to the configured webhook URL.
    ///
    /// # Returns
    /// * `Ok(Report)` carrying every non-fatal warning.
    /// * `Err(NotifyError::EncodingFailed)` or `Err(NotifyError::DeliveryFailed)` otherwise.
    async fn notify(&self, alerts: &[Alert]) -> Result<Report<()>, NotifyError> {
        info!(receiver = %self.name, alerts = alerts.len(), "sending feishu notification");

        let now = self.deps.clock.now();
        let data = TemplateData::new(&self.name, alerts, &self.external_url, now);
        let mut warnings = Vec::new();
        let message = self.render(&self.config.message, &data, &mut warnings);
        let title = self.render(&self.config.title, &data, &mut warnings);

        let body = match self.build_body(alerts, title, message, now).await {
            Ok(body) => body,
            Err(e) => {
                error!(receiver = %self.name, "failed to build feishu body: {e}");
                return Err(e);
            }
        };
        warnings.extend(body.warnings);

        let request = WebhookRequest::post_json(&self.config.url, body.value);
        if let Err(e) = self.deps.sender.send_webhook(&request).await {
            error!(receiver = %self.name, "failed to send feishu: {e}");
            return Err(match e {
                NotifyError::DeliveryFailed(_) => e,
                other => NotifyError::DeliveryFailed(other.to_string()),
            });
        }

        Ok(Report {
            value: (),
            warnings,
        })
    }
}

fn as_upload_failure(e: NotifyError, path: &Path) -> NotifyError {
    match e {
        NotifyError::UploadFailed { .. } => e,
        other => NotifyError::UploadFailed {
            path: path.display().to_string(),
            reason: other.to_string(),
        },
    }
}

// 拼接外部地址与路径，保留地址中已有的前缀路径
fn join_url_path(base: &str, path: &str) -> Option<String> {
    if base.is_empty() {
        return None;
    }
    let mut url = match Url::parse(base) {
        Ok(url) => url,
        Err(e) => {
            warn!("failed to parse external URL {base}: {e}");
            return None;
        }
    };
    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    Some(url.to_string())
}
