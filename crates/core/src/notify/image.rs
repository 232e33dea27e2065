use crate::alert::entity::{Alert, Image};
use crate::notify::port::ImageStore;
use tracing::{debug, warn};

/// # Summary
/// 收集告警批次中附带的截图。
///
/// # Logic
/// 1. 按告警顺序读取截图令牌注解，没有令牌的告警跳过。
/// 2. 逐个查询图片存储，查询失败或不存在时记录日志并跳过。
///
/// # Arguments
/// * `store` - 图片存储。
/// * `alerts` - 告警批次。
///
/// # Returns
/// * `(告警下标, 图片)` 列表，保持告警顺序。
pub async fn stored_images(store: &dyn ImageStore, alerts: &[Alert]) -> Vec<(usize, Image)> {
    let mut images = Vec::new();
    for (index, alert) in alerts.iter().enumerate() {
        let Some(token) = alert.image_token() else {
            continue;
        };
        match store.get_image(token).await {
            Ok(Some(image)) => images.push((index, image)),
            Ok(None) => debug!("image not found for token {token}, alert index {index}"),
            Err(e) => warn!("failed to load image {token} for alert index {index}: {e}"),
        }
    }
    images
}
