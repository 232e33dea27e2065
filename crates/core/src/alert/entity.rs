use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// 携带截图令牌的注解键，值为图片存储中的 token。
pub const IMAGE_TOKEN_ANNOTATION: &str = "__alertImageToken__";

/// # Summary
/// 单条告警实体，字段与 Alertmanager 推送的 JSON 结构保持一致。
///
/// # Invariants
/// - `ends_at` 不晚于当前时间时视为已恢复。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    // 标签集合，例如 alertname、severity
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    // 注解集合，例如 summary、description
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    // 告警开始时间
    pub starts_at: DateTime<Utc>,
    // 告警结束时间，未结束时为空
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    // 告警规则的回链地址
    #[serde(default, rename = "generatorURL")]
    pub generator_url: String,
    // 告警指纹
    #[serde(default)]
    pub fingerprint: String,
}

impl Alert {
    /// # Summary
    /// 计算告警在给定时刻的状态。
    ///
    /// # Arguments
    /// * `now` - 判定时刻。
    ///
    /// # Returns
    /// * `ends_at <= now` 时返回 `Resolved`，否则返回 `Firing`。
    pub fn status_at(&self, now: DateTime<Utc>) -> AlertStatus {
        match self.ends_at {
            Some(ends_at) if ends_at <= now => AlertStatus::Resolved,
            _ => AlertStatus::Firing,
        }
    }

    /// 读取截图令牌注解，空值视为不存在。
    pub fn image_token(&self) -> Option<&str> {
        self.annotations
            .get(IMAGE_TOKEN_ANNOTATION)
            .map(String::as_str)
            .filter(|token| !token.is_empty())
    }
}

/// # Summary
/// 单条告警状态。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    // 触发中
    Firing,
    // 已恢复
    Resolved,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Firing => write!(f, "firing"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// # Summary
/// 一批告警的整体状态，用于决定卡片消息的配色与图标。
///
/// # Invariants
/// - 空批次视为 `Resolved`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchStatus {
    // 全部触发中
    Firing,
    // 全部已恢复
    Resolved,
    // 触发与恢复混合
    Mixed,
}

impl BatchStatus {
    /// # Summary
    /// 根据告警列表计算批次状态。
    ///
    /// # Logic
    /// 1. 统计触发中与已恢复的告警数量。
    /// 2. 两者均存在时为 `Mixed`，仅有触发时为 `Firing`，其余为 `Resolved`。
    pub fn of(alerts: &[Alert], now: DateTime<Utc>) -> Self {
        let firing = alerts
            .iter()
            .filter(|a| a.status_at(now) == AlertStatus::Firing)
            .count();
        match (firing, alerts.len() - firing) {
            (0, _) => BatchStatus::Resolved,
            (_, 0) => BatchStatus::Firing,
            _ => BatchStatus::Mixed,
        }
    }

    /// 批次在模板中呈现的状态：只要有一条触发中即为 firing。
    pub fn as_alert_status(&self) -> AlertStatus {
        match self {
            BatchStatus::Resolved => AlertStatus::Resolved,
            BatchStatus::Firing | BatchStatus::Mixed => AlertStatus::Firing,
        }
    }
}

/// # Summary
/// 图片存储中的告警截图。
///
/// # Invariants
/// - 只有存在本地路径 `path` 的图片才能上传到推送平台。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    // 图片存储令牌
    pub token: String,
    // 本地文件路径
    pub path: Option<PathBuf>,
    // 外部可访问地址
    pub url: Option<String>,
}
