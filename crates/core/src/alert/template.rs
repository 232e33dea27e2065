use crate::alert::entity::{Alert, AlertStatus, BatchStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// 默认消息标题模板。
pub const DEFAULT_TITLE: &str = "[{{ status | upper }}{% if firing_count > 0 %}:{{ firing_count }}{% endif %}] {{ group_labels.alertname | default(\"\") }}";

/// 默认消息正文模板。
pub const DEFAULT_MESSAGE: &str = "{% for alert in alerts %}[{{ alert.status | upper }}] {{ alert.labels.alertname | default(\"\") }}
{% for key, value in alert.labels | dictsort %}- {{ key }} = {{ value }}
{% endfor %}{% if alert.annotations.summary %}Summary: {{ alert.annotations.summary }}
{% endif %}{% if alert.annotations.description %}Description: {{ alert.annotations.description }}
{% endif %}{% if alert.generator_url %}Source: {{ alert.generator_url }}
{% endif %}
{% endfor %}";

/// # Summary
/// 提供给模板引擎的渲染上下文。
///
/// # Invariants
/// - `group_labels` 为所有告警共有且取值相同的标签。
/// - `status` 只要存在一条触发中的告警即为 `firing`。
#[derive(Debug, Clone, Serialize)]
pub struct TemplateData {
    pub receiver: String,
    pub status: AlertStatus,
    pub alerts: Vec<AlertData>,
    pub firing_count: usize,
    pub resolved_count: usize,
    pub group_labels: BTreeMap<String, String>,
    pub common_annotations: BTreeMap<String, String>,
    pub external_url: String,
}

/// 模板中的单条告警视图。
#[derive(Debug, Clone, Serialize)]
pub struct AlertData {
    pub status: AlertStatus,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub generator_url: String,
    pub fingerprint: String,
}

impl TemplateData {
    /// # Summary
    /// 由告警批次构造渲染上下文。
    ///
    /// # Logic
    /// 1. 以 `now` 为基准计算每条告警与整批状态。
    /// 2. 求所有告警标签与注解的交集作为公共字段。
    ///
    /// # Arguments
    /// * `receiver` - 接收器名称。
    /// * `alerts` - 告警批次。
    /// * `external_url` - 告警系统外部访问地址，未配置时为空串。
    /// * `now` - 状态判定时刻。
    pub fn new(receiver: &str, alerts: &[Alert], external_url: &str, now: DateTime<Utc>) -> Self {
        let views: Vec<AlertData> = alerts
            .iter()
            .map(|alert| AlertData {
                status: alert.status_at(now),
                labels: alert.labels.clone(),
                annotations: alert.annotations.clone(),
                starts_at: alert.starts_at,
                ends_at: alert.ends_at,
                generator_url: alert.generator_url.clone(),
                fingerprint: alert.fingerprint.clone(),
            })
            .collect();
        let firing_count = views
            .iter()
            .filter(|v| v.status == AlertStatus::Firing)
            .count();

        Self {
            receiver: receiver.to_string(),
            status: BatchStatus::of(alerts, now).as_alert_status(),
            resolved_count: views.len() - firing_count,
            firing_count,
            group_labels: common_pairs(alerts.iter().map(|a| &a.labels)),
            common_annotations: common_pairs(alerts.iter().map(|a| &a.annotations)),
            alerts: views,
            external_url: external_url.to_string(),
        }
    }
}

// 求多个映射中键值完全一致的交集
fn common_pairs<'a>(
    mut maps: impl Iterator<Item = &'a BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    let Some(first) = maps.next() else {
        return BTreeMap::new();
    };
    let mut common = first.clone();
    for map in maps {
        common.retain(|k, v| map.get(k) == Some(v));
    }
    common
}
