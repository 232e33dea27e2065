use anyhow::Context;
use config::{Config, Environment, File};
use std::path::Path;
use suzu_core::alert::entity::Alert;
use suzu_core::config::AppConfig;

/// 环境变量前缀，层级以 `__` 分隔，如 `SUZU__PLATFORM__TIMEOUT_SECS`
const ENV_PREFIX: &str = "SUZU";

/// # Summary
/// 加载应用配置。
///
/// # Logic
/// 1. 读取可选的配置文件（TOML/JSON/YAML，按扩展名识别）。
/// 2. 叠加 `SUZU__` 前缀的环境变量。
/// 3. 反序列化为 `AppConfig`，缺省字段使用默认值。
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }
    let settings = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .context("failed to load configuration")?;
    settings
        .try_deserialize()
        .context("failed to parse configuration")
}

/// 读取一批告警（JSON 数组）
pub async fn load_alerts(path: &Path) -> anyhow::Result<Vec<Alert>> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read alerts from {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("malformed alerts in {}", path.display()))
}
