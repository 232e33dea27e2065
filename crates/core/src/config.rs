use crate::alert::template::{DEFAULT_MESSAGE, DEFAULT_TITLE};
use crate::notify::error::NotifyError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// 飞书开放平台默认 API 地址
pub const DEFAULT_API_BASE: &str = "https://open.feishu.cn/open-apis";

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub receiver: ReceiverConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub images: ImageStoreConfig,
}

/// 接收器配置，`settings` 原样交给 `FeishuConfig` 校验
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    #[serde(default = "default_receiver_name")]
    pub name: String,
    #[serde(default)]
    pub disable_resolve_message: bool,
    // 告警系统外部访问地址，用于生成告警列表回链
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default = "empty_object")]
    pub settings: serde_json::Value,
    // 敏感字段的明文来源，覆盖 settings 中的同名字段
    #[serde(default)]
    pub secure_settings: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageStoreConfig {
    #[serde(default = "default_image_dir")]
    pub dir: String,
}

fn default_receiver_name() -> String {
    "feishu".to_string()
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_image_dir() -> String {
    "data/images".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            receiver: ReceiverConfig::default(),
            platform: PlatformConfig::default(),
            images: ImageStoreConfig::default(),
        }
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            name: default_receiver_name(),
            disable_resolve_message: false,
            external_url: None,
            settings: empty_object(),
            secure_settings: HashMap::new(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ImageStoreConfig {
    fn default() -> Self {
        Self {
            dir: default_image_dir(),
        }
    }
}

/// # Summary
/// 敏感字段解密接口。
///
/// # Invariants
/// - 找不到对应密文时必须原样返回 `fallback`。
pub trait Decrypter {
    fn decrypt(&self, key: &str, fallback: &str) -> String;
}

impl<F: Fn(&str, &str) -> String> Decrypter for F {
    fn decrypt(&self, key: &str, fallback: &str) -> String {
        self(key, fallback)
    }
}

/// # Summary
/// 基于键值映射的敏感配置，值为已解密的明文。
#[derive(Debug, Clone, Default)]
pub struct SecureSettings(pub HashMap<String, String>);

impl Decrypter for SecureSettings {
    fn decrypt(&self, key: &str, fallback: &str) -> String {
        // 环境变量来源的键会被转为小写
        let value = self.0.get(key).or_else(|| {
            self.0
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        });
        match value {
            Some(value) if !value.is_empty() => value.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// # Summary
/// 消息格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageFormat {
    // 富文本 post 消息
    Post,
    // 消息卡片，线上 msg_type 为 interactive
    Card,
}

impl MessageFormat {
    /// 解析 `msgType` 配置，空值与无法识别的取值均按 post 处理
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "" | "post" => MessageFormat::Post,
            "card" | "interactive" => MessageFormat::Card,
            other => {
                warn!("unsupported msgType {other}, falling back to post");
                MessageFormat::Post
            }
        }
    }

    /// 推送平台识别的 msg_type
    pub fn msg_type(&self) -> &'static str {
        match self {
            MessageFormat::Post => "post",
            MessageFormat::Card => "interactive",
        }
    }
}

// 原始设置，字段名兼容 camelCase / snake_case / 全小写
#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawFeishuSettings {
    url: String,
    #[serde(alias = "app_id", alias = "appid")]
    app_id: String,
    #[serde(alias = "app_secret", alias = "appsecret")]
    app_secret: String,
    #[serde(alias = "msg_type", alias = "msgtype")]
    msg_type: String,
    title: String,
    message: String,
    #[serde(
        alias = "mention_users",
        alias = "mentionusers",
        deserialize_with = "comma_separated"
    )]
    mention_users: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

// 接受 "a@x.com, b@x.com" 或 ["a@x.com", "b@x.com"]
fn comma_separated<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let items = match Option::<StringOrList>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(StringOrList::One(s)) => s.split(',').map(str::to_string).collect(),
        Some(StringOrList::Many(list)) => list,
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

/// # Summary
/// 经过校验的飞书接收器配置。
///
/// # Invariants
/// - `url`、`app_id`、`app_secret` 在解密后均非空。
/// - `title`、`message` 缺省时取默认模板。
#[derive(Clone, PartialEq, Eq)]
pub struct FeishuConfig {
    pub url: String,
    pub app_id: String,
    pub app_secret: String,
    pub format: MessageFormat,
    pub title: String,
    pub message: String,
    pub mention_users: Vec<String>,
}

impl std::fmt::Debug for FeishuConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeishuConfig")
            .field("url", &self.url)
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .field("format", &self.format)
            .field("title", &self.title)
            .field("message", &self.message)
            .field("mention_users", &self.mention_users)
            .finish()
    }
}

impl FeishuConfig {
    /// # Summary
    /// 从 JSON 字节加载配置。
    ///
    /// # Arguments
    /// * `raw` - 设置 JSON。
    /// * `decrypter` - 敏感字段解密器，`None` 表示明文直通。
    ///
    /// # Returns
    /// * 校验通过的配置或 `NotifyError::InvalidConfig`。
    pub fn from_json(raw: &[u8], decrypter: Option<&dyn Decrypter>) -> Result<Self, NotifyError> {
        let settings: RawFeishuSettings = serde_json::from_slice(raw)
            .map_err(|e| NotifyError::InvalidConfig(format!("failed to unmarshal settings: {e}")))?;
        Self::validate(settings, decrypter)
    }

    /// 从已解析的 JSON 值加载配置，语义同 `from_json`。
    pub fn from_value(
        value: serde_json::Value,
        decrypter: Option<&dyn Decrypter>,
    ) -> Result<Self, NotifyError> {
        let settings: RawFeishuSettings = serde_json::from_value(value)
            .map_err(|e| NotifyError::InvalidConfig(format!("failed to unmarshal settings: {e}")))?;
        Self::validate(settings, decrypter)
    }

    /// # Logic
    /// 1. 仅对 appId / appSecret 调用解密器。
    /// 2. 校验必填字段。
    /// 3. 为标题、正文、消息格式填充默认值。
    fn validate(
        settings: RawFeishuSettings,
        decrypter: Option<&dyn Decrypter>,
    ) -> Result<Self, NotifyError> {
        let (app_id, app_secret) = match decrypter {
            Some(d) => (
                d.decrypt("appId", &settings.app_id),
                d.decrypt("appSecret", &settings.app_secret),
            ),
            None => (settings.app_id, settings.app_secret),
        };

        if settings.url.is_empty() || app_id.is_empty() || app_secret.is_empty() {
            return Err(NotifyError::InvalidConfig(
                "could not find url, Bot AppID or AppSecret in settings".to_string(),
            ));
        }

        let title = if settings.title.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            settings.title
        };
        let message = if settings.message.is_empty() {
            DEFAULT_MESSAGE.to_string()
        } else {
            settings.message
        };

        Ok(Self {
            url: settings.url,
            app_id,
            app_secret,
            format: MessageFormat::parse(&settings.msg_type),
            title,
            message,
            mention_users: settings.mention_users,
        })
    }
}
