mod settings;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use suzu_cache::mem::MemCache;
use suzu_core::alert::entity::{AlertStatus, BatchStatus};
use suzu_core::common::time::{RealTimeProvider, TimeProvider};
use suzu_core::config::{FeishuConfig, SecureSettings};
use suzu_core::notify::port::Notifier;
use suzu_notify::client::FeishuClient;
use suzu_notify::feishu::{Collaborators, FeishuNotifier, Receiver};
use suzu_notify::http::build_client;
use suzu_notify::image::LocalImageStore;
use suzu_notify::template::JinjaRenderer;
use suzu_notify::token::TenantTokenCache;
use suzu_notify::webhook::HttpWebhookSender;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Send a batch of alerts to a Feishu bot
#[derive(Debug, Parser)]
#[command(name = "suzu")]
#[command(version)]
struct Args {
    /// Configuration file path (TOML, JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON file holding the alert batch
    #[arg(short, long)]
    alerts: PathBuf,
}

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到 FeishuNotifier。
///
/// # Logic
/// 1. 初始化全局日志。
/// 2. 加载配置并校验飞书设置。
/// 3. 实例化基础设施层（HTTP 客户端、缓存、图片存储）。
/// 4. 构造 FeishuNotifier 并发送告警批次。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 1. 初始化日志，guard 需存活至进程退出以保证刷盘
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();
    info!("Suzu starting...");

    // 2. 加载配置
    let app_config = settings::load_config(args.config.as_deref())?;
    let secure = SecureSettings(app_config.receiver.secure_settings);
    let feishu = FeishuConfig::from_value(app_config.receiver.settings, Some(&secure))
        .context("invalid feishu settings")?;

    // 3. 实例化基础设施层
    let http = build_client(Duration::from_secs(app_config.platform.timeout_secs))?;
    let cache = Arc::new(MemCache::new());
    let platform = Arc::new(FeishuClient::new(
        &app_config.platform.api_base,
        &feishu.app_id,
        &feishu.app_secret,
        http.clone(),
        TenantTokenCache::new(cache),
    ));
    let clock: Arc<dyn TimeProvider> = Arc::new(RealTimeProvider);

    // 4. 构造通知器（注入 Core Trait 抽象）
    let notifier = FeishuNotifier::new(
        Receiver {
            name: app_config.receiver.name,
            disable_resolve_message: app_config.receiver.disable_resolve_message,
            external_url: app_config.receiver.external_url,
            config: feishu,
        },
        Collaborators {
            sender: Arc::new(HttpWebhookSender::new(http)),
            renderer: Arc::new(JinjaRenderer::new()),
            images: Arc::new(LocalImageStore::new(app_config.images.dir)),
            uploader: platform.clone(),
            directory: platform,
            clock: clock.clone(),
        },
    );

    let alerts = settings::load_alerts(&args.alerts).await?;
    let status = BatchStatus::of(&alerts, clock.now()).as_alert_status();
    if status == AlertStatus::Resolved && !notifier.send_resolved() {
        info!(receiver = notifier.name(), "resolve messages disabled, skipping batch");
        return Ok(());
    }

    // 5. 发送告警批次
    match notifier.notify(&alerts).await {
        Ok(report) => {
            for warning in &report.warnings {
                warn!(receiver = notifier.name(), "{warning}");
            }
            info!(
                receiver = notifier.name(),
                alerts = alerts.len(),
                warnings = report.warnings.len(),
                "notification delivered"
            );
            Ok(())
        }
        Err(e) => {
            error!(receiver = notifier.name(), "notification failed: {e}");
            Err(e.into())
        }
    }
}
