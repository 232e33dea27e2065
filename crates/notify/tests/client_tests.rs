
use chrono::TimeDelta;
use mock_platform::{Fixture, alert, now};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use suzu_cache::mem::MemCache;
use suzu_core::common::time::FakeClockProvider;
use suzu_core::notify::error::NotifyError;
use suzu_core::notify::port::{ImageUploader, Notifier, UserDirectory};
use suzu_notify::client::FeishuClient;
use suzu_notify::feishu::{Collaborators, FeishuNotifier, Receiver};
use suzu_notify::http::build_client;
use suzu_notify::image::LocalImageStore;
use suzu_notify::mention::resolve_mentions;
use suzu_notify::template::JinjaRenderer;
use suzu_notify::token::TenantTokenCache;
use suzu_notify::webhook::HttpWebhookSender;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/auth/v3/tenant_access_token/internal/";

fn client(server: &MockServer, clock: Arc<FakeClockProvider>, app_id: &str) -> FeishuClient {
    let cache = Arc::new(MemCache::with_clock(clock));
    FeishuClient::new(
        &server.uri(),
        app_id,
        "secret",
        build_client(Duration::from_secs(5)).unwrap(),
        TenantTokenCache::new(cache),
    )
}

async fn mount_token(server: &MockServer, token: &str, expire: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "msg": "ok",
            "tenant_access_token": token,
            "expire": expire
        })))
        .mount(server)
        .await;
}

async fn token_calls(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == TOKEN_PATH)
        .count()
}

#[tokio::test]
async fn test_token_cached_until_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_json(json!({"app_id": "cli_test", "app_secret": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "msg": "ok",
            "tenant_access_token": "t-123",
            "expire": 7200
        })))
        .mount(&server)
        .await;

    let clock = Arc::new(FakeClockProvider::new(now()));
    let client = client(&server, clock.clone(), "cli_test");

    assert_eq!(client.tenant_access_token().await.unwrap(), "t-123");
    assert_eq!(client.tenant_access_token().await.unwrap(), "t-123");
    assert_eq!(token_calls(&server).await, 1);

    clock.advance(TimeDelta::seconds(7199));
    client.tenant_access_token().await.unwrap();
    assert_eq!(token_calls(&server).await, 1);

    clock.advance(TimeDelta::seconds(1));
    client.tenant_access_token().await.unwrap();
    assert_eq!(token_calls(&server).await, 2);
}

#[tokio::test]
async fn test_token_error_code_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 10003,
            "msg": "invalid param"
        })))
        .mount(&server)
        .await;

    let client = client(&server, Arc::new(FakeClockProvider::new(now())), "cli_test");
    let err = client.tenant_access_token().await.unwrap_err();
    assert!(matches!(err, NotifyError::Platform(_)));
    assert!(err.to_string().contains("10003"));

    client.tenant_access_token().await.unwrap_err();
    assert_eq!(token_calls(&server).await, 2);
}

#[tokio::test]
async fn test_tokens_keyed_by_app_id() {
    let server = MockServer::start().await;
    mount_token(&server, "t-shared", 7200).await;

    let clock = Arc::new(FakeClockProvider::new(now()));
    let cache = Arc::new(MemCache::with_clock(clock));
    let http = build_client(Duration::from_secs(5)).unwrap();
    let first = FeishuClient::new(
        &server.uri(),
        "cli_a",
        "secret",
        http.clone(),
        TenantTokenCache::new(cache.clone()),
    );
    let second = FeishuClient::new(
        &server.uri(),
        "cli_b",
        "secret",
        http,
        TenantTokenCache::new(cache),
    );

    first.tenant_access_token().await.unwrap();
    second.tenant_access_token().await.unwrap();
    first.tenant_access_token().await.unwrap();
    assert_eq!(token_calls(&server).await, 2);
}

#[tokio::test]
async fn test_upload_image() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_token(&server, "t-123", 7200).await;
    Mock::given(method("POST"))
        .and(path("/image/v4/put/"))
        .and(header("authorization", "Bearer t-123"))
        .and(body_string_contains("name=\"image_type\""))
        .and(body_string_contains("message"))
        .and(body_string_contains("name=\"image\"; filename=\"panel.png\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "msg": "success",
            "data": {"image_key": "img_v2_abc"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let file = dir.path().join("panel.png");
    tokio::fs::write(&file, b"fake png bytes").await?;

    let client = client(&server, Arc::new(FakeClockProvider::new(now())), "cli_test");
    assert_eq!(client.upload_image(&file).await?, "img_v2_abc");
    server.verify().await;
    Ok(())
}

#[tokio::test]
async fn test_upload_image_failures() {
    let server = MockServer::start().await;
    mount_token(&server, "t-123", 7200).await;
    Mock::given(method("POST"))
        .and(path("/image/v4/put/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("panel.png");
    tokio::fs::write(&file, b"png").await.unwrap();
    let client = client(&server, Arc::new(FakeClockProvider::new(now())), "cli_test");

    let err = client.upload_image(&file).await.unwrap_err();
    assert!(matches!(err, NotifyError::UploadFailed { .. }));
    assert!(err.to_string().contains("boom"));

    let err = client
        .upload_image(&dir.path().join("missing.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::UploadFailed { .. }));
}

#[tokio::test]
async fn test_lookup_aligns_reordered_response() {
    let server = MockServer::start().await;
    mount_token(&server, "t-123", 7200).await;
    Mock::given(method("POST"))
        .and(path("/contact/v3/users/batch_get_id"))
        .and(query_param("user_id_type", "open_id"))
        .and(header("authorization", "Bearer t-123"))
        .and(body_json(json!({"emails": ["bob@example.com", "alice@example.com"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "msg": "success",
            "data": {"user_list": [
                {"email": "alice@example.com", "user_id": "ou_alice"},
                {"email": "bob@example.com", "user_id": "ou_bob"}
            ]}
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server, Arc::new(FakeClockProvider::new(now())), "cli_test");
    let emails = vec!["bob@example.com".to_string(), "alice@example.com".to_string()];

    let records = client.lookup_user_ids(&emails).await.unwrap();
    assert_eq!(records[0].email, "alice@example.com");

    // 按邮箱对齐，而非响应顺序
    let ids = resolve_mentions(&client, &emails).await.unwrap();
    assert_eq!(ids, vec!["ou_bob", "ou_alice"]);
    server.verify().await;
}

#[tokio::test]
async fn test_lookup_unknown_user_fails_resolution() {
    let server = MockServer::start().await;
    mount_token(&server, "t-123", 7200).await;
    Mock::given(method("POST"))
        .and(path("/contact/v3/users/batch_get_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "msg": "success",
            "data": {"user_list": [{"email": "ghost@example.com"}]}
        })))
        .mount(&server)
        .await;

    let client = client(&server, Arc::new(FakeClockProvider::new(now())), "cli_test");
    let err = resolve_mentions(&client, &["ghost@example.com".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::MentionResolutionFailed(_)));
}

#[tokio::test]
async fn test_end_to_end_over_http() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_token(&server, "t-123", 7200).await;
    Mock::given(method("POST"))
        .and(path("/image/v4/put/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {"image_key": "img_v2_panel"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bot/v2/hook/abc"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    tokio::fs::write(dir.path().join("panel.png"), b"png").await?;

    let clock = Arc::new(FakeClockProvider::new(now()));
    let http = build_client(Duration::from_secs(5))?;
    let platform = Arc::new(client(&server, clock.clone(), "cli_test"));
    let mut config = mock_platform::config(json!({"title": "T", "message": "M"}));
    config.url = format!("{}/bot/v2/hook/abc", server.uri());

    let notifier = FeishuNotifier::new(
        Receiver {
            name: "feishu-e2e".to_string(),
            disable_resolve_message: false,
            external_url: Some("https://grafana.example.com/".to_string()),
            config,
        },
        Collaborators {
            sender: Arc::new(HttpWebhookSender::new(http)),
            renderer: Arc::new(JinjaRenderer::new()),
            images: Arc::new(LocalImageStore::new(dir.path())),
            uploader: platform.clone(),
            directory: platform,
            clock,
        },
    );

    let report = notifier
        .notify(&[alert("HighCPU", false, Some("panel.png"))])
        .await?;
    assert!(report.is_clean());
    server.verify().await;

    let requests = server.received_requests().await.unwrap_or_default();
    let hook = requests
        .iter()
        .find(|r| r.url.path() == "/bot/v2/hook/abc")
        .ok_or_else(|| anyhow::anyhow!("webhook not called"))?;
    let body: serde_json::Value = serde_json::from_slice(&hook.body)?;
    assert_eq!(
        body["content"]["post"]["zh_cn"]["content"],
        json!([
            [{"tag": "text", "text": "M"}],
            [{"tag": "img", "image_key": "img_v2_panel"}],
            [{"tag": "a", "text": "Alerting list", "href": "https://grafana.example.com/alerting/list"}]
        ])
    );
    Ok(())
}

#[tokio::test]
async fn test_webhook_error_status_fails_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot/v2/hook/abc"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .mount(&server)
        .await;

    let mut fixture = Fixture::new(json!({"title": "T", "message": "M"}));
    fixture.config.url = format!("{}/bot/v2/hook/abc", server.uri());
    let http = build_client(Duration::from_secs(5)).unwrap();
    let notifier = FeishuNotifier::new(
        Receiver {
            name: "feishu-http".to_string(),
            disable_resolve_message: false,
            external_url: None,
            config: fixture.config.clone(),
        },
        Collaborators {
            sender: Arc::new(HttpWebhookSender::new(http)),
            renderer: Arc::new(JinjaRenderer::new()),
            images: Arc::new(LocalImageStore::new("/nonexistent")),
            uploader: fixture.uploader.clone(),
            directory: fixture.directory.clone(),
            clock: Arc::new(FakeClockProvider::new(now())),
        },
    );

    let err = notifier
        .notify(&[alert("A", false, None)])
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::DeliveryFailed(_)));
    assert!(err.to_string().contains("bad request"));
}

#[tokio::test]
async fn test_token_with_zero_expire_is_not_cached() {
    let server = MockServer::start().await;
    mount_token(&server, "t-short", 0).await;

    let client = client(&server, Arc::new(FakeClockProvider::new(now())), "cli_test");
    assert_eq!(client.tenant_access_token().await.unwrap(), "t-short");
    assert_eq!(client.tenant_access_token().await.unwrap(), "t-short");
    assert_eq!(token_calls(&server).await, 2);
}

#[tokio::test]
async fn test_token_with_huge_expire_is_returned_uncached() {
    let server = MockServer::start().await;
    mount_token(&server, "t-forever", 10_000_000_000_000).await;

    let client = client(&server, Arc::new(FakeClockProvider::new(now())), "cli_test");
    assert_eq!(client.tenant_access_token().await.unwrap(), "t-forever");
    assert_eq!(client.tenant_access_token().await.unwrap(), "t-forever");
    assert_eq!(token_calls(&server).await, 2);
}

#[tokio::test]
async fn test_webhook_rejection_code_fails_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot/v2/hook/abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 19024, "msg": "Key Words Not Found"})),
        )
        .mount(&server)
        .await;

    let mut fixture = Fixture::new(json!({"title": "T", "message": "M"}));
    fixture.config.url = format!("{}/bot/v2/hook/abc", server.uri());
    let notifier = FeishuNotifier::new(
        Receiver {
            name: "feishu-http".to_string(),
            disable_resolve_message: false,
            external_url: None,
            config: fixture.config.clone(),
        },
        Collaborators {
            sender: Arc::new(HttpWebhookSender::new(
                build_client(Duration::from_secs(5)).unwrap(),
            )),
            renderer: Arc::new(JinjaRenderer::new()),
            images: Arc::new(LocalImageStore::new("/nonexistent")),
            uploader: fixture.uploader.clone(),
            directory: fixture.directory.clone(),
            clock: Arc::new(FakeClockProvider::new(now())),
        },
    );

    let err = notifier
        .notify(&[alert("A", false, None)])
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::DeliveryFailed(_)));
    assert!(err.to_string().contains("19024"));
}
