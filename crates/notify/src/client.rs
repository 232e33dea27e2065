use crate::token::TenantTokenCache;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use suzu_core::notify::error::NotifyError;
use suzu_core::notify::port::{ImageUploader, UserDirectory, UserRecord};
use tracing::debug;

/// # Summary
/// Raw-HTTP client for the Feishu open platform.
///
/// # Invariants
/// - Every authenticated call obtains its bearer token through `tenant_access_token`.
/// - No call is retried; failures surface to the caller immediately.
pub struct FeishuClient {
    /// API root, e.g. `https://open.feishu.cn/open-apis`.
    api_base: String,
    app_id: String,
    app_secret: String,
    http: Client,
    tokens: TenantTokenCache,
}

#[derive(Serialize)]
struct TenantTokenRequest<'a> {
    app_id: &'a str,
    app_secret: &'a str,
}

#[derive(Deserialize, Debug)]
struct TenantTokenResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    tenant_access_token: String,
    /// Lifetime in seconds.
    #[serde(default, alias = "expire_seconds")]
    expire: u64,
}

#[derive(Deserialize, Debug)]
struct ImageUploadResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<ImageUploadData>,
}

#[derive(Deserialize, Debug)]
struct ImageUploadData {
    #[serde(default)]
    image_key: String,
}

#[derive(Serialize)]
struct BatchGetIdRequest<'a> {
    emails: &'a [String],
}

#[derive(Deserialize, Debug)]
struct BatchGetIdResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<BatchGetIdData>,
}

#[derive(Deserialize, Debug)]
struct BatchGetIdData {
    #[serde(default)]
    user_list: Vec<UserListItem>,
}

#[derive(Deserialize, Debug)]
struct UserListItem {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

impl FeishuClient {
    /// # Summary
    /// Creates a new `FeishuClient`.
    ///
    /// # Arguments
    /// * `api_base` - API root; a trailing slash is ignored.
    /// * `app_id` / `app_secret` - Bot credentials, already decrypted.
    /// * `http` - Shared HTTP client (see `http::build_client`).
    /// * `tokens` - Tenant token cache.
    pub fn new(
        api_base: &str,
        app_id: &str,
        app_secret: &str,
        http: Client,
        tokens: TenantTokenCache,
    ) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            app_secret: app_secret.to_string(),
            http,
            tokens,
        }
    }

    /// # Summary
    /// Returns a valid tenant access token.
    ///
    /// # Logic
    /// 1. Returns the cached token if it has not expired.
    /// 2. Otherwise calls `auth/v3/tenant_access_token/internal/` with the app credentials.
    /// 3. Caches the new token for `expire` seconds.
    ///
    /// # Returns
    /// * `Err(NotifyError::Network)` on transport failure.
    /// * `Err(NotifyError::Platform)` on non-2xx, non-zero `code`, or a malformed body.
    pub async fn tenant_access_token(&self) -> Result<String, NotifyError> {
        if let Some(token) = self.tokens.get(&self.app_id).await {
            debug!("tenant token cache hit for {}", self.app_id);
            return Ok(token);
        }

        let url = format!("{}/auth/v3/tenant_access_token/internal/", self.api_base);
        let response = self
            .http
            .post(&url)
            .json(&TenantTokenRequest {
                app_id: &self.app_id,
                app_secret: &self.app_secret,
            })
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Platform(format!(
                "tenant token request returned {}: {}",
                status, error_text
            )));
        }

        let tenant: TenantTokenResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Platform(format!("malformed tenant token response: {}", e)))?;
        if tenant.code != 0 {
            return Err(NotifyError::Platform(format!(
                "tenant token error code {}: {}",
                tenant.code, tenant.msg
            )));
        }
        if tenant.tenant_access_token.is_empty() {
            return Err(NotifyError::Platform(
                "tenant token response carried no token".to_string(),
            ));
        }

        self.tokens
            .put(
                &self.app_id,
                &tenant.tenant_access_token,
                Duration::from_secs(tenant.expire),
            )
            .await;
        Ok(tenant.tenant_access_token)
    }
}

#[async_trait]
impl ImageUploader for FeishuClient {
    /// # Summary
    /// Uploads a local image and returns its `image_key`.
    ///
    /// # Logic
    /// 1. Acquires a tenant token.
    /// 2. Reads the file once and posts it as the `image` part with `image_type=message`.
    /// 3. Extracts `data.image_key` from the response.
    ///
    /// # Returns
    /// * `Err(NotifyError::UploadFailed)` for any failure along the way.
    async fn upload_image(&self, path: &Path) -> Result<String, NotifyError> {
        let failed = |reason: String| NotifyError::UploadFailed {
            path: path.display().to_string(),
            reason,
        };

        let token = self
            .tenant_access_token()
            .await
            .map_err(|e| failed(e.to_string()))?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| failed(format!("failed to read image: {}", e)))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let form = Form::new()
            .part("image", Part::bytes(bytes).file_name(file_name))
            .text("image_type", "message");

        let url = format!("{}/image/v4/put/", self.api_base);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(failed(format!("upload returned {}: {}", status, error_text)));
        }

        let uploaded: ImageUploadResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("malformed upload response: {}", e)))?;
        if uploaded.code != 0 {
            return Err(failed(format!(
                "upload error code {}: {}",
                uploaded.code, uploaded.msg
            )));
        }
        match uploaded.data {
            Some(data) if !data.image_key.is_empty() => Ok(data.image_key),
            _ => Err(failed("upload response carried no image_key".to_string())),
        }
    }
}

#[async_trait]
impl UserDirectory for FeishuClient {
    /// # Summary
    /// Resolves emails to open IDs with one `contact/v3/users/batch_get_id` call.
    ///
    /// # Returns
    /// * One record per entry of the response's `user_list`, in response order.
    async fn lookup_user_ids(&self, emails: &[String]) -> Result<Vec<UserRecord>, NotifyError> {
        let token = self.tenant_access_token().await?;

        let url = format!(
            "{}/contact/v3/users/batch_get_id?user_id_type=open_id",
            self.api_base
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&BatchGetIdRequest { emails })
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Platform(format!(
                "user lookup returned {}: {}",
                status, error_text
            )));
        }

        let lookup: BatchGetIdResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Platform(format!("malformed user lookup response: {}", e)))?;
        if lookup.code != 0 {
            return Err(NotifyError::Platform(format!(
                "user lookup error code {}: {}",
                lookup.code, lookup.msg
            )));
        }

        Ok(lookup
            .data
            .map(|data| data.user_list)
            .unwrap_or_default()
            .into_iter()
            .map(|item| UserRecord {
                email: item.email.unwrap_or_default(),
                user_id: item.user_id.filter(|id| !id.is_empty()),
            })
            .collect())
    }
}
