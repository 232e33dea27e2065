use std::sync::Arc;
use std::time::Duration;
use suzu_core::cache::port::{Cache, CacheExt};
use tracing::warn;

/// # Summary
/// Tenant access tokens, cached per Feishu app.
///
/// # Invariants
/// - Entries are keyed by app ID so several receivers can share one cache.
/// - Cache failures degrade to a miss; they never fail the caller.
/// - Concurrent refreshes are not coordinated; the last write wins.
#[derive(Clone)]
pub struct TenantTokenCache {
    cache: Arc<dyn Cache>,
}

impl TenantTokenCache {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    fn key(app_id: &str) -> String {
        format!("feishu:tenant_access_token:{app_id}")
    }

    /// Returns the cached, unexpired token for `app_id`.
    pub async fn get(&self, app_id: &str) -> Option<String> {
        match self.cache.get::<String>(&Self::key(app_id)).await {
            Ok(token) => token,
            Err(e) => {
                warn!("failed to read cached tenant token for {app_id}: {e}");
                None
            }
        }
    }

    /// Stores `token` for `ttl`. A zero TTL leaves the cache untouched.
    pub async fn put(&self, app_id: &str, token: &str, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        if let Err(e) = self
            .cache
            .set(&Self::key(app_id), &token.to_string(), Some(ttl))
            .await
        {
            warn!("failed to cache tenant token for {app_id}: {e}");
        }
    }
}
