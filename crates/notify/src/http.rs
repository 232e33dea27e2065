use std::time::Duration;
use suzu_core::notify::error::NotifyError;
use tracing::debug;

/// # Summary
/// Builds the shared HTTP client used for every outbound call.
///
/// # Logic
/// 1. Installs the `ring` rustls provider as process default (no-op if one is already installed).
/// 2. Builds a `reqwest::Client` with the given request timeout.
///
/// # Returns
/// * The client, or `NotifyError::InvalidConfig` if the TLS backend cannot be initialised.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, NotifyError> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| NotifyError::InvalidConfig(format!("failed to build HTTP client: {}", e)))
}
