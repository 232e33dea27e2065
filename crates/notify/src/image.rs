use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use suzu_core::alert::entity::Image;
use suzu_core::notify::error::NotifyError;
use suzu_core::notify::port::ImageStore;
use tracing::warn;

/// # Summary
/// Image store over a local directory; a token is a file name inside it.
///
/// # Invariants
/// - Tokens that would escape the directory are treated as not found.
pub struct LocalImageStore {
    dir: PathBuf,
}

impl LocalImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

fn is_plain_file_name(token: &str) -> bool {
    let mut components = Path::new(token).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn get_image(&self, token: &str) -> Result<Option<Image>, NotifyError> {
        if !is_plain_file_name(token) {
            warn!("rejecting image token {token}: not a plain file name");
            return Ok(None);
        }

        let path = self.dir.join(token);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Ok(Some(Image {
                token: token.to_string(),
                path: Some(path),
                url: None,
            })),
            Ok(false) => Ok(None),
            Err(e) => Err(NotifyError::ImageStore(format!(
                "failed to stat {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
