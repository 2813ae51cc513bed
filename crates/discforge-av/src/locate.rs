//! Disc image visibility checks.
//!
//! Remote mounts (cloud drives in particular) can lag behind their backing
//! store: a freshly added image may not be listed yet. For remote images a
//! miss triggers one wait plus a directory re-listing before giving up.

use std::path::Path;
use std::time::Duration;

use discforge_common::{Error, Result};

/// Make sure `image` exists before any external tool touches it.
///
/// A local miss fails immediately with [`Error::NotVisible`]. A remote miss
/// sleeps `wait`, lists the parent directory to nudge the mount's cache, then
/// checks once more.
pub async fn ensure_visible(image: &Path, is_remote: bool, wait: Duration) -> Result<()> {
    if tokio::fs::try_exists(image).await.unwrap_or(false) {
        return Ok(());
    }

    if !is_remote {
        return Err(Error::NotVisible(image.to_path_buf()));
    }

    tracing::info!(
        "Image {:?} not visible on remote mount, re-listing in {:?}",
        image,
        wait
    );
    tokio::time::sleep(wait).await;

    if let Some(parent) = image.parent() {
        match tokio::fs::read_dir(parent).await {
            Ok(mut entries) => while let Ok(Some(_)) = entries.next_entry().await {},
            Err(e) => tracing::debug!("Re-listing {:?} failed: {}", parent, e),
        }
    }

    if tokio::fs::try_exists(image).await.unwrap_or(false) {
        tracing::debug!("Image {:?} appeared after re-listing", image);
        Ok(())
    } else {
        Err(Error::NotVisible(image.to_path_buf()))
    }
}
