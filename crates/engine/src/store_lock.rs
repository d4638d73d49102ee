use crate::{EngineError, Result};
use fs2::FileExt;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub(crate) const LOCK_FILE_NAME: &str = "graph.lock";

/// Exclusive advisory lock on the durable store, released on drop
pub(crate) struct StoreWriteLock {
    file: std::fs::File,
}

impl Drop for StoreWriteLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn lock_path(state_dir: &Path) -> PathBuf {
    state_dir.join(LOCK_FILE_NAME)
}

pub(crate) async fn acquire_store_write_lock(state_dir: &Path) -> Result<StoreWriteLock> {
    tokio::fs::create_dir_all(state_dir).await?;
    let path = lock_path(state_dir);

    tokio::task::spawn_blocking(move || -> Result<StoreWriteLock> {
        use std::fs::OpenOptions;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| {
                EngineError::Other(format!("open store lock {}: {err}", path.display()))
            })?;

        let start = Instant::now();
        file.lock_exclusive().map_err(|err| {
            EngineError::Other(format!("acquire store lock {}: {err}", path.display()))
        })?;
        let waited = start.elapsed().as_millis();
        if waited > 0 {
            log::debug!("Waited {waited}ms for {}", path.display());
        }

        Ok(StoreWriteLock { file })
    })
    .await
    .map_err(|err| EngineError::Other(format!("join store lock task: {err}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lock_is_released_on_drop() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let state_dir = dir.path().join(".synapse");

        let first = acquire_store_write_lock(&state_dir).await.expect("lock");
        assert!(state_dir.join(LOCK_FILE_NAME).exists());
        drop(first);

        let second = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            acquire_store_write_lock(&state_dir),
        )
        .await
        .expect("lock acquired after release");
        assert!(second.is_ok());
    }
}
