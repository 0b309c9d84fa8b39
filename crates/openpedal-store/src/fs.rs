//! Atomic file helpers.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs as async_fs;
use tracing::debug;

/// Write `content` to `<path>.tmp`, then rename it over `path`.
///
/// The original file is left untouched if the write fails.
pub async fn write_atomic(path: &Path, content: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {parent:?}"))?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = Path::new(&temp_name);

    async_fs::write(temp_path, content)
        .await
        .with_context(|| format!("Failed to write temp file: {temp_path:?}"))?;
    async_fs::rename(temp_path, path)
        .await
        .with_context(|| format!("Failed to rename temp file to target: {path:?}"))?;

    debug!(path = ?path, bytes = content.len(), "File written");
    Ok(())
}

/// Serialize as pretty JSON and write atomically.
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(value).with_context(|| format!("Failed to serialize {path:?}"))?;
    write_atomic(path, &json).await
}

/// Read and parse a JSON file; `Ok(None)` when it does not exist.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    let bytes = match async_fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to read file: {path:?}")),
    };
    let value = serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse JSON: {path:?}"))?;
    Ok(Some(value))
}

/// Remove a file; a missing file is not an error.
pub async fn remove_if_exists(path: &Path) -> anyhow::Result<bool> {
    match async_fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to delete file: {path:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_atomic_leaves_no_temp_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("file.json");

        write_atomic(&path, b"{}").await?;
        assert_eq!(tokio::fs::read_to_string(&path).await?, "{}");
        assert!(!dir.path().join("nested").join("file.json.tmp").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_read_missing_is_none() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let value: Option<serde_json::Value> = read_json(&dir.path().join("missing.json")).await?;
        assert!(value.is_none());
        assert!(!remove_if_exists(&dir.path().join("missing.json")).await?);
        Ok(())
    }
}
