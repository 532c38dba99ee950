//! File-backed dispatcher watermark.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, SeshuError};
use crate::traits::watermark::WatermarkStore;

/// Stores the watermark as a unix timestamp on the first line of a file.
///
/// Writes go to a sibling temp file and are renamed into place, so a crash
/// mid-write leaves the previous value intact.
pub struct FileWatermark {
    path: PathBuf,
}

impl FileWatermark {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl WatermarkStore for FileWatermark {
    async fn load(&self) -> Result<Option<i64>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SeshuError::store(e)),
        };

        let first_line = contents.lines().next().unwrap_or_default().trim();
        if first_line.is_empty() {
            return Ok(None);
        }

        first_line.parse::<i64>().map(Some).map_err(|e| {
            SeshuError::store(format!(
                "corrupt watermark in {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn store(&self, timestamp: i64) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(SeshuError::store)?;
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, format!("{}\n", timestamp))
            .await
            .map_err(SeshuError::store)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(SeshuError::store)?;

        debug!(path = %self.path.display(), timestamp, "Watermark advanced");
        Ok(())
    }
}
