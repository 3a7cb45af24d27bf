use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("export destination rejected the file: {0}")]
    Rejected(String),
}

/// Where a finished CSV document is handed off.
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Delivers `contents` under `file_name` and returns a description of
    /// where it ended up.
    async fn deliver(&self, file_name: &str, contents: &str) -> Result<String, ExportError>;
}

/// Writes exports as files into a directory, creating it when missing.
pub struct DirectoryExportSink {
    directory: PathBuf,
}

impl DirectoryExportSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into() }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

#[async_trait]
impl ExportSink for DirectoryExportSink {
    async fn deliver(&self, file_name: &str, contents: &str) -> Result<String, ExportError> {
        if file_name.contains(&['/', '\\'][..]) {
            return Err(ExportError::Rejected(format!("`{file_name}` is not a plain file name")));
        }

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| ExportError::Io { path: self.directory.clone(), source })?;

        let path = self.directory.join(file_name);
        tokio::fs::write(&path, contents.as_bytes())
            .await
            .map_err(|source| ExportError::Io { path: path.clone(), source })?;

        debug!(event_name = "desk.export.written", path = %path.display(), bytes = contents.len(), "export file written");
        Ok(path.display().to_string())
    }
}
