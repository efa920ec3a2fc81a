use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::reference::ContentReference;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("reference does not resolve to a readable location: {0}")]
    Unresolvable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("content is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("read timed out after {0:?}")]
    TimedOut(Duration),
}

pub type Result<T> = std::result::Result<T, ResourceError>;

/// Reads the resource a [`ContentReference`] points at.
///
/// Reads are side effects on the outside world; callers treat every error
/// as "field unavailable", never as a delivery failure.
#[async_trait]
pub trait ResourceReader: Send + Sync {
    async fn read(&self, reference: &ContentReference) -> Result<Vec<u8>>;

    async fn read_text(&self, reference: &ContentReference) -> Result<String> {
        let bytes = self.read(reference).await?;
        Ok(String::from_utf8(bytes)?)
    }
}

/// Local filesystem reader for `file://` references, bounded by a timeout
#[derive(Debug, Clone)]
pub struct FsResourceReader {
    timeout: Duration,
}

impl FsResourceReader {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn resolve(reference: &ContentReference) -> Result<PathBuf> {
        let url = reference
            .parse_uri()
            .ok_or_else(|| ResourceError::Unresolvable(reference.uri.clone()))?;

        if url.scheme() != "file" {
            return Err(ResourceError::Unresolvable(reference.uri.clone()));
        }

        url.to_file_path()
            .map_err(|_| ResourceError::Unresolvable(reference.uri.clone()))
    }
}

impl Default for FsResourceReader {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl ResourceReader for FsResourceReader {
    async fn read(&self, reference: &ContentReference) -> Result<Vec<u8>> {
        let path = Self::resolve(reference)?;

        match tokio::time::timeout(self.timeout, tokio::fs::read(&path)).await {
            Ok(read) => Ok(read?),
            Err(_) => Err(ResourceError::TimedOut(self.timeout)),
        }
    }
}
