use super::Fetch;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

/// Archive stored on the local filesystem
pub struct LocalSource {
    path: PathBuf,
    location: String,
}

impl LocalSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let location = path.display().to_string();
        Self { path, location }
    }
}

#[async_trait]
impl Fetch for LocalSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.location))
    }

    fn location(&self) -> &str {
        &self.location
    }
}
