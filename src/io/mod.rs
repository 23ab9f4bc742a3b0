mod http;
mod local;

pub use http::HttpSource;
pub use local::LocalSource;

use anyhow::Result;
use async_trait::async_trait;

/// Trait for loading a whole archive into memory
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Read the complete archive into a buffer
    async fn fetch(&self) -> Result<Vec<u8>>;

    /// Where the archive comes from, for messages
    fn location(&self) -> &str;
}
