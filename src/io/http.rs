use async_trait::async_trait;
use log::warn;
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::Fetch;
use anyhow::{Result, bail};

/// Archive served over HTTP(S)
///
/// Downloads the whole body. A download interrupted by a timeout or a
/// dropped connection resumes with a Range request from the last byte
/// received.
pub struct HttpSource {
    client: Client,
    url: String,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpSource {
    pub fn new(url: String) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            url,
            transferred_bytes: AtomicU64::new(0),
            max_retry: 10,
        })
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    async fn backoff(&self, retry_count: &mut u32, err: &reqwest::Error) -> Result<()> {
        *retry_count += 1;
        if *retry_count >= self.max_retry {
            bail!("Max retries exceeded: {}", err);
        }
        warn!(
            "Connection error, retry {}/{}: {}",
            retry_count, self.max_retry, err
        );
        tokio::time::sleep(Duration::from_millis(500 * *retry_count as u64)).await;
        Ok(())
    }
}

#[async_trait]
impl Fetch for HttpSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let mut retry_count = 0;

        'request: loop {
            let mut request = self.client.get(&self.url);
            if !data.is_empty() {
                request = request.header(RANGE, format!("bytes={}-", data.len()));
            }

            let mut resp = match request.send().await {
                Ok(resp) => resp,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    self.backoff(&mut retry_count, &e).await?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = resp.status();
            if !status.is_success() {
                bail!("HTTP request failed with status: {}", status);
            }
            if !data.is_empty() && status != StatusCode::PARTIAL_CONTENT {
                // Range ignored: the server is sending the whole body again.
                data.clear();
            }

            loop {
                match resp.chunk().await {
                    Ok(Some(chunk)) => {
                        data.extend_from_slice(&chunk);
                        self.transferred_bytes
                            .fetch_add(chunk.len() as u64, Ordering::Relaxed);
                    }
                    Ok(None) => return Ok(data),
                    Err(e) if e.is_timeout() || e.is_body() || e.is_decode() => {
                        self.backoff(&mut retry_count, &e).await?;
                        continue 'request;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    fn location(&self) -> &str {
        &self.url
    }
}
