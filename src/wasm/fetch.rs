//! Bytecode fetcher - downloads module bytes over HTTP(S)

use super::error::PipelineError;
use crate::config::FetchConfig;
use anyhow::Result;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::error::Error as StdError;
use tracing::debug;

/// Source of module bytecode
#[async_trait]
pub trait BytecodeSource: Send + Sync {
    /// Retrieve the full payload stored at `url`
    async fn fetch(&self, url: &str) -> Result<Bytes, PipelineError>;

    /// Human-readable name for this source
    fn name(&self) -> &'static str;
}

/// Fetches bytecode with a single GET request, no retries
pub struct HttpFetcher {
    client: reqwest::Client,
    max_size: usize,
}

impl HttpFetcher {
    /// Create a fetcher bounded by the configured timeouts and size limit
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            max_size: config.max_bytecode_size,
        })
    }
}

#[async_trait]
impl BytecodeSource for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, PipelineError> {
        let fetch_err = |reason: String| PipelineError::Fetch {
            url: url.to_string(),
            reason,
        };
        let read_err = |reason: String| PipelineError::Read {
            url: url.to_string(),
            reason,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(error_chain(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("server responded with {}", status)));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_size as u64 {
                return Err(read_err(format!(
                    "payload of {} bytes exceeds limit of {} bytes",
                    len, self.max_size
                )));
            }
        }

        // The response is dropped on every return path below, releasing the connection
        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| read_err(error_chain(&e)))?
        {
            if body.len() + chunk.len() > self.max_size {
                return Err(read_err(format!(
                    "payload exceeds limit of {} bytes",
                    self.max_size
                )));
            }
            body.extend_from_slice(&chunk);
        }

        debug!("Downloaded {} bytes of bytecode from {}", body.len(), url);
        Ok(body.freeze())
    }

    fn name(&self) -> &'static str {
        "HTTP"
    }
}

/// Render an error together with its source chain
fn error_chain(err: &dyn StdError) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
