//! HttpTransport - 事前署名 URL への HTTP PUT（reqwest）
//!
//! reqwest::Client はプロセス全体の共有状態ではなく、このインスタンスが持つ
//! 明示的な設定です（タイムアウトなど）。

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use tracing::debug;

use crate::config::UploadConfig;
use crate::domain::{ProgressTracker, TransportError, UploadTarget, UploadableFile};
use crate::ports::UploadTransport;

pub struct HttpTransport {
    http: reqwest::Client,
    chunk_size: usize,
}

impl HttpTransport {
    pub fn new(config: &UploadConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(Self::with_client(http, config.chunk_size))
    }

    pub fn with_client(http: reqwest::Client, chunk_size: usize) -> Self {
        Self {
            http,
            chunk_size: chunk_size.max(1),
        }
    }

    fn parse_target(target: &UploadTarget) -> Result<reqwest::Url, TransportError> {
        let url = reqwest::Url::parse(&target.url)
            .map_err(|e| TransportError::InvalidTarget(format!("{}: {e}", target.url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(TransportError::InvalidTarget(format!(
                "{}: unsupported scheme {other}",
                target.url
            ))),
        }
    }

    async fn check_status(resp: reqwest::Response) -> Result<(), TransportError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Streams `body` in `chunk_size` pieces, counting each piece as it is
/// handed to the connection.
fn progress_body(body: Bytes, chunk_size: usize, progress: Arc<ProgressTracker>) -> reqwest::Body {
    let chunks: Vec<Bytes> = (0..body.len())
        .step_by(chunk_size)
        .map(|start| body.slice(start..(start + chunk_size).min(body.len())))
        .collect();

    let stream = futures::stream::iter(chunks).map(move |chunk| {
        progress.advance(chunk.len() as u64);
        Ok::<Bytes, std::io::Error>(chunk)
    });
    reqwest::Body::wrap_stream(stream)
}

/// Issuer headers first, then the file's own `Content-Type` and
/// `Content-Length`, which replace any issuer value of the same name.
fn request_headers(target: &UploadTarget, file: &UploadableFile) -> Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::with_capacity(target.headers.len() + 2);
    for (name, value) in &target.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidTarget(format!("header {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidTarget(format!("header {name}: {e}")))?;
        headers.insert(name, value);
    }

    let content_type = HeaderValue::from_str(&file.content_type).map_err(|e| {
        TransportError::InvalidTarget(format!("content type {}: {e}", file.content_type))
    })?;
    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(CONTENT_LENGTH, HeaderValue::from(file.size()));
    Ok(headers)
}

fn map_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_builder() {
        TransportError::InvalidTarget(e.to_string())
    } else {
        TransportError::Connection(e.to_string())
    }
}

#[async_trait]
impl UploadTransport for HttpTransport {
    async fn put(
        &self,
        target: &UploadTarget,
        file: &UploadableFile,
        progress: Arc<ProgressTracker>,
    ) -> Result<(), TransportError> {
        let url = Self::parse_target(target)?;
        debug!(file = %file.name, host = url.host_str().unwrap_or_default(), bytes = file.size(), "PUT");

        let resp = self
            .http
            .put(url)
            .headers(request_headers(target, file)?)
            .body(progress_body(file.body.clone(), self.chunk_size, progress))
            .send()
            .await
            .map_err(map_send_error)?;

        Self::check_status(resp).await
    }
}
