//! Transport client and shared HTTP utilities for the openFDA endpoints.

use std::borrow::Cow;
use std::sync::OnceLock;
use std::time::Instant;

use http::Extensions;
use reqwest::header::HeaderValue;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use tracing::{debug, warn};

use crate::error::FaersError;

pub(crate) mod api_key;
pub(crate) mod openfda;

const ERROR_BODY_MAX_BYTES: usize = 2048;
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

static HTTP_CLIENT: OnceLock<ClientWithMiddleware> = OnceLock::new();

pub(crate) fn env_base(default: &'static str, env_var: &str) -> Cow<'static, str> {
    std::env::var(env_var)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(Cow::Owned)
        .unwrap_or_else(|| Cow::Borrowed(default))
}

/// Logs every upstream GET with its path, status, and latency.
///
/// The query string is never logged because it can carry the API key.
#[derive(Clone, Debug, Default)]
pub(crate) struct UpstreamTraceMiddleware;

#[async_trait::async_trait]
impl Middleware for UpstreamTraceMiddleware {
    async fn handle(
        &self,
        req: reqwest::Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        let host = req.url().host_str().unwrap_or("unknown-host").to_string();
        let path = req.url().path().to_string();
        let start = Instant::now();
        let result = next.run(req, extensions).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(resp) => debug!(
                host = %host,
                path = %path,
                status = resp.status().as_u16(),
                elapsed_ms,
                "upstream GET"
            ),
            Err(err) => warn!(
                host = %host,
                path = %path,
                elapsed_ms,
                error = %err,
                "upstream GET failed"
            ),
        }
        result
    }
}

/// Returns the process-wide HTTP client.
///
/// No retry or cache layers: a failed upstream call surfaces immediately.
pub(crate) fn shared_client() -> Result<ClientWithMiddleware, FaersError> {
    if let Some(client) = HTTP_CLIENT.get() {
        return Ok(client.clone());
    }

    let base_client = reqwest::Client::builder()
        .user_agent(concat!("faers-mcp/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(FaersError::HttpClientInit)?;

    let client = ClientBuilder::new(base_client)
        .with(UpstreamTraceMiddleware)
        .build();

    match HTTP_CLIENT.set(client.clone()) {
        Ok(()) => Ok(client),
        Err(_) => HTTP_CLIENT
            .get()
            .cloned()
            .ok_or_else(|| FaersError::FetchAborted {
                api: "http-client".into(),
                message: "Shared HTTP client initialization race".into(),
            }),
    }
}

pub(crate) fn send_error(err: reqwest_middleware::Error) -> FaersError {
    match err {
        reqwest_middleware::Error::Reqwest(err) => FaersError::FetchFailed(err),
        other => FaersError::HttpMiddleware(other),
    }
}

pub(crate) fn body_excerpt(bytes: &[u8]) -> String {
    let full = String::from_utf8_lossy(bytes);

    let truncated: &str = if full.len() > ERROR_BODY_MAX_BYTES {
        let mut end = ERROR_BODY_MAX_BYTES;
        while end > 0 && !full.is_char_boundary(end) {
            end -= 1;
        }
        &full[..end]
    } else {
        full.as_ref()
    };

    let mut s = truncated.trim().replace(['\n', '\r', '\t'], " ");
    if full.len() > ERROR_BODY_MAX_BYTES {
        s.push_str(" …");
    }
    s
}

pub(crate) fn ensure_json_content_type(
    api: &str,
    content_type: Option<&HeaderValue>,
    body: &[u8],
) -> Result<(), FaersError> {
    let Some(content_type) = content_type else {
        return Ok(());
    };

    let raw = match content_type.to_str() {
        Ok(v) => v.trim(),
        Err(_) => {
            warn!(
                source = api,
                "Response content-type header was not valid UTF-8; attempting JSON parse"
            );
            return Ok(());
        }
    };
    if raw.is_empty() {
        return Ok(());
    }

    let media_type = raw
        .split(';')
        .next()
        .map(str::trim)
        .unwrap_or_default()
        .to_ascii_lowercase();
    if matches!(media_type.as_str(), "text/html" | "application/xhtml+xml") {
        return Err(FaersError::FetchAborted {
            api: api.to_string(),
            message: format!(
                "unexpected HTML response (content-type: {raw}): {}",
                body_excerpt(body)
            ),
        });
    }

    Ok(())
}

pub(crate) async fn read_limited_body(
    mut resp: reqwest::Response,
    api: &str,
) -> Result<Vec<u8>, FaersError> {
    let mut body: Vec<u8> = Vec::new();

    while let Some(chunk) = resp.chunk().await? {
        let next_len = body.len().saturating_add(chunk.len());
        if next_len > DEFAULT_MAX_BODY_BYTES {
            return Err(FaersError::FetchAborted {
                api: api.to_string(),
                message: format!("response body exceeded {DEFAULT_MAX_BODY_BYTES} bytes"),
            });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}
