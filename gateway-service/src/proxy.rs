// ============================================================================
// Upstream Proxy
// ============================================================================
//
// Forwards an authorized request to the object store and streams the answer
// back. Neither body is ever collected in memory:
// - request bodies (uploads) go out through reqwest::Body::wrap_stream
// - response bodies come back through Body::from_stream
//
// Dropping the response body (client went away) drops the reqwest response,
// which stops reading from the upstream connection.
//
// Only the path is forwarded. The capability query string stays at the edge.
//
// ============================================================================

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderName, HeaderValue, Response},
};
use delivery_config::GatewayConfig;
use delivery_error::{AppError, AppResult};
use futures_util::TryStreamExt;
use std::time::{Duration, Instant};
use url::Url;

use crate::metrics::UPSTREAM_TIME_TO_HEADERS_SECONDS;

/// Connection-scoped headers, never copied in either direction
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "upgrade",
    "transfer-encoding",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

/// HTTP client bound to the single configured object store
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: Url,
}

impl UpstreamClient {
    pub fn new(config: &GatewayConfig) -> AppResult<Self> {
        // No total timeout: large objects may legitimately stream for minutes
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.upstream_connect_timeout_secs))
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.upstream_url.clone(),
        })
    }

    /// Target URL for a raw (still percent-encoded) request path
    fn target_url(&self, raw_path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(raw_path);
        url.set_query(None);
        url.set_fragment(None);
        url
    }

    /// Forward `request` and stream the upstream response back
    ///
    /// An upstream that answers, even with 4xx/5xx, is returned as-is. Only
    /// transport failures become `AppError::Upstream`.
    pub async fn forward(&self, request: Request) -> AppResult<Response<Body>> {
        let (parts, body) = request.into_parts();
        let target = self.target_url(parts.uri.path());

        let mut outbound = self.client.request(parts.method.clone(), target.as_str());
        for (name, value) in parts.headers.iter() {
            if name == header::HOST || is_hop_by_hop(name) {
                continue;
            }
            outbound = outbound.header(name, value);
        }

        if has_request_body(&parts.headers) {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let started = Instant::now();
        let upstream = outbound.send().await.map_err(|e| {
            if e.is_connect() {
                AppError::upstream(format!("Unable to connect to object store: {}", e))
            } else {
                AppError::upstream(format!("Object store request failed: {}", e))
            }
        })?;
        UPSTREAM_TIME_TO_HEADERS_SECONDS.observe(started.elapsed().as_secs_f64());

        let status = upstream.status();
        tracing::debug!(status = %status, path = %parts.uri.path(), "Object store responded");

        let mut response = Response::builder().status(status);
        if let Some(headers) = response.headers_mut() {
            for (name, value) in upstream.headers().iter() {
                if !is_hop_by_hop(name) {
                    headers.append(name.clone(), value.clone());
                }
            }
        }

        let stream = upstream.bytes_stream().inspect_err(|e| {
            tracing::warn!(error = %e, "Object store stream ended with an error");
        });

        response
            .body(Body::from_stream(stream))
            .map_err(|e| AppError::internal(format!("Failed to build response: {}", e)))
    }
}

/// Bodiless requests (GET, HEAD) are forwarded without one
fn has_request_body(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::TRANSFER_ENCODING) {
        return true;
    }
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}

/// Apply the caller-supplied `content-disposition` directive
///
/// Directives starting with `inline` (and an absent directive) leave the
/// upstream response untouched. Anything else is set as the
/// `Content-Disposition` header, replacing whatever the upstream sent.
/// A directive that is not a valid header value is ignored.
pub fn apply_disposition(mut response: Response<Body>, directive: Option<&str>) -> Response<Body> {
    let Some(directive) = directive else {
        return response;
    };
    if directive.starts_with("inline") {
        return response;
    }

    match HeaderValue::from_bytes(directive.as_bytes()) {
        Ok(value) => {
            response
                .headers_mut()
                .insert(header::CONTENT_DISPOSITION, value);
        }
        Err(_) => {
            tracing::debug!("Ignoring content-disposition directive that is not a valid header");
        }
    }
    response
}
