//! Request handling and transformation.
//!
//! # Responsibilities
//! - Narrow the inbound method to the two we forward
//! - Validate the path before anything is sent upstream
//! - Build the upstream target URL (path + re-encoded query)
//! - Work out the proxy's own externally visible base URL
//!
//! # Design Decisions
//! - Validation runs on the percent-decoded path so `%2e%2e` is caught too
//! - The raw (still-encoded) path is what gets forwarded
//! - Query pairs keep their order and repeated keys

use axum::body::Bytes;
use axum::http::header::{CONTENT_TYPE, HOST};
use axum::http::uri::Authority;
use axum::http::{HeaderMap, HeaderValue, Method, Uri};
use thiserror::Error;

/// Methods the proxy forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMethod {
    Get,
    Post,
}

impl ProxyMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyMethod::Get => "GET",
            ProxyMethod::Post => "POST",
        }
    }
}

impl TryFrom<&Method> for ProxyMethod {
    type Error = Method;

    fn try_from(method: &Method) -> Result<Self, Self::Error> {
        if method == Method::GET {
            Ok(ProxyMethod::Get)
        } else if method == Method::POST {
            Ok(ProxyMethod::Post)
        } else {
            Err(method.clone())
        }
    }
}

/// Why a path was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathRejection {
    #[error("path is {len} characters, limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("path contains '..'")]
    Traversal,

    #[error("path starts with '//'")]
    DoubleSlash,

    #[error("path is not valid percent-encoded UTF-8")]
    Encoding,
}

/// One inbound request, reduced to what the gateway forwards.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: ProxyMethod,
    /// Path as received, still percent-encoded, including the leading `/`.
    pub path: String,
    /// Decoded query pairs in arrival order.
    pub query: Vec<(String, String)>,
    /// Content-Type of the body, forwarded on POST.
    pub content_type: Option<HeaderValue>,
    /// Empty for GET.
    pub body: Bytes,
}

impl ProxyRequest {
    /// Split a URI into the forwarded path and decoded query pairs.
    pub fn new(method: ProxyMethod, uri: &Uri, headers: &HeaderMap, body: Bytes) -> Self {
        let query = uri.query().map(parse_query).unwrap_or_default();
        let (content_type, body) = match method {
            ProxyMethod::Get => (None, Bytes::new()),
            ProxyMethod::Post => (headers.get(CONTENT_TYPE).cloned(), body),
        };
        Self {
            method,
            path: uri.path().to_string(),
            query,
            content_type,
            body,
        }
    }
}

/// Decode a raw query string into ordered pairs.
pub fn parse_query(raw: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect()
}

/// Check a request path (leading `/` included).
///
/// Length is measured in characters of the decoded path without its leading
/// slash.
pub fn validate_path(path: &str, max_len: usize) -> Result<(), PathRejection> {
    if path.starts_with("//") {
        return Err(PathRejection::DoubleSlash);
    }
    let decoded = urlencoding::decode(path).map_err(|_| PathRejection::Encoding)?;
    let relative = decoded.strip_prefix('/').unwrap_or(&decoded);

    let len = relative.chars().count();
    if len > max_len {
        return Err(PathRejection::TooLong { len, max: max_len });
    }
    if decoded.contains("..") {
        return Err(PathRejection::Traversal);
    }
    if decoded.starts_with("//") {
        return Err(PathRejection::DoubleSlash);
    }
    Ok(())
}

/// `upstream_base + "/" + path` plus the re-encoded query.
///
/// Leading slashes of `path` are stripped; repeated query keys are emitted
/// as repeated `key=value` pairs in their original order.
pub fn build_target_url(upstream_base: &str, path: &str, query: &[(String, String)]) -> String {
    let mut target = format!(
        "{}/{}",
        upstream_base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    if !query.is_empty() {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query)
            .finish();
        target.push('?');
        target.push_str(&encoded);
    }
    target
}

/// The base URL clients used to reach the proxy, e.g. `http://127.0.0.1:8232`.
///
/// A configured public URL wins. Otherwise the scheme comes from
/// `X-Forwarded-Proto` (http or https only) and the authority from the
/// request URI or `Host` header; a malformed `Host` falls back to `fallback`.
pub fn proxy_base_url(
    public_url: Option<&str>,
    uri: &Uri,
    headers: &HeaderMap,
    fallback: &str,
) -> String {
    if let Some(public_url) = public_url {
        return public_url.trim_end_matches('/').to_string();
    }

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| v == "http" || v == "https")
        .unwrap_or_else(|| "http".to_string());

    let authority = uri
        .authority()
        .map(Authority::to_string)
        .or_else(|| {
            headers
                .get(HOST)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<Authority>().ok())
                .filter(|a| !a.as_str().contains('@'))
                .map(|a| a.to_string())
        })
        .unwrap_or_else(|| fallback.to_string());

    format!("{scheme}://{authority}")
}
