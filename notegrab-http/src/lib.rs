//! Minimal JSON-over-HTTP client with safe logging and flexible auth.
//!
//! - Request options: `Auth`, timeout
//! - Credentials either travel as a bearer header or are injected into the
//!   JSON body (Misskey's `i` field); logs never include the secret value
//! - Error bodies are decoded from the Misskey `{"error": {...}}` envelope,
//!   falling back to common `{"message": ...}` shapes
//! - Optional *raw* request/response logging via `NOTEGRAB_HTTP_RAW=1`
//!
//! Failed requests are not retried; callers see the first error.
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), notegrab_http::HttpError> {
//! use notegrab_http::{Auth, HttpClient, RequestOpts};
//! use std::borrow::Cow;
//!
//! let client = HttpClient::new("https://misskey.example/api/")?;
//! let stats: serde_json::Value = client
//!     .post_json(
//!         "stats",
//!         &serde_json::json!({}),
//!         RequestOpts {
//!             auth: Some(Auth::BodyField { name: "i", value: Cow::Borrowed("token") }),
//!             ..Default::default()
//!         },
//!     )
//!     .await?;
//! # Ok(()) }
//! ```

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::env;
use std::time::Duration;
use thiserror::Error;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "NOTEGRAB_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)
const REDACTED: &str = "<redacted>";

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Render a best-effort curl command for repro/debug. The body passed in must
/// already be redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap, body: Option<&str>) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    for (name, val) in redact_headers(headers) {
        parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
    }
    if let Some(s) = body {
        let mut s = s.to_string();
        if s.len() > RAW_MAX_BODY {
            truncate_at_char_boundary(&mut s, RAW_MAX_BODY);
            s.push('…');
        }
        parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
    }
    parts.push(format!("'{}'", url.as_str()));
    parts.join(" ")
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let mut val = v.to_str().unwrap_or("").to_string();
            if key.eq_ignore_ascii_case("authorization") {
                val = "Bearer <redacted>".into();
            }
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, code={code}")]
    Api {
        status: StatusCode,
        message: String,
        code: String,
    },
}

// ==============================
// Auth & Request Options
// ==============================

/// Authentication strategies supported by the HTTP client.
///
/// ```
/// use notegrab_http::Auth;
/// use std::borrow::Cow;
///
/// let auth = Auth::BodyField { name: "i", value: Cow::Borrowed("token") };
/// match auth {
///     Auth::BodyField { name, .. } => assert_eq!(name, "i"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    /// Token injected as a top-level field of the JSON request body.
    BodyField { name: &'a str, value: Cow<'a, str> },
}

impl Auth<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::BodyField { .. } => "body",
        }
    }
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use notegrab_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(5)),
///     ..Default::default()
/// };
/// assert_eq!(opts.timeout.unwrap().as_secs(), 5);
/// assert!(opts.auth.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub auth: Option<Auth<'a>>,
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// Construct a client anchored to a base URL. Relative paths are joined
    /// onto it, so the base should end in `/`.
    ///
    /// ```no_run
    /// use notegrab_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://misskey.example/api/")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(30));
    /// assert_eq!(client.base().path(), "/api/");
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("notegrab/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(30),
        })
    }

    /// Override the default per-request timeout.
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// POST a JSON body and decode a JSON response.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json_internal(Method::POST, path, Some(body), opts)
            .await
    }

    // ==============================
    // Core request implementation
    // ==============================

    async fn request_json_internal<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;

        // ----- Build request -----
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let mut rb = self.inner.request(method.clone(), url.clone()).timeout(timeout);

        let payload = match body {
            Some(b) => Some(encode_body(b, opts.auth.as_ref())?),
            None => None,
        };
        if let Some(p) = &payload {
            rb = rb
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(p.bytes.clone());
        }

        if let Some(Auth::Bearer(tok)) = &opts.auth {
            let tok = sanitize_api_key(tok)?;
            rb = rb.bearer_auth(tok);
        }

        // ----- Safe request logging (pre-send) -----
        let auth_kind = opts.auth.as_ref().map(Auth::kind).unwrap_or("none");

        let req_id = format!(
            "r{:x}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );

        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            timeout_ms=timeout.as_millis() as u64,
            auth_kind,
            has_body=%payload.is_some(),
            "http.request.start"
        );

        if raw_enabled() {
            let mut headers = HeaderMap::new();
            headers.insert(
                reqwest::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            if let Some(Auth::Bearer(_)) = &opts.auth {
                // value is redacted before printing
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    HeaderValue::from_static("Bearer"),
                );
            }
            let curl = make_curl(
                &method,
                &url,
                &headers,
                payload.as_ref().map(|p| p.redacted.as_str()),
            );
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        // ----- Send -----
        let t0 = std::time::Instant::now();
        let resp = rb.send().await.map_err(|err| {
            let message = err.to_string();
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error.send");
            HttpError::Network(message)
        })?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await.map_err(|err| {
            let message = err.to_string();
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error.body");
            HttpError::Network(message)
        })?;
        let dur_ms = t0.elapsed().as_millis() as u64;

        let limit = headers
            .get("x-ratelimit-limit")
            .and_then(|v| v.to_str().ok());
        let remain = headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok());

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=dur_ms,
            body_len=bytes.len(),
            rate_limit.limit=?limit,
            rate_limit.remaining=?remain,
            "http.response.headers"
        );

        if raw_enabled() {
            let hdrs = redact_headers(&headers);
            let truncated = bytes.len() > RAW_MAX_BODY;
            let text = String::from_utf8_lossy(&bytes[..bytes.len().min(RAW_MAX_BODY)]);
            tracing::info!(
                target:"http.raw",
                %req_id,
                status=%status,
                duration_ms=dur_ms,
                headers=?hdrs,
                body=%text,
                truncated
            );
        }

        let snippet = snip_body(&bytes);
        tracing::trace!(
            req_id=%req_id,
            body_snippet=%snippet,
            "http.response.body_snippet"
        );

        // ----- Success path -----
        if status.is_success() {
            return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                tracing::warn!(
                    req_id=%req_id,
                    serde_line=%e.line(),
                    serde_col=%e.column(),
                    serde_err=%e.to_string(),
                    body_snippet=%snippet,
                    "http.response.decode_error"
                );
                HttpError::Decode(e.to_string(), snippet)
            });
        }

        // ----- Non-success -----
        let ApiErrorInfo { message, code } = extract_error_info(&bytes);
        tracing::warn!(
            req_id=%req_id,
            %status,
            message=%message,
            code=%code,
            body_snippet=%snippet,
            "http.error"
        );
        Err(HttpError::Api {
            status,
            message,
            code,
        })
    }
}

// ==============================
// Helpers
// ==============================

/// Serialized request body plus a copy that is safe to log.
#[derive(Debug)]
struct EncodedBody {
    bytes: Vec<u8>,
    redacted: String,
}

fn encode_body<B>(body: &B, auth: Option<&Auth<'_>>) -> Result<EncodedBody, HttpError>
where
    B: Serialize + ?Sized,
{
    let mut value =
        serde_json::to_value(body).map_err(|e| HttpError::Build(format!("body encode: {e}")))?;

    let mut redacted = value.clone();
    if let Some(Auth::BodyField { name, value: secret }) = auth {
        let (Value::Object(obj), Value::Object(safe)) = (&mut value, &mut redacted) else {
            return Err(HttpError::Build(
                "body auth requires a JSON object request body".into(),
            ));
        };
        obj.insert((*name).to_string(), Value::String(secret.to_string()));
        safe.insert((*name).to_string(), Value::String(REDACTED.into()));
    }

    let bytes =
        serde_json::to_vec(&value).map_err(|e| HttpError::Build(format!("body encode: {e}")))?;
    Ok(EncodedBody {
        bytes,
        redacted: redacted.to_string(),
    })
}

#[derive(Debug, PartialEq, Eq)]
struct ApiErrorInfo {
    message: String,
    code: String,
}

fn extract_error_info(body: &[u8]) -> ApiErrorInfo {
    // Misskey: {"error":{"message":"...","code":"NO_SUCH_USER","id":"..."}}
    #[derive(Deserialize)]
    struct MisskeyEnv {
        error: MisskeyDetail,
    }
    #[derive(Deserialize)]
    struct MisskeyDetail {
        #[serde(default)]
        message: String,
        #[serde(default)]
        code: String,
    }

    // Generic: {"message":"..."} or {"detail":"..."} or {"error":"..."}
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(env) = serde_json::from_slice::<MisskeyEnv>(body) {
        let message = if env.error.message.is_empty() {
            snip_body(body)
        } else {
            env.error.message
        };
        return ApiErrorInfo {
            message,
            code: non_empty_or_dash(env.error.code),
        };
    }
    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        let message = [m.message, m.detail, m.error]
            .into_iter()
            .find(|s| !s.is_empty());
        if let Some(message) = message {
            return ApiErrorInfo {
                message,
                code: "-".into(),
            };
        }
    }
    ApiErrorInfo {
        message: snip_body(body),
        code: "-".into(),
    }
}

fn non_empty_or_dash(s: String) -> String {
    if s.is_empty() { "-".into() } else { s }
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > 500 {
        truncate_at_char_boundary(&mut snip, 500);
        snip.push_str("...");
    }
    snip
}

fn truncate_at_char_boundary(s: &mut String, max: usize) {
    let mut cut = max.min(s.len());
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    // Trim outer spaces/quotes, then strip any embedded whitespace.
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if !s.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build(
            "API key contains control characters".into(),
        ));
    }

    HeaderValue::from_str(&format!("Bearer {}", s))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}
