//! Backend client
//!
//! The only component that talks to the org. Every call:
//!
//! 1. borrows a session snapshot from the [`SessionManager`]
//! 2. takes a concurrency permit
//! 3. sends through the [`OrgTransport`]
//! 4. re-authenticates once if the org rejects the session
//! 5. classifies the response into a value or a [`BridgeError`]
//!
//! Transient failures are retried by the [`RetryPolicy`] around the whole
//! sequence.

pub mod retry;
pub mod transport;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Semaphore;

use crate::auth::SoapLogin;
use crate::config::{BridgeConfig, Credentials};
use crate::error::{BridgeError, BridgeResult};
use crate::session::{Session, SessionManager};

pub use retry::RetryPolicy;
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, OrgTransport};

/// Error code the org uses for an expired or revoked session
const INVALID_SESSION_ID: &str = "INVALID_SESSION_ID";

/// Codes that mean the query or search text itself is wrong
const QUERY_SYNTAX_CODES: &[&str] = &[
    "MALFORMED_QUERY",
    "MALFORMED_SEARCH",
    "INVALID_FIELD",
    "INVALID_TYPE",
    "INVALID_SEARCH",
    "INVALID_QUERY_FILTER_OPERATOR",
    "INVALID_QUERY_LOCATOR",
];

/// Issues authenticated calls against the org
pub struct BackendClient {
    transport: Arc<dyn OrgTransport>,
    sessions: Arc<SessionManager>,
    retry: RetryPolicy,
    permits: Semaphore,
    data_path: String,
}

impl BackendClient {
    /// Create a client from its collaborators
    pub fn new(
        transport: Arc<dyn OrgTransport>,
        sessions: Arc<SessionManager>,
        config: &BridgeConfig,
    ) -> Self {
        Self {
            transport,
            sessions,
            retry: config.retry.clone(),
            permits: Semaphore::new(config.max_concurrent_calls.max(1)),
            data_path: config.data_path(),
        }
    }

    /// Wire up the production stack: reqwest transport and SOAP login
    pub fn connect(config: &BridgeConfig, credentials: Credentials) -> BridgeResult<Self> {
        let transport: Arc<dyn OrgTransport> = Arc::new(HttpTransport::new(config.request_timeout_ms)?);
        let authenticator = Arc::new(SoapLogin::new(
            Arc::clone(&transport),
            &config.login_url,
            &config.api_version,
        ));
        let sessions = Arc::new(SessionManager::new(authenticator, credentials));

        Ok(Self::new(transport, sessions, config))
    }

    /// The session manager this client borrows from
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// REST base path, e.g. `/services/data/v59.0`
    pub fn data_path(&self) -> &str {
        &self.data_path
    }

    /// GET an instance-relative path, retrying transient failures
    pub async fn get(&self, path: &str) -> BridgeResult<Value> {
        self.execute(HttpMethod::Get, path, None, &self.retry).await
    }

    /// POST JSON to an instance-relative path, retrying transient failures
    pub async fn post(&self, path: &str, body: &Value) -> BridgeResult<Value> {
        self.execute(HttpMethod::Post, path, Some(body), &self.retry).await
    }

    /// POST JSON exactly once (apart from a session refresh)
    pub async fn post_once(&self, path: &str, body: &Value) -> BridgeResult<Value> {
        self.execute(HttpMethod::Post, path, Some(body), &RetryPolicy::none()).await
    }

    async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        policy: &RetryPolicy,
    ) -> BridgeResult<Value> {
        let mut attempt = 1;
        loop {
            match self.execute_authenticated(method, path, body).await {
                Ok(value) => return Ok(value),
                Err(e) if policy.should_retry(&e, attempt) => {
                    let delay = policy.delay_for(attempt);
                    tracing::warn!(
                        path = %path,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient backend failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn execute_authenticated(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> BridgeResult<Value> {
        let session = self.sessions.acquire().await?;
        let response = self.send(&session, method, path, body).await?;

        if !is_session_rejected(&response) {
            return classify(response);
        }

        // One silent re-authentication, then give up
        self.sessions.invalidate_generation(session.generation).await;
        let session = self.sessions.acquire().await?;
        let response = self.send(&session, method, path, body).await?;

        if is_session_rejected(&response) {
            let reason = "org rejected a freshly issued session";
            self.sessions.mark_failed(reason).await;
            return Err(BridgeError::authentication(reason));
        }
        classify(response)
    }

    async fn send(
        &self,
        session: &Session,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> BridgeResult<HttpResponse> {
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            session.url(path)
        };

        let request = match (method, body) {
            (HttpMethod::Post, Some(body)) => HttpRequest::post_json(url, body),
            (HttpMethod::Post, None) => HttpRequest::post_json(url, &Value::Null),
            (HttpMethod::Get, _) => HttpRequest::get(url),
        }
        .bearer(&session.access_token)
        .header("Accept", "application/json");

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| BridgeError::Internal("backend permit pool closed".to_string()))?;

        tracing::debug!(method = ?method, path = %request.path(), "Backend call");
        let response = self.transport.send(request).await?;
        tracing::debug!(status = response.status, "Backend response");

        Ok(response)
    }
}

fn is_session_rejected(response: &HttpResponse) -> bool {
    if response.status == 401 {
        return true;
    }
    !response.is_success()
        && first_error(response)
            .map(|(code, _)| code == INVALID_SESSION_ID)
            .unwrap_or(false)
}

/// Turn a raw response into a value or a classified error
pub fn classify(response: HttpResponse) -> BridgeResult<Value> {
    if response.is_success() {
        return response.body_json();
    }

    let status = response.status;
    let (code, message) = first_error(&response).unwrap_or_else(|| {
        (
            format!("HTTP_{}", status),
            truncate(&response.body, 500),
        )
    });

    if status >= 500 {
        return Err(BridgeError::transient(Some(status), format!("{}: {}", code, message)));
    }

    if QUERY_SYNTAX_CODES.contains(&code.as_str()) {
        return Err(BridgeError::QuerySyntax { code, message });
    }

    if status == 403 || code.starts_with("INSUFFICIENT_ACCESS") || code == "API_DISABLED_FOR_ORG" {
        return Err(BridgeError::Permission { code, message });
    }

    if status == 404 || code == "NOT_FOUND" {
        return Err(BridgeError::NotFound { code, message });
    }

    Err(BridgeError::Backend { status, code, message })
}

/// First `(errorCode, message)` pair from an org error body
///
/// The org answers with either an array of error objects or a single one.
fn first_error(response: &HttpResponse) -> Option<(String, String)> {
    let body: Value = serde_json::from_str(&response.body).ok()?;
    let entry = match &body {
        Value::Array(items) => items.first()?.clone(),
        Value::Object(_) => body.clone(),
        _ => return None,
    };

    let code = entry
        .get("errorCode")
        .or_else(|| entry.get("statusCode"))
        .and_then(Value::as_str)?
        .to_string();
    let message = entry
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some((code, message))
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
