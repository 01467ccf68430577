//! In-memory org and authenticator shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use sfmcp_core::backend::{BackendClient, HttpMethod, HttpRequest, HttpResponse, OrgTransport, RetryPolicy};
use sfmcp_core::config::{BridgeConfig, Credentials};
use sfmcp_core::error::{BridgeError, BridgeResult};
use sfmcp_core::session::{Authenticator, SessionGrant, SessionManager};
use sfmcp_core::Dispatcher;

pub const INSTANCE_URL: &str = "https://acme.my.salesforce.com";
pub const DATA: &str = "/services/data/v59.0";

/// A request the fake org received
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<String>,
    pub authorization: Option<String>,
}

impl RecordedCall {
    pub fn body_json(&self) -> Value {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
            .unwrap_or(Value::Null)
    }
}

struct Route {
    method: HttpMethod,
    prefix: String,
    body_contains: Option<String>,
    replies: VecDeque<HttpResponse>,
}

/// Fake org answering by method and path prefix
///
/// Each route holds a queue of replies; the last reply repeats once the
/// queue is down to one. Body-matching routes win over plain ones, then
/// the longest prefix wins. Unmatched requests get a 404.
#[derive(Default)]
pub struct FakeOrg {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeOrg {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer `method prefix*` with `replies` in order
    pub fn on(&self, method: HttpMethod, prefix: &str, replies: Vec<HttpResponse>) {
        self.add(method, prefix, None, replies);
    }

    /// Answer `method prefix*` whose body contains `needle`
    pub fn on_body(&self, method: HttpMethod, prefix: &str, needle: &str, replies: Vec<HttpResponse>) {
        self.add(method, prefix, Some(needle.to_string()), replies);
    }

    fn add(&self, method: HttpMethod, prefix: &str, body_contains: Option<String>, replies: Vec<HttpResponse>) {
        self.routes.lock().unwrap().push(Route {
            method,
            prefix: prefix.to_string(),
            body_contains,
            replies: replies.into(),
        });
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of calls whose path starts with `prefix`
    pub fn calls_to(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.path.starts_with(prefix))
            .count()
    }

    fn reply(&self, request: &HttpRequest) -> HttpResponse {
        let path = request.path();
        let body = request.body.as_deref().unwrap_or_default();
        let mut routes = self.routes.lock().unwrap();

        let best = routes
            .iter_mut()
            .filter(|r| r.method == request.method && path.starts_with(&r.prefix))
            .filter(|r| r.body_contains.as_ref().map_or(true, |n| body.contains(n.as_str())))
            .max_by_key(|r| (r.body_contains.is_some(), r.prefix.len()));

        match best {
            Some(route) if route.replies.len() > 1 => route.replies.pop_front().unwrap(),
            Some(route) => route
                .replies
                .front()
                .cloned()
                .unwrap_or_else(|| HttpResponse::new(500, "empty route")),
            None => HttpResponse::json(404, json!([{"errorCode": "NOT_FOUND", "message": format!("no route for {}", path)}])),
        }
    }
}

#[async_trait]
impl OrgTransport for FakeOrg {
    fn name(&self) -> &str {
        "fake-org"
    }

    async fn send(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let authorization = request
            .headers
            .iter()
            .find(|(k, _)| k == "Authorization")
            .map(|(_, v)| v.clone());

        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method,
            path: request.path().to_string(),
            body: request.body.clone(),
            authorization,
        });

        Ok(self.reply(&request))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Authenticator
// ═══════════════════════════════════════════════════════════════════════

/// Counts logins and hands out `token-1`, `token-2`, ...
pub struct FakeAuth {
    attempts: AtomicUsize,
    logins: AtomicUsize,
    reject: AtomicBool,
    delay: Duration,
    valid_for_seconds: Option<i64>,
}

impl FakeAuth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
            logins: AtomicUsize::new(0),
            reject: AtomicBool::new(false),
            delay: Duration::ZERO,
            valid_for_seconds: Some(7_200),
        })
    }

    /// Logins take `delay`, so concurrent callers overlap
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
            logins: AtomicUsize::new(0),
            reject: AtomicBool::new(false),
            delay,
            valid_for_seconds: Some(7_200),
        })
    }

    /// Sessions that are already expired when issued
    pub fn expiring() -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
            logins: AtomicUsize::new(0),
            reject: AtomicBool::new(false),
            delay: Duration::ZERO,
            valid_for_seconds: Some(0),
        })
    }

    /// Grants that report `valid_for_seconds` as their lifetime
    pub fn with_lifetime(valid_for_seconds: Option<i64>) -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
            logins: AtomicUsize::new(0),
            reject: AtomicBool::new(false),
            delay: Duration::ZERO,
            valid_for_seconds,
        })
    }

    pub fn rejecting() -> Arc<Self> {
        let auth = Self::new();
        auth.set_reject(true);
        auth
    }

    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    /// Successful logins
    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    /// Every call to `login`, accepted or not
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for FakeAuth {
    async fn login(&self, credentials: &Credentials) -> BridgeResult<SessionGrant> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.reject.load(Ordering::SeqCst) {
            return Err(BridgeError::authentication(format!(
                "INVALID_LOGIN: Invalid username, password, security token; or user locked out ({})",
                credentials.username
            )));
        }

        let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SessionGrant {
            access_token: format!("token-{}", n),
            instance_url: INSTANCE_URL.to_string(),
            valid_for_seconds: self.valid_for_seconds,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Wiring
// ═══════════════════════════════════════════════════════════════════════

pub fn credentials() -> Credentials {
    Credentials::new("admin@acme.example", "s3cret", "TOKEN")
}

/// Config with instant retries so tests never sleep
pub fn test_config() -> BridgeConfig {
    BridgeConfig::builder()
        .retry(RetryPolicy::immediate(3))
        .max_query_records(10_000)
        .build()
}

pub fn backend(org: &Arc<FakeOrg>, auth: &Arc<FakeAuth>, config: &BridgeConfig) -> BackendClient {
    let transport: Arc<dyn OrgTransport> = Arc::clone(org) as Arc<dyn OrgTransport>;
    let authenticator: Arc<dyn Authenticator> = Arc::clone(auth) as Arc<dyn Authenticator>;
    let sessions = Arc::new(SessionManager::new(authenticator, credentials()));
    BackendClient::new(transport, sessions, config)
}

pub fn dispatcher_with(org: &Arc<FakeOrg>, auth: &Arc<FakeAuth>, config: BridgeConfig) -> Dispatcher {
    Dispatcher::new(backend(org, auth, &config), config)
}

pub fn dispatcher(org: &Arc<FakeOrg>) -> (Dispatcher, Arc<FakeAuth>) {
    let auth = FakeAuth::new();
    (dispatcher_with(org, &auth, test_config()), auth)
}

// ═══════════════════════════════════════════════════════════════════════
// Canned responses
// ═══════════════════════════════════════════════════════════════════════

pub fn ok(body: Value) -> HttpResponse {
    HttpResponse::json(200, body)
}

pub fn created(id: &str) -> HttpResponse {
    HttpResponse::json(201, json!({"id": id, "success": true, "errors": [], "warnings": [], "infos": []}))
}

pub fn sf_error(status: u16, code: &str, message: &str) -> HttpResponse {
    HttpResponse::json(status, json!([{"errorCode": code, "message": message}]))
}

pub fn session_expired() -> HttpResponse {
    sf_error(401, "INVALID_SESSION_ID", "Session expired or invalid")
}

pub fn server_error() -> HttpResponse {
    HttpResponse::new(503, "<html>Service Unavailable</html>")
}

/// One SOQL page of `count` records numbered from `start`
pub fn soql_page(start: usize, count: usize, total: usize, next: Option<&str>) -> HttpResponse {
    let records: Vec<Value> = (start..start + count)
        .map(|i| json!({"attributes": {"type": "Account"}, "Id": format!("001{:012}", i), "Name": format!("Account {}", i)}))
        .collect();

    let mut body = json!({
        "totalSize": total,
        "done": next.is_none(),
        "records": records,
    });
    if let Some(next) = next {
        body["nextRecordsUrl"] = json!(next);
    }
    HttpResponse::json(200, body)
}

/// Minimal describe payload for `name`
pub fn describe(name: &str, fields: Value) -> HttpResponse {
    ok(json!({
        "name": name,
        "label": name.trim_end_matches("__c").replace('_', " "),
        "labelPlural": format!("{}s", name.trim_end_matches("__c")),
        "custom": name.ends_with("__c"),
        "keyPrefix": "a01",
        "createable": true,
        "updateable": true,
        "deletable": true,
        "fields": fields,
    }))
}
