//! Backend client concurrency tests

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::task::JoinSet;

use common::*;
use sfmcp_core::backend::{BackendClient, HttpRequest, HttpResponse, OrgTransport, RetryPolicy};
use sfmcp_core::config::BridgeConfig;
use sfmcp_core::error::BridgeResult;
use sfmcp_core::session::{Authenticator, SessionManager};

/// Holds every call open for a while and records the peak overlap
#[derive(Default)]
struct SlowOrg {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl OrgTransport for SlowOrg {
    fn name(&self) -> &str {
        "slow-org"
    }

    async fn send(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(25)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(HttpResponse::json(200, json!({"ok": true})))
    }
}

fn slow_backend(org: &Arc<SlowOrg>, max_concurrent_calls: usize) -> Arc<BackendClient> {
    let config = BridgeConfig::builder()
        .max_concurrent_calls(max_concurrent_calls)
        .retry(RetryPolicy::immediate(1))
        .build();
    let sessions = Arc::new(SessionManager::new(
        FakeAuth::new() as Arc<dyn Authenticator>,
        credentials(),
    ));
    Arc::new(BackendClient::new(
        Arc::clone(org) as Arc<dyn OrgTransport>,
        sessions,
        &config,
    ))
}

async fn run_burst(backend: &Arc<BackendClient>, calls: usize) {
    let mut tasks = JoinSet::new();
    for i in 0..calls {
        let backend = Arc::clone(backend);
        tasks.spawn(async move { backend.get(&format!("{DATA}/sobjects/Account/{i}")).await });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap().unwrap();
    }
}

#[tokio::test]
async fn test_concurrent_calls_stay_within_permit_cap() {
    let org = Arc::new(SlowOrg::default());
    let backend = slow_backend(&org, 2);

    run_burst(&backend, 8).await;

    assert_eq!(org.calls.load(Ordering::SeqCst), 8);
    let peak = org.peak.load(Ordering::SeqCst);
    assert!(peak <= 2, "peak in-flight was {peak}");
    assert_eq!(peak, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_permit_serializes_calls() {
    let org = Arc::new(SlowOrg::default());
    let backend = slow_backend(&org, 1);

    run_burst(&backend, 5).await;

    assert_eq!(org.calls.load(Ordering::SeqCst), 5);
    assert_eq!(org.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_zero_cap_is_treated_as_one() {
    let org = Arc::new(SlowOrg::default());
    let backend = slow_backend(&org, 0);

    run_burst(&backend, 3).await;

    assert_eq!(org.peak.load(Ordering::SeqCst), 1);
}
