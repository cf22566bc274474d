use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use clauseguard_api::request::HttpRequest;
use clauseguard_api::runtime::HttpResponse;
use clauseguard_core::auth::{Session, User};
use clauseguard_core::types::UserId;

use crate::traits::{Clock, Transport};

type Handler = Box<dyn Fn(&HttpRequest) -> anyhow::Result<HttpResponse> + Send + Sync>;

pub struct ScriptedTransport {
    handler: Handler,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(
        handler: impl Fn(&HttpRequest) -> anyhow::Result<HttpResponse> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(vec![]),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, path_suffix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.url.split('?').next().unwrap().ends_with(path_suffix))
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, req: &HttpRequest) -> anyhow::Result<HttpResponse> {
        self.requests.lock().unwrap().push(req.clone());
        (self.handler)(req)
    }
}

pub fn json(status: u16, body: serde_json::Value) -> anyhow::Result<HttpResponse> {
    Ok(HttpResponse {
        status,
        body: body.to_string().into_bytes(),
    })
}

/// Sleeps return at once and advance the fake wall clock.
pub struct TestClock {
    now: AtomicI64,
    sleeps: Mutex<Vec<Duration>>,
}

impl TestClock {
    pub fn at(now_unix: i64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicI64::new(now_unix),
            sleeps: Mutex::new(vec![]),
        })
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for TestClock {
    fn now_unix(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }

    fn now_rfc3339(&self) -> String {
        chrono::DateTime::from_timestamp(self.now_unix(), 0)
            .unwrap()
            .to_rfc3339()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.now
            .fetch_add(duration.as_secs().max(1) as i64, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }
}

pub fn session(access_token: &str, expires_at: i64) -> Session {
    Session {
        user: User {
            id: UserId::new("user-1"),
            email: Some("ann@example.com".into()),
            full_name: None,
        },
        access_token: access_token.into(),
        refresh_token: "refresh-1".into(),
        expires_at,
    }
}
