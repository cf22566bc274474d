use std::time::Duration;

use async_trait::async_trait;
use clauseguard_api::request::HttpRequest;
use clauseguard_api::runtime::{HttpClient, HttpResponse};
use clauseguard_core::auth::Session;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, req: &HttpRequest) -> anyhow::Result<HttpResponse>;
}

#[async_trait]
impl Transport for HttpClient {
    async fn execute(&self, req: &HttpRequest) -> anyhow::Result<HttpResponse> {
        HttpClient::execute(self, req).await
    }
}

#[async_trait]
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> i64;
    fn now_rfc3339(&self) -> String;
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now_unix(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn now_rfc3339(&self) -> String {
        chrono::Utc::now().to_rfc3339()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Where the signed-in session survives between runs.
#[async_trait]
pub trait SessionVault: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<Session>>;
    async fn store(&self, session: &Session) -> anyhow::Result<()>;
    async fn clear(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryVault {
    inner: tokio::sync::Mutex<Option<Session>>,
}

impl MemoryVault {
    pub fn with_session(session: Session) -> Self {
        Self {
            inner: tokio::sync::Mutex::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionVault for MemoryVault {
    async fn load(&self) -> anyhow::Result<Option<Session>> {
        Ok(self.inner.lock().await.clone())
    }

    async fn store(&self, session: &Session) -> anyhow::Result<()> {
        *self.inner.lock().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        *self.inner.lock().await = None;
        Ok(())
    }
}
