use anyhow::Context;
use async_trait::async_trait;
use clauseguard_core::auth::Session;
use clauseguard_engine::traits::SessionVault;

use crate::defaults::{KEYRING_SERVICE, KEYRING_SESSION_USER};

/// Keeps the signed-in session in the OS keyring as one JSON blob.
#[derive(Debug, Clone)]
pub struct KeyringVault {
    service: String,
    user: String,
}

impl Default for KeyringVault {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE, KEYRING_SESSION_USER)
    }
}

impl KeyringVault {
    pub fn new(service: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            user: user.into(),
        }
    }

    fn entry(&self) -> anyhow::Result<keyring::Entry> {
        keyring::Entry::new(&self.service, &self.user).context("create keyring entry")
    }

    fn load_blocking(&self) -> anyhow::Result<Option<Session>> {
        match self.entry()?.get_password() {
            Ok(v) => decode_session(&v),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(anyhow::Error::new(e)).context("get session"),
        }
    }

    fn store_blocking(&self, session: &Session) -> anyhow::Result<()> {
        let json = encode_session(session)?;
        self.entry()?.set_password(&json).context("set session")
    }

    fn clear_blocking(&self) -> anyhow::Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)).context("delete session"),
        }
    }
}

fn encode_session(session: &Session) -> anyhow::Result<String> {
    serde_json::to_string(session).context("encode session")
}

/// A blob we can't read is treated as no session; the user just signs in again.
fn decode_session(raw: &str) -> anyhow::Result<Option<Session>> {
    match serde_json::from_str(raw) {
        Ok(s) => Ok(Some(s)),
        Err(e) => {
            log::warn!("discarding unreadable stored session: {e}");
            Ok(None)
        }
    }
}

// keyring calls block on platform services, keep them off the async workers.
#[async_trait]
impl SessionVault for KeyringVault {
    async fn load(&self) -> anyhow::Result<Option<Session>> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.load_blocking())
            .await
            .context("keyring task")?
    }

    async fn store(&self, session: &Session) -> anyhow::Result<()> {
        let this = self.clone();
        let session = session.clone();
        tokio::task::spawn_blocking(move || this.store_blocking(&session))
            .await
            .context("keyring task")?
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.clear_blocking())
            .await
            .context("keyring task")?
    }
}
