use std::sync::Arc;

use clauseguard_api::parse::{
    SignUpOutcome, gotrue_error_message, parse_gotrue_session, parse_signup,
};
use clauseguard_api::request::HttpRequest;
use clauseguard_api::runtime::HttpResponse;
use clauseguard_api::supabase::{
    SupabaseConfig, authorize_url, logout_request, password_grant_request, recover_request,
    refresh_grant_request, reset_redirect, signup_request, update_password_request,
};
use clauseguard_core::auth::{
    AuthState, Session, User, validate_credentials, validate_email, validate_new_password,
};
use clauseguard_core::config::AppConfig;
use tokio::sync::{Mutex, watch};

use crate::error::ClientError;
use crate::traits::{Clock, SessionVault, Transport};

/// Owns the signed-in session and hands out fresh bearer tokens.
///
/// Lifecycle: `Initializing` until [`SessionManager::init`] restores (or fails
/// to restore) a persisted session, then `SignedIn` / `SignedOut`.
pub struct SessionManager {
    supabase: Option<SupabaseConfig>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    vault: Arc<dyn SessionVault>,
    skew_secs: i64,

    // Held across a refresh so concurrent callers wait for one refresh
    // instead of starting their own.
    current: Mutex<Option<Session>>,
    state: watch::Sender<AuthState>,
}

impl SessionManager {
    pub fn new(
        cfg: &AppConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        vault: Arc<dyn SessionVault>,
    ) -> Self {
        let supabase = cfg.has_identity_provider().then(|| SupabaseConfig {
            url: cfg.supabase_url.trim().to_string(),
            anon_key: cfg.supabase_anon_key.trim().to_string(),
        });
        Self {
            supabase,
            transport,
            clock,
            vault,
            skew_secs: cfg.token_refresh_skew_secs,
            current: Mutex::new(None),
            state: watch::Sender::new(AuthState::Initializing),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    fn supabase(&self) -> Result<&SupabaseConfig, ClientError> {
        self.supabase.as_ref().ok_or(ClientError::NotConfigured)
    }

    async fn send(&self, req: &HttpRequest) -> Result<HttpResponse, ClientError> {
        self.transport
            .execute(req)
            .await
            .map_err(ClientError::Transport)
    }

    fn refused(resp: &HttpResponse, fallback: &str) -> ClientError {
        ClientError::Auth(gotrue_error_message(&resp.body).unwrap_or_else(|| fallback.into()))
    }

    async fn install(&self, slot: &mut Option<Session>, session: Session) {
        if let Err(e) = self.vault.store(&session).await {
            log::warn!("failed to persist session: {e:#}");
        }
        let user = session.user.clone();
        *slot = Some(session);
        self.state.send_replace(AuthState::SignedIn(user));
    }

    async fn clear(&self, slot: &mut Option<Session>) {
        *slot = None;
        if let Err(e) = self.vault.clear().await {
            log::warn!("failed to clear persisted session: {e:#}");
        }
        self.state.send_replace(AuthState::SignedOut);
    }

    /// Restores a persisted session, refreshing it first if it is about to expire.
    pub async fn init(&self) -> AuthState {
        let mut slot = self.current.lock().await;
        let restored = match self.vault.load().await {
            Ok(s) => s,
            Err(e) => {
                log::warn!("failed to read persisted session: {e:#}");
                None
            }
        };

        match restored {
            None => {
                *slot = None;
                self.state.send_replace(AuthState::SignedOut);
            }
            Some(session) if session.expires_within(self.clock.now_unix(), self.skew_secs) => {
                match self.refresh(&session).await {
                    Ok(fresh) => self.install(&mut slot, fresh).await,
                    Err(e) => {
                        log::info!("stored session could not be refreshed: {e}");
                        self.clear(&mut slot).await;
                    }
                }
            }
            Some(session) => {
                let user = session.user.clone();
                *slot = Some(session);
                self.state.send_replace(AuthState::SignedIn(user));
            }
        }
        self.state()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, ClientError> {
        validate_credentials(email, password)?;
        let cfg = self.supabase()?;

        let resp = self.send(&password_grant_request(cfg, email, password)).await?;
        if !resp.is_success() {
            return Err(Self::refused(&resp, "Invalid login credentials"));
        }
        let session =
            parse_gotrue_session(&resp.body, self.clock.now_unix()).map_err(ClientError::Decode)?;
        let user = session.user.clone();

        let mut slot = self.current.lock().await;
        self.install(&mut slot, session).await;
        log::info!("signed in as {}", user.display_name());
        Ok(user)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ClientError> {
        validate_credentials(email, password)?;
        let cfg = self.supabase()?;

        let resp = self.send(&signup_request(cfg, email, password)).await?;
        if !resp.is_success() {
            return Err(Self::refused(&resp, "Sign up failed"));
        }
        let outcome = parse_signup(&resp.body, self.clock.now_unix()).map_err(ClientError::Decode)?;
        if let SignUpOutcome::SignedIn(session) = &outcome {
            let mut slot = self.current.lock().await;
            self.install(&mut slot, session.clone()).await;
        }
        Ok(outcome)
    }

    /// OAuth sign-in URL; the browser returns to `{origin}/auth/callback`.
    pub fn provider_sign_in_url(&self, provider: &str, origin: &str) -> Result<String, ClientError> {
        Ok(authorize_url(self.supabase()?, provider, origin))
    }

    pub async fn reset_password(&self, email: &str, origin: Option<&str>) -> Result<(), ClientError> {
        validate_email(email)?;
        let cfg = self.supabase()?;
        let redirect = origin.map(reset_redirect);

        let resp = self
            .send(&recover_request(cfg, email, redirect.as_deref()))
            .await?;
        if !resp.is_success() {
            return Err(Self::refused(&resp, "Failed to send reset email"));
        }
        Ok(())
    }

    pub async fn update_password(&self, new: &str, confirm: &str) -> Result<(), ClientError> {
        validate_new_password(new, confirm)?;
        let cfg = self.supabase()?;
        let token = self.access_token().await?;

        let resp = self.send(&update_password_request(cfg, &token, new)).await?;
        if resp.status == 401 {
            self.force_sign_out().await;
            return Err(ClientError::Unauthorized);
        }
        if !resp.is_success() {
            return Err(Self::refused(&resp, "Failed to update password"));
        }
        log::info!("password updated");
        Ok(())
    }

    async fn refresh(&self, session: &Session) -> Result<Session, ClientError> {
        let cfg = self.supabase()?;
        let resp = self
            .send(&refresh_grant_request(cfg, &session.refresh_token))
            .await?;
        if !resp.is_success() {
            return Err(Self::refused(&resp, "Session expired"));
        }
        let mut fresh =
            parse_gotrue_session(&resp.body, self.clock.now_unix()).map_err(ClientError::Decode)?;
        if fresh.user.full_name.is_none() {
            fresh.user.full_name = session.user.full_name.clone();
        }
        log::debug!("access token refreshed");
        Ok(fresh)
    }

    /// A bearer token that is valid right now; refreshes transparently when
    /// the current one is close to expiry.
    pub async fn access_token(&self) -> Result<String, ClientError> {
        let mut slot = self.current.lock().await;
        let Some(session) = slot.clone() else {
            return Err(ClientError::NotAuthenticated);
        };

        let now = self.clock.now_unix();
        if !session.expires_within(now, self.skew_secs) {
            return Ok(session.access_token);
        }

        match self.refresh(&session).await {
            Ok(fresh) => {
                let token = fresh.access_token.clone();
                self.install(&mut slot, fresh).await;
                Ok(token)
            }
            // A network blip should not sign the user out while the token
            // still works.
            Err(ClientError::Transport(e)) if session.expires_at > now => {
                log::warn!("token refresh failed, using current token: {e:#}");
                Ok(session.access_token)
            }
            Err(ClientError::Transport(e)) => Err(ClientError::Transport(e)),
            Err(e) => {
                log::warn!("token refresh rejected, signing out: {e}");
                self.clear(&mut slot).await;
                Err(ClientError::Unauthorized)
            }
        }
    }

    /// Revokes the session upstream (best effort) and always clears it locally.
    pub async fn sign_out(&self) {
        let mut slot = self.current.lock().await;
        if let (Some(session), Some(cfg)) = (slot.as_ref(), self.supabase.as_ref()) {
            match self.send(&logout_request(cfg, &session.access_token)).await {
                Ok(resp) if !resp.is_success() => {
                    log::debug!("logout returned status {}", resp.status);
                }
                Ok(_) => {}
                Err(e) => log::warn!("logout request failed: {e}"),
            }
        }
        self.clear(&mut slot).await;
        log::info!("signed out");
    }

    /// Clears the session after the backend rejected its token.
    pub async fn force_sign_out(&self) {
        let mut slot = self.current.lock().await;
        if slot.is_some() {
            log::warn!("backend rejected the session, forcing sign-out");
        }
        self.clear(&mut slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedTransport, TestClock, json, session};
    use crate::traits::MemoryVault;
    use serde_json::json as j;

    fn cfg() -> AppConfig {
        AppConfig {
            supabase_url: "https://proj.supabase.co".into(),
            supabase_anon_key: "anon".into(),
            ..Default::default()
        }
    }

    fn token_body(access: &str, expires_in: i64) -> serde_json::Value {
        j!({
            "access_token": access,
            "refresh_token": "refresh-2",
            "expires_in": expires_in,
            "user": {"id": "user-1", "email": "ann@example.com"}
        })
    }

    #[tokio::test]
    async fn init_without_stored_session_is_signed_out() {
        let transport = ScriptedTransport::new(|_| panic!("no network expected"));
        let mgr = SessionManager::new(&cfg(), transport, TestClock::at(0), Arc::new(MemoryVault::default()));
        assert_eq!(mgr.state(), AuthState::Initializing);
        assert_eq!(mgr.init().await, AuthState::SignedOut);
        assert!(matches!(mgr.access_token().await, Err(ClientError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn sign_in_stores_session_and_publishes_state() {
        let transport = ScriptedTransport::new(|req| {
            assert!(req.url.contains("grant_type=password"));
            json(200, token_body("access-1", 3600))
        });
        let vault = Arc::new(MemoryVault::default());
        let mgr = SessionManager::new(&cfg(), transport, TestClock::at(1000), vault.clone());
        mgr.init().await;
        let mut rx = mgr.subscribe();

        let user = mgr.sign_in("ann@example.com", "pw").await.unwrap();
        assert_eq!(user.display_name(), "ann");
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().user().map(|u| u.id.as_str()), Some("user-1"));
        assert_eq!(mgr.access_token().await.unwrap(), "access-1");
        assert_eq!(vault.load().await.unwrap().unwrap().expires_at, 4600);
    }

    #[tokio::test]
    async fn bad_credentials_surface_provider_message() {
        let transport = ScriptedTransport::new(|_| {
            json(400, j!({"error": "invalid_grant", "error_description": "Invalid login credentials"}))
        });
        let mgr = SessionManager::new(&cfg(), transport.clone(), TestClock::at(0), Arc::new(MemoryVault::default()));
        let err = mgr.sign_in("ann@example.com", "nope").await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid login credentials");

        let err = mgr.sign_in("not-an-email", "pw").await.unwrap_err();
        assert!(matches!(err, ClientError::Credentials(_)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn init_refreshes_a_nearly_expired_session() {
        let transport = ScriptedTransport::new(|req| {
            assert!(req.url.contains("grant_type=refresh_token"));
            json(200, token_body("access-2", 3600))
        });
        let vault = Arc::new(MemoryVault::with_session(session("access-1", 1030)));
        let mgr = SessionManager::new(&cfg(), transport.clone(), TestClock::at(1000), vault.clone());

        assert!(matches!(mgr.init().await, AuthState::SignedIn(_)));
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(mgr.access_token().await.unwrap(), "access-2");
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(vault.load().await.unwrap().unwrap().refresh_token, "refresh-2");
    }

    #[tokio::test]
    async fn concurrent_refresh_happens_once() {
        let transport = ScriptedTransport::new(|_| json(200, token_body("access-2", 3600)));
        let vault = Arc::new(MemoryVault::with_session(session("access-1", 2000)));
        let clock = TestClock::at(1000);
        let mgr = Arc::new(SessionManager::new(&cfg(), transport.clone(), clock.clone(), vault));
        mgr.init().await;
        assert!(transport.requests().is_empty());

        // Move the clock into the refresh window.
        clock.sleep(std::time::Duration::from_secs(960)).await;
        let (a, b, c) = tokio::join!(mgr.access_token(), mgr.access_token(), mgr.access_token());
        for token in [a, b, c] {
            assert_eq!(token.unwrap(), "access-2");
        }
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn rejected_refresh_signs_out() {
        let transport = ScriptedTransport::new(|_| json(400, j!({"error": "invalid_grant"})));
        let vault = Arc::new(MemoryVault::with_session(session("access-1", 2000)));
        let clock = TestClock::at(1000);
        let mgr = SessionManager::new(&cfg(), transport, clock.clone(), vault.clone());
        mgr.init().await;

        clock.sleep(std::time::Duration::from_secs(990)).await;
        assert!(matches!(mgr.access_token().await, Err(ClientError::Unauthorized)));
        assert_eq!(mgr.state(), AuthState::SignedOut);
        assert!(vault.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sign_out_revokes_and_clears_even_when_revoke_fails() {
        let transport = ScriptedTransport::new(|req| {
            assert!(req.url.ends_with("/auth/v1/logout"));
            Err(anyhow::anyhow!("offline"))
        });
        let vault = Arc::new(MemoryVault::with_session(session("access-1", 99_999)));
        let mgr = SessionManager::new(&cfg(), transport.clone(), TestClock::at(0), vault.clone());
        mgr.init().await;

        mgr.sign_out().await;
        assert_eq!(transport.count("POST", "/auth/v1/logout"), 1);
        assert_eq!(mgr.state(), AuthState::SignedOut);
        assert!(vault.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_password_checks_locally_first() {
        let transport = ScriptedTransport::new(|req| {
            assert_eq!(req.method, "PUT");
            json(200, j!({"id": "user-1"}))
        });
        let vault = Arc::new(MemoryVault::with_session(session("access-1", 99_999)));
        let mgr = SessionManager::new(&cfg(), transport.clone(), TestClock::at(0), vault);
        mgr.init().await;

        let err = mgr.update_password("abcdefgh", "abcdefgX").await.unwrap_err();
        assert_eq!(err.user_message(), "New passwords do not match");
        let err = mgr.update_password("short", "short").await.unwrap_err();
        assert_eq!(err.user_message(), "Password must be at least 8 characters long");
        assert!(transport.requests().is_empty());

        mgr.update_password("longer-pass", "longer-pass").await.unwrap();
        assert_eq!(transport.requests()[0].header("authorization"), Some("Bearer access-1"));
    }

    #[tokio::test]
    async fn missing_identity_provider_is_reported() {
        let transport = ScriptedTransport::new(|_| panic!("no network expected"));
        let mgr = SessionManager::new(&AppConfig::default(), transport, TestClock::at(0), Arc::new(MemoryVault::default()));
        assert!(matches!(
            mgr.sign_in("ann@example.com", "pw").await,
            Err(ClientError::NotConfigured)
        ));
    }
}
