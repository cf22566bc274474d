use anyhow::{Context, anyhow};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use clauseguard_core::analysis::Analysis;
use clauseguard_core::auth::{Session, User};
use clauseguard_core::contract::{Contract, UploadedContract};
use clauseguard_core::dashboard::DashboardStats;
use clauseguard_core::types::UserId;
use serde::Deserialize;
use serde::de::DeserializeOwned;

// Used when the identity provider reports no expiry at all.
const FALLBACK_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

fn parse_data<T: DeserializeOwned>(body: &[u8], what: &str) -> anyhow::Result<T> {
    let env: Envelope<T> =
        serde_json::from_slice(body).with_context(|| format!("decode {what} JSON"))?;
    Ok(env.data)
}

#[derive(Debug, Deserialize)]
struct ContractList {
    #[serde(default)]
    contracts: Option<Vec<Contract>>,
}

pub fn parse_contract_list(body: &[u8]) -> anyhow::Result<Vec<Contract>> {
    let list: ContractList = parse_data(body, "contract list")?;
    Ok(list.contracts.unwrap_or_default())
}

pub fn parse_contract(body: &[u8]) -> anyhow::Result<Contract> {
    parse_data(body, "contract")
}

pub fn parse_uploaded_contract(body: &[u8]) -> anyhow::Result<UploadedContract> {
    parse_data(body, "upload")
}

pub fn parse_analysis(body: &[u8]) -> anyhow::Result<Analysis> {
    parse_data(body, "analysis")
}

pub fn parse_dashboard_stats(body: &[u8]) -> anyhow::Result<DashboardStats> {
    parse_data(body, "dashboard stats")
}

fn first_string(body: &[u8], keys: &[&str]) -> Option<String> {
    let v: serde_json::Value = serde_json::from_slice(body).ok()?;
    keys.iter()
        .filter_map(|k| v.get(*k).and_then(|x| x.as_str()))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Server-provided error text from a backend error body, if any.
pub fn error_message(body: &[u8]) -> Option<String> {
    first_string(body, &["error", "message", "detail"])
}

/// Error text from an identity provider error body, if any.
pub fn gotrue_error_message(body: &[u8]) -> Option<String> {
    first_string(body, &["error_description", "msg", "message", "error"])
}

#[derive(Debug, Default, Deserialize)]
struct GotrueMetadata {
    #[serde(default)]
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GotrueUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<GotrueMetadata>,
}

impl From<GotrueUser> for User {
    fn from(u: GotrueUser) -> Self {
        User {
            id: UserId::new(u.id),
            email: u.email.filter(|e| !e.is_empty()),
            full_name: u.user_metadata.unwrap_or_default().full_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GotrueSession {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: GotrueUser,
}

impl GotrueSession {
    fn into_session(self, now_unix: i64) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now_unix + secs))
            .or_else(|| jwt_expiry(&self.access_token))
            .unwrap_or(now_unix + FALLBACK_TOKEN_LIFETIME_SECS);
        Session {
            user: self.user.into(),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

/// Reads the `exp` claim without verifying the signature.
pub fn jwt_expiry(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("exp")?.as_i64()
}

pub fn parse_gotrue_session(body: &[u8], now_unix: i64) -> anyhow::Result<Session> {
    let s: GotrueSession = serde_json::from_slice(body).context("decode auth session JSON")?;
    Ok(s.into_session(now_unix))
}

pub fn parse_gotrue_user(body: &[u8]) -> anyhow::Result<User> {
    let u: GotrueUser = serde_json::from_slice(body).context("decode auth user JSON")?;
    Ok(u.into())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(Session),
    /// The account exists but the email address must be confirmed first.
    ConfirmationRequired(User),
}

pub fn parse_signup(body: &[u8], now_unix: i64) -> anyhow::Result<SignUpOutcome> {
    let v: serde_json::Value = serde_json::from_slice(body).context("decode sign-up JSON")?;
    if v.get("access_token").is_some_and(|t| t.is_string()) {
        return Ok(SignUpOutcome::SignedIn(parse_gotrue_session(body, now_unix)?));
    }

    // Without a session the provider answers with the user, either bare or
    // nested under `user`.
    let user = v.get("user").cloned().unwrap_or(v);
    let user: GotrueUser =
        serde_json::from_value(user).map_err(|e| anyhow!("decode sign-up user: {e}"))?;
    Ok(SignUpOutcome::ConfirmationRequired(user.into()))
}
