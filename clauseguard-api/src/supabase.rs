use serde_json::json;
use url::form_urlencoded;

use crate::backend::join_url;
use crate::request::HttpRequest;

#[derive(Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

fn auth_url(cfg: &SupabaseConfig, path: &str, query: &[(&str, &str)]) -> String {
    let url = join_url(&cfg.url, &format!("/auth/v1/{}", path.trim_start_matches('/')));
    if query.is_empty() {
        return url;
    }
    let qs = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query)
        .finish();
    format!("{url}?{qs}")
}

fn gotrue(req: HttpRequest, cfg: &SupabaseConfig) -> HttpRequest {
    req.with_header("apikey", cfg.anon_key.clone())
        .with_header("Accept", "application/json")
}

pub fn password_grant_request(cfg: &SupabaseConfig, email: &str, password: &str) -> HttpRequest {
    let url = auth_url(cfg, "token", &[("grant_type", "password")]);
    gotrue(HttpRequest::post(url), cfg).with_json(&json!({
        "email": email.trim(),
        "password": password,
    }))
}

pub fn refresh_grant_request(cfg: &SupabaseConfig, refresh_token: &str) -> HttpRequest {
    let url = auth_url(cfg, "token", &[("grant_type", "refresh_token")]);
    gotrue(HttpRequest::post(url), cfg).with_json(&json!({ "refresh_token": refresh_token }))
}

pub fn signup_request(cfg: &SupabaseConfig, email: &str, password: &str) -> HttpRequest {
    gotrue(HttpRequest::post(auth_url(cfg, "signup", &[])), cfg).with_json(&json!({
        "email": email.trim(),
        "password": password,
    }))
}

pub fn logout_request(cfg: &SupabaseConfig, access_token: &str) -> HttpRequest {
    gotrue(HttpRequest::post(auth_url(cfg, "logout", &[])), cfg).with_bearer(access_token)
}

pub fn recover_request(cfg: &SupabaseConfig, email: &str, redirect_to: Option<&str>) -> HttpRequest {
    let query: Vec<(&str, &str)> = redirect_to.map(|r| ("redirect_to", r)).into_iter().collect();
    gotrue(HttpRequest::post(auth_url(cfg, "recover", &query)), cfg)
        .with_json(&json!({ "email": email.trim() }))
}

pub fn update_password_request(cfg: &SupabaseConfig, access_token: &str, password: &str) -> HttpRequest {
    gotrue(HttpRequest::put(auth_url(cfg, "user", &[])), cfg)
        .with_bearer(access_token)
        .with_json(&json!({ "password": password }))
}

/// Browser URL that starts an OAuth sign-in; the provider redirects back to
/// `{origin}/auth/callback`.
pub fn authorize_url(cfg: &SupabaseConfig, provider: &str, origin: &str) -> String {
    let redirect_to = join_url(origin, "/auth/callback");
    auth_url(
        cfg,
        "authorize",
        &[("provider", provider), ("redirect_to", redirect_to.as_str())],
    )
}

/// Where the recovery email sends the user.
pub fn reset_redirect(origin: &str) -> String {
    join_url(origin, "/auth/reset-password")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SupabaseConfig {
        SupabaseConfig {
            url: "https://proj.supabase.co/".into(),
            anon_key: "anon".into(),
        }
    }

    #[test]
    fn password_grant_targets_token_endpoint() {
        let req = password_grant_request(&cfg(), " a@b.co ", "pw");
        assert_eq!(req.url, "https://proj.supabase.co/auth/v1/token?grant_type=password");
        assert_eq!(req.header("apikey"), Some("anon"));
        assert_eq!(
            req.json_body(),
            Some(serde_json::json!({"email": "a@b.co", "password": "pw"}))
        );
    }

    #[test]
    fn update_password_is_authorized_put() {
        let req = update_password_request(&cfg(), "at", "newpassword");
        assert_eq!(req.method, "PUT");
        assert!(req.url.ends_with("/auth/v1/user"));
        assert_eq!(req.header("authorization"), Some("Bearer at"));
    }

    #[test]
    fn recover_and_authorize_encode_redirects() {
        let req = recover_request(&cfg(), "a@b.co", Some(&reset_redirect("http://localhost:5173")));
        assert_eq!(
            req.url,
            "https://proj.supabase.co/auth/v1/recover?redirect_to=http%3A%2F%2Flocalhost%3A5173%2Fauth%2Freset-password"
        );

        let url = authorize_url(&cfg(), "google", "https://app.example.com/");
        assert_eq!(
            url,
            "https://proj.supabase.co/auth/v1/authorize?provider=google&redirect_to=https%3A%2F%2Fapp.example.com%2Fauth%2Fcallback"
        );
    }

    #[test]
    fn debug_hides_anon_key() {
        assert!(!format!("{:?}", cfg()).contains("\"anon\""));
    }
}
