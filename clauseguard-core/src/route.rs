use crate::auth::AuthState;
use crate::types::ContractId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    Upload,
    Contracts,
    Analysis(ContractId),
    Account,
    About,
    Contact,
    Privacy,
    Terms,
    Legal,
    AuthCallback,
    NotFound(String),
}

impl Route {
    pub fn parse(path: &str) -> Self {
        // Query strings and fragments do not take part in matching.
        let path = path.split(['?', '#']).next().unwrap_or("");
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Dashboard,
            ["upload"] => Route::Upload,
            ["contracts"] => Route::Contracts,
            ["contracts", id, "analysis"] => Route::Analysis(ContractId::new(*id)),
            ["account"] => Route::Account,
            ["about"] => Route::About,
            ["contact"] => Route::Contact,
            ["privacy"] => Route::Privacy,
            ["terms"] => Route::Terms,
            ["legal"] => Route::Legal,
            ["auth", "callback"] => Route::AuthCallback,
            _ => Route::NotFound(path.to_string()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Dashboard => "/".into(),
            Route::Upload => "/upload".into(),
            Route::Contracts => "/contracts".into(),
            Route::Analysis(id) => format!("/contracts/{id}/analysis"),
            Route::Account => "/account".into(),
            Route::About => "/about".into(),
            Route::Contact => "/contact".into(),
            Route::Privacy => "/privacy".into(),
            Route::Terms => "/terms".into(),
            Route::Legal => "/legal".into(),
            Route::AuthCallback => "/auth/callback".into(),
            Route::NotFound(p) => p.clone(),
        }
    }
}

/// What the shell renders for a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Loading,
    Login,
    Page(Route),
}

/// Every route is behind the session: nothing renders until the session has
/// been restored, and a signed-out user always lands on the login screen.
pub fn resolve_screen(route: &Route, auth: &AuthState) -> Screen {
    match auth {
        AuthState::Initializing => Screen::Loading,
        AuthState::SignedOut => Screen::Login,
        AuthState::SignedIn(_) => Screen::Page(route.clone()),
    }
}
