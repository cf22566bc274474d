use std::path::PathBuf;

/// Keyring service name; constant so upgrades don't orphan a stored session.
pub const KEYRING_SERVICE: &str = "clauseguard";
pub const KEYRING_SESSION_USER: &str = "session";

pub const ENV_API_BASE: &str = "CLAUSEGUARD_API_BASE";
pub const ENV_SUPABASE_URL: &str = "CLAUSEGUARD_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "CLAUSEGUARD_SUPABASE_ANON_KEY";

const APP_DIR: &str = "clauseguard";
const CONFIG_FILE: &str = "config.json";

/// `<platform config dir>/clauseguard`, falling back to `~/.clauseguard`.
pub fn app_config_dir() -> Option<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .or_else(|| dirs::home_dir().map(|h| h.join(format!(".{APP_DIR}"))))
}

pub fn default_config_path() -> Option<PathBuf> {
    app_config_dir().map(|d| d.join(CONFIG_FILE))
}
