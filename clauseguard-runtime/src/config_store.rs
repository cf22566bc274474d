use anyhow::Context;
use clauseguard_core::config::AppConfig;
use std::path::{Path, PathBuf};

use crate::defaults::{ENV_API_BASE, ENV_SUPABASE_ANON_KEY, ENV_SUPABASE_URL};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<AppConfig> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("read config: {}", self.path.display()))?;
        let cfg: AppConfig = serde_json::from_slice(&bytes).context("decode config JSON")?;
        Ok(cfg)
    }

    /// Missing file means first run: defaults, nothing written yet.
    pub fn load_or_default(&self) -> anyhow::Result<AppConfig> {
        if !self.path.exists() {
            log::debug!("no config at {}; using defaults", self.path.display());
            return Ok(AppConfig::default());
        }
        self.load()
    }

    pub fn save(&self, cfg: &AppConfig) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(cfg).context("encode config JSON")?;
        crate::files::write_atomic(&self.path, &json)
            .with_context(|| format!("write config: {}", self.path.display()))
    }
}

/// Overlays `CLAUSEGUARD_*` variables on top of a loaded config.
///
/// `lookup` is usually `|k| std::env::var(k).ok()`. Empty values are ignored.
pub fn apply_env_overrides(cfg: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(v) = get(ENV_API_BASE) {
        cfg.api_base = v;
    }
    if let Some(v) = get(ENV_SUPABASE_URL) {
        cfg.supabase_url = v;
    }
    if let Some(v) = get(ENV_SUPABASE_ANON_KEY) {
        cfg.supabase_anon_key = v;
    }
}
