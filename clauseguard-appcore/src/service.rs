use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clauseguard_api::backend::UploadFile;
use clauseguard_api::parse::SignUpOutcome;
use clauseguard_api::runtime::HttpClient;
use clauseguard_core::analysis::AnalysisType;
use clauseguard_core::auth::{AuthState, CredentialError, User};
use clauseguard_core::config::AppConfig;
use clauseguard_core::contract::Contract;
use clauseguard_core::dashboard::DashboardStats;
use clauseguard_core::listing::ContractQuery;
use clauseguard_core::route::{Route, Screen, resolve_screen};
use clauseguard_core::types::ContractId;
use clauseguard_core::upload::{FileCandidate, UploadRejection, accepted_type_for};
use clauseguard_engine::api_client::ApiClient;
use clauseguard_engine::error::ClientError;
use clauseguard_engine::lifecycle::{AnalysisHandle, AnalysisRunner, ContractAnalysis};
use clauseguard_engine::notify::ToastBus;
use clauseguard_engine::session::SessionManager;
use clauseguard_engine::store::ContractStore;
use clauseguard_engine::traits::{Clock, SessionVault, TokioClock, Transport};
use clauseguard_engine::upload::UploadFlow;
use clauseguard_runtime::config_store::{ConfigStore, apply_env_overrides};
use clauseguard_runtime::files::write_atomic;

/// Everything a front end needs, wired together once.
#[derive(Clone)]
pub struct AppService {
    config: AppConfig,
    session: Arc<SessionManager>,
    api: Arc<ApiClient>,
    store: Arc<ContractStore>,
    toasts: Arc<ToastBus>,
    upload: Arc<UploadFlow>,
    runner: Arc<AnalysisRunner>,
}

/// Loads the config at `path` (defaults if absent) with `CLAUSEGUARD_*`
/// environment overrides applied on top.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let mut cfg = ConfigStore::at_path(path).load_or_default()?;
    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok());
    Ok(cfg)
}

/// Applies `edit` to the config stored at `path` and writes it back.
/// Environment overrides are not persisted.
pub fn update_config(path: &Path, edit: impl FnOnce(&mut AppConfig)) -> anyhow::Result<AppConfig> {
    let store = ConfigStore::at_path(path);
    let mut cfg = store.load_or_default()?;
    edit(&mut cfg);
    store.save(&cfg)?;
    log::info!("config written to {}", path.display());
    Ok(cfg)
}

impl AppService {
    pub fn new(config: AppConfig, vault: Arc<dyn SessionVault>) -> anyhow::Result<Self> {
        let http = HttpClient::new(config.http()).context("build HTTP client")?;
        Ok(Self::with_parts(
            config,
            Arc::new(http),
            Arc::new(TokioClock),
            vault,
        ))
    }

    pub fn open(config_path: &Path, vault: Arc<dyn SessionVault>) -> anyhow::Result<Self> {
        let config = load_config(config_path)?;
        log::debug!("loaded {config:?}");
        Self::new(config, vault)
    }

    pub fn with_parts(
        config: AppConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        vault: Arc<dyn SessionVault>,
    ) -> Self {
        let session = Arc::new(SessionManager::new(
            &config,
            transport.clone(),
            clock.clone(),
            vault,
        ));
        let api = Arc::new(ApiClient::new(
            config.api_base.clone(),
            transport,
            session.clone(),
        ));
        let store = Arc::new(ContractStore::new(api.clone(), clock.clone()));
        let toasts = Arc::new(ToastBus::new());
        let upload = Arc::new(UploadFlow::new(api.clone(), store.clone(), toasts.clone()));
        let runner = Arc::new(AnalysisRunner::new(
            api.clone(),
            store.clone(),
            toasts.clone(),
            clock,
            config.poll(),
        ));
        Self {
            config,
            session,
            api,
            store,
            toasts,
            upload,
            runner,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn store(&self) -> &Arc<ContractStore> {
        &self.store
    }

    pub fn toasts(&self) -> &Arc<ToastBus> {
        &self.toasts
    }

    pub fn upload_flow(&self) -> &Arc<UploadFlow> {
        &self.upload
    }

    pub fn auth_state(&self) -> AuthState {
        self.session.state()
    }

    /// Restores the stored session and, when signed in, loads the contract list.
    pub async fn init(&self) -> AuthState {
        let state = self.session.init().await;
        if matches!(state, AuthState::SignedIn(_)) {
            let _ = self.load_contracts().await;
        }
        self.session.state()
    }

    /// What to show for `path` given the current session.
    pub fn screen(&self, path: &str) -> Screen {
        resolve_screen(&Route::parse(path), &self.session.state())
    }

    // An auth loss has already cleared the session; drop the cached list with it.
    fn note(&self, e: ClientError) -> ClientError {
        if e.is_auth_loss() {
            self.store.clear();
        }
        e
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, ClientError> {
        let user = self.session.sign_in(email, password).await?;
        let _ = self.load_contracts().await;
        Ok(user)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ClientError> {
        let outcome = self.session.sign_up(email, password).await?;
        if matches!(outcome, SignUpOutcome::SignedIn(_)) {
            let _ = self.load_contracts().await;
        }
        Ok(outcome)
    }

    pub fn provider_sign_in_url(&self, provider: &str, origin: &str) -> Result<String, ClientError> {
        self.session.provider_sign_in_url(provider, origin)
    }

    pub async fn reset_password(&self, email: &str, origin: Option<&str>) -> Result<(), ClientError> {
        self.session.reset_password(email, origin).await
    }

    /// Account screen password change; every outcome is also announced as a toast.
    pub async fn change_password(&self, new: &str, confirm: &str) -> Result<(), ClientError> {
        match self.session.update_password(new, confirm).await {
            Ok(()) => {
                self.toasts
                    .success("Password Updated", "Password updated successfully!");
                Ok(())
            }
            Err(e) => {
                match &e {
                    ClientError::Credentials(CredentialError::Mismatch) => {
                        self.toasts.error("Password Mismatch", e.to_string());
                    }
                    ClientError::Credentials(_) => {
                        self.toasts.error("Invalid Password", e.to_string());
                    }
                    ClientError::Auth(message) => {
                        self.toasts.error("Password Update Failed", message.clone());
                    }
                    e if e.is_auth_loss() => {}
                    _ => {
                        self.toasts
                            .error("Update Failed", "Failed to update password. Please try again.");
                    }
                }
                Err(self.note(e))
            }
        }
    }

    pub async fn sign_out(&self) {
        self.session.sign_out().await;
        self.store.clear();
    }

    /// Refreshes the contract cache. Failures other than a lost session
    /// raise an error toast with the server's message.
    pub async fn load_contracts(&self) -> Result<usize, ClientError> {
        match self.store.refresh().await {
            Ok(n) => Ok(n),
            Err(e) => {
                if !e.is_auth_loss() {
                    log::error!("failed to fetch contracts: {e}");
                    self.toasts.error("Loading Failed", e.user_message());
                }
                Err(self.note(e))
            }
        }
    }

    pub fn contracts(&self, query: &ContractQuery) -> Vec<Arc<Contract>> {
        self.store.project(query)
    }

    /// Dashboard figures; falls back to numbers derived from the cached list
    /// when the stats endpoint can't be used.
    pub async fn dashboard(&self) -> Result<DashboardStats, ClientError> {
        match self.api.dashboard_stats().await {
            Ok(stats) => Ok(stats),
            Err(e) if e.is_auth_loss() => Err(self.note(e)),
            Err(e @ (ClientError::Transport(_) | ClientError::Decode(_))) => {
                log::error!("error fetching dashboard stats: {e}");
                self.toasts.error(
                    "Dashboard Error",
                    "Failed to load dashboard statistics. Please refresh the page.",
                );
                Ok(DashboardStats::fallback(&self.store.list()))
            }
            Err(e) => {
                log::warn!("dashboard stats unavailable: {e}");
                self.toasts.warning(
                    "Dashboard Stats",
                    "Unable to load dashboard statistics. Using default values.",
                );
                Ok(DashboardStats::fallback(&self.store.list()))
            }
        }
    }

    /// Uploads a file from disk. Size and type are checked from metadata
    /// before the file is read.
    pub async fn upload_path(&self, path: &Path) -> Result<Contract, ClientError> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let meta = tokio::fs::metadata(path).await.map_err(|e| unreadable(path, e))?;
        let mime = accepted_type_for(&filename, None).map(|t| t.mime);

        self.upload.validate(&FileCandidate {
            filename: filename.clone(),
            mime_type: mime.map(str::to_string),
            size_bytes: meta.len(),
        })?;

        let bytes = tokio::fs::read(path).await.map_err(|e| unreadable(path, e))?;
        let file = UploadFile {
            filename,
            mime_type: mime.unwrap_or("application/octet-stream").to_string(),
            bytes,
        };
        self.upload.upload(file).await.map_err(|e| self.note(e))
    }

    /// State holder for one contract's analysis screen.
    pub fn analysis(&self, id: ContractId) -> Arc<ContractAnalysis> {
        self.runner.screen(id)
    }

    /// Starts an analysis in the background; dropping the handle stops polling.
    pub fn start_analysis(
        &self,
        id: ContractId,
        analysis_type: AnalysisType,
    ) -> (Arc<ContractAnalysis>, AnalysisHandle) {
        let screen = self.runner.screen(id);
        let handle = screen.spawn(analysis_type);
        (screen, handle)
    }

    pub async fn delete_contract(&self, id: &ContractId) -> Result<(), ClientError> {
        self.store.remove(id).await.map_err(|e| self.note(e))
    }

    /// Saves the original document to `dest`; returns the number of bytes written.
    pub async fn download_to(&self, id: &ContractId, dest: &Path) -> anyhow::Result<u64> {
        let bytes = self.store.download(id).await.map_err(|e| self.note(e))?;
        let len = bytes.len() as u64;
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || write_atomic(&dest, &bytes))
            .await
            .context("download write task")??;
        log::info!("contract {id} saved ({len} bytes)");
        Ok(len)
    }
}

fn unreadable(path: &Path, e: std::io::Error) -> ClientError {
    log::warn!("cannot read {}: {e}", path.display());
    ClientError::Validation(UploadRejection::Other {
        reason: e.to_string(),
    })
}
