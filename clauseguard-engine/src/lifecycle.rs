use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use clauseguard_core::analysis::{Analysis, AnalysisType};
use clauseguard_core::config::PollSettings;
use clauseguard_core::contract::Contract;
use clauseguard_core::types::ContractId;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api_client::ApiClient;
use crate::error::{ANALYSIS_TIMEOUT_MESSAGE, ClientError};
use crate::notify::ToastBus;
use crate::store::ContractStore;
use crate::traits::Clock;

const STAGE_REQUESTED: &str = "requested";
const STAGE_POLLING: &str = "polling";
const STAGE_COMPLETED: &str = "completed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisFailure {
    /// The analyze request was refused; carries the server's message.
    Rejected(String),
    Timeout,
    SignedOut,
    /// The contract itself could not be loaded.
    Unavailable(String),
}

impl AnalysisFailure {
    pub fn message(&self) -> String {
        match self {
            AnalysisFailure::Rejected(m) | AnalysisFailure::Unavailable(m) => m.clone(),
            AnalysisFailure::Timeout => ANALYSIS_TIMEOUT_MESSAGE.into(),
            AnalysisFailure::SignedOut => ClientError::Unauthorized.user_message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum AnalysisState {
    #[default]
    Loading,
    NotAnalyzed,
    Requested,
    Polling {
        attempt: u32,
    },
    Completed(Arc<Analysis>),
    Failed(AnalysisFailure),
}

impl AnalysisState {
    pub fn is_busy(&self) -> bool {
        matches!(self, AnalysisState::Requested | AnalysisState::Polling { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnalysisState::Loading => "loading",
            AnalysisState::NotAnalyzed => "not analyzed",
            AnalysisState::Requested => STAGE_REQUESTED,
            AnalysisState::Polling { .. } => STAGE_POLLING,
            AnalysisState::Completed(_) => STAGE_COMPLETED,
            AnalysisState::Failed(_) => "failed",
        }
    }
}

/// Runs analyses: one analyze request, then bounded polling of the status
/// endpoint. At most one run per contract is in flight at a time.
pub struct AnalysisRunner {
    api: Arc<ApiClient>,
    store: Arc<ContractStore>,
    toasts: Arc<ToastBus>,
    clock: Arc<dyn Clock>,
    poll: PollSettings,
    in_flight: Mutex<HashSet<ContractId>>,
}

struct InFlightGuard {
    runner: Arc<AnalysisRunner>,
    id: ContractId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.runner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

impl AnalysisRunner {
    pub fn new(
        api: Arc<ApiClient>,
        store: Arc<ContractStore>,
        toasts: Arc<ToastBus>,
        clock: Arc<dyn Clock>,
        poll: PollSettings,
    ) -> Self {
        Self {
            api,
            store,
            toasts,
            clock,
            poll,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_running(&self, id: &ContractId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    fn claim(self: &Arc<Self>, id: &ContractId) -> Result<InFlightGuard, ClientError> {
        let mut set = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(id.clone()) {
            return Err(ClientError::AlreadyRunning);
        }
        Ok(InFlightGuard {
            runner: Arc::clone(self),
            id: id.clone(),
        })
    }

    /// State holder for one contract's analysis screen.
    pub fn screen(self: &Arc<Self>, id: ContractId) -> Arc<ContractAnalysis> {
        Arc::new(ContractAnalysis {
            runner: Arc::clone(self),
            id,
            state: watch::Sender::new(AnalysisState::Loading),
        })
    }
}

/// Analysis lifecycle of a single contract, observable through [`watch`].
pub struct ContractAnalysis {
    runner: Arc<AnalysisRunner>,
    id: ContractId,
    state: watch::Sender<AnalysisState>,
}

impl ContractAnalysis {
    pub fn contract_id(&self) -> &ContractId {
        &self.id
    }

    pub fn subscribe(&self) -> watch::Receiver<AnalysisState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AnalysisState {
        self.state.borrow().clone()
    }

    fn set(&self, next: AnalysisState) {
        log::debug!("contract {}: {}", self.id, next.label());
        self.state.send_replace(next);
    }

    /// Fetches the contract and any finished analysis for it.
    pub async fn load(&self) -> Result<Arc<Contract>, ClientError> {
        self.set(AnalysisState::Loading);
        let api = &self.runner.api;

        let contract = match api.get_contract(&self.id).await {
            Ok(c) => Arc::new(c),
            Err(e) => {
                let failure = if e.is_auth_loss() {
                    AnalysisFailure::SignedOut
                } else {
                    AnalysisFailure::Unavailable(e.user_message())
                };
                self.set(AnalysisState::Failed(failure));
                return Err(e);
            }
        };

        match api.analysis(&self.id).await {
            Ok(a) if a.is_completed() => self.set(AnalysisState::Completed(Arc::new(a))),
            Ok(_) => self.set(AnalysisState::NotAnalyzed),
            Err(e) if e.is_auth_loss() => {
                self.set(AnalysisState::Failed(AnalysisFailure::SignedOut));
                return Err(e);
            }
            Err(e) => {
                log::debug!("no analysis for contract {} ({}): {e}", self.id, contract.status);
                self.set(AnalysisState::NotAnalyzed);
            }
        }
        Ok(contract)
    }

    /// Requests an analysis and polls until it completes, times out, or
    /// `cancel` fires. The poll budget is checked after each response.
    pub async fn run(
        &self,
        analysis_type: AnalysisType,
        cancel: &CancellationToken,
    ) -> Result<Arc<Analysis>, ClientError> {
        let _guard = self.runner.claim(&self.id)?;
        let runner = &self.runner;

        self.set(AnalysisState::Requested);
        log::info!("requesting {} analysis of contract {}", analysis_type, self.id);
        if let Err(e) = runner.api.analyze(&self.id, analysis_type).await {
            return Err(self.fail_request(e));
        }
        runner.toasts.info(
            "Analysis Started",
            "Your contract is being analyzed. This may take a few moments.",
        );

        let max = runner.poll.max_attempts;
        for attempt in 1..=max {
            if cancel.is_cancelled() {
                return Err(self.cancelled());
            }
            self.set(AnalysisState::Polling { attempt });

            match runner.api.analysis(&self.id).await {
                Ok(a) if a.is_completed() => return Ok(self.complete(a)),
                Ok(a) => log::debug!("poll {attempt}/{max}: status {:?}", a.status),
                Err(e) if e.is_auth_loss() => {
                    self.set(AnalysisState::Failed(AnalysisFailure::SignedOut));
                    return Err(e);
                }
                Err(e) => log::warn!("poll {attempt}/{max} for contract {} failed: {e}", self.id),
            }

            if attempt < max {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(self.cancelled()),
                    _ = runner.clock.sleep(runner.poll.interval) => {}
                }
            }
        }

        log::warn!("analysis of contract {} timed out after {max} checks", self.id);
        self.set(AnalysisState::Failed(AnalysisFailure::Timeout));
        runner
            .toasts
            .error("Analysis Failed", ANALYSIS_TIMEOUT_MESSAGE);
        Err(ClientError::Timeout { attempts: max })
    }

    // The request may still finish server-side; a later `load` picks it up.
    fn cancelled(&self) -> ClientError {
        log::info!("analysis polling for contract {} cancelled", self.id);
        self.set(AnalysisState::NotAnalyzed);
        ClientError::Cancelled
    }

    fn fail_request(&self, e: ClientError) -> ClientError {
        if e.is_auth_loss() {
            self.set(AnalysisState::Failed(AnalysisFailure::SignedOut));
            return e;
        }
        let message = e.user_message();
        log::warn!("analysis request for contract {} failed: {e}", self.id);
        self.set(AnalysisState::Failed(AnalysisFailure::Rejected(message.clone())));
        self.runner.toasts.error("Analysis Failed", message.clone());
        match e {
            ClientError::Rejected(_) => e,
            _ => ClientError::Rejected(message),
        }
    }

    fn complete(&self, analysis: Analysis) -> Arc<Analysis> {
        let analysis = Arc::new(analysis);
        self.runner
            .store
            .mark_analyzed(&self.id, &analysis.summary());
        self.set(AnalysisState::Completed(Arc::clone(&analysis)));
        self.runner
            .toasts
            .success("Analysis Complete", "Your contract analysis is ready!");
        log::info!(
            "analysis of contract {} completed (risk level {})",
            self.id,
            analysis.risk_level.as_deref().unwrap_or("unknown")
        );
        analysis
    }

    /// Runs the analysis on a background task tied to the returned handle.
    pub fn spawn(self: &Arc<Self>, analysis_type: AnalysisType) -> AnalysisHandle {
        let cancel = CancellationToken::new();
        let this = Arc::clone(self);
        let token = cancel.clone();
        let join = tokio::spawn(async move { this.run(analysis_type, &token).await });
        AnalysisHandle {
            cancel,
            join: Some(join),
        }
    }
}

/// Owns a spawned analysis run. Dropping the handle cancels the polling loop,
/// so a closed screen never leaves a timer behind.
pub struct AnalysisHandle {
    cancel: CancellationToken,
    join: Option<JoinHandle<Result<Arc<Analysis>, ClientError>>>,
}

impl AnalysisHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(|j| j.is_finished())
    }

    pub async fn wait(mut self) -> Result<Arc<Analysis>, ClientError> {
        let Some(join) = self.join.take() else {
            return Err(ClientError::Cancelled);
        };
        match join.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(ClientError::Cancelled),
            Err(e) => Err(ClientError::Transport(anyhow::anyhow!("analysis task failed: {e}"))),
        }
    }
}

impl Drop for AnalysisHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
