use std::sync::Arc;

use clauseguard_api::backend::UploadFile;
use clauseguard_core::contract::Contract;
use clauseguard_core::upload::{FileCandidate, UploadProgress, validate_upload};
use tokio::sync::watch;
use tokio::time::{Instant, interval_at};

use crate::api_client::ApiClient;
use crate::error::ClientError;
use crate::notify::ToastBus;
use crate::store::ContractStore;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadState {
    pub uploading: bool,
    pub progress: UploadProgress,
    /// Inline error shown next to the drop zone.
    pub error: Option<String>,
    pub uploaded: Option<Contract>,
}

pub struct UploadFlow {
    api: Arc<ApiClient>,
    store: Arc<ContractStore>,
    toasts: Arc<ToastBus>,
    state: watch::Sender<UploadState>,
}

impl UploadFlow {
    pub fn new(api: Arc<ApiClient>, store: Arc<ContractStore>, toasts: Arc<ToastBus>) -> Self {
        Self {
            api,
            store,
            toasts,
            state: watch::Sender::new(UploadState::default()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> UploadState {
        self.state.borrow().clone()
    }

    /// Clears a finished upload so another file can be picked.
    pub fn reset(&self) {
        self.state.send_replace(UploadState::default());
    }

    /// Checks a picked file; a rejection is shown inline only.
    pub fn validate(&self, candidate: &FileCandidate) -> Result<(), ClientError> {
        match validate_upload(candidate) {
            Ok(_) => {
                self.state.send_modify(|s| s.error = None);
                Ok(())
            }
            Err(rejection) => {
                log::info!("rejected {}: {rejection}", candidate.filename);
                let message = rejection.to_string();
                self.state.send_modify(|s| s.error = Some(message));
                Err(ClientError::Validation(rejection))
            }
        }
    }

    pub async fn upload(&self, file: UploadFile) -> Result<Contract, ClientError> {
        let candidate = FileCandidate {
            filename: file.filename.clone(),
            mime_type: Some(file.mime_type.clone()),
            size_bytes: file.bytes.len() as u64,
        };
        self.validate(&candidate)?;

        self.state.send_modify(|s| {
            s.uploading = true;
            s.progress.reset();
            s.error = None;
            s.uploaded = None;
        });

        // Estimated progress while the request is in flight.
        let request = self.api.upload(&file);
        tokio::pin!(request);
        let mut ticker = interval_at(Instant::now() + UploadProgress::TICK, UploadProgress::TICK);
        let result = loop {
            tokio::select! {
                r = &mut request => break r,
                _ = ticker.tick() => {
                    self.state.send_if_modified(|s| s.progress.tick());
                }
            }
        };

        match result {
            Ok(uploaded) => {
                let contract = self.store.append_uploaded(uploaded);
                self.state.send_modify(|s| {
                    s.uploading = false;
                    s.progress.complete();
                    s.uploaded = Some(contract.clone());
                });
                self.toasts.success(
                    "Upload Successful",
                    format!("{} has been uploaded successfully.", file.filename),
                );
                log::info!("uploaded {} as contract {}", file.filename, contract.id);
                Ok(contract)
            }
            Err(e) => {
                let message = e.user_message();
                self.state.send_modify(|s| {
                    s.uploading = false;
                    s.progress.reset();
                    s.error = Some(message.clone());
                });
                if !e.is_auth_loss() {
                    self.toasts.error("Upload Failed", message);
                }
                log::warn!("upload of {} failed: {e}", file.filename);
                Err(e)
            }
        }
    }
}
