use std::sync::Arc;

use clauseguard_api::backend::{
    UploadFile, analyze_contract_request, dashboard_stats_request, delete_contract_request,
    download_contract_request, get_analysis_request, get_contract_request, list_contracts_request,
    upload_contract_request,
};
use clauseguard_api::parse::{
    error_message, parse_analysis, parse_contract, parse_contract_list, parse_dashboard_stats,
    parse_uploaded_contract,
};
use clauseguard_api::request::HttpRequest;
use clauseguard_api::runtime::HttpResponse;
use clauseguard_core::analysis::{Analysis, AnalysisType};
use clauseguard_core::contract::{Contract, UploadedContract};
use clauseguard_core::dashboard::DashboardStats;
use clauseguard_core::types::ContractId;

use crate::error::ClientError;
use crate::session::SessionManager;
use crate::traits::Transport;

/// Authenticated calls against the contract backend.
///
/// Every call asks the session for a token right before sending, and a 401
/// from any endpoint signs the user out.
pub struct ApiClient {
    base: String,
    transport: Arc<dyn Transport>,
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(base: impl Into<String>, transport: Arc<dyn Transport>, session: Arc<SessionManager>) -> Self {
        Self {
            base: base.into(),
            transport,
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    async fn send<F>(&self, build: F) -> Result<HttpResponse, ClientError>
    where
        F: FnOnce(&str, &str) -> HttpRequest,
    {
        let token = self.session.access_token().await?;
        let req = build(&self.base, &token);
        log::debug!("{} {}", req.method, req.url);

        let resp = self
            .transport
            .execute(&req)
            .await
            .map_err(ClientError::Transport)?;

        if resp.status == 401 {
            self.session.force_sign_out().await;
            return Err(ClientError::Unauthorized);
        }
        Ok(resp)
    }

    fn ensure_success(resp: HttpResponse, fallback: &str) -> Result<HttpResponse, ClientError> {
        if resp.is_success() {
            return Ok(resp);
        }
        Err(ClientError::Api {
            status: resp.status,
            message: error_message(&resp.body).unwrap_or_else(|| fallback.into()),
        })
    }

    pub async fn list_contracts(&self) -> Result<Vec<Contract>, ClientError> {
        let resp = self.send(list_contracts_request).await?;
        let resp = Self::ensure_success(resp, "Failed to load contracts")?;
        parse_contract_list(&resp.body).map_err(ClientError::Decode)
    }

    pub async fn get_contract(&self, id: &ContractId) -> Result<Contract, ClientError> {
        let resp = self.send(|base, token| get_contract_request(base, token, id)).await?;
        let resp = Self::ensure_success(resp, "Contract not found")?;
        parse_contract(&resp.body).map_err(ClientError::Decode)
    }

    pub async fn upload(&self, file: &UploadFile) -> Result<UploadedContract, ClientError> {
        let resp = self
            .send(|base, token| upload_contract_request(base, token, file))
            .await?;
        let resp = Self::ensure_success(resp, "Upload failed")?;
        parse_uploaded_contract(&resp.body).map_err(ClientError::Decode)
    }

    pub async fn delete_contract(&self, id: &ContractId) -> Result<(), ClientError> {
        let resp = self
            .send(|base, token| delete_contract_request(base, token, id))
            .await?;
        Self::ensure_success(resp, "Failed to delete contract")?;
        Ok(())
    }

    pub async fn download(&self, id: &ContractId) -> Result<Vec<u8>, ClientError> {
        let resp = self
            .send(|base, token| download_contract_request(base, token, id))
            .await?;
        Ok(Self::ensure_success(resp, "Failed to download contract")?.body)
    }

    /// Asks the backend to start analyzing. A refusal carries the server's
    /// message verbatim.
    pub async fn analyze(&self, id: &ContractId, analysis_type: AnalysisType) -> Result<(), ClientError> {
        let resp = self
            .send(|base, token| analyze_contract_request(base, token, id, analysis_type))
            .await?;
        if !resp.is_success() {
            let message = error_message(&resp.body).unwrap_or_else(|| "Analysis failed".into());
            return Err(ClientError::Rejected(message));
        }
        Ok(())
    }

    pub async fn analysis(&self, id: &ContractId) -> Result<Analysis, ClientError> {
        let resp = self
            .send(|base, token| get_analysis_request(base, token, id))
            .await?;
        let resp = Self::ensure_success(resp, "Analysis not found")?;
        parse_analysis(&resp.body).map_err(ClientError::Decode)
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ClientError> {
        let resp = self.send(dashboard_stats_request).await?;
        let resp = Self::ensure_success(resp, "Unable to load dashboard statistics")?;
        parse_dashboard_stats(&resp.body).map_err(ClientError::Decode)
    }
}
