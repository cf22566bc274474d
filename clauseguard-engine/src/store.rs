use std::sync::Arc;

use clauseguard_core::analysis::AnalysisSummary;
use clauseguard_core::contract::{
    Contract, UploadedContract, append_contract, mark_analyzed, remove_contract,
};
use clauseguard_core::listing::{ContractQuery, project};
use clauseguard_core::types::ContractId;
use tokio::sync::watch;

use crate::api_client::ApiClient;
use crate::error::ClientError;
use crate::traits::Clock;

pub type ContractList = Arc<Vec<Arc<Contract>>>;

/// Client-side cache of the user's contracts.
///
/// The list is only ever replaced wholesale through the reducers in
/// `clauseguard_core::contract`; subscribers see each new version.
pub struct ContractStore {
    api: Arc<ApiClient>,
    clock: Arc<dyn Clock>,
    list: watch::Sender<ContractList>,
}

impl ContractStore {
    pub fn new(api: Arc<ApiClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            clock,
            list: watch::Sender::new(Arc::new(Vec::new())),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ContractList> {
        self.list.subscribe()
    }

    pub fn list(&self) -> ContractList {
        self.list.borrow().clone()
    }

    pub fn get(&self, id: &ContractId) -> Option<Arc<Contract>> {
        self.list.borrow().iter().find(|c| &c.id == id).cloned()
    }

    /// Filtered and sorted view; the cache itself is left alone.
    pub fn project(&self, query: &ContractQuery) -> Vec<Arc<Contract>> {
        project(&self.list(), query)
    }

    /// Replaces the cache with the backend's current list.
    pub async fn refresh(&self) -> Result<usize, ClientError> {
        let fresh = self.api.list_contracts().await?;
        let count = fresh.len();
        self.list
            .send_replace(Arc::new(fresh.into_iter().map(Arc::new).collect()));
        log::debug!("contract list refreshed ({count} entries)");
        Ok(count)
    }

    pub fn append(&self, contract: Contract) {
        self.list
            .send_modify(|list| *list = Arc::new(append_contract(list, contract)));
    }

    /// Adds a just-uploaded file as an `uploaded` contract and returns it.
    pub fn append_uploaded(&self, uploaded: UploadedContract) -> Contract {
        let contract = uploaded.into_contract(self.clock.now_rfc3339());
        self.append(contract.clone());
        contract
    }

    pub fn mark_analyzed(&self, id: &ContractId, summary: &AnalysisSummary) {
        self.list
            .send_modify(|list| *list = Arc::new(mark_analyzed(list, id, summary)));
    }

    /// Deletes on the backend first; the cache changes only after a 2xx.
    pub async fn remove(&self, id: &ContractId) -> Result<(), ClientError> {
        self.api.delete_contract(id).await?;
        self.list
            .send_modify(|list| *list = Arc::new(remove_contract(list, id)));
        log::info!("contract {id} deleted");
        Ok(())
    }

    pub async fn download(&self, id: &ContractId) -> Result<Vec<u8>, ClientError> {
        self.api.download(id).await
    }

    pub fn clear(&self) {
        self.list.send_replace(Arc::new(Vec::new()));
    }
}
