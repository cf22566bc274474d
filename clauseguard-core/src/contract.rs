use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisSummary;
use crate::types::ContractId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Uploaded,
    Processing,
    Analyzed,
    Error,
    #[serde(other)]
    Unknown,
}

impl ContractStatus {
    pub const ALL: [ContractStatus; 4] = [
        ContractStatus::Uploaded,
        ContractStatus::Processing,
        ContractStatus::Analyzed,
        ContractStatus::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContractStatus::Uploaded => "uploaded",
            ContractStatus::Processing => "processing",
            ContractStatus::Analyzed => "analyzed",
            ContractStatus::Error => "error",
            ContractStatus::Unknown => "unknown",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(raw))
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contract summary as listed by `GET /contracts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    #[serde(default)]
    pub original_filename: String,
    #[serde(default)]
    pub file_size: u64,
    pub status: ContractStatus,
    #[serde(default)]
    pub contract_type: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub analyses_count: u32,

    // Merged in locally once an analysis completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
}

/// Body of a successful `POST /contracts/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedContract {
    pub contract_id: ContractId,
    pub filename: String,
    #[serde(default)]
    pub file_size: u64,
}

impl UploadedContract {
    pub fn into_contract(self, created_at: impl Into<String>) -> Contract {
        Contract {
            id: self.contract_id,
            original_filename: self.filename,
            file_size: self.file_size,
            status: ContractStatus::Uploaded,
            contract_type: None,
            created_at: created_at.into(),
            analyses_count: 0,
            risk_level: None,
            risk_score: None,
        }
    }
}

/// Returns a new list where only the entry matching `id` is replaced.
///
/// Every other entry is the same `Arc` as in `list`, so siblings stay
/// pointer-equal to their previous versions.
pub fn mark_analyzed(
    list: &[Arc<Contract>],
    id: &ContractId,
    summary: &AnalysisSummary,
) -> Vec<Arc<Contract>> {
    list.iter()
        .map(|c| {
            if &c.id != id {
                return Arc::clone(c);
            }
            let mut next = Contract::clone(c);
            next.status = ContractStatus::Analyzed;
            next.analyses_count = next.analyses_count.max(1);
            if summary.risk_level.is_some() {
                next.risk_level = summary.risk_level.clone();
            }
            if summary.risk_score.is_some() {
                next.risk_score = summary.risk_score;
            }
            Arc::new(next)
        })
        .collect()
}

/// Appends `contract`, replacing any entry with the same id in place.
pub fn append_contract(list: &[Arc<Contract>], contract: Contract) -> Vec<Arc<Contract>> {
    let mut out: Vec<Arc<Contract>> = list.to_vec();
    match out.iter().position(|c| c.id == contract.id) {
        Some(idx) => out[idx] = Arc::new(contract),
        None => out.push(Arc::new(contract)),
    }
    out
}

pub fn remove_contract(list: &[Arc<Contract>], id: &ContractId) -> Vec<Arc<Contract>> {
    list.iter().filter(|c| &c.id != id).cloned().collect()
}
