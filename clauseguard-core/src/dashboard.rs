use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::contract::{Contract, ContractStatus};
use crate::text::share_percent;
use crate::types::ContractId;

const RECENT_ACTIVITY_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusBreakdown {
    #[serde(default)]
    pub uploaded: u64,
    #[serde(default)]
    pub processing: u64,
    #[serde(default)]
    pub analyzed: u64,
    #[serde(default)]
    pub error: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RiskDistribution {
    #[serde(default)]
    pub high_risk: u64,
    #[serde(default)]
    pub medium_risk: u64,
    #[serde(default)]
    pub low_risk: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActivityItem {
    #[serde(default)]
    pub id: Option<ContractId>,
    #[serde(default)]
    pub original_filename: String,
    #[serde(default)]
    pub status: Option<ContractStatus>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub risk_level: Option<String>,
}

impl From<&Contract> for ActivityItem {
    fn from(c: &Contract) -> Self {
        Self {
            id: Some(c.id.clone()),
            original_filename: c.original_filename.clone(),
            status: Some(c.status),
            created_at: c.created_at.clone(),
            risk_level: c.risk_level.clone(),
        }
    }
}

/// Aggregates from `GET /dashboard/stats`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_contracts: u64,
    #[serde(default)]
    pub status_breakdown: StatusBreakdown,
    #[serde(default)]
    pub risk_distribution: RiskDistribution,
    #[serde(default)]
    pub recent_activity: Vec<ActivityItem>,
}

impl DashboardStats {
    /// Stand-in used when the stats endpoint is unavailable.
    pub fn fallback(contracts: &[Arc<Contract>]) -> Self {
        Self {
            total_contracts: contracts.len() as u64,
            status_breakdown: StatusBreakdown::default(),
            risk_distribution: RiskDistribution::default(),
            recent_activity: contracts
                .iter()
                .take(RECENT_ACTIVITY_LEN)
                .map(|c| ActivityItem::from(c.as_ref()))
                .collect(),
        }
    }

    pub fn pending_review(&self) -> u64 {
        self.status_breakdown.uploaded + self.status_breakdown.processing
    }

    pub fn risk_share_percent(&self, count: u64) -> f64 {
        share_percent(count, self.total_contracts)
    }
}
