use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime};

use crate::contract::{Contract, ContractStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CreatedAt,
    Name,
    Size,
    Status,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created_at" | "date" | "created" => Ok(SortKey::CreatedAt),
            "name" => Ok(SortKey::Name),
            "size" => Ok(SortKey::Size),
            "status" => Ok(SortKey::Status),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ContractStatus),
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        ContractStatus::parse(s)
            .map(StatusFilter::Only)
            .ok_or_else(|| format!("unknown status: {s}"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractQuery {
    pub search: String,
    pub status: StatusFilter,
    pub sort: SortKey,
}

impl ContractQuery {
    pub fn is_filtered(&self) -> bool {
        !self.search.trim().is_empty() || self.status != StatusFilter::All
    }
}

fn created_at_key(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    // Python's isoformat() without an offset.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

fn compare(a: &Contract, b: &Contract, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a
            .original_filename
            .to_lowercase()
            .cmp(&b.original_filename.to_lowercase()),
        SortKey::Size => b.file_size.cmp(&a.file_size),
        SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
        // Newest first; unparseable dates sink to the bottom.
        SortKey::CreatedAt => created_at_key(&b.created_at).cmp(&created_at_key(&a.created_at)),
    }
}

/// Filtered and sorted view over the cached list. The input is never modified.
pub fn project(contracts: &[Arc<Contract>], query: &ContractQuery) -> Vec<Arc<Contract>> {
    let needle = query.search.trim().to_lowercase();
    let mut out: Vec<Arc<Contract>> = contracts
        .iter()
        .filter(|c| needle.is_empty() || c.original_filename.to_lowercase().contains(&needle))
        .filter(|c| match query.status {
            StatusFilter::All => true,
            StatusFilter::Only(s) => c.status == s,
        })
        .cloned()
        .collect();
    out.sort_by(|a, b| compare(a, b, query.sort));
    out
}
