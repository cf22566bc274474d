use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::risk::{RiskLevel, RiskPresentation, presentation_for};
use crate::text::humanize_key;
use crate::types::ContractId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    #[default]
    SmallBusiness,
    Individual,
    Comprehensive,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 3] = [
        AnalysisType::SmallBusiness,
        AnalysisType::Individual,
        AnalysisType::Comprehensive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisType::SmallBusiness => "small_business",
            AnalysisType::Individual => "individual",
            AnalysisType::Comprehensive => "comprehensive",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AnalysisType::SmallBusiness => "Small Business",
            AnalysisType::Individual => "Individual",
            AnalysisType::Comprehensive => "Comprehensive",
        }
    }
}

impl FromStr for AnalysisType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown analysis type: {s}"))
    }
}

impl std::fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FactorCategory {
    RiskFactor,
    RedFlag,
    MissingProtection,
    Other(String),
}

impl FactorCategory {
    pub const KNOWN: [FactorCategory; 3] = [
        FactorCategory::RiskFactor,
        FactorCategory::RedFlag,
        FactorCategory::MissingProtection,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            FactorCategory::RiskFactor => "Risk Factor",
            FactorCategory::RedFlag => "Red Flag",
            FactorCategory::MissingProtection => "Missing Protection",
            FactorCategory::Other(s) => s,
        }
    }

    pub fn heading(&self) -> &str {
        match self {
            FactorCategory::RiskFactor => "Risk Factors",
            FactorCategory::RedFlag => "Red Flags",
            FactorCategory::MissingProtection => "Missing Protections",
            FactorCategory::Other(s) => s,
        }
    }

    /// Advice shown under a group of factors of this category.
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            FactorCategory::RiskFactor => Some(
                "Review these risk factors and consider mitigation strategies (See Negotiation Points)",
            ),
            FactorCategory::RedFlag => Some(
                "These red flags require attention. They should be negotiated and even removed if possible.",
            ),
            FactorCategory::MissingProtection => {
                Some("If you can add these missing clauses, you'll be better protected")
            }
            FactorCategory::Other(_) => None,
        }
    }
}

impl From<String> for FactorCategory {
    fn from(raw: String) -> Self {
        let lowered = raw.trim().to_lowercase();
        let singular = lowered.strip_suffix('s').unwrap_or(&lowered);
        match singular {
            "risk factor" => FactorCategory::RiskFactor,
            "red flag" => FactorCategory::RedFlag,
            "missing protection" => FactorCategory::MissingProtection,
            _ => FactorCategory::Other(raw),
        }
    }
}

impl From<FactorCategory> for String {
    fn from(c: FactorCategory) -> Self {
        c.as_str().to_string()
    }
}

impl Default for FactorCategory {
    fn default() -> Self {
        FactorCategory::Other(String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskFactor {
    #[serde(default)]
    pub category: FactorCategory,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Recommendations {
    #[serde(default)]
    pub suggested_changes: Vec<String>,
    #[serde(default)]
    pub negotiation_points: Vec<String>,
    #[serde(default)]
    pub priority_actions: Vec<String>,
}

impl Recommendations {
    pub fn is_empty(&self) -> bool {
        self.suggested_changes.is_empty()
            && self.negotiation_points.is_empty()
            && self.priority_actions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisResults {
    #[serde(default)]
    pub key_terms: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub recommendations: Option<Recommendations>,
    #[serde(default)]
    pub plain_english_summary: Option<String>,
    #[serde(default)]
    pub plain_english_key_terms_summary: Option<String>,
}

/// Analysis payload returned by `GET /contracts/:id/analysis`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub contract_id: Option<ContractId>,
    #[serde(default)]
    pub status: AnalysisStatus,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub risk_factors: Vec<RiskFactor>,
    #[serde(default)]
    pub analysis_results: AnalysisResults,
    #[serde(default)]
    pub ai_model_used: Option<String>,
    #[serde(default)]
    pub analysis_type: Option<String>,
    #[serde(default)]
    pub processing_time_ms: Option<f64>,
    #[serde(default)]
    pub tokens_used: Option<u64>,
}

/// Fields merged into a listed contract once its analysis completes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisSummary {
    pub risk_level: Option<String>,
    pub risk_score: Option<f64>,
}

impl Analysis {
    pub fn is_completed(&self) -> bool {
        self.status == AnalysisStatus::Completed
    }

    pub fn level(&self) -> Option<RiskLevel> {
        self.risk_level.as_deref().and_then(RiskLevel::parse)
    }

    pub fn presentation(&self) -> RiskPresentation {
        presentation_for(self.risk_level.as_deref())
    }

    /// Score rounded and clamped to the 0..=100 gauge.
    pub fn rounded_score(&self) -> u8 {
        let score = self.risk_score.unwrap_or(0.0);
        if score.is_nan() {
            return 0;
        }
        score.round().clamp(0.0, 100.0) as u8
    }

    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            risk_level: self.risk_level.clone(),
            risk_score: self.risk_score,
        }
    }

    pub fn factors_in<'a>(&'a self, category: &FactorCategory) -> Vec<&'a RiskFactor> {
        self.risk_factors
            .iter()
            .filter(|f| &f.category == category)
            .collect()
    }

    /// Key terms as `(display name, text)` pairs; blank values read "Not specified".
    pub fn key_terms(&self) -> Vec<(String, String)> {
        self.analysis_results
            .key_terms
            .iter()
            .map(|(k, v)| {
                let text = match v {
                    serde_json::Value::String(s) if !s.trim().is_empty() => s.clone(),
                    serde_json::Value::String(_) | serde_json::Value::Null => {
                        "Not specified".to_string()
                    }
                    other => other.to_string(),
                };
                (humanize_key(k), text)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETED: &str = r#"{
        "contract_id": 3,
        "status": "completed",
        "risk_score": 62.4,
        "risk_level": "Medium",
        "risk_factors": [
            {"category": "Red Flags", "severity": "high", "description": "Unlimited liability"},
            {"category": "Risk Factor", "severity": "medium", "description": "Auto renewal",
             "recommendation": "Add a notice period"},
            {"category": "missing protection", "severity": "low", "description": "No cap"}
        ],
        "analysis_results": {
            "key_terms": {"payment_terms": "Net 30", "termination": null},
            "recommendations": {"suggested_changes": ["Cap liability"]},
            "plain_english_summary": "A fairly standard lease."
        },
        "ai_model_used": "gpt-4o-mini",
        "analysis_type": "individual",
        "tokens_used": 1200
    }"#;

    #[test]
    fn decodes_completed_analysis() {
        let a: Analysis = serde_json::from_str(COMPLETED).unwrap();
        assert!(a.is_completed());
        assert_eq!(a.level(), Some(RiskLevel::Medium));
        assert_eq!(a.rounded_score(), 62);
        assert_eq!(a.risk_factors[0].category, FactorCategory::RedFlag);
        assert_eq!(a.risk_factors[2].category, FactorCategory::MissingProtection);
        assert_eq!(a.factors_in(&FactorCategory::RiskFactor).len(), 1);
        assert_eq!(a.ai_model_used.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn key_terms_are_humanized_with_fallback_text() {
        let a: Analysis = serde_json::from_str(COMPLETED).unwrap();
        let terms = a.key_terms();
        assert_eq!(terms[0], ("Payment Terms".to_string(), "Net 30".to_string()));
        assert_eq!(terms[1], ("Termination".to_string(), "Not specified".to_string()));
    }

    #[test]
    fn pending_payload_is_not_completed() {
        let a: Analysis = serde_json::from_str(r#"{"status":"processing"}"#).unwrap();
        assert!(!a.is_completed());
        let a: Analysis = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(a.status, AnalysisStatus::Unknown);
    }

    #[test]
    fn analysis_type_parses_loosely() {
        assert_eq!("small-business".parse::<AnalysisType>().unwrap(), AnalysisType::SmallBusiness);
        assert_eq!("Individual".parse::<AnalysisType>().unwrap(), AnalysisType::Individual);
        assert!("premium".parse::<AnalysisType>().is_err());
        assert_eq!(
            serde_json::to_string(&AnalysisType::SmallBusiness).unwrap(),
            "\"small_business\""
        );
    }

    #[test]
    fn category_guidance_only_for_known_categories() {
        assert!(FactorCategory::RedFlag.guidance().is_some());
        assert!(FactorCategory::from("Other".to_string()).guidance().is_none());
    }

    #[test]
    fn score_is_clamped() {
        let a = Analysis {
            risk_score: Some(140.0),
            ..Default::default()
        };
        assert_eq!(a.rounded_score(), 100);
    }
}
