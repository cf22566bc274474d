use serde::{Deserialize, Serialize};

/// Ordinal risk category, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskLevel {
    Low,
    MediumLow,
    Medium,
    MediumHigh,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::Low,
        RiskLevel::MediumLow,
        RiskLevel::Medium,
        RiskLevel::MediumHigh,
        RiskLevel::High,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::MediumLow => "medium-low",
            RiskLevel::Medium => "medium",
            RiskLevel::MediumHigh => "medium-high",
            RiskLevel::High => "high",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::MediumLow => "Medium-Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::MediumHigh => "Medium-High",
            RiskLevel::High => "High",
        }
    }

    /// Case-insensitive; accepts `-`, `_` or a space between the two words.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Self::ALL.into_iter().find(|l| l.as_str() == normalized)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskIcon {
    AlertTriangle,
    AlertCircle,
    Info,
    CheckCircle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskPresentation {
    pub color: &'static str,
    pub background: &'static str,
    pub icon: RiskIcon,
}

pub const NEUTRAL_PRESENTATION: RiskPresentation = RiskPresentation {
    color: "text-gray-600",
    background: "bg-gray-50 border-gray-200",
    icon: RiskIcon::Info,
};

/// Total mapping from risk level to display tokens; `None` is neutral.
pub fn risk_presentation(level: Option<RiskLevel>) -> RiskPresentation {
    let Some(level) = level else {
        return NEUTRAL_PRESENTATION;
    };
    match level {
        RiskLevel::High => RiskPresentation {
            color: "text-red-600",
            background: "bg-red-50 border-red-200",
            icon: RiskIcon::AlertTriangle,
        },
        RiskLevel::MediumHigh => RiskPresentation {
            color: "text-orange-600",
            background: "bg-orange-50 border-orange-200",
            icon: RiskIcon::AlertTriangle,
        },
        RiskLevel::Medium => RiskPresentation {
            color: "text-yellow-600",
            background: "bg-yellow-50 border-yellow-200",
            icon: RiskIcon::AlertCircle,
        },
        RiskLevel::MediumLow => RiskPresentation {
            color: "text-lime-600",
            background: "bg-lime-50 border-lime-200",
            icon: RiskIcon::Info,
        },
        RiskLevel::Low => RiskPresentation {
            color: "text-green-600",
            background: "bg-green-50 border-green-200",
            icon: RiskIcon::CheckCircle,
        },
    }
}

pub fn presentation_for(raw: Option<&str>) -> RiskPresentation {
    risk_presentation(raw.and_then(RiskLevel::parse))
}

/// Icon and color for a single risk factor's severity.
pub fn severity_icon(severity: Option<&str>) -> (RiskIcon, &'static str) {
    match severity.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("high") => (RiskIcon::AlertTriangle, "text-red-500"),
        Some("medium") => (RiskIcon::AlertCircle, "text-orange-500"),
        Some("low") => (RiskIcon::Info, "text-blue-500"),
        _ => (RiskIcon::Info, "text-gray-500"),
    }
}
