use std::fmt::Write;
use std::sync::Arc;

use clauseguard_core::analysis::{Analysis, FactorCategory};
use clauseguard_core::config::AppConfig;
use clauseguard_core::contract::Contract;
use clauseguard_core::dashboard::DashboardStats;
use clauseguard_core::risk::{RiskIcon, RiskLevel, severity_icon};
use clauseguard_core::text::format_file_size;
use clauseguard_core::toast::{Toast, ToastVariant};

fn icon(icon: RiskIcon) -> &'static str {
    match icon {
        RiskIcon::AlertTriangle => "[!!]",
        RiskIcon::AlertCircle => "[!]",
        RiskIcon::Info => "[i]",
        RiskIcon::CheckCircle => "[ok]",
    }
}

pub fn toast(t: &Toast) -> String {
    let tag = match t.variant {
        ToastVariant::Default => "info",
        ToastVariant::Success => "ok",
        ToastVariant::Destructive => "error",
        ToastVariant::Warning => "warning",
        ToastVariant::Loading => "...",
    };
    match t.description.as_deref() {
        Some(d) => format!("[{tag}] {}: {d}", t.title),
        None => format!("[{tag}] {}", t.title),
    }
}

pub fn settings(cfg: &AppConfig) -> String {
    let key = if cfg.supabase_anon_key.is_empty() {
        "(not set)"
    } else {
        "[REDACTED]"
    };
    format!(
        "api_base:          {}\nsupabase_url:      {}\nsupabase_anon_key: {key}\n",
        cfg.api_base, cfg.supabase_url
    )
}

pub fn contract_table(contracts: &[Arc<Contract>]) -> String {
    if contracts.is_empty() {
        return "No contracts found\n".into();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {:<36} {:>10} {:<11} {}",
        "ID", "FILE", "SIZE", "STATUS", "UPLOADED"
    );
    for c in contracts {
        let _ = writeln!(
            out,
            "{:<8} {:<36} {:>10} {:<11} {}",
            c.id.as_str(),
            c.original_filename,
            format_file_size(c.file_size),
            c.status.as_str(),
            c.created_at
        );
    }
    out
}

pub fn dashboard(stats: &DashboardStats) -> String {
    let mut out = String::new();
    let b = &stats.status_breakdown;
    let r = &stats.risk_distribution;
    let _ = writeln!(out, "Total contracts:  {}", stats.total_contracts);
    let _ = writeln!(out, "Analyzed:         {}", b.analyzed);
    let _ = writeln!(out, "Pending review:   {}", stats.pending_review());
    let _ = writeln!(out, "Errors:           {}", b.error);
    let _ = writeln!(out);
    let _ = writeln!(out, "Risk distribution");
    for (label, count) in [
        ("High", r.high_risk),
        ("Medium", r.medium_risk),
        ("Low", r.low_risk),
    ] {
        let _ = writeln!(
            out,
            "  {label:<7} {count:>4}  ({:.0}%)",
            stats.risk_share_percent(count)
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Recent activity");
    if stats.recent_activity.is_empty() {
        let _ = writeln!(out, "  No contracts uploaded yet");
    }
    for item in &stats.recent_activity {
        let status = item.status.map(|s| s.as_str()).unwrap_or("unknown");
        let _ = writeln!(out, "  {:<36} {status}", item.original_filename);
    }
    out
}

pub fn analysis(contract: Option<&Contract>, a: &Analysis) -> String {
    let mut out = String::new();
    if let Some(c) = contract {
        let _ = writeln!(out, "{} ({})", c.original_filename, format_file_size(c.file_size));
    }

    let p = a.presentation();
    let level = a
        .level()
        .map(RiskLevel::label)
        .unwrap_or("Unknown");
    let _ = writeln!(out, "{} Risk: {level}  score {}/100", icon(p.icon), a.rounded_score());

    if let Some(summary) = a.analysis_results.plain_english_summary.as_deref() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{summary}");
    }

    let mut groups: Vec<FactorCategory> = FactorCategory::KNOWN.to_vec();
    for f in &a.risk_factors {
        if !groups.contains(&f.category) {
            groups.push(f.category.clone());
        }
    }
    for category in &groups {
        let factors = a.factors_in(category);
        if factors.is_empty() {
            continue;
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", category.heading());
        if let Some(g) = category.guidance() {
            let _ = writeln!(out, "  {g}");
        }
        for f in factors {
            let (i, _) = severity_icon(Some(&f.severity));
            let _ = writeln!(out, "  {} {}", icon(i), f.description);
            if let Some(rec) = f.recommendation.as_deref() {
                let _ = writeln!(out, "      -> {rec}");
            }
        }
    }

    let terms = a.key_terms();
    if !terms.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Key terms");
        for (name, text) in terms {
            let _ = writeln!(out, "  {name}: {text}");
        }
    }

    if let Some(recs) = a.analysis_results.recommendations.as_ref().filter(|r| !r.is_empty()) {
        for (heading, items) in [
            ("Priority actions", &recs.priority_actions),
            ("Suggested changes", &recs.suggested_changes),
            ("Negotiation points", &recs.negotiation_points),
        ] {
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "{heading}");
            for item in items {
                let _ = writeln!(out, "  - {item}");
            }
        }
    }

    let details: Vec<String> = [
        a.ai_model_used.as_ref().map(|m| format!("AI model: {m}")),
        a.analysis_type.as_ref().map(|t| format!("type: {t}")),
        a.processing_time_ms.map(|ms| format!("processing time: {ms:.0}ms")),
        a.tokens_used.map(|n| format!("tokens used: {n}")),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !details.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Analysis details: {}", details.join(", "));
    }
    out
}
