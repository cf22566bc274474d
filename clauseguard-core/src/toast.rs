use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::ToastId;

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    #[default]
    Default,
    Success,
    Destructive,
    Warning,
    Loading,
}

/// What a caller asks the notification bus to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastSpec {
    pub title: String,
    pub description: Option<String>,
    pub variant: ToastVariant,
    pub duration: Duration,
    pub persistent: bool,
}

impl ToastSpec {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            variant: ToastVariant::Default,
            duration: DEFAULT_TOAST_DURATION,
            persistent: false,
        }
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title)
            .with_description(description)
            .with_variant(ToastVariant::Success)
            .with_duration(Duration::from_millis(4000))
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title)
            .with_description(description)
            .with_variant(ToastVariant::Destructive)
            .with_duration(Duration::from_millis(8000))
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title)
            .with_description(description)
            .with_variant(ToastVariant::Warning)
            .with_duration(Duration::from_millis(6000))
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title).with_description(description)
    }

    pub fn loading(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title)
            .with_description(description)
            .with_variant(ToastVariant::Loading)
            .persistent()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.is_empty()).then_some(description);
        self
    }

    pub fn with_variant(mut self, variant: ToastVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub id: ToastId,
    pub title: String,
    pub description: Option<String>,
    pub variant: ToastVariant,
    pub duration_ms: u64,
    pub persistent: bool,
    pub created_at_unix_ms: i64,
}

impl Toast {
    pub fn from_spec(id: ToastId, spec: ToastSpec, created_at_unix_ms: i64) -> Self {
        Self {
            id,
            title: spec.title,
            description: spec.description,
            variant: spec.variant,
            duration_ms: spec.duration.as_millis().try_into().unwrap_or(u64::MAX),
            persistent: spec.persistent,
            created_at_unix_ms,
        }
    }

    /// `None` when the toast stays until dismissed.
    pub fn auto_dismiss_after(&self) -> Option<Duration> {
        if self.persistent || self.duration_ms == 0 {
            return None;
        }
        Some(Duration::from_millis(self.duration_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_notification_defaults() {
        assert_eq!(ToastSpec::success("a", "b").duration, Duration::from_millis(4000));
        assert_eq!(ToastSpec::error("a", "b").variant, ToastVariant::Destructive);
        assert_eq!(ToastSpec::warning("a", "b").duration, Duration::from_millis(6000));
        assert_eq!(ToastSpec::info("a", "b").variant, ToastVariant::Default);
        assert!(ToastSpec::loading("a", "b").persistent);
    }

    #[test]
    fn persistent_or_zero_duration_never_expires() {
        let t = Toast::from_spec(ToastId::new(), ToastSpec::loading("Working", ""), 0);
        assert_eq!(t.auto_dismiss_after(), None);
        assert_eq!(t.description, None);

        let t = Toast::from_spec(
            ToastId::new(),
            ToastSpec::new("x").with_duration(Duration::ZERO),
            0,
        );
        assert_eq!(t.auto_dismiss_after(), None);

        let t = Toast::from_spec(ToastId::new(), ToastSpec::new("x"), 0);
        assert_eq!(t.auto_dismiss_after(), Some(DEFAULT_TOAST_DURATION));
    }
}
