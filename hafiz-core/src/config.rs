//! Runtime configuration for a [`RetentionContext`](crate::context::RetentionContext).

use serde::Deserialize;
use tracing::warn;

/// Suffix appended to a view class name to name its binder.
pub const DEFAULT_BINDER_SUFFIX: &str = "$$PresentersBinder";

/// Settings shared by every component of a context.
///
/// Deserializable from any serde format; missing fields take their
/// defaults.
///
/// # Examples
/// ```
/// use hafiz_core::config::HafizConfig;
///
/// let config = HafizConfig::default();
/// assert_eq!(config.binder_suffix, "$$PresentersBinder");
/// assert!(!config.allow_override);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HafizConfig {
    /// Binder name = view class name + this suffix.
    pub binder_suffix: String,
    /// Allow a later binder registration to replace an earlier one.
    pub allow_override: bool,
    /// Namespace local presenters without params by the session tag.
    ///
    /// Turning this off makes every parameterless local presenter of a
    /// class shared by all views.
    pub session_namespacing: bool,
}

impl Default for HafizConfig {
    fn default() -> Self {
        Self {
            binder_suffix: DEFAULT_BINDER_SUFFIX.to_owned(),
            allow_override: false,
            session_namespacing: true,
        }
    }
}

impl HafizConfig {
    /// Defaults overridden by `HAFIZ_BINDER_SUFFIX`, `HAFIZ_ALLOW_OVERRIDE`
    /// and `HAFIZ_SESSION_NAMESPACING`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(suffix) = lookup("HAFIZ_BINDER_SUFFIX").filter(|s| !s.is_empty()) {
            config.binder_suffix = suffix;
        }
        if let Some(flag) = lookup("HAFIZ_ALLOW_OVERRIDE") {
            config.allow_override = parse_flag("HAFIZ_ALLOW_OVERRIDE", &flag, config.allow_override);
        }
        if let Some(flag) = lookup("HAFIZ_SESSION_NAMESPACING") {
            config.session_namespacing =
                parse_flag("HAFIZ_SESSION_NAMESPACING", &flag, config.session_namespacing);
        }

        config
    }
}

fn parse_flag(name: &str, value: &str, fallback: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        other => {
            warn!(variable = name, value = other, "Ignoring unrecognised boolean");
            fallback
        }
    }
}
