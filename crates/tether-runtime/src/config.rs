#![forbid(unsafe_code)]

//! Runtime policy for the binding engine.
//!
//! A [`BindingConfig`] is installed per thread, alongside the object graphs
//! it governs. Every propagation hop reads the current value, so a change
//! takes effect on the next write.
//!
//! # Sources
//!
//! | Source | Entry point |
//! |--------|-------------|
//! | Code | [`BindingConfig::install`] |
//! | Environment | [`BindingConfig::from_env`] (`TETHER_MAX_PROPAGATION_DEPTH`, `TETHER_TRANSFORM_FAILURE_LEVEL`) |
//! | TOML (`policy-config` feature) | [`BindingConfig::from_toml_str`], [`BindingConfig::from_file`] |
//!
//! Invalid environment values fall back to defaults with a warning; invalid
//! TOML is an error.

use std::cell::Cell;
use std::env;
use std::fmt;
use std::str::FromStr;

/// Environment variable holding the propagation depth limit.
pub const MAX_DEPTH_ENV: &str = "TETHER_MAX_PROPAGATION_DEPTH";
/// Environment variable holding the transform failure diagnostic level.
pub const FAILURE_LEVEL_ENV: &str = "TETHER_TRANSFORM_FAILURE_LEVEL";

/// Log level used for a diagnostic the engine emits routinely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "policy-config", derive(serde::Deserialize))]
#[cfg_attr(feature = "policy-config", serde(rename_all = "lowercase"))]
pub enum DiagnosticLevel {
    #[default]
    Warn,
    Debug,
}

impl FromStr for DiagnosticLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" | "warning" => Ok(Self::Warn),
            "debug" => Ok(Self::Debug),
            _ => Err(ConfigError::Invalid {
                key: "transform_failure_level",
                value: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warn => "warn",
            Self::Debug => "debug",
        })
    }
}

/// Errors from loading a [`BindingConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
    #[cfg(feature = "policy-config")]
    #[error("failed to read binding policy: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "policy-config")]
    #[error("failed to parse binding policy: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Binding engine policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "policy-config", derive(serde::Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default, deny_unknown_fields))]
pub struct BindingConfig {
    /// Maximum number of nested propagation hops on this thread, across all
    /// bindings. `None` means unlimited.
    pub max_propagation_depth: Option<usize>,
    /// Level of the diagnostic logged when a transform fails.
    pub transform_failure_level: DiagnosticLevel,
}

thread_local! {
    static CURRENT: Cell<BindingConfig> = Cell::new(BindingConfig::default());
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

impl BindingConfig {
    /// Limit nested propagation hops. `0` means unlimited, as it does in
    /// the environment and in TOML.
    #[must_use]
    pub fn with_max_propagation_depth(mut self, depth: usize) -> Self {
        self.max_propagation_depth = (depth > 0).then_some(depth);
        self
    }

    #[must_use]
    pub fn with_transform_failure_level(mut self, level: DiagnosticLevel) -> Self {
        self.transform_failure_level = level;
        self
    }

    /// Make this the policy for bindings on the current thread.
    pub fn install(self) {
        tracing::debug!(
            max_propagation_depth = ?self.max_propagation_depth,
            transform_failure_level = %self.transform_failure_level,
            "binding config installed"
        );
        CURRENT.with(|c| c.set(self));
    }

    /// The policy installed on the current thread.
    #[must_use]
    pub fn current() -> Self {
        CURRENT.with(Cell::get)
    }

    /// Read the policy from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(
            env::var(MAX_DEPTH_ENV).ok().as_deref(),
            env::var(FAILURE_LEVEL_ENV).ok().as_deref(),
        )
    }

    /// Build a policy from raw variable values (testable without touching
    /// the environment).
    #[must_use]
    pub fn from_vars(max_depth: Option<&str>, failure_level: Option<&str>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = max_depth.map(str::trim).filter(|s| !s.is_empty()) {
            match parse_depth(raw) {
                Ok(depth) => config.max_propagation_depth = depth,
                Err(err) => tracing::warn!(var = MAX_DEPTH_ENV, error = %err, "ignoring"),
            }
        }
        if let Some(raw) = failure_level.filter(|s| !s.trim().is_empty()) {
            match raw.parse() {
                Ok(level) => config.transform_failure_level = level,
                Err(err) => tracing::warn!(var = FAILURE_LEVEL_ENV, error = %err, "ignoring"),
            }
        }
        config
    }

    /// Parse a policy from TOML.
    ///
    /// ```toml
    /// max_propagation_depth = 16
    /// transform_failure_level = "debug"
    /// ```
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.max_propagation_depth = config.max_propagation_depth.filter(|&d| d > 0);
        Ok(config)
    }

    /// Load a policy from a TOML file.
    #[cfg(feature = "policy-config")]
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// `"0"`, `"none"` and `"unlimited"` disable the limit.
fn parse_depth(raw: &str) -> Result<Option<usize>, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "none" | "unlimited" | "0" => Ok(None),
        other => other.parse().map(Some).map_err(|_| ConfigError::Invalid {
            key: "max_propagation_depth",
            value: raw.to_owned(),
        }),
    }
}

/// Marks one propagation hop as in flight on this thread.
pub(crate) struct DepthGuard(());

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// Enter a propagation hop, or `None` if `limit` hops are already nested.
pub(crate) fn enter_propagation(limit: Option<usize>) -> Option<DepthGuard> {
    DEPTH.with(|d| {
        let depth = d.get();
        if limit.is_some_and(|max| depth >= max) {
            return None;
        }
        d.set(depth + 1);
        Some(DepthGuard(()))
    })
}

/// Nested propagation hops currently in flight on this thread.
#[must_use]
pub fn propagation_depth() -> usize {
    DEPTH.with(Cell::get)
}
