//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Annotation that disables reconciliation when set to exactly `"true"`.
pub const SKIP_RECONCILE_ANNOTATION: &str = "converge.dev/skip-reconcile";

/// When the engine writes metadata and status changes back to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersistMode {
    /// Persist after every cycle in which a resource was obtained.
    #[default]
    Always,
    /// Persist only when not-found resources are reconstructed (tolerant mode).
    TolerantOnly,
}

/// Configuration for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ReconcilerConfig {
    /// Controller name; defaults to the lower-cased kind.
    pub name: Option<String>,
    /// End the cycle quietly when the resource is missing.
    pub abort_on_not_found: bool,
    /// Finalizer prefix; defaults to `<name>.<group>/`.
    pub finalizer_base: Option<String>,
    pub persist: PersistMode,
    pub skip_annotation: String,
    /// Treat a not-found patch on a reconstructed resource as nothing to
    /// write instead of failing the cycle. Only meaningful in tolerant mode.
    pub ignore_missing_on_persist: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            name: None,
            abort_on_not_found: true,
            finalizer_base: None,
            persist: PersistMode::default(),
            skip_annotation: SKIP_RECONCILE_ANNOTATION.to_string(),
            ignore_missing_on_persist: false,
        }
    }
}

impl ReconcilerConfig {
    /// Parse configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(input).map_err(|e| Error::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.name.as_deref().is_some_and(str::is_empty) {
            return Err(Error::invalid_config("name must not be empty"));
        }
        if self.skip_annotation.is_empty() {
            return Err(Error::invalid_config("skip-annotation must not be empty"));
        }
        Ok(())
    }

    /// Whether a cycle that obtained a resource should write changes back.
    pub const fn should_persist(&self) -> bool {
        match self.persist {
            PersistMode::Always => true,
            PersistMode::TolerantOnly => !self.abort_on_not_found,
        }
    }
}
