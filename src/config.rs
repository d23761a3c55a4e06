//! Dispatch configuration. Defaults match the `?fields=` convention; override via env or JSON.

use serde::{Deserialize, Serialize};

/// Env var overriding the query parameter name (default `fields`).
pub const PARAM_ENV: &str = "FIELDSET_PARAM";

pub const DEFAULT_PARAM: &str = "fields";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Query parameter carrying the requested fields. Matched case-insensitively.
    pub param_name: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            param_name: DEFAULT_PARAM.into(),
        }
    }
}

impl DispatchConfig {
    /// Defaults, with `FIELDSET_PARAM` applied when set and non-blank.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(name) = std::env::var(PARAM_ENV)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
        {
            config.param_name = name;
        }
        config
    }

    pub fn with_param_name(mut self, name: impl Into<String>) -> Self {
        self.param_name = name.into();
        self
    }
}
