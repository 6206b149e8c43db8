use std::collections::HashSet;

use serde::Deserialize;

use crate::catalog::DEFAULT_PLACEHOLDER_PREFIX;
use crate::error::ReconError;
use crate::model::{Scope, Visibility};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Location name that stands for the general (all locations) scope.
    pub general_label: String,
    /// Prefix for generated names of rows imported without one.
    pub placeholder_prefix: String,
    /// Whether assets without a location count toward every location.
    pub unscoped_visibility: Visibility,
    /// Locations registered in a fresh collection.
    pub locations: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            general_label: "Geral".into(),
            placeholder_prefix: DEFAULT_PLACEHOLDER_PREFIX.into(),
            unscoped_visibility: Visibility::Everywhere,
            locations: ["Sala 01", "Sala 02", "Sala 03", "Sala 04"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl EngineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: EngineConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.general_label.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "general_label cannot be empty".into(),
            ));
        }

        let mut seen = HashSet::new();
        for location in &self.locations {
            let name = location.trim();
            if name.is_empty() {
                return Err(ReconError::ConfigValidation(
                    "location names cannot be empty".into(),
                ));
            }
            if self.scope(name).is_general() {
                return Err(ReconError::ConfigValidation(format!(
                    "location '{name}' collides with the general scope"
                )));
            }
            if !seen.insert(name) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate location '{name}'"
                )));
            }
        }

        Ok(())
    }

    pub fn scope(&self, name: &str) -> Scope {
        Scope::resolve(name, &self.general_label)
    }

    /// The name a verification is filed under when captured in `name`.
    pub fn location_label(&self, name: &str) -> String {
        match self.scope(name) {
            Scope::General => self.general_label.trim().to_string(),
            Scope::Location(location) => location,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
