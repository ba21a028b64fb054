//! Parse configuration and validation.
//!
//! Provides the options that control one parse session: which post-parse
//! passes run, how parameter aliases are named, and the database name used
//! when the export doesn't carry one.

use crate::constants::DEFAULT_PARAMETER_PREFIX;
use crate::error::{Result, SimaProError};
use serde::{Deserialize, Serialize};

/// Options for a single SimaPro CSV parse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseConfig {
    /// Database name; falls back to the `Project:` header line
    pub database_name: Option<String>,

    /// Prefix added to every uppercased parameter alias
    pub parameter_prefix: String,

    /// Run the cell cleaner over every field
    pub clean_cells: bool,

    /// Evaluate parameter scopes and exchange formulas
    pub resolve_parameters: bool,

    /// Convert exchange units to their reference units
    pub normalize_units: bool,

    /// Copy CAS numbers and comments from trailing flow lists onto process edges
    pub supplement_biosphere: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            database_name: None,
            parameter_prefix: DEFAULT_PARAMETER_PREFIX.to_string(),
            clean_cells: true,
            resolve_parameters: true,
            normalize_units: true,
            supplement_biosphere: true,
        }
    }
}

impl ParseConfig {
    /// Set the database name explicitly
    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = Some(name.into());
        self
    }

    /// Use a custom parameter alias prefix
    pub fn with_parameter_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.parameter_prefix = prefix.into();
        self
    }

    /// Keep raw cell text
    pub fn without_cell_cleaning(mut self) -> Self {
        self.clean_cells = false;
        self
    }

    /// Skip parameter and exchange formula evaluation
    pub fn without_parameter_resolution(mut self) -> Self {
        self.resolve_parameters = false;
        self
    }

    /// Leave exchange units as written
    pub fn without_unit_normalization(mut self) -> Self {
        self.normalize_units = false;
        self
    }

    /// Don't copy flow-list data onto process edges
    pub fn without_biosphere_supplement(mut self) -> Self {
        self.supplement_biosphere = false;
        self
    }

    /// Check that the prefix produces valid formula identifiers
    pub fn validate(&self) -> Result<()> {
        let valid = self
            .parameter_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
        let starts_ok = self
            .parameter_prefix
            .chars()
            .next()
            .is_none_or(|c| c.is_ascii_alphabetic() || c == '_');

        if !valid || !starts_ok {
            return Err(SimaProError::Configuration {
                message: format!(
                    "Parameter prefix '{}' must be an identifier (letters, digits, underscore)",
                    self.parameter_prefix
                ),
            });
        }
        if let Some(name) = &self.database_name
            && name.trim().is_empty()
        {
            return Err(SimaProError::Configuration {
                message: "Database name can't be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ParseConfig::default();
        assert_eq!(config.parameter_prefix, "SP_");
        assert!(config.clean_cells);
        assert!(config.resolve_parameters);
        assert!(config.normalize_units);
        assert!(config.database_name.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = ParseConfig::default()
            .with_database_name("ecoinvent")
            .with_parameter_prefix("P_")
            .without_unit_normalization()
            .without_parameter_resolution();

        assert_eq!(config.database_name.as_deref(), Some("ecoinvent"));
        assert_eq!(config.parameter_prefix, "P_");
        assert!(!config.normalize_units);
        assert!(!config.resolve_parameters);
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        assert!(ParseConfig::default().with_parameter_prefix("1X").validate().is_err());
        assert!(ParseConfig::default().with_parameter_prefix("A-B").validate().is_err());
        assert!(ParseConfig::default().with_database_name("  ").validate().is_err());
    }
}
