use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::RomanizationError;

/// Per-romanizer options. Missing JSON fields take their default values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RomanizerConfig {
    /// Reject language codes that are malformed or unknown to the rule store.
    pub strict_lcodes: bool,
    /// Upper bound on alternates per best-path edge in the `alts` view.
    pub max_alternates: Option<usize>,
    /// Recognize digit runs and numerals as numeric edges.
    pub numbers: bool,
}

impl Default for RomanizerConfig {
    fn default() -> Self {
        Self { strict_lcodes: false, max_alternates: None, numbers: true }
    }
}

impl RomanizerConfig {
    pub fn strict_lcodes(mut self, strict: bool) -> Self {
        self.strict_lcodes = strict;
        self
    }

    pub fn max_alternates(mut self, max: Option<usize>) -> Self {
        self.max_alternates = max;
        self
    }

    pub fn numbers(mut self, numbers: bool) -> Self {
        self.numbers = numbers;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, RomanizationError> {
        serde_json::from_str(json).map_err(|e| RomanizationError::InvalidConfig(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RomanizationError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| RomanizationError::InvalidConfig(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = RomanizerConfig::from_json_str(r#"{"strict_lcodes": true}"#).unwrap();
        assert_eq!(config, RomanizerConfig::default().strict_lcodes(true));
        assert!(config.numbers);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = RomanizerConfig::from_json_str(r#"{"strict": true}"#).unwrap_err();
        assert!(matches!(err, RomanizationError::InvalidConfig(_)));
    }

    #[test]
    fn builder_methods() {
        let config = RomanizerConfig::default().max_alternates(Some(2)).numbers(false);
        assert_eq!(config.max_alternates, Some(2));
        assert!(!config.numbers);
        assert!(!config.strict_lcodes);
    }
}
