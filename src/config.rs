//! Threshold configuration for the auto-match driver.

use serde::{Deserialize, Serialize};

use crate::error::{ClassMatchError, Result};
use crate::matching::MatchLevel;

/// Acceptance thresholds and pass defaults.
///
/// Absolute thresholds apply to the normalized (squared) score of the top
/// candidate; relative thresholds bound how close the runner-up may come.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    pub abs_class_threshold: f64,
    pub rel_class_threshold: f64,
    pub abs_method_threshold: f64,
    pub rel_method_threshold: f64,
    pub abs_field_threshold: f64,
    pub rel_field_threshold: f64,
    pub abs_var_threshold: f64,
    pub rel_var_threshold: f64,
    /// Level used by passes that are not given one explicitly
    /// (merge-match re-consideration).
    pub level: MatchLevel,
    /// Instruction similarity below which merge-match demotes a class pair.
    pub merge_similarity_threshold: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            abs_class_threshold: 0.85,
            rel_class_threshold: 0.085,
            abs_method_threshold: 0.85,
            rel_method_threshold: 0.085,
            abs_field_threshold: 0.85,
            rel_field_threshold: 0.085,
            abs_var_threshold: 0.85,
            rel_var_threshold: 0.085,
            level: MatchLevel::Full,
            merge_similarity_threshold: 0.99,
        }
    }
}

impl MatchConfig {
    /// Higher bars everywhere; fewer, more certain matches.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            abs_class_threshold: 0.92,
            rel_class_threshold: 0.15,
            abs_method_threshold: 0.92,
            rel_method_threshold: 0.15,
            abs_field_threshold: 0.92,
            rel_field_threshold: 0.15,
            abs_var_threshold: 0.92,
            rel_var_threshold: 0.15,
            ..Self::default()
        }
    }

    /// Lower bars; accepts more speculative pairings.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            abs_class_threshold: 0.70,
            rel_class_threshold: 0.05,
            abs_method_threshold: 0.70,
            rel_method_threshold: 0.05,
            abs_field_threshold: 0.70,
            rel_field_threshold: 0.05,
            abs_var_threshold: 0.70,
            rel_var_threshold: 0.05,
            ..Self::default()
        }
    }

    /// Check every threshold is inside its valid range.
    pub fn validate(&self) -> Result<()> {
        let abs = [
            ("abs_class_threshold", self.abs_class_threshold),
            ("abs_method_threshold", self.abs_method_threshold),
            ("abs_field_threshold", self.abs_field_threshold),
            ("abs_var_threshold", self.abs_var_threshold),
            ("merge_similarity_threshold", self.merge_similarity_threshold),
        ];
        for (name, value) in abs {
            if !(0.0..=1.0).contains(&value) {
                return Err(ClassMatchError::config(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        let rel = [
            ("rel_class_threshold", self.rel_class_threshold),
            ("rel_method_threshold", self.rel_method_threshold),
            ("rel_field_threshold", self.rel_field_threshold),
            ("rel_var_threshold", self.rel_var_threshold),
        ];
        for (name, value) in rel {
            if !(0.0..1.0).contains(&value) {
                return Err(ClassMatchError::config(format!(
                    "{name} must be in [0, 1), got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_documented_thresholds() {
        let config = MatchConfig::default();
        assert_eq!(config.abs_class_threshold, 0.85);
        assert_eq!(config.rel_method_threshold, 0.085);
        assert_eq!(config.level, MatchLevel::Full);
        assert_eq!(config.merge_similarity_threshold, 0.99);
        config.validate().unwrap();
    }

    #[test]
    fn test_presets_validate() {
        MatchConfig::strict().validate().unwrap();
        MatchConfig::permissive().validate().unwrap();
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let config = MatchConfig {
            abs_class_threshold: 1.5,
            ..MatchConfig::default()
        };
        assert!(config.validate().is_err());

        let config = MatchConfig {
            rel_var_threshold: 1.0,
            ..MatchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let config = MatchConfig::strict();
        let json = serde_json::to_string(&config).unwrap();
        let back: MatchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.abs_class_threshold, config.abs_class_threshold);
        assert_eq!(back.level, config.level);
    }
}
