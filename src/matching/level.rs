//! Classifier levels.

use serde::{Deserialize, Serialize};

/// Progressively richer criterion set, selected per pass.
///
/// A criterion declares the lowest level it participates at; raising the
/// level only ever adds criteria, so `max_score` grows monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchLevel {
    Initial,
    Intermediate,
    Full,
    Extra,
}

impl MatchLevel {
    /// All levels in ascending order.
    pub const ALL: [Self; 4] = [Self::Initial, Self::Intermediate, Self::Full, Self::Extra];
}

impl std::fmt::Display for MatchLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Full => write!(f, "full"),
            Self::Extra => write!(f, "extra"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(MatchLevel::Initial < MatchLevel::Intermediate);
        assert!(MatchLevel::Intermediate < MatchLevel::Full);
        assert!(MatchLevel::Full < MatchLevel::Extra);
    }
}
