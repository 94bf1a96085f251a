use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    Forest,
    Network,
    Neighbors,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 3] =
        [ModelFamily::Forest, ModelFamily::Network, ModelFamily::Neighbors];

    /// How this family turns a class distribution into a label.
    pub fn decision_rule(self) -> DecisionRule {
        match self {
            ModelFamily::Forest => DecisionRule::Argmax,
            ModelFamily::Network => DecisionRule::Above(0.6),
            ModelFamily::Neighbors => DecisionRule::AtLeast(0.6),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelFamily::Forest => "forest",
            ModelFamily::Network => "network",
            ModelFamily::Neighbors => "neighbors",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = ExoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forest" | "random_forest" => Ok(ModelFamily::Forest),
            "network" | "mlp" => Ok(ModelFamily::Network),
            "neighbors" | "knn" => Ok(ModelFamily::Neighbors),
            other => Err(ExoError::InvalidInput(format!("unknown model family '{other}'"))),
        }
    }
}

/// Per-family positive-class cutoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecisionRule {
    /// Positive iff P(positive) > P(negative); a tie is negative.
    Argmax,
    /// Positive iff P(positive) > threshold.
    Above(f64),
    /// Positive iff P(positive) >= threshold.
    AtLeast(f64),
}

impl DecisionRule {
    pub fn is_positive(self, p_negative: f64, p_positive: f64) -> bool {
        match self {
            DecisionRule::Argmax => p_positive > p_negative,
            DecisionRule::Above(t) => p_positive > t,
            DecisionRule::AtLeast(t) => p_positive >= t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_at_point_six() {
        assert!(!ModelFamily::Network.decision_rule().is_positive(0.4, 0.6));
        assert!(ModelFamily::Neighbors.decision_rule().is_positive(0.4, 0.6));
        assert!(ModelFamily::Network.decision_rule().is_positive(0.39, 0.61));
        assert!(!ModelFamily::Neighbors.decision_rule().is_positive(0.41, 0.59));
    }

    #[test]
    fn test_argmax_tie_is_negative() {
        let rule = ModelFamily::Forest.decision_rule();
        assert!(!rule.is_positive(0.5, 0.5));
        assert!(rule.is_positive(0.49, 0.51));
    }

    #[test]
    fn test_parse_family() {
        assert_eq!("Forest".parse::<ModelFamily>().unwrap(), ModelFamily::Forest);
        assert_eq!("knn".parse::<ModelFamily>().unwrap(), ModelFamily::Neighbors);
        assert!("svm".parse::<ModelFamily>().is_err());
    }
}
