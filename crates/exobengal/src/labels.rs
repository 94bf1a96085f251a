use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExoError;

/// Survey verdict on a transit candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disposition {
    Confirmed,
    Candidate,
    FalsePositive,
}

impl Disposition {
    pub fn label(self) -> Label {
        match self {
            Disposition::Confirmed | Disposition::Candidate => Label::Planet,
            Disposition::FalsePositive => Label::NotPlanet,
        }
    }
}

impl FromStr for Disposition {
    type Err = ExoError;

    /// Accepts exactly the survey's spellings, ignoring surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "CONFIRMED" => Ok(Disposition::Confirmed),
            "CANDIDATE" => Ok(Disposition::Candidate),
            "FALSE POSITIVE" => Ok(Disposition::FalsePositive),
            other => Err(ExoError::DataFormat(format!("unmapped disposition '{other}'"))),
        }
    }
}

/// Binary class reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "Planet")]
    Planet,
    #[serde(rename = "Not a Planet")]
    NotPlanet,
}

impl Label {
    pub fn from_positive(positive: bool) -> Self {
        if positive {
            Label::Planet
        } else {
            Label::NotPlanet
        }
    }

    pub fn is_positive(self) -> bool {
        self == Label::Planet
    }

    /// Training target: 1 for planets, 0 otherwise.
    pub fn target(self) -> f64 {
        if self.is_positive() {
            1.0
        } else {
            0.0
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Label::Planet => "Planet",
            Label::NotPlanet => "Not a Planet",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_is_exact() {
        assert_eq!("CONFIRMED".parse::<Disposition>().unwrap().label().target(), 1.0);
        assert_eq!("CANDIDATE".parse::<Disposition>().unwrap().label().target(), 1.0);
        assert_eq!("FALSE POSITIVE".parse::<Disposition>().unwrap().label().target(), 0.0);
        assert_eq!(" CONFIRMED ".parse::<Disposition>().unwrap(), Disposition::Confirmed);
    }

    #[test]
    fn test_unknown_dispositions_fail() {
        for raw in ["", "confirmed", "NOT DISPOSITIONED", "FALSE_POSITIVE"] {
            assert!(matches!(raw.parse::<Disposition>(), Err(ExoError::DataFormat(_))));
        }
    }

    #[test]
    fn test_label_serializes_as_text() {
        assert_eq!(serde_json::to_string(&Label::NotPlanet).unwrap(), "\"Not a Planet\"");
        assert_eq!(Label::from_positive(true).to_string(), "Planet");
    }
}
