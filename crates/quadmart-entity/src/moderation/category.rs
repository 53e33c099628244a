//! Content categories scored by moderation providers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A content category on the shared 0..1 risk scale.
///
/// Every provider normalizes its native output onto these categories;
/// unknown provider categories are dropped at the adapter boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationCategory {
    /// Nudity or sexual content.
    Nudity,
    /// Graphic violence or gore.
    Violence,
    /// Hate symbols or hateful imagery.
    Hate,
    /// Spam, scams, or misleading promotional content.
    Spam,
    /// Drugs and drug paraphernalia.
    Drugs,
    /// Weapons.
    Weapons,
}

impl ModerationCategory {
    /// All categories, in a stable order.
    pub const ALL: [ModerationCategory; 6] = [
        Self::Nudity,
        Self::Violence,
        Self::Hate,
        Self::Spam,
        Self::Drugs,
        Self::Weapons,
    ];

    /// Lowercase identifier used in configuration and JSON maps.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nudity => "nudity",
            Self::Violence => "violence",
            Self::Hate => "hate",
            Self::Spam => "spam",
            Self::Drugs => "drugs",
            Self::Weapons => "weapons",
        }
    }

    /// Rejection reason code surfaced to the submitting user.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Nudity => "NUDITY",
            Self::Violence => "VIOLENCE",
            Self::Hate => "HATE",
            Self::Spam => "SPAM",
            Self::Drugs => "DRUGS",
            Self::Weapons => "WEAPONS",
        }
    }
}

impl fmt::Display for ModerationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModerationCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nudity" => Ok(Self::Nudity),
            "violence" => Ok(Self::Violence),
            "hate" => Ok(Self::Hate),
            "spam" => Ok(Self::Spam),
            "drugs" => Ok(Self::Drugs),
            "weapons" => Ok(Self::Weapons),
            other => Err(format!("unknown moderation category '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_categories() {
        for category in ModerationCategory::ALL {
            let parsed: ModerationCategory = category.as_str().parse().expect("parses");
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn test_serializes_as_map_key() {
        let mut scores = std::collections::HashMap::new();
        scores.insert(ModerationCategory::Nudity, 0.9);
        let json = serde_json::to_string(&scores).expect("serialize");
        assert!(json.contains("\"nudity\""));
    }
}
