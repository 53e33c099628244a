//! Enforcement enumerations: account status, violation types, severities,
//! and actions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account standing of a marketplace user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// In good standing.
    Active,
    /// Formally warned; strikes on record.
    Warning,
    /// Temporarily suspended; uploads blocked until the window elapses.
    Suspended,
    /// Permanently banned; irreversible.
    Banned,
}

impl AccountStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Warning => "warning",
            Self::Suspended => "suspended",
            Self::Banned => "banned",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category of a confirmed policy violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    /// Nudity or sexual content.
    Nudity,
    /// Graphic violence.
    Violence,
    /// Hateful imagery or symbols.
    HateSpeech,
    /// Spam or misleading promotion.
    Spam,
    /// Scam or fraudulent listing.
    Scam,
    /// Drugs or paraphernalia.
    Drugs,
    /// Weapons.
    Weapons,
    /// Counterfeit goods.
    Counterfeit,
    /// Anything without a fixed severity mapping.
    Other,
}

impl ViolationType {
    /// Fixed violation-type to severity mapping.
    ///
    /// Returns `None` for unmapped types; callers fall back to the maximum
    /// AI score magnitude.
    pub fn default_severity(&self) -> Option<Severity> {
        match self {
            Self::HateSpeech | Self::Weapons => Some(Severity::Critical),
            Self::Nudity | Self::Violence | Self::Drugs => Some(Severity::High),
            Self::Spam | Self::Scam | Self::Counterfeit => Some(Severity::Medium),
            Self::Other => None,
        }
    }

    /// Return the type as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nudity => "nudity",
            Self::Violence => "violence",
            Self::HateSpeech => "hate_speech",
            Self::Spam => "spam",
            Self::Scam => "scam",
            Self::Drugs => "drugs",
            Self::Weapons => "weapons",
            Self::Counterfeit => "counterfeit",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity band of a violation, driving the strike weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Minor infraction.
    Low,
    /// Standard infraction.
    Medium,
    /// Serious infraction.
    High,
    /// Most serious infraction.
    Critical,
}

impl Severity {
    /// Derive a severity band from an AI score magnitude (0..1).
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            Self::Critical
        } else if score >= 0.7 {
            Self::High
        } else if score >= 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Return the severity as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Action taken by the enforcement engine for one violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementAction {
    /// Image removed; no formal account action.
    ImageRemoved,
    /// Formal warning issued.
    Warning,
    /// Time-bounded suspension issued.
    TemporarySuspension,
    /// Permanent, irreversible ban.
    PermanentBan,
}

impl EnforcementAction {
    /// Return the action as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImageRemoved => "image_removed",
            Self::Warning => "warning",
            Self::TemporarySuspension => "temporary_suspension",
            Self::PermanentBan => "permanent_ban",
        }
    }
}

impl fmt::Display for EnforcementAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mapping() {
        assert_eq!(ViolationType::Nudity.default_severity(), Some(Severity::High));
        assert_eq!(
            ViolationType::Weapons.default_severity(),
            Some(Severity::Critical)
        );
        assert_eq!(ViolationType::Spam.default_severity(), Some(Severity::Medium));
        assert_eq!(ViolationType::Other.default_severity(), None);
    }

    #[test]
    fn test_severity_from_score_bands() {
        assert_eq!(Severity::from_score(0.95), Severity::Critical);
        assert_eq!(Severity::from_score(0.75), Severity::High);
        assert_eq!(Severity::from_score(0.55), Severity::Medium);
        assert_eq!(Severity::from_score(0.1), Severity::Low);
    }
}
