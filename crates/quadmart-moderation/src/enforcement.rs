//! Enforcement engine: strikes, account-status transitions, suspensions,
//! bans, and good-behavior decay.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{error, info, warn};

use quadmart_core::config::enforcement::EnforcementConfig;
use quadmart_core::result::AppResult;
use quadmart_core::types::id::{ImageId, ItemId, UserId};
use quadmart_entity::audit::model::{ActorType, CreateAuditLogEntry};
use quadmart_entity::moderation::category::ModerationCategory;
use quadmart_entity::violation::model::{UserViolation, ViolationEntry, WarningRecord};
use quadmart_entity::violation::types::{
    AccountStatus, EnforcementAction, Severity, ViolationType,
};

use crate::stores::{AuditSink, ViolationStore};

/// A confirmed policy violation to record against a user.
#[derive(Debug, Clone)]
pub struct NewViolation {
    /// The sanctioned user.
    pub user_id: UserId,
    /// The offending image, if image-linked.
    pub image_id: Option<ImageId>,
    /// The item listing involved, if any.
    pub item_id: Option<ItemId>,
    /// What kind of violation.
    pub violation_type: ViolationType,
    /// AI scores backing the violation (severity fallback input).
    pub scores: HashMap<ModerationCategory, f64>,
    /// Human-readable description.
    pub description: String,
    /// Who recorded it (`"ai"`, `"admin:<id>"`, `"system"`).
    pub actor: String,
}

/// Result of recording one violation.
#[derive(Debug, Clone)]
pub struct EnforcementOutcome {
    /// The action taken.
    pub action: EnforcementAction,
    /// Strikes added by this violation.
    pub strikes_applied: f64,
    /// Active strikes after this violation.
    pub strikes_active: f64,
    /// Lifetime strikes after this violation.
    pub strikes_lifetime: f64,
    /// Account standing after this violation.
    pub account_status: AccountStatus,
}

/// Whether a user may upload, and why not.
#[derive(Debug, Clone)]
pub struct UploadPermission {
    /// Whether the upload may proceed.
    pub allowed: bool,
    /// Denial reason shown to the user.
    pub reason: Option<String>,
    /// End of the suspension window, when denied for suspension.
    pub suspended_until: Option<DateTime<Utc>>,
}

impl UploadPermission {
    fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
            suspended_until: None,
        }
    }
}

/// Aggregate enforcement standing surfaced to the upload route.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ViolationStats {
    /// Total violations on record.
    pub total_violations: i32,
    /// Current active strikes.
    pub active_strikes: f64,
    /// Lifetime strikes.
    pub lifetime_strikes: f64,
    /// Current account standing.
    pub account_status: AccountStatus,
    /// Images uploaded.
    pub images_uploaded: i32,
    /// Images rejected.
    pub images_rejected: i32,
    /// Images reported by other users.
    pub images_reported: i32,
    /// Rejected / uploaded ratio.
    pub rejection_rate: f64,
    /// Suspension window end, while suspended.
    pub suspended_until: Option<DateTime<Utc>>,
}

/// Converts confirmed violations into strikes, status transitions, and
/// suspension windows.
///
/// Violation writes fail loudly; audit writes are best-effort. The
/// upload-permission check fails open on infrastructure errors.
pub struct EnforcementEngine {
    config: EnforcementConfig,
    violations: Arc<dyn ViolationStore>,
    audit: Arc<dyn AuditSink>,
}

impl EnforcementEngine {
    /// Create a new enforcement engine.
    pub fn new(
        config: EnforcementConfig,
        violations: Arc<dyn ViolationStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config,
            violations,
            audit,
        }
    }

    /// Record one confirmed violation and apply the resulting tier action.
    pub async fn record_violation(&self, violation: NewViolation) -> AppResult<EnforcementOutcome> {
        let now = Utc::now();
        let mut ledger = self
            .violations
            .get(violation.user_id)
            .await?
            .unwrap_or_else(|| UserViolation::new(violation.user_id));

        let severity = self.derive_severity(&violation);
        let weight = self.strike_weight(severity);

        ledger.active_strikes += weight;
        ledger.lifetime_strikes += weight;
        ledger.total_violations += 1;
        if violation.image_id.is_some() {
            ledger.images_rejected += 1;
        }
        ledger.recompute_rejection_rate();
        ledger.last_violation_at = Some(now);
        ledger.good_behavior_days = 0;

        let action = self.apply_tier(&mut ledger, &violation, now);

        ledger.entries.push(ViolationEntry {
            image_id: violation.image_id,
            item_id: violation.item_id,
            violation_type: violation.violation_type,
            severity,
            action,
            description: violation.description.clone(),
            actor: violation.actor.clone(),
            strikes_added: weight,
            occurred_at: now,
            appealed: false,
            appeal_notes: None,
        });

        // A violation must never be silently lost.
        self.violations.upsert(&ledger).await?;

        info!(
            user_id = %violation.user_id,
            violation_type = %violation.violation_type,
            severity = %severity,
            action = %action,
            active_strikes = ledger.active_strikes,
            "Recorded violation"
        );

        self.audit_best_effort(CreateAuditLogEntry {
            action: format!("enforcement.{action}"),
            image_id: violation.image_id,
            item_id: violation.item_id,
            user_id: Some(violation.user_id),
            actor_type: actor_type_of(&violation.actor),
            actor_id: Some(violation.actor.clone()),
            details: Some(json!({
                "violation_type": violation.violation_type.as_str(),
                "severity": severity.as_str(),
                "strikes_applied": weight,
                "strikes_active": ledger.active_strikes,
                "description": violation.description,
            })),
        })
        .await;

        Ok(EnforcementOutcome {
            action,
            strikes_applied: weight,
            strikes_active: ledger.active_strikes,
            strikes_lifetime: ledger.lifetime_strikes,
            account_status: ledger.account_status,
        })
    }

    /// Whether a user may upload new content.
    ///
    /// Fails open: an infrastructure error allows the upload rather than
    /// blocking every user behind a broken store.
    pub async fn check_user_can_upload(&self, user_id: UserId) -> UploadPermission {
        match self.check_upload_inner(user_id).await {
            Ok(permission) => permission,
            Err(e) => {
                warn!(%user_id, "Upload permission check failed open: {e}");
                UploadPermission::allowed()
            }
        }
    }

    async fn check_upload_inner(&self, user_id: UserId) -> AppResult<UploadPermission> {
        let Some(mut ledger) = self.violations.get(user_id).await? else {
            return Ok(UploadPermission::allowed());
        };

        if ledger.permanently_banned {
            return Ok(UploadPermission {
                allowed: false,
                reason: Some(
                    ledger
                        .ban_reason
                        .clone()
                        .unwrap_or_else(|| "account permanently banned".to_string()),
                ),
                suspended_until: None,
            });
        }

        let now = Utc::now();
        if ledger.account_status == AccountStatus::Suspended {
            if !ledger.suspension_elapsed(now) {
                return Ok(UploadPermission {
                    allowed: false,
                    reason: ledger.suspension_reason.clone(),
                    suspended_until: ledger.suspended_until,
                });
            }
            // Lift the elapsed suspension lazily.
            ledger.account_status = if ledger.active_strikes > 0.0 {
                AccountStatus::Warning
            } else {
                AccountStatus::Active
            };
            ledger.suspended_until = None;
            ledger.suspension_reason = None;
            self.violations.upsert(&ledger).await?;
            info!(%user_id, status = %ledger.account_status, "Lifted elapsed suspension");
        }

        Ok(UploadPermission::allowed())
    }

    /// Decay active strikes for sustained good behavior.
    ///
    /// Each full block of days since the last violation removes a fixed
    /// decrement, floored at zero; blocks already consumed by earlier runs
    /// are not applied again. Lifetime strikes never decrease.
    pub async fn reduce_strikes_for_good_behavior(&self, user_id: UserId) -> AppResult<f64> {
        let Some(mut ledger) = self.violations.get(user_id).await? else {
            return Ok(0.0);
        };
        if ledger.permanently_banned || ledger.active_strikes <= 0.0 {
            return Ok(ledger.active_strikes);
        }
        let Some(last_violation) = ledger.last_violation_at else {
            return Ok(ledger.active_strikes);
        };

        let days_clean = (Utc::now() - last_violation).num_days().max(0) as i32;
        let blocks_total = i64::from(days_clean) / self.config.decay_block_days;
        let blocks_applied = i64::from(ledger.good_behavior_days) / self.config.decay_block_days;
        let new_blocks = blocks_total - blocks_applied;
        ledger.good_behavior_days = days_clean;

        if new_blocks > 0 {
            let decay = new_blocks as f64 * self.config.decay_per_block;
            ledger.active_strikes = (ledger.active_strikes - decay).max(0.0);
            if ledger.active_strikes == 0.0
                && matches!(
                    ledger.account_status,
                    AccountStatus::Warning | AccountStatus::Suspended
                )
            {
                ledger.account_status = AccountStatus::Active;
                ledger.suspended_until = None;
                ledger.suspension_reason = None;
            }
            info!(
                %user_id,
                blocks = new_blocks,
                active_strikes = ledger.active_strikes,
                "Decayed strikes for good behavior"
            );
        }

        self.violations.upsert(&ledger).await?;
        Ok(ledger.active_strikes)
    }

    /// Run the decay pass over every ledger with decayable strikes.
    pub async fn run_decay_sweep(&self, limit: i64) -> AppResult<usize> {
        let candidates = self.violations.find_decay_candidates(limit).await?;
        let count = candidates.len();
        for ledger in candidates {
            if let Err(e) = self.reduce_strikes_for_good_behavior(ledger.user_id).await {
                error!(user_id = %ledger.user_id, "Strike decay failed: {e}");
            }
        }
        Ok(count)
    }

    /// Aggregate enforcement standing for one user.
    pub async fn get_user_violation_stats(&self, user_id: UserId) -> AppResult<ViolationStats> {
        let ledger = self
            .violations
            .get(user_id)
            .await?
            .unwrap_or_else(|| UserViolation::new(user_id));
        Ok(ViolationStats {
            total_violations: ledger.total_violations,
            active_strikes: ledger.active_strikes,
            lifetime_strikes: ledger.lifetime_strikes,
            account_status: ledger.account_status,
            images_uploaded: ledger.images_uploaded,
            images_rejected: ledger.images_rejected,
            images_reported: ledger.images_reported,
            rejection_rate: ledger.rejection_rate,
            suspended_until: ledger.suspended_until,
        })
    }

    /// Count one scored upload toward the user's rejection rate.
    pub async fn note_image_uploaded(&self, user_id: UserId) -> AppResult<()> {
        let mut ledger = self
            .violations
            .get(user_id)
            .await?
            .unwrap_or_else(|| UserViolation::new(user_id));
        ledger.images_uploaded += 1;
        ledger.recompute_rejection_rate();
        self.violations.upsert(&ledger).await
    }

    fn derive_severity(&self, violation: &NewViolation) -> Severity {
        violation.violation_type.default_severity().unwrap_or_else(|| {
            let max_score = violation
                .scores
                .values()
                .copied()
                .fold(0.0_f64, f64::max);
            Severity::from_score(max_score)
        })
    }

    fn strike_weight(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Low => self.config.weight_low,
            Severity::Medium => self.config.weight_medium,
            Severity::High => self.config.weight_high,
            Severity::Critical => self.config.weight_critical,
        }
    }

    fn apply_tier(
        &self,
        ledger: &mut UserViolation,
        violation: &NewViolation,
        now: DateTime<Utc>,
    ) -> EnforcementAction {
        if ledger.permanently_banned {
            return EnforcementAction::PermanentBan;
        }
        let strikes = ledger.active_strikes;

        if strikes >= self.config.ban_threshold {
            ledger.permanently_banned = true;
            ledger.account_status = AccountStatus::Banned;
            ledger.ban_reason = Some(violation.description.clone());
            ledger.banned_at = Some(now);
            return EnforcementAction::PermanentBan;
        }

        if strikes >= self.config.suspension_2_threshold {
            let duration = escalated_suspension(ledger.suspension_count);
            self.suspend(ledger, violation, now, duration);
            return EnforcementAction::TemporarySuspension;
        }

        if strikes >= self.config.suspension_1_threshold {
            self.suspend(ledger, violation, now, Duration::hours(24));
            return EnforcementAction::TemporarySuspension;
        }

        if strikes >= self.config.warning_threshold {
            ledger.account_status = AccountStatus::Warning;
            ledger.warnings.push(WarningRecord {
                sent_at: now,
                reason: violation.description.clone(),
            });
            return EnforcementAction::Warning;
        }

        EnforcementAction::ImageRemoved
    }

    fn suspend(
        &self,
        ledger: &mut UserViolation,
        violation: &NewViolation,
        now: DateTime<Utc>,
        duration: Duration,
    ) {
        ledger.account_status = AccountStatus::Suspended;
        ledger.suspended_until = Some(now + duration);
        ledger.suspension_reason = Some(violation.description.clone());
        ledger.suspension_count += 1;
    }

    async fn audit_best_effort(&self, entry: CreateAuditLogEntry) {
        if let Err(e) = self.audit.append(&entry).await {
            error!(action = %entry.action, "Audit write failed: {e}");
        }
    }
}

/// Suspension duration escalating with the count of prior suspensions.
fn escalated_suspension(prior_suspensions: i32) -> Duration {
    match prior_suspensions {
        0 => Duration::hours(24),
        1 => Duration::days(7),
        _ => Duration::days(30),
    }
}

fn actor_type_of(actor: &str) -> ActorType {
    if actor == "ai" {
        ActorType::Ai
    } else if actor.starts_with("admin") {
        ActorType::Admin
    } else {
        ActorType::System
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::{InMemoryAuditSink, InMemoryViolationStore};

    fn engine() -> (EnforcementEngine, Arc<InMemoryViolationStore>, Arc<InMemoryAuditSink>) {
        let store = Arc::new(InMemoryViolationStore::new());
        let audit = Arc::new(InMemoryAuditSink::new());
        let engine = EnforcementEngine::new(
            EnforcementConfig::default(),
            store.clone(),
            audit.clone(),
        );
        (engine, store, audit)
    }

    fn violation(user_id: UserId, violation_type: ViolationType) -> NewViolation {
        NewViolation {
            user_id,
            image_id: Some(quadmart_core::types::id::ImageId::new()),
            item_id: None,
            violation_type,
            scores: HashMap::new(),
            description: "policy violation".to_string(),
            actor: "ai".to_string(),
        }
    }

    #[tokio::test]
    async fn test_high_severity_first_violation_suspends_24h() {
        let (engine, _, _) = engine();
        let user = UserId::new();

        // HIGH weight 2.0 meets the first suspension threshold exactly.
        let outcome = engine
            .record_violation(violation(user, ViolationType::Nudity))
            .await
            .unwrap();

        assert_eq!(outcome.action, EnforcementAction::TemporarySuspension);
        assert_eq!(outcome.strikes_active, 2.0);
        assert_eq!(outcome.account_status, AccountStatus::Suspended);

        let permission = engine.check_user_can_upload(user).await;
        assert!(!permission.allowed);
        let until = permission.suspended_until.expect("window surfaced");
        let window = until - Utc::now();
        assert!(window <= Duration::hours(24) && window > Duration::hours(23));
    }

    #[tokio::test]
    async fn test_low_severity_only_removes_image() {
        let (engine, _, _) = engine();
        let user = UserId::new();

        let outcome = engine
            .record_violation(NewViolation {
                scores: HashMap::from([(ModerationCategory::Spam, 0.2)]),
                ..violation(user, ViolationType::Other)
            })
            .await
            .unwrap();

        // Unmapped type falls back to score magnitude: 0.2 is LOW (0.5).
        assert_eq!(outcome.strikes_applied, 0.5);
        assert_eq!(outcome.action, EnforcementAction::ImageRemoved);
        assert_eq!(outcome.account_status, AccountStatus::Active);
    }

    #[tokio::test]
    async fn test_critical_violation_jumps_to_second_tier() {
        let (engine, _, _) = engine();
        let user = UserId::new();

        let outcome = engine
            .record_violation(violation(user, ViolationType::Weapons))
            .await
            .unwrap();

        // CRITICAL weight 3.0 on a clean user lands at the escalating tier.
        assert_eq!(outcome.strikes_active, 3.0);
        assert_eq!(outcome.action, EnforcementAction::TemporarySuspension);
    }

    #[tokio::test]
    async fn test_ban_threshold_is_irreversible() {
        let (engine, store, _) = engine();
        let user = UserId::new();

        engine
            .record_violation(violation(user, ViolationType::Weapons))
            .await
            .unwrap();
        let outcome = engine
            .record_violation(violation(user, ViolationType::HateSpeech))
            .await
            .unwrap();
        assert_eq!(outcome.action, EnforcementAction::PermanentBan);
        assert_eq!(outcome.account_status, AccountStatus::Banned);

        let permission = engine.check_user_can_upload(user).await;
        assert!(!permission.allowed);

        // Decay never lifts a permanent ban.
        let mut ledger = store.get(user).await.unwrap().unwrap();
        ledger.last_violation_at = Some(Utc::now() - Duration::days(365));
        store.upsert(&ledger).await.unwrap();
        engine.reduce_strikes_for_good_behavior(user).await.unwrap();
        assert!(store.get(user).await.unwrap().unwrap().permanently_banned);
    }

    #[tokio::test]
    async fn test_lifetime_strikes_are_monotonic() {
        let (engine, store, _) = engine();
        let user = UserId::new();

        engine
            .record_violation(violation(user, ViolationType::Spam))
            .await
            .unwrap();
        let after_one = store.get(user).await.unwrap().unwrap().lifetime_strikes;

        let mut ledger = store.get(user).await.unwrap().unwrap();
        ledger.last_violation_at = Some(Utc::now() - Duration::days(65));
        store.upsert(&ledger).await.unwrap();
        engine.reduce_strikes_for_good_behavior(user).await.unwrap();

        let ledger = store.get(user).await.unwrap().unwrap();
        assert_eq!(ledger.lifetime_strikes, after_one);
        assert!(ledger.active_strikes < after_one);
    }

    #[tokio::test]
    async fn test_decay_applies_each_block_once() {
        let (engine, store, _) = engine();
        let user = UserId::new();

        let mut ledger = UserViolation::new(user);
        ledger.active_strikes = 2.0;
        ledger.lifetime_strikes = 2.0;
        ledger.account_status = AccountStatus::Warning;
        ledger.last_violation_at = Some(Utc::now() - Duration::days(65));
        store.upsert(&ledger).await.unwrap();

        // 65 days = two full 30-day blocks = 1.0 decayed.
        let first = engine.reduce_strikes_for_good_behavior(user).await.unwrap();
        assert_eq!(first, 1.0);

        // Re-running within the same block decays nothing further.
        let second = engine.reduce_strikes_for_good_behavior(user).await.unwrap();
        assert_eq!(second, 1.0);
    }

    #[tokio::test]
    async fn test_decay_to_zero_restores_active_status() {
        let (engine, store, _) = engine();
        let user = UserId::new();

        let mut ledger = UserViolation::new(user);
        ledger.active_strikes = 0.5;
        ledger.lifetime_strikes = 0.5;
        ledger.account_status = AccountStatus::Warning;
        ledger.last_violation_at = Some(Utc::now() - Duration::days(31));
        store.upsert(&ledger).await.unwrap();

        engine.reduce_strikes_for_good_behavior(user).await.unwrap();
        let ledger = store.get(user).await.unwrap().unwrap();
        assert_eq!(ledger.active_strikes, 0.0);
        assert_eq!(ledger.account_status, AccountStatus::Active);
    }

    #[tokio::test]
    async fn test_elapsed_suspension_lifted_lazily() {
        let (engine, store, _) = engine();
        let user = UserId::new();

        let mut ledger = UserViolation::new(user);
        ledger.active_strikes = 2.0;
        ledger.account_status = AccountStatus::Suspended;
        ledger.suspended_until = Some(Utc::now() - Duration::hours(1));
        store.upsert(&ledger).await.unwrap();

        let permission = engine.check_user_can_upload(user).await;
        assert!(permission.allowed);

        // Strikes remain, so the lifted status is WARNING.
        let ledger = store.get(user).await.unwrap().unwrap();
        assert_eq!(ledger.account_status, AccountStatus::Warning);
        assert!(ledger.suspended_until.is_none());
    }

    #[tokio::test]
    async fn test_every_violation_writes_one_audit_entry() {
        let (engine, _, audit) = engine();
        let user = UserId::new();

        engine
            .record_violation(violation(user, ViolationType::Spam))
            .await
            .unwrap();
        engine
            .record_violation(violation(user, ViolationType::Drugs))
            .await
            .unwrap();

        let entries = audit.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].action.starts_with("enforcement."));
        assert_eq!(entries[0].actor_type, ActorType::Ai);
    }

    #[tokio::test]
    async fn test_unknown_user_may_upload() {
        let (engine, _, _) = engine();
        assert!(engine.check_user_can_upload(UserId::new()).await.allowed);
    }
}
