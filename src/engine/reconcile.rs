//! Reconciliation - bring local state in line with the ledger and the clock
//!
//! Runs on attach, on every ledger change and whenever a countdown expires.
//! Running intervals get a countdown; expired ones are credited immediately,
//! however long ago they expired. Repeated passes are harmless.

use serde::Serialize;

use crate::core::error::{EngineError, Result};
use crate::core::types::SkillId;
use crate::engine::completion::{CompletionOutcome, CompletionReport};
use crate::engine::events::EngineEvent;
use crate::engine::EngineCore;
use crate::ledger::{LedgerSnapshot, TrainingInterval};

/// Summary of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// Completions credited by this pass
    pub credited: Vec<CompletionReport>,
    /// Skills still counting down
    pub running: Vec<SkillId>,
    /// Intervals cleared because their skill left the catalog
    pub discarded: Vec<SkillId>,
    /// Completions that failed and stay owed
    pub failed: Vec<(SkillId, String)>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn merge(&mut self, other: ReconcileReport) {
        self.credited.extend(other.credited);
        self.running.extend(other.running);
        self.discarded.extend(other.discarded);
        self.failed.extend(other.failed);
    }
}

impl EngineCore {
    pub(crate) async fn reconcile_now(&self) -> Result<ReconcileReport> {
        let snapshot = self.backend.ledger.snapshot(&self.user).await?;
        Ok(self.reconcile_snapshot(snapshot).await)
    }

    pub(crate) async fn reconcile_snapshot(&self, snapshot: LedgerSnapshot) -> ReconcileReport {
        for skill in self.tracked_skills() {
            if !snapshot.contains_key(&skill) {
                self.mark_idle(&skill);
            }
        }

        let mut report = ReconcileReport::default();
        for (_, interval) in snapshot {
            report.merge(self.reconcile_interval(interval).await);
        }
        report
    }

    /// Re-check one skill, typically after its countdown reached zero
    pub(crate) async fn reconcile_skill(&self, skill: &SkillId) -> ReconcileReport {
        match self.backend.ledger.get(&self.user, skill).await {
            Ok(Some(interval)) => self.reconcile_interval(interval).await,
            Ok(None) => {
                self.mark_idle(skill);
                ReconcileReport::default()
            }
            Err(e) => {
                let mut report = ReconcileReport::default();
                report.failed.push(self.report_failure(skill, &EngineError::from(e)));
                self.schedule_retry(skill);
                report
            }
        }
    }

    async fn reconcile_interval(&self, interval: TrainingInterval) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let skill = interval.skill_id.clone();

        if !interval.is_completable(self.clock.now()) {
            self.mark_running(interval);
            report.running.push(skill);
            return report;
        }

        self.mark_completable(interval.clone());
        match self.complete(&interval).await {
            Ok(CompletionOutcome::Credited(credited)) => {
                if let Some(next) = &credited.rearmed {
                    report.running.push(next.skill_id.clone());
                }
                report.credited.push(credited);
            }
            Ok(CompletionOutcome::Discarded) => report.discarded.push(skill),
            Ok(outcome) => {
                tracing::trace!(skill = %skill, ?outcome, "nothing to credit");
            }
            Err(e) => {
                report.failed.push(self.report_failure(&skill, &e));
                self.schedule_retry(&skill);
            }
        }
        report
    }

    fn report_failure(&self, skill: &SkillId, error: &EngineError) -> (SkillId, String) {
        tracing::warn!(
            user = %self.user,
            skill = %skill,
            error = %error,
            transient = error.is_transient(),
            "completion failed, will retry on next pass"
        );
        self.events.emit(EngineEvent::Failed {
            skill_id: skill.clone(),
            error: error.to_string(),
        });
        (skill.clone(), error.to_string())
    }
}
