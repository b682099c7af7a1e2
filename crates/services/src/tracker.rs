use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use course_core::Clock;
use course_core::metrics::{self, AchievementTier};
use course_core::model::{Catalog, LessonId, ProgressRecord};
use course_core::streak::{self, StreakChange};
use storage::repository::ProgressRepository;

use crate::error::TrackerError;
use crate::lifecycle::LifecycleEvent;

//
// ─── OUTCOME TYPES ─────────────────────────────────────────────────────────────
//

/// Where the active record came from at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// No persisted record existed; the session starts from seed defaults.
    Fresh,
    /// A persisted record was found and merged over the defaults.
    Persisted,
    /// Storage failed or the record was malformed; seed defaults are used
    /// and the failure was logged. The session runs in memory only until
    /// a later save succeeds.
    FallbackAfterError,
}

/// Everything that happened while opening the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    pub source: LoadSource,
    /// Streak transition applied to a persisted record, if one was loaded.
    pub streak: Option<StreakChange>,
    /// Replacement applied to an out-of-catalog current lesson, if any.
    pub normalized_current: Option<LessonId>,
}

/// Result of a persistence attempt.
///
/// Failures are absorbed here rather than raised: the worst case for the
/// learner is a session that does not survive a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Saved { at: DateTime<Utc> },
    /// Nothing changed, nothing written.
    Skipped,
    Failed,
}

/// Result of completing a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// False when the lesson was already in the completed set.
    pub newly_completed: bool,
    pub xp_awarded: u32,
    /// Tier the record sits at after this completion.
    pub tier: AchievementTier,
    pub save: SaveStatus,
}

/// Explicit learner confirmation for the one destructive action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetConfirmation {
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// Confirmation was withheld; the record is untouched.
    Cancelled,
    Reset { save: SaveStatus },
}

//
// ─── PROGRESS TRACKER ──────────────────────────────────────────────────────────
//

/// Application controller owning one learner's session.
///
/// Holds the course catalog, the in-memory progress record, the
/// persistence handle, and a clock, all as explicit state. Learner
/// actions mutate the record and persist it; the read API hands out
/// derived metrics and defensive copies.
pub struct ProgressTracker {
    catalog: Catalog,
    record: ProgressRecord,
    repo: Arc<dyn ProgressRepository>,
    clock: Clock,
}

impl ProgressTracker {
    /// Load the persisted record (if any), merge it over seed defaults,
    /// apply the streak transition, and normalize the current lesson.
    ///
    /// Never fails: storage errors are logged and degrade the session to
    /// in-memory defaults, reported through the returned [`LoadOutcome`].
    pub async fn open(
        catalog: Catalog,
        repo: Arc<dyn ProgressRepository>,
        clock: Clock,
    ) -> (Self, LoadOutcome) {
        let now = clock.now();
        let seed = ProgressRecord::seed(catalog.first().id(), now);

        let (record, source, streak_change) = match repo.load().await {
            Ok(Some(draft)) => {
                let mut merged = seed.merge(draft);
                let outcome = streak::advance(merged.streak(), merged.last_visit(), now);
                merged.set_streak(outcome.streak);
                (merged, LoadSource::Persisted, Some(outcome.change))
            }
            Ok(None) => (seed, LoadSource::Fresh, None),
            Err(err) => {
                warn!(error = %err, "failed to load persisted progress; starting from defaults");
                (seed, LoadSource::FallbackAfterError, None)
            }
        };

        let mut tracker = Self {
            catalog,
            record,
            repo,
            clock,
        };

        let normalized_current =
            metrics::normalized_current_lesson(&tracker.record, &tracker.catalog);
        if let Some(next) = normalized_current {
            tracker.record.set_current_lesson(next);
            // Persist the correction right away so a crashy session does
            // not resurrect the out-of-range lesson.
            tracker.save().await;
        }

        let outcome = LoadOutcome {
            source,
            streak: streak_change,
            normalized_current,
        };
        (tracker, outcome)
    }

    /// Serialize the record into the storage slot.
    ///
    /// Refreshes `last_visit` first, so saving is idempotent except for
    /// the timestamp. A storage failure is logged and reported as
    /// [`SaveStatus::Failed`]; the in-memory record stays authoritative.
    pub async fn save(&mut self) -> SaveStatus {
        let now = self.clock.now();
        self.record.touch(now);
        match self.repo.save(&self.record.to_draft()).await {
            Ok(()) => SaveStatus::Saved { at: now },
            Err(err) => {
                warn!(error = %err, "failed to persist progress; continuing in memory");
                SaveStatus::Failed
            }
        }
    }

    fn require_lesson(&self, id: LessonId) -> Result<(), TrackerError> {
        if self.catalog.get(id).is_some() {
            Ok(())
        } else {
            Err(TrackerError::UnknownLesson(id))
        }
    }

    // ── Learner actions ──

    /// Mark a lesson done and award its XP.
    ///
    /// Completing an already-complete lesson is a no-op that awards
    /// nothing and writes nothing.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::UnknownLesson` if the id is not in the
    /// catalog.
    pub async fn complete_lesson(
        &mut self,
        id: LessonId,
    ) -> Result<CompletionOutcome, TrackerError> {
        self.require_lesson(id)?;

        if !self.record.mark_completed(id) {
            return Ok(CompletionOutcome {
                newly_completed: false,
                xp_awarded: 0,
                tier: self.achievement_tier(),
                save: SaveStatus::Skipped,
            });
        }

        let xp = metrics::xp_for_lesson(id);
        self.record.add_xp(xp);
        let save = self.save().await;

        Ok(CompletionOutcome {
            newly_completed: true,
            xp_awarded: xp,
            tier: self.achievement_tier(),
            save,
        })
    }

    /// Undo a completion, taking back the XP it awarded (clamped at zero).
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::UnknownLesson` if the id is not in the
    /// catalog.
    pub async fn uncomplete_lesson(&mut self, id: LessonId) -> Result<SaveStatus, TrackerError> {
        self.require_lesson(id)?;

        if !self.record.unmark_completed(id) {
            return Ok(SaveStatus::Skipped);
        }
        self.record.deduct_xp(metrics::xp_for_lesson(id));
        Ok(self.save().await)
    }

    /// Attach free-text notes to a lesson, replacing any previous note.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::UnknownLesson` if the id is not in the
    /// catalog.
    pub async fn set_note(
        &mut self,
        id: LessonId,
        text: impl Into<String>,
    ) -> Result<SaveStatus, TrackerError> {
        self.require_lesson(id)?;
        self.record.set_note(id, text);
        Ok(self.save().await)
    }

    /// Remove a lesson's note, if there was one.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::UnknownLesson` if the id is not in the
    /// catalog.
    pub async fn clear_note(&mut self, id: LessonId) -> Result<SaveStatus, TrackerError> {
        self.require_lesson(id)?;
        if self.record.clear_note(id) {
            Ok(self.save().await)
        } else {
            Ok(SaveStatus::Skipped)
        }
    }

    /// Jump directly to a lesson.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::UnknownLesson` if the id is not in the
    /// catalog.
    pub async fn go_to_lesson(&mut self, id: LessonId) -> Result<SaveStatus, TrackerError> {
        self.require_lesson(id)?;
        if self.record.current_lesson() == id {
            return Ok(SaveStatus::Skipped);
        }
        self.record.set_current_lesson(id);
        Ok(self.save().await)
    }

    /// Step to the following lesson, clamped at the end of the course.
    pub async fn next_lesson(&mut self) -> SaveStatus {
        let position = self
            .catalog
            .position(self.record.current_lesson())
            .unwrap_or(0);
        let last = self.catalog.len() - 1;
        self.move_to_position(position.saturating_add(1).min(last))
            .await
    }

    /// Step to the preceding lesson, clamped at the start of the course.
    pub async fn previous_lesson(&mut self) -> SaveStatus {
        let position = self
            .catalog
            .position(self.record.current_lesson())
            .unwrap_or(0);
        self.move_to_position(position.saturating_sub(1)).await
    }

    async fn move_to_position(&mut self, position: usize) -> SaveStatus {
        let Some(lesson) = self.catalog.lesson_at(position) else {
            return SaveStatus::Skipped;
        };
        let id = lesson.id();
        if self.record.current_lesson() == id {
            return SaveStatus::Skipped;
        }
        self.record.set_current_lesson(id);
        self.save().await
    }

    /// Grant XP outside the per-lesson reward.
    pub async fn award_xp(&mut self, amount: u32) -> SaveStatus {
        self.record.add_xp(amount);
        self.save().await
    }

    /// Take XP away; the balance never goes below zero.
    pub async fn deduct_xp(&mut self, amount: u32) -> SaveStatus {
        self.record.deduct_xp(amount);
        self.save().await
    }

    /// Destroy all progress and persist fresh post-reset defaults.
    ///
    /// The confirmation parameter is the whole point: callers must spell
    /// out that the learner agreed. `Cancelled` leaves both the record
    /// and the storage slot untouched.
    pub async fn reset(&mut self, confirmation: ResetConfirmation) -> ResetOutcome {
        if confirmation == ResetConfirmation::Cancelled {
            return ResetOutcome::Cancelled;
        }

        let now = self.clock.now();
        self.record = ProgressRecord::fresh(self.catalog.first().id(), now);
        let save = self.save().await;
        ResetOutcome::Reset { save }
    }

    /// React to a page-lifecycle trigger from the surrounding shell.
    pub async fn handle_lifecycle(&mut self, event: LifecycleEvent) -> SaveStatus {
        match event {
            LifecycleEvent::Hidden | LifecycleEvent::Unload => self.save().await,
        }
    }

    // ── Read API (UI boundary) ──

    /// Defensive copy of the live record.
    #[must_use]
    pub fn snapshot(&self) -> ProgressRecord {
        self.record.clone()
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn current_lesson(&self) -> LessonId {
        self.record.current_lesson()
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.record.streak()
    }

    #[must_use]
    pub fn xp(&self) -> u32 {
        self.record.xp()
    }

    #[must_use]
    pub fn note(&self, id: LessonId) -> Option<&str> {
        self.record.note(id)
    }

    #[must_use]
    pub fn is_completed(&self, id: LessonId) -> bool {
        metrics::is_completed(&self.record, id)
    }

    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        metrics::progress_percent(&self.record, &self.catalog)
    }

    #[must_use]
    pub fn achievement_tier(&self) -> AchievementTier {
        metrics::achievement_tier(&self.record, &self.catalog)
    }

    #[must_use]
    pub fn next_incomplete_lesson(&self) -> LessonId {
        metrics::next_incomplete_lesson(&self.record, &self.catalog)
    }

    /// Render every lesson note into one exportable text blob.
    ///
    /// Lessons appear in catalog order under a `--- title ---` heading;
    /// lessons without a note are skipped entirely.
    #[must_use]
    pub fn export_notes(&self) -> String {
        let mut out = format!("=== {} - My Notes ===\n\n", self.catalog.title());
        for lesson in self.catalog.iter() {
            if let Some(note) = self.record.note(lesson.id()) {
                out.push_str("\n--- ");
                out.push_str(lesson.title());
                out.push_str(" ---\n");
                out.push_str(note);
                out.push_str("\n\n");
            }
        }
        out
    }
}
