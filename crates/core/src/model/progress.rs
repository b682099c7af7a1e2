use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::catalog::LessonId;

/// Streak value a brand-new in-memory record starts with (demo seed).
pub const SEED_STREAK: u32 = 7;
/// XP value a brand-new in-memory record starts with (demo seed).
pub const SEED_XP: u32 = 2450;

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// The complete mutable snapshot of one learner's state.
///
/// Owned by the application controller for the duration of a session;
/// persisted as a whole on every save point. Lessons are referenced by
/// stable [`LessonId`], never by catalog position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    current_lesson: LessonId,
    completed: BTreeSet<LessonId>,
    notes: BTreeMap<LessonId, String>,
    streak: u32,
    xp: u32,
    last_visit: DateTime<Utc>,
}

impl ProgressRecord {
    /// In-memory defaults constructed at startup, before any persisted
    /// record has been merged in. Carries the demo seed streak and XP.
    #[must_use]
    pub fn seed(first_lesson: LessonId, now: DateTime<Utc>) -> Self {
        Self {
            current_lesson: first_lesson,
            completed: BTreeSet::new(),
            notes: BTreeMap::new(),
            streak: SEED_STREAK,
            xp: SEED_XP,
            last_visit: now,
        }
    }

    /// State after an explicit reset: one-day streak, zero XP, nothing
    /// completed.
    #[must_use]
    pub fn fresh(first_lesson: LessonId, now: DateTime<Utc>) -> Self {
        Self {
            current_lesson: first_lesson,
            completed: BTreeSet::new(),
            notes: BTreeMap::new(),
            streak: 1,
            xp: 0,
            last_visit: now,
        }
    }

    /// Merge a persisted draft over this record, field by field.
    ///
    /// Precedence is explicit: a field present in the draft wins wholesale
    /// (a persisted notes map replaces the default map, it is not merged
    /// key-by-key); a field missing from the draft keeps this record's
    /// value.
    #[must_use]
    pub fn merge(self, draft: ProgressDraft) -> Self {
        Self {
            current_lesson: draft.current_lesson.unwrap_or(self.current_lesson),
            completed: draft.completed.unwrap_or(self.completed),
            notes: draft.notes.unwrap_or(self.notes),
            streak: draft.streak.unwrap_or(self.streak),
            xp: draft.xp.unwrap_or(self.xp),
            last_visit: draft.last_visit.unwrap_or(self.last_visit),
        }
    }

    /// The full persisted shape of this record.
    #[must_use]
    pub fn to_draft(&self) -> ProgressDraft {
        ProgressDraft {
            current_lesson: Some(self.current_lesson),
            completed: Some(self.completed.clone()),
            notes: Some(self.notes.clone()),
            streak: Some(self.streak),
            xp: Some(self.xp),
            last_visit: Some(self.last_visit),
        }
    }

    // ── Accessors ──

    #[must_use]
    pub fn current_lesson(&self) -> LessonId {
        self.current_lesson
    }

    #[must_use]
    pub fn completed(&self) -> &BTreeSet<LessonId> {
        &self.completed
    }

    #[must_use]
    pub fn is_completed(&self, id: LessonId) -> bool {
        self.completed.contains(&id)
    }

    #[must_use]
    pub fn note(&self, id: LessonId) -> Option<&str> {
        self.notes.get(&id).map(String::as_str)
    }

    #[must_use]
    pub fn notes(&self) -> &BTreeMap<LessonId, String> {
        &self.notes
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn xp(&self) -> u32 {
        self.xp
    }

    #[must_use]
    pub fn last_visit(&self) -> DateTime<Utc> {
        self.last_visit
    }

    // ── Mutators ──

    pub fn set_current_lesson(&mut self, id: LessonId) {
        self.current_lesson = id;
    }

    /// Mark a lesson completed. Returns false if it already was.
    pub fn mark_completed(&mut self, id: LessonId) -> bool {
        self.completed.insert(id)
    }

    /// Remove a lesson from the completed set. Returns false if it was
    /// not completed.
    pub fn unmark_completed(&mut self, id: LessonId) -> bool {
        self.completed.remove(&id)
    }

    pub fn set_note(&mut self, id: LessonId, text: impl Into<String>) {
        self.notes.insert(id, text.into());
    }

    pub fn clear_note(&mut self, id: LessonId) -> bool {
        self.notes.remove(&id).is_some()
    }

    pub fn add_xp(&mut self, amount: u32) {
        self.xp = self.xp.saturating_add(amount);
    }

    /// Deduct XP, clamping at zero. XP never goes negative.
    pub fn deduct_xp(&mut self, amount: u32) {
        self.xp = self.xp.saturating_sub(amount);
    }

    pub fn set_streak(&mut self, streak: u32) {
        self.streak = streak;
    }

    /// Refresh the last-visit timestamp. Called by the save path just
    /// before serialization.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_visit = now;
    }
}

//
// ─── PERSISTED SHAPE ───────────────────────────────────────────────────────────
//

/// Wire shape of the single persisted progress slot.
///
/// Every field is optional so a record written by an older shape still
/// loads: missing fields fall back to the in-memory defaults during
/// [`ProgressRecord::merge`]. Unknown keys in the stored JSON are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressDraft {
    pub current_lesson: Option<LessonId>,
    pub completed: Option<BTreeSet<LessonId>>,
    pub notes: Option<BTreeMap<LessonId, String>>,
    pub streak: Option<u32>,
    pub xp: Option<u32>,
    pub last_visit: Option<DateTime<Utc>>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn seed() -> ProgressRecord {
        ProgressRecord::seed(LessonId::new(1), fixed_now())
    }

    #[test]
    fn seed_and_fresh_defaults() {
        let record = seed();
        assert_eq!(record.streak(), SEED_STREAK);
        assert_eq!(record.xp(), SEED_XP);
        assert!(record.completed().is_empty());

        let reset = ProgressRecord::fresh(LessonId::new(1), fixed_now());
        assert_eq!(reset.streak(), 1);
        assert_eq!(reset.xp(), 0);
    }

    #[test]
    fn merge_prefers_draft_fields_and_keeps_defaults_for_missing() {
        let draft = ProgressDraft {
            streak: Some(3),
            xp: None,
            ..ProgressDraft::default()
        };

        let merged = seed().merge(draft);
        assert_eq!(merged.streak(), 3);
        assert_eq!(merged.xp(), SEED_XP);
        assert_eq!(merged.current_lesson(), LessonId::new(1));
    }

    #[test]
    fn merge_replaces_notes_wholesale() {
        let mut base = seed();
        base.set_note(LessonId::new(1), "default note");
        base.set_note(LessonId::new(2), "another");

        let mut persisted = BTreeMap::new();
        persisted.insert(LessonId::new(3), "from disk".to_string());

        let merged = base.merge(ProgressDraft {
            notes: Some(persisted),
            ..ProgressDraft::default()
        });

        assert_eq!(merged.note(LessonId::new(3)), Some("from disk"));
        assert_eq!(merged.note(LessonId::new(1)), None);
        assert_eq!(merged.note(LessonId::new(2)), None);
    }

    #[test]
    fn xp_deduction_clamps_at_zero() {
        let mut record = ProgressRecord::fresh(LessonId::new(1), fixed_now());
        record.add_xp(30);
        record.deduct_xp(100);
        assert_eq!(record.xp(), 0);
    }

    #[test]
    fn completion_set_collapses_duplicates() {
        let mut record = seed();
        assert!(record.mark_completed(LessonId::new(2)));
        assert!(!record.mark_completed(LessonId::new(2)));
        assert_eq!(record.completed().len(), 1);
        assert!(record.unmark_completed(LessonId::new(2)));
        assert!(!record.unmark_completed(LessonId::new(2)));
    }

    #[test]
    fn draft_round_trips_through_merge() {
        let mut record = seed();
        record.mark_completed(LessonId::new(1));
        record.set_note(LessonId::new(1), "did this one");
        record.add_xp(100);

        let rebuilt = seed().merge(record.to_draft());
        assert_eq!(rebuilt, record);
    }

    #[test]
    fn draft_tolerates_unknown_and_missing_json_fields() {
        let json = r#"{
            "streak": 4,
            "notes": {"2": "keyed by lesson id"},
            "someday_maybe": true
        }"#;

        let draft: ProgressDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.streak, Some(4));
        assert_eq!(draft.xp, None);
        assert_eq!(
            draft.notes.unwrap().get(&LessonId::new(2)).map(String::as_str),
            Some("keyed by lesson id")
        );
    }
}
