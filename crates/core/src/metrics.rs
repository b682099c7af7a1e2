use std::fmt;

use crate::model::{Catalog, LessonId, ProgressRecord};

/// Fixed XP reward for completing any lesson.
pub const XP_PER_LESSON: u32 = 100;

//
// ─── ACHIEVEMENT TIERS ─────────────────────────────────────────────────────────
//

/// Coarse classification of completion percentage, used to trigger
/// celebratory signals. Thresholds are evaluated top-down; the first match
/// wins, so a finished course never also reports `ThreeQuarters`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AchievementTier {
    None,
    FirstLesson,
    Quarter,
    Halfway,
    ThreeQuarters,
    CourseComplete,
}

impl fmt::Display for AchievementTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AchievementTier::None => "none",
            AchievementTier::FirstLesson => "first_lesson",
            AchievementTier::Quarter => "quarter",
            AchievementTier::Halfway => "halfway",
            AchievementTier::ThreeQuarters => "three_quarters",
            AchievementTier::CourseComplete => "course_complete",
        };
        write!(f, "{name}")
    }
}

//
// ─── METRICS ───────────────────────────────────────────────────────────────────
//

/// Number of completed lessons that actually exist in the catalog.
///
/// Completed ids with no catalog entry (the catalog shrank since they were
/// recorded) are excluded from every metric so percentages stay in range.
#[must_use]
pub fn completed_in_catalog(record: &ProgressRecord, catalog: &Catalog) -> usize {
    catalog
        .iter()
        .filter(|lesson| record.is_completed(lesson.id()))
        .count()
}

/// Completion percentage in `0..=100`, rounded half-up.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn progress_percent(record: &ProgressRecord, catalog: &Catalog) -> u8 {
    let done = completed_in_catalog(record, catalog) as f64;
    let total = catalog.len() as f64;
    ((done / total) * 100.0).round() as u8
}

/// Membership test against the completed set.
#[must_use]
pub fn is_completed(record: &ProgressRecord, id: LessonId) -> bool {
    record.is_completed(id)
}

/// First lesson in catalog order that has not been completed.
///
/// When every lesson is complete this wraps to the first lesson of the
/// course; that is deliberate, not an error.
#[must_use]
pub fn next_incomplete_lesson(record: &ProgressRecord, catalog: &Catalog) -> LessonId {
    catalog
        .iter()
        .find(|lesson| !record.is_completed(lesson.id()))
        .unwrap_or_else(|| catalog.first())
        .id()
}

/// Classify the record into an achievement tier.
#[must_use]
pub fn achievement_tier(record: &ProgressRecord, catalog: &Catalog) -> AchievementTier {
    let percent = progress_percent(record, catalog);
    if percent == 100 {
        AchievementTier::CourseComplete
    } else if percent >= 75 {
        AchievementTier::ThreeQuarters
    } else if percent >= 50 {
        AchievementTier::Halfway
    } else if percent >= 25 {
        AchievementTier::Quarter
    } else if completed_in_catalog(record, catalog) == 1 {
        AchievementTier::FirstLesson
    } else {
        AchievementTier::None
    }
}

/// XP reward for completing the given lesson.
///
/// Currently a fixed per-lesson amount; the id parameter keeps room for
/// position- or difficulty-dependent rewards later.
#[must_use]
pub fn xp_for_lesson(_id: LessonId) -> u32 {
    XP_PER_LESSON
}

/// Replacement current lesson, if the record points at a lesson the
/// catalog no longer contains.
///
/// Returns `Some(first incomplete lesson)` when the current lesson id is
/// unknown to the catalog, `None` when the record is already in range.
/// Callers apply the replacement and re-save immediately.
#[must_use]
pub fn normalized_current_lesson(record: &ProgressRecord, catalog: &Catalog) -> Option<LessonId> {
    if catalog.get(record.current_lesson()).is_some() {
        None
    } else {
        Some(next_incomplete_lesson(record, catalog))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Lesson;
    use crate::time::fixed_now;

    fn catalog_of(len: u64) -> Catalog {
        let lessons = (1..=len)
            .map(|id| Lesson::new(LessonId::new(id), format!("Lesson {id}"), format!("vid{id}"), "").unwrap())
            .collect();
        Catalog::new("Test Course", lessons).unwrap()
    }

    fn record_with_completed(catalog: &Catalog, ids: &[u64]) -> ProgressRecord {
        let mut record = ProgressRecord::seed(catalog.first().id(), fixed_now());
        for id in ids {
            record.mark_completed(LessonId::new(*id));
        }
        record
    }

    #[test]
    fn percent_of_two_in_five_is_forty() {
        let catalog = catalog_of(5);
        let record = record_with_completed(&catalog, &[1, 2]);
        assert_eq!(progress_percent(&record, &catalog), 40);
    }

    #[test]
    fn percent_rounds_half_up() {
        let catalog = catalog_of(8);
        let record = record_with_completed(&catalog, &[1]);
        // 1/8 = 12.5%
        assert_eq!(progress_percent(&record, &catalog), 13);
    }

    #[test]
    fn stray_completed_ids_do_not_inflate_percent() {
        let catalog = catalog_of(5);
        let record = record_with_completed(&catalog, &[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(progress_percent(&record, &catalog), 100);
    }

    #[test]
    fn full_completion_reports_course_complete_only() {
        let catalog = catalog_of(5);
        let record = record_with_completed(&catalog, &[1, 2, 3, 4, 5]);
        assert_eq!(
            achievement_tier(&record, &catalog),
            AchievementTier::CourseComplete
        );
    }

    #[test]
    fn tier_thresholds_evaluate_top_down() {
        let catalog = catalog_of(5);
        assert_eq!(
            achievement_tier(&record_with_completed(&catalog, &[1, 2, 3, 4]), &catalog),
            AchievementTier::ThreeQuarters
        );
        assert_eq!(
            achievement_tier(&record_with_completed(&catalog, &[1, 2, 3]), &catalog),
            AchievementTier::Halfway
        );
        assert_eq!(
            achievement_tier(&record_with_completed(&catalog, &[1, 2]), &catalog),
            AchievementTier::Quarter
        );
        assert_eq!(
            achievement_tier(&record_with_completed(&catalog, &[1]), &catalog),
            AchievementTier::FirstLesson
        );
        assert_eq!(
            achievement_tier(&record_with_completed(&catalog, &[]), &catalog),
            AchievementTier::None
        );
    }

    #[test]
    fn next_incomplete_scans_in_catalog_order() {
        let catalog = catalog_of(5);
        let record = record_with_completed(&catalog, &[1, 3]);
        assert_eq!(next_incomplete_lesson(&record, &catalog), LessonId::new(2));
    }

    #[test]
    fn next_incomplete_wraps_to_first_when_all_done() {
        let catalog = catalog_of(5);
        let record = record_with_completed(&catalog, &[1, 2, 3, 4, 5]);
        assert_eq!(next_incomplete_lesson(&record, &catalog), LessonId::new(1));
    }

    #[test]
    fn out_of_catalog_current_lesson_is_normalized() {
        let catalog = catalog_of(5);
        let mut record = record_with_completed(&catalog, &[1, 2]);
        record.set_current_lesson(LessonId::new(99));

        assert_eq!(
            normalized_current_lesson(&record, &catalog),
            Some(LessonId::new(3))
        );

        record.set_current_lesson(LessonId::new(4));
        assert_eq!(normalized_current_lesson(&record, &catalog), None);
    }

    #[test]
    fn xp_reward_is_position_independent() {
        assert_eq!(xp_for_lesson(LessonId::new(1)), XP_PER_LESSON);
        assert_eq!(xp_for_lesson(LessonId::new(42)), XP_PER_LESSON);
    }
}
