mod catalog;
mod progress;

pub use catalog::{Catalog, CatalogError, Lesson, LessonId};
pub use progress::{ProgressDraft, ProgressRecord, SEED_STREAK, SEED_XP};
