//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::LessonId;

/// Errors emitted by `ProgressTracker`.
///
/// Persistence failures are deliberately absent: saves degrade to an
/// in-memory session and report through [`crate::SaveStatus`] instead of
/// an error, so no learner action can fail just because storage did.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    #[error("unknown lesson: {0}")]
    UnknownLesson(LessonId),
}
