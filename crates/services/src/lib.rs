#![forbid(unsafe_code)]

pub mod error;
pub mod lifecycle;
pub mod tracker;

pub use course_core::Clock;

pub use error::TrackerError;
pub use lifecycle::LifecycleEvent;
pub use tracker::{
    CompletionOutcome, LoadOutcome, LoadSource, ProgressTracker, ResetConfirmation, ResetOutcome,
    SaveStatus,
};
