/// Page-lifecycle moments at which the surrounding shell hands control to
/// the tracker.
///
/// The initial-load trigger has no variant here: loading is what
/// [`crate::ProgressTracker::open`] does. The remaining two both flush the
/// in-memory record to storage, so a session survives the tab being
/// hidden or torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The surrounding shell became invisible (tab hidden, window minimized).
    Hidden,
    /// The surrounding shell is shutting down.
    Unload,
}
