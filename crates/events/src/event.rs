use chrono::{DateTime, Utc};

/// A domain-agnostic event.
///
/// Events are immutable facts; `event_type` is stable across releases and
/// `version` tracks schema evolution.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "directory.role.deleted").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the change happened (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
