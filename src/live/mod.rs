//! Live event tracking.
//!
//! `EventViewHandle` runs the event page as a single tokio task: it loads the event,
//! picks a session, keeps results and lap telemetry for the selection and, while the
//! event is live, refreshes everything on a fixed interval. The pure pieces it is
//! built from live in their own modules.

pub mod intervals;
pub mod selection;
pub mod tracker;
pub mod view;

pub use intervals::{compute_class_intervals, display_gaps, parse_timing_to_seconds};
pub use selection::{Reconciliation, SelectionFallback, pick_default_session, reconcile_selection};
pub use tracker::LifecycleTracker;
pub use view::{DEFAULT_POLL_INTERVAL_MS, EventView, EventViewHandle, ViewCommand, ViewOptions};
