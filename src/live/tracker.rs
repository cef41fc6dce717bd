use log::{debug, warn};

use crate::errors::PitwallError;
use crate::model::EventDetail;

/// Latest known state of one event.
///
/// The snapshot is only ever replaced as a whole. A failed fetch leaves the previous
/// snapshot in place, so the tracker keeps serving stale data rather than nothing while
/// the backend is unreachable.
#[derive(Debug, Default)]
pub struct LifecycleTracker {
    snapshot: Option<EventDetail>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the outcome of a fetch. Returns true when the snapshot was replaced.
    pub fn apply(&mut self, fetched: Result<EventDetail, PitwallError>) -> bool {
        match fetched {
            Ok(event) => {
                if let Some(previous) = &self.snapshot {
                    if previous.status != event.status {
                        debug!(
                            "Event {} went from {} to {}",
                            event.slug, previous.status, event.status
                        );
                    }
                }
                self.snapshot = Some(event);
                true
            }
            Err(e) => {
                warn!("Event refresh failed, keeping the last snapshot: {}", e);
                false
            }
        }
    }

    pub fn snapshot(&self) -> Option<&EventDetail> {
        self.snapshot.as_ref()
    }

    /// Polling only runs while the known snapshot says the event is live.
    pub fn should_poll(&self) -> bool {
        self.snapshot.as_ref().is_some_and(|e| e.status.is_live())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LifecycleStatus;

    fn event(status: LifecycleStatus) -> EventDetail {
        let mut event: EventDetail =
            serde_json::from_str(crate::model::tests::EVENT_JSON).unwrap();
        event.status = status;
        event
    }

    fn offline() -> PitwallError {
        PitwallError::HttpStatus {
            status: 503,
            path: "/api/events/monza".to_string(),
        }
    }

    #[test]
    fn test_unresolved_until_first_success() {
        let mut tracker = LifecycleTracker::new();
        assert!(tracker.snapshot().is_none());
        assert!(!tracker.apply(Err(offline())));
        assert!(tracker.snapshot().is_none());
        assert!(!tracker.should_poll());
    }

    #[test]
    fn test_failure_keeps_previous_snapshot() {
        let mut tracker = LifecycleTracker::new();
        assert!(tracker.apply(Ok(event(LifecycleStatus::Live))));
        assert!(!tracker.apply(Err(offline())));
        assert_eq!(
            tracker.snapshot().map(|e| &e.status),
            Some(&LifecycleStatus::Live)
        );
        assert!(tracker.should_poll());
    }

    #[test]
    fn test_polling_stops_when_event_leaves_live() {
        let mut tracker = LifecycleTracker::new();
        tracker.apply(Ok(event(LifecycleStatus::Live)));
        assert!(tracker.should_poll());
        tracker.apply(Ok(event(LifecycleStatus::Completed)));
        assert!(!tracker.should_poll());
        tracker.apply(Ok(event(LifecycleStatus::Other("red_flag".to_string()))));
        assert!(!tracker.should_poll());
    }
}
