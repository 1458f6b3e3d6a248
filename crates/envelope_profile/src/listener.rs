//! Consumers of flaw and violation notifications.

use envelope_model::{InstantId, ProblemKind};
use serde::Serialize;

/// Receives state changes of instants as the detector finds them.
///
/// Notifications are edge-triggered: a listener hears about a violation or
/// flaw when it appears and again when it clears, not on every sweep.
pub trait ResourceListener {
    /// An instant became violated with `kind`.
    fn notify_of_violation(&mut self, instant: InstantId, kind: ProblemKind);

    /// A violated instant is no longer violated.
    fn notify_no_longer_violated(&mut self, instant: InstantId);

    /// An instant became flawed.
    fn notify_of_flaw(&mut self, instant: InstantId);

    /// A flawed instant is no longer flawed.
    fn notify_no_longer_flawed(&mut self, instant: InstantId);

    /// An instant was removed from the timeline.
    fn notify_deleted(&mut self, instant: InstantId);
}

/// One notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ResourceEvent {
    /// See [`ResourceListener::notify_of_violation`].
    Violation {
        /// Instant concerned.
        instant: InstantId,
        /// What is violated.
        kind: ProblemKind,
    },
    /// See [`ResourceListener::notify_no_longer_violated`].
    NoLongerViolated {
        /// Instant concerned.
        instant: InstantId,
    },
    /// See [`ResourceListener::notify_of_flaw`].
    Flaw {
        /// Instant concerned.
        instant: InstantId,
    },
    /// See [`ResourceListener::notify_no_longer_flawed`].
    NoLongerFlawed {
        /// Instant concerned.
        instant: InstantId,
    },
    /// See [`ResourceListener::notify_deleted`].
    Deleted {
        /// Instant concerned.
        instant: InstantId,
    },
}

/// Keeps every notification in arrival order.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    events: Vec<ResourceEvent>,
}

impl RecordingListener {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded notifications.
    pub fn events(&self) -> &[ResourceEvent] {
        &self.events
    }

    /// Removes and returns the recorded notifications.
    pub fn drain(&mut self) -> Vec<ResourceEvent> {
        std::mem::take(&mut self.events)
    }
}

impl ResourceListener for RecordingListener {
    fn notify_of_violation(&mut self, instant: InstantId, kind: ProblemKind) {
        self.events.push(ResourceEvent::Violation { instant, kind });
    }

    fn notify_no_longer_violated(&mut self, instant: InstantId) {
        self.events.push(ResourceEvent::NoLongerViolated { instant });
    }

    fn notify_of_flaw(&mut self, instant: InstantId) {
        self.events.push(ResourceEvent::Flaw { instant });
    }

    fn notify_no_longer_flawed(&mut self, instant: InstantId) {
        self.events.push(ResourceEvent::NoLongerFlawed { instant });
    }

    fn notify_deleted(&mut self, instant: InstantId) {
        self.events.push(ResourceEvent::Deleted { instant });
    }
}

/// Ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullListener;

impl ResourceListener for NullListener {
    fn notify_of_violation(&mut self, _instant: InstantId, _kind: ProblemKind) {}

    fn notify_no_longer_violated(&mut self, _instant: InstantId) {}

    fn notify_of_flaw(&mut self, _instant: InstantId) {}

    fn notify_no_longer_flawed(&mut self, _instant: InstantId) {}

    fn notify_deleted(&mut self, _instant: InstantId) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use envelope_model::{Arena, Instant};

    #[test]
    fn recorder_keeps_order_and_drains() {
        let mut arena = Arena::new();
        let id = arena.insert(Instant::new(3));

        let mut listener = RecordingListener::new();
        listener.notify_of_flaw(id);
        listener.notify_of_violation(id, ProblemKind::LevelTooLow);
        listener.notify_deleted(id);

        assert_eq!(
            listener.events(),
            &[
                ResourceEvent::Flaw { instant: id },
                ResourceEvent::Violation {
                    instant: id,
                    kind: ProblemKind::LevelTooLow
                },
                ResourceEvent::Deleted { instant: id },
            ]
        );
        assert_eq!(listener.drain().len(), 3);
        assert!(listener.events().is_empty());
    }

    #[test]
    fn events_serialize_with_a_tag() {
        let mut arena = Arena::new();
        let id = arena.insert(Instant::new(0));
        let json = serde_json::to_string(&ResourceEvent::NoLongerFlawed { instant: id }).unwrap();
        assert!(json.contains("\"event\":\"no_longer_flawed\""));
    }
}
