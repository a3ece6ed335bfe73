//! Store change events for observers (UI bindings, diagnostics, tests).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::{ApplicationStatus, DashboardPeriod};
use crate::session::SessionStatus;

/// Which store an event came from.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Session,
    Jobs,
    Applications,
    Dashboard,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Session => write!(f, "session"),
            StoreKind::Jobs => write!(f, "jobs"),
            StoreKind::Applications => write!(f, "applications"),
            StoreKind::Dashboard => write!(f, "dashboard"),
        }
    }
}

/// A state change that has already been committed.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StoreEvent {
    SessionChanged {
        status: SessionStatus,
    },
    JobsLoaded {
        count: usize,
        page: u32,
    },
    JobBookmarkChanged {
        #[serde(rename = "jobId")]
        job_id: String,
        bookmarked: bool,
    },
    ApplicationsLoaded {
        count: usize,
    },
    ApplicationAdded {
        #[serde(rename = "applicationId")]
        application_id: String,
        status: ApplicationStatus,
    },
    ApplicationStatusChanged {
        #[serde(rename = "applicationId")]
        application_id: String,
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    ApplicationRemoved {
        #[serde(rename = "applicationId")]
        application_id: String,
    },
    DashboardLoaded {
        period: DashboardPeriod,
        #[serde(rename = "loadedAt")]
        loaded_at: DateTime<Utc>,
    },
    DashboardCountsAdjusted {
        from: Option<ApplicationStatus>,
        to: Option<ApplicationStatus>,
    },
    Failed {
        store: StoreKind,
        message: String,
    },
}

/// Broadcasts store events to any number of subscribers.
#[derive(Clone)]
pub struct StoreEventBroadcaster {
    sender: Arc<broadcast::Sender<StoreEvent>>,
}

impl StoreEventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: StoreEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    pub fn failure(&self, store: StoreKind, message: &str) {
        self.send(StoreEvent::Failed {
            store,
            message: message.to_string(),
        });
    }
}

impl Default for StoreEventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let broadcaster = StoreEventBroadcaster::default();
        let mut rx = broadcaster.subscribe();

        broadcaster.send(StoreEvent::JobsLoaded { count: 3, page: 1 });

        let event = rx.recv().await.unwrap();
        assert_eq!(event, StoreEvent::JobsLoaded { count: 3, page: 1 });
    }

    #[test]
    fn test_send_without_subscribers() {
        let broadcaster = StoreEventBroadcaster::new(4);
        broadcaster.failure(StoreKind::Jobs, "boom");
    }

    #[test]
    fn test_event_serialization() {
        let event = StoreEvent::ApplicationStatusChanged {
            application_id: "a1".to_string(),
            from: ApplicationStatus::Applied,
            to: ApplicationStatus::Interview,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "applicationStatusChanged");
        assert_eq!(json["applicationId"], "a1");
        assert_eq!(json["to"], "interview");
    }
}
