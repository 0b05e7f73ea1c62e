// Notification Presenter Port
// Rendering collaborator: the service decides visibility, the presenter draws it

use crate::domain::{Notification, NotificationId};

/// Receives visibility transitions from the notification service
///
/// Called outside the service's internal lock, so implementations may call
/// back into the service.
pub trait NotificationPresenter: Send + Sync {
    fn show(&self, notification: &Notification);
    fn hide(&self, id: NotificationId);
}

/// Presenter that only logs (headless default)
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPresenter;

impl NotificationPresenter for TracingPresenter {
    fn show(&self, notification: &Notification) {
        tracing::info!(
            id = %notification.id,
            severity = %notification.severity,
            message = %notification.message,
            "Notification shown"
        );
    }

    fn hide(&self, id: NotificationId) {
        tracing::debug!(id = %id, "Notification hidden");
    }
}

pub mod mocks {
    use super::*;
    use crate::domain::Severity;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum PresenterEvent {
        Shown(NotificationId, Severity, String),
        Hidden(NotificationId),
    }

    /// Presenter recording every transition in order
    #[derive(Debug, Default)]
    pub struct RecordingPresenter {
        events: Mutex<Vec<PresenterEvent>>,
    }

    impl RecordingPresenter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<PresenterEvent> {
            self.events.lock().unwrap().clone()
        }

        /// Messages of every notification shown so far
        pub fn shown_messages(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    PresenterEvent::Shown(_, _, msg) => Some(msg),
                    PresenterEvent::Hidden(_) => None,
                })
                .collect()
        }
    }

    impl NotificationPresenter for RecordingPresenter {
        fn show(&self, notification: &Notification) {
            self.events.lock().unwrap().push(PresenterEvent::Shown(
                notification.id,
                notification.severity,
                notification.message.clone(),
            ));
        }

        fn hide(&self, id: NotificationId) {
            self.events.lock().unwrap().push(PresenterEvent::Hidden(id));
        }
    }
}
