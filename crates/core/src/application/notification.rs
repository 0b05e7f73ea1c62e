//! Notification Queue Manager
//!
//! FIFO queue of pending notifications feeding a bounded visible set.
//! Visible non-persistent notifications expire after their duration; every
//! removal from the visible set promotes the next queued entry.

use crate::config::NotificationConfig;
use crate::domain::{Notification, NotificationAction, NotificationId, Severity};
use crate::port::{
    NotificationPresenter, Sleeper, SystemTimeProvider, TimeProvider, TokioSleeper,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Options recognized by [`NotificationService::enqueue`]
#[derive(Debug, Clone, Default)]
pub struct NotifyOptions {
    /// Lifetime once visible; `Some(Duration::ZERO)` means persistent
    pub duration: Option<Duration>,
    pub persistent: bool,
    pub actions: Vec<NotificationAction>,
    /// Suppresses a second notification while one with this key is queued or visible
    pub dedup_key: Option<String>,
}

impl NotifyOptions {
    pub fn persistent() -> Self {
        Self {
            persistent: true,
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_action(
        mut self,
        label: impl Into<String>,
        handler: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.actions.push(NotificationAction::new(label, handler));
        self
    }

    pub fn with_dedup_key(mut self, key: impl Into<String>) -> Self {
        self.dedup_key = Some(key.into());
        self
    }
}

struct VisibleEntry {
    notification: Notification,
    expiry: Option<JoinHandle<()>>,
}

impl VisibleEntry {
    fn cancel_expiry(&mut self) {
        if let Some(handle) = self.expiry.take() {
            handle.abort();
        }
    }
}

#[derive(Default)]
struct QueueState {
    queued: VecDeque<Notification>,
    visible: Vec<VisibleEntry>,
}

struct Inner {
    config: NotificationConfig,
    presenter: Arc<dyn NotificationPresenter>,
    sleeper: Arc<dyn Sleeper>,
    time_provider: Arc<dyn TimeProvider>,
    next_id: AtomicU64,
    state: Mutex<QueueState>,
}

/// Process-wide notification queue (cheap to clone, clones share state)
#[derive(Clone)]
pub struct NotificationService {
    inner: Arc<Inner>,
}

impl NotificationService {
    pub fn new(config: NotificationConfig, presenter: Arc<dyn NotificationPresenter>) -> Self {
        Self::with_ports(
            config,
            presenter,
            Arc::new(TokioSleeper),
            Arc::new(SystemTimeProvider),
        )
    }

    pub fn with_ports(
        config: NotificationConfig,
        presenter: Arc<dyn NotificationPresenter>,
        sleeper: Arc<dyn Sleeper>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                presenter,
                sleeper,
                time_provider,
                next_id: AtomicU64::new(0),
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// Queue a notification and promote as many queued entries as fit
    ///
    /// Must be called within a tokio runtime (expiry timers are spawned).
    pub fn enqueue(
        &self,
        message: impl Into<String>,
        severity: Severity,
        options: NotifyOptions,
    ) -> NotificationId {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = severity.default_title().to_string();
        }

        let duration = if options.persistent {
            None
        } else {
            match options.duration {
                Some(d) if d.is_zero() => None,
                Some(d) => Some(d),
                None if severity == Severity::Loading => None,
                None => Some(self.inner.config.duration()),
            }
        };

        let (id, shown) = {
            let mut state = self.inner.state();

            if let Some(key) = options.dedup_key.as_deref() {
                let existing = state
                    .queued
                    .iter()
                    .chain(state.visible.iter().map(|e| &e.notification))
                    .find(|n| n.dedup_key.as_deref() == Some(key))
                    .map(|n| n.id);
                if let Some(id) = existing {
                    debug!(id = %id, dedup_key = key, "Duplicate notification suppressed");
                    return id;
                }
            }

            let id = NotificationId(self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1);
            state.queued.push_back(Notification {
                id,
                message,
                severity,
                duration,
                actions: options.actions,
                dedup_key: options.dedup_key,
                created_at_ms: self.inner.time_provider.now_millis(),
            });
            debug!(id = %id, severity = %severity, queued = state.queued.len(), "Notification queued");

            (id, Inner::promote(&self.inner, &mut state))
        };

        for notification in &shown {
            self.inner.presenter.show(notification);
        }
        id
    }

    /// Remove a notification; unknown ids are ignored
    ///
    /// Returns true when something was removed.
    pub fn dismiss(&self, id: NotificationId) -> bool {
        Inner::dismiss(&self.inner, id)
    }

    /// Clear both the queue and the visible set
    pub fn dismiss_all(&self) {
        let hidden: Vec<NotificationId> = {
            let mut state = self.inner.state();
            let dropped = state.queued.len();
            state.queued.clear();
            let hidden = state
                .visible
                .drain(..)
                .map(|mut entry| {
                    entry.cancel_expiry();
                    entry.notification.id
                })
                .collect::<Vec<_>>();
            debug!(visible = hidden.len(), queued = dropped, "All notifications dismissed");
            hidden
        };

        for id in hidden {
            self.inner.presenter.hide(id);
        }
    }

    /// Dismiss everything and restart id numbering (test isolation)
    pub fn reset(&self) {
        self.dismiss_all();
        self.inner.next_id.store(0, Ordering::SeqCst);
    }

    /// Run a visible notification's action; it stays visible
    pub fn invoke_action(&self, id: NotificationId, label: &str) -> bool {
        let action = {
            let state = self.inner.state();
            state
                .visible
                .iter()
                .find(|e| e.notification.id == id)
                .and_then(|e| e.notification.action(label).cloned())
        };

        match action {
            Some(action) => {
                debug!(id = %id, label, "Notification action invoked");
                action.invoke();
                true
            }
            None => false,
        }
    }

    pub fn show(
        &self,
        message: impl Into<String>,
        severity: Severity,
        options: NotifyOptions,
    ) -> NotificationId {
        self.enqueue(message, severity, options)
    }

    pub fn close(&self, id: NotificationId) -> bool {
        self.dismiss(id)
    }

    pub fn close_all(&self) {
        self.dismiss_all()
    }

    pub fn success(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(message, Severity::Success, NotifyOptions::default())
    }

    pub fn error(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(message, Severity::Error, NotifyOptions::default())
    }

    pub fn warning(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(message, Severity::Warning, NotifyOptions::default())
    }

    pub fn info(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(message, Severity::Info, NotifyOptions::default())
    }

    pub fn visible(&self) -> Vec<Notification> {
        self.inner
            .state()
            .visible
            .iter()
            .map(|e| e.notification.clone())
            .collect()
    }

    pub fn queued(&self) -> Vec<Notification> {
        self.inner.state().queued.iter().cloned().collect()
    }

    pub fn visible_count(&self) -> usize {
        self.inner.state().visible.len()
    }

    pub fn queued_count(&self) -> usize {
        self.inner.state().queued.len()
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move queued entries into the visible set while there is room
    fn promote(this: &Arc<Inner>, state: &mut QueueState) -> Vec<Notification> {
        let mut shown = Vec::new();
        while state.visible.len() < this.config.max_visible {
            let Some(notification) = state.queued.pop_front() else {
                break;
            };
            let expiry = notification
                .duration
                .map(|d| Inner::schedule_expiry(this, notification.id, d));
            shown.push(notification.clone());
            state.visible.push(VisibleEntry {
                notification,
                expiry,
            });
        }
        shown
    }

    fn schedule_expiry(this: &Arc<Inner>, id: NotificationId, duration: Duration) -> JoinHandle<()> {
        let weak: Weak<Inner> = Arc::downgrade(this);
        let sleeper = Arc::clone(&this.sleeper);
        tokio::spawn(async move {
            sleeper.sleep(duration).await;
            if let Some(inner) = weak.upgrade() {
                debug!(id = %id, "Notification expired");
                Inner::dismiss(&inner, id);
            }
        })
    }

    fn dismiss(this: &Arc<Inner>, id: NotificationId) -> bool {
        let (removed, hidden, shown) = {
            let mut state = this.state();
            if let Some(pos) = state.visible.iter().position(|e| e.notification.id == id) {
                let mut entry = state.visible.remove(pos);
                entry.cancel_expiry();
                let shown = Inner::promote(this, &mut state);
                (true, Some(id), shown)
            } else if let Some(pos) = state.queued.iter().position(|n| n.id == id) {
                state.queued.remove(pos);
                (true, None, Vec::new())
            } else {
                (false, None, Vec::new())
            }
        };

        if let Some(id) = hidden {
            this.presenter.hide(id);
        }
        for notification in &shown {
            this.presenter.show(notification);
        }
        removed
    }
}
