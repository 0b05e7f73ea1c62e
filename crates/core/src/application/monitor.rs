//! Execution Monitor - collaborator surface over client, registry and toasts
//!
//! UI glue calls `start_monitoring(job_id, kind)` after launching a run;
//! status checks go through the request client, terminal outcomes become
//! notifications and an optional refresh callback.

use crate::application::notification::{NotificationService, NotifyOptions};
use crate::application::polling::{JobProbe, PollingRegistry};
use crate::application::request_client::RequestClient;
use crate::domain::{ApiFailure, JobKind, ResponseBody, Severity, TerminalOutcome};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Called with `(job_id, terminal payload)` so the caller can refresh its view
pub type RefreshCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Composes the three console services for job monitoring
pub struct ExecutionMonitor {
    client: Arc<RequestClient>,
    registry: PollingRegistry,
    notifications: NotificationService,
    on_refresh: Option<RefreshCallback>,
}

impl ExecutionMonitor {
    pub fn new(
        client: Arc<RequestClient>,
        registry: PollingRegistry,
        notifications: NotificationService,
    ) -> Self {
        Self {
            client,
            registry,
            notifications,
            on_refresh: None,
        }
    }

    pub fn with_refresh(mut self, callback: impl Fn(&str, &Value) + Send + Sync + 'static) -> Self {
        self.on_refresh = Some(Arc::new(callback));
        self
    }

    /// Poll `job_id` until it finishes; false if it is already monitored
    pub fn start_monitoring(&self, job_id: &str, kind: JobKind) -> bool {
        let probe = Arc::new(StatusProbe {
            client: Arc::clone(&self.client),
            notifications: self.notifications.clone(),
            status_path: self.registry.config().status_path(kind, job_id),
            kind,
            on_refresh: self.on_refresh.clone(),
        });
        self.registry.watch(job_id, kind, probe, None)
    }

    pub fn stop_monitoring(&self, job_id: &str) -> bool {
        self.registry.unwatch(job_id)
    }

    pub fn pause(&self) -> usize {
        self.registry.pause_all()
    }

    pub fn resume(&self) -> usize {
        self.registry.resume_all()
    }

    /// Teardown: cancel every monitor and drop all notifications
    pub fn shutdown(&self) {
        self.registry.clear();
        self.notifications.dismiss_all();
    }

    pub fn registry(&self) -> &PollingRegistry {
        &self.registry
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.notifications
    }
}

struct StatusProbe {
    client: Arc<RequestClient>,
    notifications: NotificationService,
    status_path: String,
    kind: JobKind,
    on_refresh: Option<RefreshCallback>,
}

#[async_trait]
impl JobProbe for StatusProbe {
    async fn poll(&self, _job_id: &str) -> Result<Value, ApiFailure> {
        match self.client.get_with_status(&self.status_path).await? {
            (_, ResponseBody::Json(status)) => Ok(status),
            (code, _) => Err(ApiFailure::decode(code, "status payload is not JSON")),
        }
    }

    fn is_terminal(&self, status: &Value) -> bool {
        TerminalOutcome::from_payload(status).is_some()
    }

    fn on_terminal(&self, job_id: &str, status: Value) {
        let (severity, message) = summarize(self.kind, job_id, &status);
        debug!(job_id = %job_id, severity = %severity, "Raising terminal notification");
        self.notifications.enqueue(
            message,
            severity,
            NotifyOptions::default().with_dedup_key(format!("job:{}", job_id)),
        );
        if let Some(refresh) = &self.on_refresh {
            refresh(job_id, &status);
        }
    }

    fn on_failure(&self, job_id: &str, failure: &ApiFailure) {
        self.notifications.enqueue(
            format!(
                "Lost track of {} {}: {}",
                kind_label(self.kind).to_lowercase(),
                job_id,
                failure.message
            ),
            Severity::Warning,
            NotifyOptions::default().with_dedup_key(format!("job:{}", job_id)),
        );
    }
}

fn kind_label(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Single => "Execution",
        JobKind::Batch => "Batch",
    }
}

/// Build the user-facing summary of a terminal payload
pub fn summarize(kind: JobKind, job_id: &str, status: &Value) -> (Severity, String) {
    let (severity, verb) = match TerminalOutcome::from_payload(status) {
        Some(TerminalOutcome::Succeeded) => (Severity::Success, "completed"),
        Some(TerminalOutcome::Failed) => (Severity::Error, "failed"),
        Some(TerminalOutcome::Cancelled) => (Severity::Warning, "was cancelled"),
        None => (Severity::Info, "finished"),
    };

    let count = |field: &str| status.get(field).and_then(Value::as_u64);
    let mut message = format!("{} {} {}", kind_label(kind), job_id, verb);
    if let (Some(total), Some(passed)) = (count("totalTests"), count("passedTests")) {
        message.push_str(&format!(": {}/{} passed", passed, total));
        if let Some(failed) = count("failedTests").filter(|f| *f > 0) {
            message.push_str(&format!(", {} failed", failed));
        }
    }
    (severity, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, NotificationConfig, PollingConfig};
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::presenter::mocks::RecordingPresenter;
    use crate::port::transport::mocks::{ScriptedReply, ScriptedTransport};
    use crate::port::{OnlineFlag, TokioSleeper, TransportResponse};
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Harness {
        monitor: ExecutionMonitor,
        transport: Arc<ScriptedTransport>,
        presenter: Arc<RecordingPresenter>,
    }

    fn harness(replies: Vec<ScriptedReply>) -> Harness {
        harness_on(ScriptedTransport::new(replies))
    }

    fn harness_on(transport: ScriptedTransport) -> Harness {
        let transport = Arc::new(transport);
        let client = Arc::new(RequestClient::with_ports(
            ClientConfig::with_base_url("http://qa.local/api"),
            transport.clone(),
            Arc::new(TokioSleeper),
            Arc::new(OnlineFlag::default()),
            Arc::new(SequentialIdProvider::default()),
        ));
        let presenter = Arc::new(RecordingPresenter::new());
        let notifications = NotificationService::new(NotificationConfig::default(), presenter.clone());
        let registry = PollingRegistry::new(PollingConfig::default());
        Harness {
            monitor: ExecutionMonitor::new(client, registry, notifications),
            transport,
            presenter,
        }
    }

    fn json_reply(value: Value) -> ScriptedReply {
        ScriptedReply::Respond(TransportResponse::json(200, value))
    }

    #[test]
    fn test_summaries() {
        let (severity, message) = summarize(
            JobKind::Batch,
            "batch-42",
            &json!({"status": "COMPLETED", "totalTests": 10, "passedTests": 9, "failedTests": 1}),
        );
        assert_eq!(severity, Severity::Success);
        assert_eq!(message, "Batch batch-42 completed: 9/10 passed, 1 failed");

        let (severity, message) =
            summarize(JobKind::Single, "exec-3", &json!({"status": "FAILED"}));
        assert_eq!(severity, Severity::Error);
        assert_eq!(message, "Execution exec-3 failed");

        let (severity, _) = summarize(JobKind::Batch, "b", &json!({"status": "CANCELLED"}));
        assert_eq!(severity, Severity::Warning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execution_polled_on_status_endpoint() {
        let h = harness(vec![
            json_reply(json!({"status": "RUNNING"})),
            json_reply(json!({"status": "PASSED", "totalTests": 1, "passedTests": 1})),
        ]);
        let refreshed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&refreshed);
        let monitor = h.monitor.with_refresh(move |id, status| {
            sink.lock().unwrap().push((id.to_string(), status.clone()));
        });

        assert!(monitor.start_monitoring("exec-77", JobKind::Single));
        assert!(!monitor.start_monitoring("exec-77", JobKind::Single));

        tokio::time::sleep(Duration::from_secs(10)).await;

        let urls: Vec<_> = h.transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "http://qa.local/api/executions/exec-77",
                "http://qa.local/api/executions/exec-77"
            ]
        );
        assert!(!monitor.registry().is_watching("exec-77"));
        assert_eq!(refreshed.lock().unwrap().len(), 1);

        let visible = monitor.notifications().visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].severity, Severity::Success);
        assert_eq!(visible[0].message, "Execution exec-77 completed: 1/1 passed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_warns_once_and_stops() {
        let h = harness(vec![ScriptedReply::Respond(TransportResponse::json(
            404,
            json!({"message": "Batch not found"}),
        ))]);

        h.monitor.start_monitoring("batch-404", JobKind::Batch);
        // First poll at 5s; the warning stays visible for another 5s
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(h.transport.call_count(), 1);
        assert!(!h.monitor.registry().is_watching("batch-404"));
        let visible = h.monitor.notifications().visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].severity, Severity::Warning);
        assert!(visible[0].message.contains("batch-404"));
        assert!(visible[0].message.contains("Batch not found"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_backoff_raises_no_warning() {
        let h = harness_on(ScriptedTransport::repeating(ScriptedReply::Respond(
            TransportResponse::json(503, json!({"message": "down"})),
        )));

        h.monitor.start_monitoring("batch-7", JobKind::Batch);
        // First poll at 5s, then retry backoff of 1s and 2s
        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(h.transport.call_count(), 1);

        h.monitor.shutdown();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(h.monitor.notifications().visible_count(), 0);
        assert!(h.monitor.notifications().queued().is_empty());
        assert!(h.presenter.shown_messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_json_status_reports_response_status() {
        let h = harness(vec![ScriptedReply::Respond(TransportResponse::text(
            203,
            "maintenance page",
        ))]);
        let probe = StatusProbe {
            client: Arc::clone(&h.monitor.client),
            notifications: h.monitor.notifications().clone(),
            status_path: "/executions/exec-8".to_string(),
            kind: JobKind::Single,
            on_refresh: None,
        };

        let failure = probe.poll("exec-8").await.unwrap_err();

        assert_eq!(failure.kind, crate::domain::FailureKind::Decode);
        assert_eq!(failure.status, 203);
        // the hook, not the poll, raises the warning
        assert!(h.presenter.shown_messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_clears_everything() {
        let h = harness(vec![]);
        h.monitor.notifications().info("Batch started");
        h.monitor.start_monitoring("batch-1", JobKind::Batch);
        h.monitor.start_monitoring("exec-1", JobKind::Single);

        h.monitor.shutdown();

        assert_eq!(h.monitor.registry().active_count(), 0);
        assert_eq!(h.monitor.notifications().visible_count(), 0);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(h.transport.call_count(), 0);
    }
}
