//! Polling Monitor Registry
//!
//! Tracks in-flight server-side jobs and polls each one on its own tokio
//! task until a terminal status is observed.
//!
//! - At most one monitor per job id (`watch` is idempotent)
//! - Terminal status: entry removed, then `on_terminal` fires exactly once
//! - Poll failure: entry removed, logged, `on_failure` fires once, no retry
//! - A panicking poll is treated like a failed one
//! - `pause_all` stops ticking but keeps entries; `resume_all` polls each
//!   paused job immediately, then continues on the normal interval
//! - Every task carries a generation; results from a cancelled or
//!   superseded task are discarded

use crate::application::panic_guard::{execute_guarded, panic_message, PanicGuardResult};
use crate::application::stop::{stop_channel, StopSender, StopToken};
use crate::config::PollingConfig;
use crate::domain::{ApiFailure, JobId, JobKind, MonitorState, MonitoredJob};
use crate::port::{Sleeper, SystemTimeProvider, TimeProvider, TokioSleeper};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Status source and terminal handling for one watched job
#[async_trait]
pub trait JobProbe: Send + Sync {
    /// Fetch the current status payload
    async fn poll(&self, job_id: &str) -> Result<Value, ApiFailure>;

    /// Whether the payload describes a final state
    fn is_terminal(&self, status: &Value) -> bool;

    /// Called once with the terminal payload, after the job left the registry
    fn on_terminal(&self, job_id: &str, status: Value);

    /// Called once when a poll fails, after the job left the registry
    fn on_failure(&self, _job_id: &str, _failure: &ApiFailure) {}
}

type PollFn = Box<dyn Fn(JobId) -> BoxFuture<'static, Result<Value, ApiFailure>> + Send + Sync>;
type TerminalFn = Box<dyn Fn(&Value) -> bool + Send + Sync>;
type TerminalCallback = Box<dyn Fn(JobId, Value) + Send + Sync>;

/// [`JobProbe`] assembled from three closures
pub struct FnProbe {
    poll: PollFn,
    is_terminal: TerminalFn,
    on_terminal: TerminalCallback,
}

impl FnProbe {
    pub fn new<P, F, T, C>(poll: P, is_terminal: T, on_terminal: C) -> Self
    where
        P: Fn(JobId) -> F + Send + Sync + 'static,
        F: Future<Output = Result<Value, ApiFailure>> + Send + 'static,
        T: Fn(&Value) -> bool + Send + Sync + 'static,
        C: Fn(JobId, Value) + Send + Sync + 'static,
    {
        Self {
            poll: Box::new(move |id| poll(id).boxed()),
            is_terminal: Box::new(is_terminal),
            on_terminal: Box::new(on_terminal),
        }
    }
}

#[async_trait]
impl JobProbe for FnProbe {
    async fn poll(&self, job_id: &str) -> Result<Value, ApiFailure> {
        (self.poll)(job_id.to_string()).await
    }

    fn is_terminal(&self, status: &Value) -> bool {
        (self.is_terminal)(status)
    }

    fn on_terminal(&self, job_id: &str, status: Value) {
        (self.on_terminal)(job_id.to_string(), status)
    }
}

struct Entry {
    job: MonitoredJob,
    probe: Arc<dyn JobProbe>,
    generation: u64,
    stop: Option<StopSender>,
}

impl Entry {
    fn halt(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.stop();
        }
    }
}

/// What a monitor task should do after a tick
enum TickOutcome {
    Continue,
    Finished,
}

struct RegistryInner {
    config: PollingConfig,
    sleeper: Arc<dyn Sleeper>,
    time_provider: Arc<dyn TimeProvider>,
    next_generation: AtomicU64,
    entries: Mutex<HashMap<JobId, Entry>>,
}

/// Registry of polled jobs (cheap to clone, clones share state)
#[derive(Clone)]
pub struct PollingRegistry {
    inner: Arc<RegistryInner>,
}

/// Everything a freshly spawned monitor task needs
struct MonitorLaunch {
    job_id: JobId,
    generation: u64,
    probe: Arc<dyn JobProbe>,
    interval: Duration,
    token: StopToken,
    immediate: bool,
}

impl PollingRegistry {
    pub fn new(config: PollingConfig) -> Self {
        Self::with_ports(config, Arc::new(TokioSleeper), Arc::new(SystemTimeProvider))
    }

    pub fn with_ports(
        config: PollingConfig,
        sleeper: Arc<dyn Sleeper>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                sleeper,
                time_provider,
                next_generation: AtomicU64::new(0),
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &PollingConfig {
        &self.inner.config
    }

    /// Start polling `job_id`; a no-op if it is already watched
    ///
    /// `interval` defaults to the configured interval for `kind`.
    /// Returns true when a new monitor was registered. Must be called within
    /// a tokio runtime.
    pub fn watch(
        &self,
        job_id: impl Into<JobId>,
        kind: JobKind,
        probe: Arc<dyn JobProbe>,
        interval: Option<Duration>,
    ) -> bool {
        let job_id = job_id.into();
        let interval = interval.unwrap_or_else(|| self.inner.config.interval_for(kind));

        let launch = {
            let mut entries = self.inner.entries();
            if entries.contains_key(&job_id) {
                debug!(job_id = %job_id, "Job already monitored, ignoring watch");
                return false;
            }

            let generation = self.inner.next_generation();
            let (stop, token) = stop_channel();
            let mut job = MonitoredJob::new(job_id.clone(), kind, interval);
            job.state = MonitorState::Polling;
            entries.insert(
                job_id.clone(),
                Entry {
                    job,
                    probe: Arc::clone(&probe),
                    generation,
                    stop: Some(stop),
                },
            );
            MonitorLaunch {
                job_id,
                generation,
                probe,
                interval,
                token,
                immediate: false,
            }
        };

        info!(
            job_id = %launch.job_id,
            kind = %kind,
            interval_ms = interval.as_millis() as u64,
            "Monitoring started"
        );
        self.spawn(launch);
        true
    }

    /// Stop polling `job_id`; an in-flight poll finishes but is ignored
    pub fn unwatch(&self, job_id: &str) -> bool {
        let removed = self.inner.entries().remove(job_id);
        match removed {
            Some(mut entry) => {
                entry.halt();
                info!(job_id = %job_id, "Monitoring cancelled");
                true
            }
            None => false,
        }
    }

    /// Suspend every monitor; entries stay registered
    pub fn pause_all(&self) -> usize {
        let mut entries = self.inner.entries();
        let mut paused = 0;
        for entry in entries.values_mut() {
            if entry.job.state == MonitorState::Polling {
                entry.halt();
                entry.generation = self.inner.next_generation();
                entry.job.state = MonitorState::Paused;
                paused += 1;
            }
        }
        info!(paused, "Monitoring paused");
        paused
    }

    /// Restart paused monitors with one immediate poll each
    pub fn resume_all(&self) -> usize {
        let launches: Vec<MonitorLaunch> = {
            let mut entries = self.inner.entries();
            entries
                .iter_mut()
                .filter(|(_, entry)| entry.job.state == MonitorState::Paused)
                .map(|(job_id, entry)| {
                    let (stop, token) = stop_channel();
                    entry.generation = self.inner.next_generation();
                    entry.stop = Some(stop);
                    entry.job.state = MonitorState::Polling;
                    MonitorLaunch {
                        job_id: job_id.clone(),
                        generation: entry.generation,
                        probe: Arc::clone(&entry.probe),
                        interval: entry.job.interval,
                        token,
                        immediate: true,
                    }
                })
                .collect()
        };

        let resumed = launches.len();
        for launch in launches {
            self.spawn(launch);
        }
        info!(resumed, "Monitoring resumed");
        resumed
    }

    /// Cancel every monitor and empty the registry
    pub fn clear(&self) {
        let drained: Vec<Entry> = self.inner.entries().drain().map(|(_, e)| e).collect();
        let count = drained.len();
        for mut entry in drained {
            entry.halt();
        }
        if count > 0 {
            info!(count, "Monitoring cleared");
        }
    }

    pub fn is_watching(&self, job_id: &str) -> bool {
        self.inner.entries().contains_key(job_id)
    }

    /// Number of registered monitors (polling or paused)
    pub fn active_count(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn state(&self, job_id: &str) -> Option<MonitorState> {
        self.inner.entries().get(job_id).map(|e| e.job.state)
    }

    pub fn last_status(&self, job_id: &str) -> Option<Value> {
        self.inner
            .entries()
            .get(job_id)
            .and_then(|e| e.job.last_status.clone())
    }

    pub fn snapshot(&self, job_id: &str) -> Option<MonitoredJob> {
        self.inner.entries().get(job_id).map(|e| e.job.clone())
    }

    pub fn jobs(&self) -> Vec<MonitoredJob> {
        let mut jobs: Vec<_> = self.inner.entries().values().map(|e| e.job.clone()).collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }

    fn spawn(&self, launch: MonitorLaunch) {
        let weak = Arc::downgrade(&self.inner);
        let sleeper = Arc::clone(&self.inner.sleeper);
        tokio::spawn(run_monitor(weak, sleeper, launch));
    }
}

impl RegistryInner {
    fn entries(&self) -> MutexGuard<'_, HashMap<JobId, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Remove the entry if it still belongs to `generation`
    fn remove_current(&self, job_id: &str, generation: u64) -> bool {
        let mut entries = self.entries();
        match entries.get(job_id) {
            Some(entry) if entry.generation == generation => {
                entries.remove(job_id);
                true
            }
            _ => false,
        }
    }

    fn handle_tick(
        &self,
        job_id: &str,
        generation: u64,
        probe: &Arc<dyn JobProbe>,
        result: Result<Value, ApiFailure>,
    ) -> TickOutcome {
        let status = match result {
            Ok(status) => status,
            Err(failure) => {
                if self.remove_current(job_id, generation) {
                    warn!(
                        job_id = %job_id,
                        status = failure.status,
                        error = %failure.message,
                        "Status poll failed, monitoring stopped"
                    );
                    if let PanicGuardResult::Panicked(msg) =
                        execute_guarded(|| probe.on_failure(job_id, &failure))
                    {
                        error!(job_id = %job_id, panic_msg = %msg, "Failure callback panicked");
                    }
                }
                return TickOutcome::Finished;
            }
        };

        let terminal = match execute_guarded(|| probe.is_terminal(&status)) {
            PanicGuardResult::Success(terminal) => terminal,
            PanicGuardResult::Panicked(msg) => {
                if self.remove_current(job_id, generation) {
                    error!(job_id = %job_id, panic_msg = %msg, "Status check panicked, monitoring stopped");
                }
                return TickOutcome::Finished;
            }
        };

        {
            let mut entries = self.entries();
            let Some(entry) = entries.get_mut(job_id) else {
                return TickOutcome::Finished;
            };
            if entry.generation != generation {
                return TickOutcome::Finished;
            }

            if terminal {
                entries.remove(job_id);
            } else {
                entry.job.polls += 1;
                entry.job.last_status = Some(status);
                entry.job.last_polled_at_ms = Some(self.time_provider.now_millis());
                return TickOutcome::Continue;
            }
        }

        info!(job_id = %job_id, "Job reached terminal state");
        if let PanicGuardResult::Panicked(msg) =
            execute_guarded(|| probe.on_terminal(job_id, status))
        {
            error!(job_id = %job_id, panic_msg = %msg, "Terminal callback panicked");
        }
        TickOutcome::Finished
    }
}

async fn run_monitor(inner: Weak<RegistryInner>, sleeper: Arc<dyn Sleeper>, launch: MonitorLaunch) {
    let MonitorLaunch {
        job_id,
        generation,
        probe,
        interval,
        mut token,
        immediate,
    } = launch;

    let mut skip_wait = immediate;
    loop {
        if !skip_wait {
            tokio::select! {
                _ = sleeper.sleep(interval) => {}
                _ = token.wait() => break,
            }
        }
        skip_wait = false;

        if token.is_stopped() {
            break;
        }

        debug!(job_id = %job_id, "Polling job status");
        let polled = AssertUnwindSafe(probe.poll(&job_id)).catch_unwind().await;

        if token.is_stopped() {
            debug!(job_id = %job_id, "Monitor cancelled during poll, result discarded");
            break;
        }
        let Some(registry) = inner.upgrade() else {
            break;
        };
        let result = match polled {
            Ok(result) => result,
            Err(panic) => {
                if registry.remove_current(&job_id, generation) {
                    error!(
                        job_id = %job_id,
                        panic_msg = %panic_message(panic.as_ref()),
                        "Status poll panicked, monitoring stopped"
                    );
                }
                break;
            }
        };
        match registry.handle_tick(&job_id, generation, &probe, result) {
            TickOutcome::Continue => {}
            TickOutcome::Finished => break,
        }
    }
    debug!(job_id = %job_id, generation, "Monitor task exited");
}
