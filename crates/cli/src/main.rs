//! Testdeck CLI - terminal front-end for the test-automation console
//!
//! Launches test cases and batches, monitors them until they finish and
//! renders the resulting notifications.

mod logging;
mod presenter;
mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};
use tokio::sync::Notify;
use tracing::{debug, info};

use presenter::TerminalPresenter;
use settings::Overrides;
use testdeck_core::application::monitor::summarize;
use testdeck_core::application::NotifyOptions;
use testdeck_core::domain::TerminalOutcome;
use testdeck_core::{
    ApiFailure, ConsoleConfig, ExecutionMonitor, JobKind, NotificationService, PollingRegistry,
    RequestClient, ResponseBody, Severity,
};
use testdeck_infra_http::ReqwestTransport;
use testdeck_sdk::{ConsoleApi, JobStatus, SdkError, TestCase};

/// How often `--watch` checks whether the monitor is still running
const WATCH_CHECK: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "testdeck")]
#[command(about = "Testdeck test-automation console", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ./testdeck.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:8080/api
    #[arg(long, global = true, env = "TESTDECK_API_URL")]
    api_url: Option<String>,

    /// Per-request deadline in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Attempts per request (first attempt included)
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// GET an endpoint and print the decoded body
    Get {
        /// Endpoint relative to the base URL (e.g. /testcases/7)
        endpoint: String,
    },

    /// List test cases
    List,

    /// Execute one test case
    Run {
        /// Test case ID
        id: i64,

        /// Follow the execution until it finishes
        #[arg(short, long)]
        watch: bool,
    },

    /// Execute several test cases as one batch
    Batch {
        /// Test case IDs
        #[arg(required = true)]
        ids: Vec<i64>,

        /// Follow the batch until it finishes
        #[arg(short, long)]
        watch: bool,
    },

    /// Trigger a schedule now
    Schedule {
        /// Schedule ID
        id: i64,

        /// Follow the started batch until it finishes
        #[arg(short, long)]
        watch: bool,
    },

    /// Show the status of an execution or batch
    Status {
        /// single | execution | batch
        kind: JobKind,

        /// Execution or batch ID
        id: String,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.api_url.clone(),
            timeout_ms: self.timeout_ms,
            max_retries: self.max_retries,
        }
    }
}

#[derive(Tabled)]
struct TestCaseRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<TestCase> for TestCaseRow {
    fn from(tc: TestCase) -> Self {
        Self {
            id: tc.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
            name: tc.name,
            description: tc.description.unwrap_or_default(),
        }
    }
}

/// Wired console services
struct Console {
    api: ConsoleApi,
    notifications: NotificationService,
    monitor: ExecutionMonitor,
    finished: Arc<Notify>,
}

impl Console {
    fn build(config: ConsoleConfig) -> Self {
        let transport = Arc::new(ReqwestTransport::new());
        let client = Arc::new(RequestClient::new(config.client.clone(), transport));
        let notifications =
            NotificationService::new(config.notifications.clone(), Arc::new(TerminalPresenter::new()));
        let registry = PollingRegistry::new(config.polling.clone());

        let finished = Arc::new(Notify::new());
        let signal = Arc::clone(&finished);
        let monitor = ExecutionMonitor::new(Arc::clone(&client), registry, notifications.clone())
            .with_refresh(move |job_id, _| {
                debug!(job_id = %job_id, "Terminal status received");
                signal.notify_one();
            });

        Self {
            api: ConsoleApi::new(client),
            notifications,
            monitor,
            finished,
        }
    }

    /// Follow `job_id` until its monitor ends or Ctrl-C is pressed
    async fn watch(&self, job_id: &str, kind: JobKind) -> Result<()> {
        self.monitor.start_monitoring(job_id, kind);
        let watching = self.notifications.show(
            format!("Watching {} {} (Ctrl-C to stop)", kind, job_id),
            Severity::Loading,
            NotifyOptions::default(),
        );

        tokio::select! {
            _ = self.wait_until_finished(job_id) => {
                self.notifications.close(watching);
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                info!(job_id = %job_id, "Interrupted, stopping monitor");
                self.monitor.shutdown();
            }
        }
        Ok(())
    }

    async fn wait_until_finished(&self, job_id: &str) {
        let mut ticker = tokio::time::interval(WATCH_CHECK);
        loop {
            tokio::select! {
                _ = self.finished.notified() => return,
                _ = ticker.tick() => {
                    if !self.monitor.registry().is_watching(job_id) {
                        // the terminal callback runs right after the entry is removed
                        let _ = tokio::time::timeout(WATCH_CHECK, self.finished.notified()).await;
                        return;
                    }
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    logging::init();
    let cli = Cli::parse();

    let config = settings::load(cli.config.as_deref(), &cli.overrides())?;
    info!(base_url = %config.client.base_url, "Testdeck CLI v{}", testdeck_core::VERSION);

    let console = Console::build(config);

    match run(&console, cli.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            // API failures carry a server message meant for the user
            if let Some(message) = user_message(&e) {
                console.notifications.error(message);
                Ok(ExitCode::FAILURE)
            } else {
                Err(e)
            }
        }
    }
}

fn user_message(error: &anyhow::Error) -> Option<String> {
    if let Some(sdk) = error.downcast_ref::<SdkError>() {
        return Some(sdk.user_message());
    }
    error
        .downcast_ref::<ApiFailure>()
        .map(|failure| failure.message.clone())
}

async fn run(console: &Console, command: Commands) -> Result<()> {
    match command {
        Commands::Get { endpoint } => {
            let body = console.api.client().get(&endpoint).await?;
            print_body(body)?;
        }

        Commands::List => {
            let cases = console.api.list_test_cases().await?;
            if cases.is_empty() {
                println!("{}", "No test cases".yellow());
            } else {
                let rows: Vec<TestCaseRow> = cases.into_iter().map(TestCaseRow::from).collect();
                println!("{}", Table::new(rows));
            }
        }

        Commands::Run { id, watch } => {
            let started = console.api.execute_test_case(id).await?;
            console.notifications.success(format!(
                "Test case {} started as execution {}",
                id, started.execution_id
            ));
            if watch {
                console.watch(&started.execution_id, JobKind::Single).await?;
            }
        }

        Commands::Batch { ids, watch } => {
            let started = console.api.run_batch(&ids).await?;
            console.notifications.success(format!(
                "Batch {} started with {} test case(s)",
                started.batch_id,
                ids.len()
            ));
            if watch {
                console.watch(&started.batch_id, JobKind::Batch).await?;
            }
        }

        Commands::Schedule { id, watch } => {
            let started = console.api.trigger_schedule(id).await?;
            console.notifications.success(format!(
                "Schedule {} triggered batch {}",
                id, started.batch_id
            ));
            if watch {
                console.watch(&started.batch_id, JobKind::Batch).await?;
            }
        }

        Commands::Status { kind, id } => {
            let status = match kind {
                JobKind::Single => console.api.execution_status(&id).await?,
                JobKind::Batch => console.api.batch_status(&id).await?,
            };
            print_status(kind, &id, &status)?;
        }
    }

    Ok(())
}

fn print_body(body: ResponseBody) -> Result<()> {
    match body {
        ResponseBody::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        ResponseBody::Text(text) => println!("{}", text),
        ResponseBody::Binary(bytes) => println!("{}", format!("<{} bytes>", bytes.len()).dimmed()),
        ResponseBody::Empty => println!("{}", "(empty)".dimmed()),
    }
    Ok(())
}

fn print_status(kind: JobKind, id: &str, status: &JobStatus) -> Result<()> {
    if TerminalOutcome::from_status(&status.status).is_some() {
        let payload = serde_json::json!({
            "status": status.status,
            "totalTests": status.total_tests,
            "passedTests": status.passed_tests,
            "failedTests": status.failed_tests,
        });
        let (severity, message) = summarize(kind, id, &payload);
        let line = match severity {
            Severity::Success => message.green(),
            Severity::Error => message.red(),
            _ => message.yellow(),
        };
        println!("{}", line);
        return Ok(());
    }

    println!("{} {} is {}", kind, id, status.status.cyan().bold());
    if let (Some(passed), Some(total)) = (status.passed_tests, status.total_tests) {
        println!("  {} {}/{}", "Passed:".bold(), passed, total);
    }
    if let Some(failed) = status.failed_tests {
        println!("  {} {}", "Failed:".bold(), failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_batch_watch_with_overrides() {
        let cli = Cli::parse_from([
            "testdeck",
            "--api-url",
            "http://qa.local/api",
            "batch",
            "1",
            "2",
            "3",
            "--watch",
        ]);

        assert_eq!(cli.overrides().base_url.as_deref(), Some("http://qa.local/api"));
        match cli.command {
            Commands::Batch { ids, watch } => {
                assert_eq!(ids, vec![1, 2, 3]);
                assert!(watch);
            }
            _ => panic!("expected batch command"),
        }
    }

    #[test]
    fn test_parse_status_kind() {
        let cli = Cli::parse_from(["testdeck", "status", "execution", "exec-9"]);
        match cli.command {
            Commands::Status { kind, id } => {
                assert_eq!(kind, JobKind::Single);
                assert_eq!(id, "exec-9");
            }
            _ => panic!("expected status command"),
        }

        assert!(Cli::try_parse_from(["testdeck", "status", "nightly", "x"]).is_err());
        assert!(Cli::try_parse_from(["testdeck", "batch"]).is_err());
    }

    #[test]
    fn test_user_message_prefers_server_text() {
        let failure = ApiFailure::from_http(409, "Conflict", br#"{"message":"Already running"}"#);
        let err = anyhow::Error::new(SdkError::from(failure));
        assert_eq!(user_message(&err).as_deref(), Some("Already running"));

        let other = anyhow::anyhow!("disk full");
        assert!(user_message(&other).is_none());
    }

    #[test]
    fn test_row_from_test_case() {
        let row = TestCaseRow::from(TestCase::new("login"));
        assert_eq!(row.id, "-");
        assert_eq!(row.name, "login");
        assert_eq!(row.description, "");
    }
}
