//! Terminal notification rendering

use colored::{ColoredString, Colorize};
use testdeck_core::domain::{Notification, NotificationId, Severity};
use testdeck_core::port::NotificationPresenter;

/// Prints each notification as one colored line on stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPresenter;

impl TerminalPresenter {
    pub fn new() -> Self {
        Self
    }
}

impl NotificationPresenter for TerminalPresenter {
    fn show(&self, notification: &Notification) {
        println!("{}", render(notification));
    }

    fn hide(&self, id: NotificationId) {
        tracing::debug!(id = %id, "Notification expired");
    }
}

fn badge(severity: Severity) -> ColoredString {
    match severity {
        Severity::Success => "✓".green().bold(),
        Severity::Error => "✗".red().bold(),
        Severity::Warning => "!".yellow().bold(),
        Severity::Info => "i".cyan().bold(),
        Severity::Loading => "…".blue().bold(),
    }
}

fn tint(severity: Severity, text: &str) -> ColoredString {
    match severity {
        Severity::Success => text.green(),
        Severity::Error => text.red(),
        Severity::Warning => text.yellow(),
        Severity::Info => text.cyan(),
        Severity::Loading => text.blue(),
    }
}

pub fn render(notification: &Notification) -> String {
    let mut line = format!(
        "{} {}",
        badge(notification.severity),
        tint(notification.severity, &notification.message)
    );
    if !notification.actions.is_empty() {
        let labels: Vec<&str> = notification
            .actions
            .iter()
            .map(|a| a.label.as_str())
            .collect();
        line.push_str(&format!(" [{}]", labels.join(" | ")).dimmed().to_string());
    }
    line
}
