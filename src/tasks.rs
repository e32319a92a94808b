//! Fire-and-forget background tasks.
//!
//! Handlers hand work off here after the response is committed: nothing in
//! this module blocks the request path, and a failing task is logged and
//! dropped at the task boundary, never retried and never surfaced to the
//! client. The bodies are logging stubs standing in for real mail/audit
//! integrations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

fn spawn(name: &'static str, task: impl FnOnce() -> Result<(), TaskError> + Send + 'static) {
    tokio::spawn(async move {
        if let Err(e) = task() {
            tracing::warn!(task = name, "background task failed: {}", e);
        }
    });
}

/// Welcome email for a newly registered user.
pub fn send_welcome_email(email: String, username: String) {
    spawn("send_welcome_email", move || {
        // TODO: wire up a real mail transport once one is provisioned
        tracing::info!(
            target: "tasks",
            email = %email,
            username = %username,
            "welcome email sent"
        );
        Ok(())
    });
}

/// Audit-trail entry for a user action.
pub fn log_user_action(username: String, action: &'static str, details: String) {
    spawn("log_user_action", move || {
        tracing::info!(
            target: "tasks",
            username = %username,
            action,
            details = %details,
            "user action recorded"
        );
        Ok(())
    });
}

/// Notification about item activity.
pub fn send_item_notification(
    email: String,
    username: String,
    item_title: String,
    kind: &'static str,
) {
    spawn("send_item_notification", move || {
        let message = match kind {
            "created" => format!("Your item '{}' has been created", item_title),
            "updated" => format!("Your item '{}' has been updated", item_title),
            "completed" => format!("You marked '{}' as completed", item_title),
            "deleted" => format!("Your item '{}' has been deleted", item_title),
            _ => format!("Action on item '{}'", item_title),
        };
        tracing::info!(
            target: "tasks",
            email = %email,
            username = %username,
            message = %message,
            "item notification sent"
        );
        Ok(())
    });
}

/// Follow-up processing when an item transitions to completed.
pub fn process_item_completion(item_id: i64, username: String, item_title: String) {
    spawn("process_item_completion", move || {
        tracing::info!(
            target: "tasks",
            item_id,
            username = %username,
            item_title = %item_title,
            "item completion processed"
        );
        Ok(())
    });
}
