/// Desktop notifications for the focus session
/// Currently only implements macOS notifications

#[cfg(target_os = "macos")]
use std::process::Command;

#[cfg(target_os = "macos")]
fn display(title: &str, message: &str) {
    let script = format!(
        r#"display notification "{}" with title "{}""#,
        message.replace('"', "\\\""),
        title.replace('"', "\\\"")
    );

    if let Err(err) = Command::new("osascript").arg("-e").arg(&script).output() {
        tracing::debug!(error = %err, "osascript notification failed");
    }
}

/// Send a notification when a focus session finishes its task
pub fn notify_task_done(task_title: &str) {
    #[cfg(target_os = "macos")]
    display("Focusline - Task Completed", task_title);

    #[cfg(not(target_os = "macos"))]
    {
        // No-op on other platforms
        let _ = task_title;
    }
}

/// Send a notification when a break runs out
pub fn notify_break_over(task_title: &str) {
    #[cfg(target_os = "macos")]
    display("Focusline - Break Over", &format!("Back to {}", task_title));

    #[cfg(not(target_os = "macos"))]
    {
        let _ = task_title;
    }
}
