// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desktop notification adapter

use super::{Notification, NotifyAdapter, NotifyError, Severity};
use async_trait::async_trait;
use tokio::process::Command;

/// Sends notifications through the host desktop
/// (`notify-send` on Linux, `osascript` on macOS)
#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        Self
    }
}

fn urgency(severity: Severity) -> &'static str {
    match severity {
        Severity::Info | Severity::Success => "low",
        Severity::Warning => "normal",
        Severity::Error => "critical",
    }
}

/// Quote text for an AppleScript string literal
fn applescript_quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn command_for(notification: &Notification) -> Command {
    if cfg!(target_os = "macos") {
        let script = format!(
            "display notification {} with title {}",
            applescript_quote(&notification.message),
            applescript_quote(&notification.title)
        );
        let mut cmd = Command::new("osascript");
        cmd.arg("-e").arg(script);
        cmd
    } else {
        let mut cmd = Command::new("notify-send");
        cmd.arg(format!("--urgency={}", urgency(notification.severity)))
            .arg(&notification.title)
            .arg(&notification.message);
        cmd
    }
}

#[async_trait]
impl NotifyAdapter for DesktopNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let output = command_for(notification)
            .output()
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NotifyError::SendFailed(stderr.trim().to_string()));
        }

        Ok(())
    }
}
