// src/notifier.rs

//! Best-effort desktop notification for run results.
//!
//! Notification failure is never a run failure: the runner logs it and moves
//! on. The core hands over only text plus a logical icon; resolving the icon
//! to anything concrete is the adapter's business.

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::debug;

use crate::types::Verdict;

/// Logical notification icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Pass,
    Fail,
}

impl From<Verdict> for Icon {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Pass => Icon::Pass,
            Verdict::Fail => Icon::Fail,
        }
    }
}

/// User-visible notification capability. Implementations must not block;
/// failures are reported to the caller, who treats them as non-fatal.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str, icon: Icon) -> Result<()>;
}

/// Notifier that shells out to `notify-send`, mapping the logical icon onto
/// freedesktop icon names. The child is reaped in a background task so
/// `notify` returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandNotifier;

impl CommandNotifier {
    fn icon_name(icon: Icon) -> &'static str {
        match icon {
            Icon::Pass => "emblem-default",
            Icon::Fail => "dialog-error",
        }
    }
}

impl Notifier for CommandNotifier {
    fn notify(&self, title: &str, body: &str, icon: Icon) -> Result<()> {
        let mut child = Command::new("notify-send")
            .arg("--icon")
            .arg(Self::icon_name(icon))
            .arg(title)
            .arg(body)
            .spawn()
            .context("spawning notify-send")?;

        tokio::spawn(async move {
            if let Err(err) = child.wait().await {
                debug!(error = %err, "notify-send did not exit cleanly");
            }
        });

        Ok(())
    }
}

/// Notifier that only logs. Used headless and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str, _icon: Icon) -> Result<()> {
        debug!(%title, %body, "notification");
        Ok(())
    }
}
