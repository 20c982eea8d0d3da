//! Recording fakes for the orchestrator's injected collaborators.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use testwatch::errors::{Result, TestwatchError};
use testwatch::listing::PackageLister;
use testwatch::notifier::{Icon, Notifier};

/// One recorded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: Icon,
}

/// Notifier that records what it was asked to show; optionally fails, to
/// check that notification errors never become run errors.
#[derive(Clone, Default)]
pub struct FakeNotifier {
    notifications: Arc<Mutex<Vec<Notification>>>,
    fail: bool,
}

impl FakeNotifier {
    pub fn new() -> Self {
        FakeNotifier::default()
    }

    pub fn failing() -> Self {
        FakeNotifier {
            fail: true,
            ..FakeNotifier::default()
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl Notifier for FakeNotifier {
    fn notify(&self, title: &str, body: &str, icon: Icon) -> anyhow::Result<()> {
        self.notifications.lock().unwrap().push(Notification {
            title: title.to_string(),
            body: body.to_string(),
            icon,
        });
        if self.fail {
            anyhow::bail!("scripted notifier failure");
        }
        Ok(())
    }
}

/// Lister that returns a fixed package list, or a scripted failure.
#[derive(Clone, Default)]
pub struct FakeLister {
    pkgs: Vec<String>,
    fail: bool,
}

impl FakeLister {
    pub fn with_packages(pkgs: &[&str]) -> Self {
        FakeLister {
            pkgs: pkgs.iter().map(|s| s.to_string()).collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        FakeLister {
            fail: true,
            ..FakeLister::default()
        }
    }
}

impl PackageLister for FakeLister {
    fn list_packages(
        &self,
        _cwd: &Path,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + '_>> {
        let result = if self.fail {
            Err(TestwatchError::Listing("scripted listing failure".into()))
        } else {
            Ok(self.pkgs.clone())
        };
        Box::pin(async move { result })
    }
}
