use crate::infrastructure::error::InfraError;
use notify_rust::Notification;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationPermission {
    /// Not asked yet.
    #[default]
    Default,
    Granted,
    Denied,
}

impl NotificationPermission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Granted => "granted",
            Self::Denied => "denied",
        }
    }
}

/// Desktop notification channel. Delivery is best effort: `notify` never fails the caller.
pub trait Notifier: Send + Sync {
    fn request_permission(&self) -> NotificationPermission;
    fn permission(&self) -> NotificationPermission;
    fn notify(&self, body: &str);
}

fn lock_permission(
    permission: &Mutex<NotificationPermission>,
) -> Result<std::sync::MutexGuard<'_, NotificationPermission>, InfraError> {
    permission
        .lock()
        .map_err(|error| InfraError::LockPoisoned(format!("notification permission: {error}")))
}

#[derive(Debug)]
pub struct DesktopNotifier {
    app_name: String,
    enabled: bool,
    permission: Mutex<NotificationPermission>,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>, enabled: bool) -> Self {
        Self {
            app_name: app_name.into(),
            enabled,
            permission: Mutex::new(NotificationPermission::Default),
        }
    }

    fn show(&self, body: &str) -> Result<(), InfraError> {
        Notification::new()
            .summary(&self.app_name)
            .body(body)
            .appname(&self.app_name)
            .icon("alarm-clock")
            .show()
            .map(|_| ())
            .map_err(|error| InfraError::Io(std::io::Error::other(error.to_string())))
    }
}

impl Notifier for DesktopNotifier {
    fn request_permission(&self) -> NotificationPermission {
        let decided = if self.enabled {
            NotificationPermission::Granted
        } else {
            NotificationPermission::Denied
        };
        match lock_permission(&self.permission) {
            Ok(mut permission) => {
                if *permission == NotificationPermission::Default {
                    *permission = decided;
                }
                *permission
            }
            Err(error) => {
                log::warn!("notification permission unavailable: {error}");
                NotificationPermission::Denied
            }
        }
    }

    fn permission(&self) -> NotificationPermission {
        lock_permission(&self.permission)
            .map(|permission| *permission)
            .unwrap_or(NotificationPermission::Denied)
    }

    fn notify(&self, body: &str) {
        if self.permission() != NotificationPermission::Granted {
            log::debug!("notification suppressed ({}): {body}", self.permission().as_str());
            return;
        }
        if let Err(error) = self.show(body) {
            log::warn!("failed to show notification: {error}");
        }
    }
}

/// Collects notification bodies instead of showing them.
#[derive(Debug)]
pub struct InMemoryNotifier {
    grant: bool,
    permission: Mutex<NotificationPermission>,
    sent: Mutex<Vec<String>>,
    requests: Mutex<usize>,
}

impl InMemoryNotifier {
    pub fn granting() -> Self {
        Self::new(true)
    }

    pub fn denying() -> Self {
        Self::new(false)
    }

    fn new(grant: bool) -> Self {
        Self {
            grant,
            permission: Mutex::new(NotificationPermission::Default),
            sent: Mutex::new(Vec::new()),
            requests: Mutex::new(0),
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    pub fn permission_requests(&self) -> usize {
        self.requests.lock().map(|count| *count).unwrap_or_default()
    }
}

impl Notifier for InMemoryNotifier {
    fn request_permission(&self) -> NotificationPermission {
        if let Ok(mut requests) = self.requests.lock() {
            *requests += 1;
        }
        let decided = if self.grant {
            NotificationPermission::Granted
        } else {
            NotificationPermission::Denied
        };
        match lock_permission(&self.permission) {
            Ok(mut permission) => {
                *permission = decided;
                decided
            }
            Err(_) => NotificationPermission::Denied,
        }
    }

    fn permission(&self) -> NotificationPermission {
        lock_permission(&self.permission)
            .map(|permission| *permission)
            .unwrap_or(NotificationPermission::Denied)
    }

    fn notify(&self, body: &str) {
        if self.permission() != NotificationPermission::Granted {
            return;
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(body.to_string());
        }
    }
}
