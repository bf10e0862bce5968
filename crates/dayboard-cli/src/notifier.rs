//! Desktop notifications through the platform notification service.

use dayboard_core::{Notification, Notifier, NotifyError, Permission};

/// Set to any value to skip the notification service entirely; every
/// message then goes to the alert fallback on stderr.
pub const DISABLE_ENV: &str = "DAYBOARD_DISABLE_NOTIFICATIONS";

pub struct DesktopNotifier {
    permission: Permission,
}

impl DesktopNotifier {
    pub fn from_env() -> Self {
        let permission = if std::env::var_os(DISABLE_ENV).is_some() {
            Permission::Unsupported
        } else {
            Permission::Default
        };
        Self { permission }
    }
}

impl Notifier for DesktopNotifier {
    fn permission(&self) -> Permission {
        self.permission
    }

    // Desktop notification services do not ask; running the watcher is consent.
    fn request_permission(&mut self) -> Permission {
        if self.permission == Permission::Default {
            self.permission = Permission::Granted;
        }
        self.permission
    }

    fn show(&self, notification: &Notification) -> Result<(), NotifyError> {
        match self.permission {
            Permission::Granted => {}
            Permission::Unsupported => return Err(NotifyError::Unsupported),
            Permission::Default | Permission::Denied => return Err(NotifyError::PermissionDenied),
        }
        notify_rust::Notification::new()
            .appname("dayboard")
            .summary(&notification.title)
            .body(&notification.body)
            .show()
            .map(|_| ())
            .map_err(|err| NotifyError::ShowFailed(err.to_string()))
    }

    fn alert(&self, notification: &Notification) {
        eprintln!("{}", notification.alert_text());
    }
}
