//! "Show the user a message": native notification with an alert fallback.
//!
//! A reminder is never dropped silently. When the host cannot show native
//! notifications, permission is not granted, or showing fails, [`deliver`]
//! falls back to [`Notifier::alert`], a blocking alert-style message.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::NotifyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Not asked yet.
    Default,
    Granted,
    Denied,
    /// The host has no native notifications at all.
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Replacement tag; a newer notification with the same tag supersedes the older one.
    pub tag: Option<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tag: None,
        }
    }

    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Text used by alert-style fallbacks.
    pub fn alert_text(&self) -> String {
        format!("Reminder: {}\n{}", self.title, self.body)
    }
}

pub trait Notifier {
    fn permission(&self) -> Permission;

    /// Ask the user for permission if it has not been decided yet.
    fn request_permission(&mut self) -> Permission;

    fn show(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Blocking alert-style message. Must not fail.
    fn alert(&self, notification: &Notification);
}

impl<T: Notifier + ?Sized> Notifier for Box<T> {
    fn permission(&self) -> Permission {
        (**self).permission()
    }
    fn request_permission(&mut self) -> Permission {
        (**self).request_permission()
    }
    fn show(&self, notification: &Notification) -> Result<(), NotifyError> {
        (**self).show(notification)
    }
    fn alert(&self, notification: &Notification) {
        (**self).alert(notification)
    }
}

/// How a notification reached the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    Shown,
    Alerted,
}

/// Show `notification`, degrading to an alert instead of dropping it.
pub fn deliver<N: Notifier + ?Sized>(notifier: &N, notification: &Notification) -> Delivery {
    match notifier.permission() {
        Permission::Granted => match notifier.show(notification) {
            Ok(()) => Delivery::Shown,
            Err(e) => {
                warn!(error = %e, title = %notification.title, "native notification failed, using alert");
                notifier.alert(notification);
                Delivery::Alerted
            }
        },
        other => {
            warn!(permission = ?other, title = %notification.title, "notifications unavailable, using alert");
            notifier.alert(notification);
            Delivery::Alerted
        }
    }
}

/// Notifier that records everything it is asked to show.
///
/// Clones share the same log, so a test can inspect what the dashboard
/// delivered.
#[derive(Debug, Clone)]
pub struct RecordingNotifier {
    permission: Rc<Cell<Permission>>,
    fail_show: Rc<Cell<bool>>,
    log: Rc<RefCell<Vec<(Delivery, Notification)>>>,
}

impl RecordingNotifier {
    pub fn new(permission: Permission) -> Self {
        Self {
            permission: Rc::new(Cell::new(permission)),
            fail_show: Rc::new(Cell::new(false)),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn granted() -> Self {
        Self::new(Permission::Granted)
    }

    pub fn set_permission(&self, permission: Permission) {
        self.permission.set(permission);
    }

    /// Make every subsequent `show` fail.
    pub fn fail_show(&self, fail: bool) {
        self.fail_show.set(fail);
    }

    pub fn deliveries(&self) -> Vec<(Delivery, Notification)> {
        self.log.borrow().clone()
    }

    pub fn shown(&self) -> Vec<Notification> {
        self.filtered(Delivery::Shown)
    }

    pub fn alerts(&self) -> Vec<Notification> {
        self.filtered(Delivery::Alerted)
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    fn filtered(&self, kind: Delivery) -> Vec<Notification> {
        self.log
            .borrow()
            .iter()
            .filter(|(d, _)| *d == kind)
            .map(|(_, n)| n.clone())
            .collect()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::granted()
    }
}

impl Notifier for RecordingNotifier {
    fn permission(&self) -> Permission {
        self.permission.get()
    }

    fn request_permission(&mut self) -> Permission {
        if self.permission.get() == Permission::Default {
            self.permission.set(Permission::Granted);
        }
        self.permission.get()
    }

    fn show(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.fail_show.get() {
            return Err(NotifyError::ShowFailed("recording notifier set to fail".into()));
        }
        self.log
            .borrow_mut()
            .push((Delivery::Shown, notification.clone()));
        Ok(())
    }

    fn alert(&self, notification: &Notification) {
        self.log
            .borrow_mut()
            .push((Delivery::Alerted, notification.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder() -> Notification {
        Notification::new("Task Reminder", "It's time for: demo").tagged("task-1")
    }

    #[test]
    fn granted_permission_shows_natively() {
        let notifier = RecordingNotifier::granted();
        assert_eq!(deliver(&notifier, &reminder()), Delivery::Shown);
        assert_eq!(notifier.shown(), vec![reminder()]);
        assert!(notifier.alerts().is_empty());
    }

    #[test]
    fn denied_permission_falls_back_to_alert() {
        for permission in [Permission::Denied, Permission::Default, Permission::Unsupported] {
            let notifier = RecordingNotifier::new(permission);
            assert_eq!(deliver(&notifier, &reminder()), Delivery::Alerted);
            assert_eq!(notifier.alerts().len(), 1);
        }
    }

    #[test]
    fn show_failure_falls_back_to_alert() {
        let notifier = RecordingNotifier::granted();
        notifier.fail_show(true);
        assert_eq!(deliver(&notifier, &reminder()), Delivery::Alerted);
        assert!(notifier.shown().is_empty());
    }

    #[test]
    fn request_permission_only_upgrades_undecided() {
        let mut undecided = RecordingNotifier::new(Permission::Default);
        assert_eq!(undecided.request_permission(), Permission::Granted);
        let mut denied = RecordingNotifier::new(Permission::Denied);
        assert_eq!(denied.request_permission(), Permission::Denied);
    }

    #[test]
    fn alert_text_includes_title_and_body() {
        assert_eq!(reminder().alert_text(), "Reminder: Task Reminder\nIt's time for: demo");
    }
}
