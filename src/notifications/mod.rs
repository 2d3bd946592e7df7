//! Due-date reminders: endpoint registry, inbox store, push dispatch, and
//! the background scheduler

mod directory;
mod dispatch;
mod model;
mod scheduler;
mod service;

pub use directory::{DbReminderDirectory, ReminderDirectory};
pub use dispatch::{DispatchError, HttpPushSender, PushSender};
pub use model::{StoreTokenRequest, StoredNotification};
pub use scheduler::{ReminderScheduler, RunReport, SchedulerHandle};
pub use service::NotificationService;
