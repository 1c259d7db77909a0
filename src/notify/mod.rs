//! Notification creation, dedup, read state and email forwarding.

pub mod dispatcher;
pub mod email;

pub use dispatcher::{NewNotification, Notification, NotificationDispatcher, NotificationKind};
pub use email::{EmailSink, MockEmailSink, WebhookEmailSink};
