//! Email adapters implementing `NotificationSink`.

mod logging_sink;
mod resend_sink;

pub use logging_sink::LoggingNotificationSink;
pub use resend_sink::{ResendConfig, ResendNotificationSink};
