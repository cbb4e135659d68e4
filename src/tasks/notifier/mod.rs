//! Periodic emails with a download link for each subscription's channels.

pub mod delivery;
pub mod runner;

pub use delivery::{DeliveryError, Mailer, Notification, SmtpMailer};
pub use runner::{due_windows, run_once, start, Window};
