use crate::notification::domain::notifier::{greeting, Notifier};

/// Writes the greeting to the log. Used when voice output is disabled.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, name: &str) {
        log::info!("{}", greeting(name));
    }
}
