/// Greets a person whose attendance was just committed.
///
/// Called from the tick loop, so implementations must return promptly.
pub trait Notifier: Send {
    fn notify(&self, name: &str);
}

pub fn greeting(name: &str) -> String {
    format!("Welcome, {name}")
}
