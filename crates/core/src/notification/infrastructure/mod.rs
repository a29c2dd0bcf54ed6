pub mod log_notifier;
pub mod speech_notifier;
