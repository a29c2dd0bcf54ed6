use std::process::{Command, Stdio};
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, TrySendError};

use crate::notification::domain::notifier::{greeting, Notifier};
use crate::shared::config::VoiceSettings;

const QUEUE_CAPACITY: usize = 4;

/// Speaks greetings through an external text-to-speech command.
///
/// Utterances are queued to a worker thread. When the queue is full the
/// greeting is dropped rather than stalling the caller.
pub struct SpeechNotifier {
    tx: Option<Sender<String>>,
    worker: Option<JoinHandle<()>>,
}

impl SpeechNotifier {
    pub fn new(settings: VoiceSettings) -> Self {
        let (tx, rx) = crossbeam_channel::bounded::<String>(QUEUE_CAPACITY);
        let worker = std::thread::spawn(move || {
            for text in rx {
                let result = speech_command(&settings, &text)
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status();
                match result {
                    Ok(status) if status.success() => {}
                    Ok(status) => log::warn!("{} exited with {status}", settings.command),
                    Err(e) => log::warn!("Cannot run {}: {e}", settings.command),
                }
            }
        });
        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }
}

impl Notifier for SpeechNotifier {
    fn notify(&self, name: &str) {
        let Some(tx) = &self.tx else { return };
        match tx.try_send(greeting(name)) {
            Ok(()) => {}
            Err(TrySendError::Full(text)) => log::debug!("Speech queue full, dropped: {text}"),
            Err(TrySendError::Disconnected(_)) => log::warn!("Speech worker stopped"),
        }
    }
}

impl Drop for SpeechNotifier {
    fn drop(&mut self) {
        // closing the channel ends the worker once queued speech is done
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn speech_command(settings: &VoiceSettings, text: &str) -> Command {
    let mut cmd = Command::new(&settings.command);
    cmd.arg("-s")
        .arg(settings.speed.to_string())
        .arg("-p")
        .arg(settings.pitch.to_string())
        .arg(text);
    cmd
}
