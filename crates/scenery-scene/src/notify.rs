use std::cell::RefCell;

/// Channel for user-visible messages, such as a status line or a toast.
pub trait Notifier {
    fn notify(&self, message: &str);
}

/// Sends notifications to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::warn!(target: "scenery3d::notice", "{message}");
    }
}

/// Keeps every notification, for tests and headless runs.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: RefCell<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}
