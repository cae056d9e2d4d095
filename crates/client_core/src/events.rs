use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::warn;

use crate::upload::FileStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Transient notifications and state signals for whatever front end is attached.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminEvent {
    Notice { level: NoticeLevel, message: String },
    ReloadRequested,
    RowsChanged,
    UploadStatusChanged { filename: String, status: FileStatus },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AdminEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AdminEvent> {
        self.tx.subscribe()
    }

    // Nobody listening is fine.
    pub fn emit(&self, event: AdminEvent) {
        let _ = self.tx.send(event);
    }

    pub fn notice(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(AdminEvent::Notice {
            level,
            message: message.into(),
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notice(NoticeLevel::Error, message);
    }
}

/// Takes every event currently buffered, skipping past any overflow gap.
pub fn drain_events(rx: &mut broadcast::Receiver<AdminEvent>) -> Vec<AdminEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(missed)) => {
                warn!(missed, "event receiver lagged");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => return events,
        }
    }
}
