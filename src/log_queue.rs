//! Ordered hand-off of log messages from background threads to the
//! presentation loop.
//!
//! Any thread may hold a [`LogSender`] and enqueue without blocking. The
//! presentation loop owns the [`LogQueue`] and drains it once per poll tick
//! into a [`LogView`]. Messages from one sender arrive in the order they were
//! sent; messages from different senders may interleave.

use std::collections::VecDeque;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use time::{format_description::FormatItem, macros::format_description};

use crate::logging::now_local_or_utc;

const TIMESTAMP_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    System,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::System => "SYSTEM",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Wall-clock time of enqueueing, `HH:MM:SS`.
    pub timestamp: String,
    pub message: String,
    pub severity: Severity,
}

impl LogEntry {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        let timestamp = now_local_or_utc()
            .format(TIMESTAMP_FORMAT)
            .unwrap_or_else(|_| "--:--:--".to_string());
        Self {
            timestamp,
            message: message.into(),
            severity,
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp, self.message)
    }
}

/// Producer handle; cheap to clone and safe to move to any thread.
#[derive(Debug, Clone)]
pub struct LogSender {
    tx: Sender<LogEntry>,
}

impl LogSender {
    /// Enqueue `message` and mirror it to the tracing log.
    ///
    /// Sending after the queue is gone only reaches the tracing log.
    pub fn send(&self, severity: Severity, message: impl Into<String>) {
        let entry = LogEntry::new(severity, message);
        match severity {
            Severity::Info | Severity::System => tracing::info!("{}", entry.message),
            Severity::Warning => tracing::warn!("{}", entry.message),
            Severity::Error => tracing::error!("{}", entry.message),
        }
        let _ = self.tx.send(entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.send(Severity::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.send(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(Severity::Error, message);
    }

    pub fn system(&self, message: impl Into<String>) {
        self.send(Severity::System, message);
    }
}

/// Unbounded FIFO of log entries, drained by the presentation loop.
pub struct LogQueue {
    tx: Sender<LogEntry>,
    rx: Receiver<LogEntry>,
}

impl LogQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> LogSender {
        LogSender {
            tx: self.tx.clone(),
        }
    }

    /// Take every entry queued so far, oldest first. Empty queue yields nothing.
    pub fn drain(&self) -> Vec<LogEntry> {
        let mut drained = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(entry) => drained.push(entry),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        drained
    }

    /// Drain into `view`, returning how many entries were appended.
    pub fn drain_into(&self, view: &mut LogView) -> usize {
        let drained = self.drain();
        let count = drained.len();
        view.extend(drained);
        count
    }
}

impl Default for LogQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Append-only log shown on screen; the oldest entries fall off past `capacity`.
#[derive(Debug, Clone)]
pub struct LogView {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogView {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = LogEntry>) {
        for entry in entries {
            self.push(entry);
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }
}
