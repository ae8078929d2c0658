//! Job transcript
//!
//! Collects every line a job run produces: launcher diagnostics, tool
//! output and the completion marker. Inside a scheduler allocation the
//! transcript is echoed to the standard streams, which the scheduler
//! captures into the job log.

use pdbjob_core::{LogEntry, LogLevel};
use std::sync::{Arc, Mutex};

/// Sink for the lines of one job run
pub trait Transcript: Send + Sync {
    /// Adds an entry to the transcript
    fn add_entry(&self, entry: LogEntry);

    /// Returns a copy of all entries recorded so far
    fn snapshot(&self) -> Vec<LogEntry>;

    fn info(&self, message: String) {
        self.add_entry(LogEntry::now(LogLevel::Info, message));
    }

    fn warning(&self, message: String) {
        self.add_entry(LogEntry::now(LogLevel::Warning, message));
    }

    fn error(&self, message: String) {
        self.add_entry(LogEntry::now(LogLevel::Error, message));
    }
}

/// In-memory transcript, optionally echoed to stdout/stderr
///
/// Info lines go to stdout, warnings and errors to stderr, debug lines are
/// kept but never echoed.
#[derive(Clone)]
pub struct InMemoryTranscript {
    buffer: Arc<Mutex<Vec<LogEntry>>>,
    echo: bool,
}

impl InMemoryTranscript {
    /// Creates a transcript that only records
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
            echo: false,
        }
    }

    /// Creates a transcript that also writes every line to the standard streams
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::new()
        }
    }

    /// Message of the most recent entry
    pub fn last_message(&self) -> Option<String> {
        let buffer = self.buffer.lock().unwrap();
        buffer.last().map(|entry| entry.message.clone())
    }

    /// Messages of all entries, in order
    pub fn messages(&self) -> Vec<String> {
        let buffer = self.buffer.lock().unwrap();
        buffer.iter().map(|entry| entry.message.clone()).collect()
    }
}

impl Default for InMemoryTranscript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript for InMemoryTranscript {
    fn add_entry(&self, entry: LogEntry) {
        let mut buffer = self.buffer.lock().unwrap();

        if self.echo {
            match entry.level {
                LogLevel::Debug => {}
                LogLevel::Info => println!("{}", entry.message),
                LogLevel::Warning | LogLevel::Error => eprintln!("{}", entry.message),
            }
        }

        buffer.push(entry);
    }

    fn snapshot(&self) -> Vec<LogEntry> {
        let buffer = self.buffer.lock().unwrap();
        buffer.clone()
    }
}
