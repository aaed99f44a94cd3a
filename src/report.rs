//! Status reporting.
//!
//! The synchronizer talks to a [`Reporter`] with two fire-and-forget channels:
//! informational and warning. [`ConsoleReporter`] prints them with colored
//! markers; [`Recorder`] buffers them so they can be replayed in order later.

use colored::*;
use std::sync::Mutex;

pub trait Reporter: Send + Sync {
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
}

/// Prints info to stdout and warnings to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter {
    /// Suppress informational output. Warnings always print.
    pub quiet: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Reporter for ConsoleReporter {
    fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{} {}", "📦".blue(), msg);
        }
    }

    fn warn(&self, msg: &str) {
        eprintln!("{} {}", "!".yellow(), msg);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Info(String),
    Warn(String),
}

/// Buffers events in arrival order.
#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: Event) {
        // A poisoned lock still holds every event pushed before the panic.
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Warn(msg) => Some(msg),
                Event::Info(_) => None,
            })
            .collect()
    }

    /// Forwards every buffered event to `target`, oldest first.
    pub fn replay(&self, target: &dyn Reporter) {
        for event in self.events() {
            match event {
                Event::Info(msg) => target.info(&msg),
                Event::Warn(msg) => target.warn(&msg),
            }
        }
    }
}

impl Reporter for Recorder {
    fn info(&self, msg: &str) {
        self.push(Event::Info(msg.to_string()));
    }

    fn warn(&self, msg: &str) {
        self.push(Event::Warn(msg.to_string()));
    }
}
