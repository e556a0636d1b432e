//! Stream-writing log sink.
//!
//! Formats each message as a single line:
//!
//! ```text
//! [component] file:line @function(): text
//! ```
//!
//! Each prefix part can be toggled. By default only the component is shown;
//! the line number is only shown together with the file.

use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use super::Log;
use super::message::Message;

/// Log sink writing formatted lines to any `Write` implementor.
#[derive(Debug)]
pub struct StreamLog<W: Write + Send> {
    writer: Mutex<W>,
    display_component: AtomicBool,
    display_file: AtomicBool,
    display_line: AtomicBool,
    display_function: AtomicBool,
}

impl StreamLog<Stdout> {
    /// Creates a sink that writes to standard output.
    pub fn console() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> StreamLog<W> {
    /// Creates a sink over `writer` with default display flags.
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            display_component: AtomicBool::new(true),
            display_file: AtomicBool::new(false),
            display_line: AtomicBool::new(false),
            display_function: AtomicBool::new(false),
        }
    }

    /// Shows or hides the `[component]` prefix.
    pub fn display_component(&self, show: bool) {
        self.display_component.store(show, Ordering::Relaxed);
    }

    /// Shows or hides the source file.
    pub fn display_file(&self, show: bool) {
        self.display_file.store(show, Ordering::Relaxed);
    }

    /// Shows or hides the source line (only effective with the file shown).
    pub fn display_line(&self, show: bool) {
        self.display_line.store(show, Ordering::Relaxed);
    }

    /// Shows or hides the `@function():` prefix.
    pub fn display_function(&self, show: bool) {
        self.display_function.store(show, Ordering::Relaxed);
    }

    /// Consumes the sink and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn format(&self, message: &Message) -> String {
        let mut line = String::new();
        if self.display_component.load(Ordering::Relaxed) {
            line.push('[');
            line.push_str(message.component());
            line.push_str("] ");
        }
        if self.display_file.load(Ordering::Relaxed) {
            line.push_str(message.file());
            if self.display_line.load(Ordering::Relaxed) {
                line.push(':');
                line.push_str(&message.line().to_string());
            }
            line.push(' ');
        }
        if self.display_function.load(Ordering::Relaxed) {
            line.push('@');
            line.push_str(message.function());
            line.push_str("(): ");
        }
        line.push_str(message.text());
        line
    }
}

impl<W: Write + Send> Log for StreamLog<W> {
    fn out(&self, message: Message) {
        let line = self.format(&message);
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        // A sink has nowhere to report its own failures.
        let _ = writeln!(writer, "{line}").and_then(|()| writer.flush());
    }
}
