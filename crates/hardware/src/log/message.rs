//! Log messages.
//!
//! A [`Message`] records where a diagnostic came from (source location and
//! component name) and at what severity. The text payload is appended through
//! [`std::fmt::Write`], so `write!` works on a message the same way it works on
//! a `String`.

use std::fmt;

/// Severity of a log message, from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Detailed tracing, e.g. per-instruction disassembly.
    Debug,
    /// Informational progress.
    Info,
    /// Normal but significant conditions, such as lifecycle transitions.
    Notice,
    /// Recoverable oddities (e.g. a stale clock event was dropped).
    Warning,
    /// A failed operation.
    Error,
    /// A failure that ended the run loop.
    Critical,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Notice => "NOTICE",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        })
    }
}

/// A single leveled diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    level: Level,
    file: &'static str,
    line: u32,
    function: &'static str,
    component: String,
    text: String,
}

impl Message {
    /// Creates a message with an empty text payload.
    ///
    /// # Arguments
    ///
    /// * `level` - Severity.
    /// * `file` - Source file of the call site (usually `file!()`).
    /// * `line` - Source line of the call site (usually `line!()`).
    /// * `function` - Enclosing function or module path (usually `module_path!()`).
    /// * `component` - Name of the component the message is about.
    pub fn new(
        level: Level,
        file: &'static str,
        line: u32,
        function: &'static str,
        component: impl Into<String>,
    ) -> Self {
        Self {
            level,
            file,
            line,
            function,
            component: component.into(),
            text: String::new(),
        }
    }

    /// Returns the severity.
    pub const fn level(&self) -> Level {
        self.level
    }

    /// Returns the originating source file.
    pub const fn file(&self) -> &'static str {
        self.file
    }

    /// Returns the originating source line.
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Returns the originating function or module path.
    pub const fn function(&self) -> &'static str {
        self.function
    }

    /// Returns the name of the component the message is about.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Returns the text written so far.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Write for Message {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.text.push_str(s);
        Ok(())
    }
}
