//! Component logging.
//!
//! This module provides the leveled diagnostics every component emits. It provides:
//! 1. **Messages:** `Message` and `Level`, the value handed to sinks.
//! 2. **Sinks:** The `Log` trait with stream, queue, and `tracing` implementations.
//! 3. **Call-site capture:** The `component_log!` macro, which records file, line,
//!    and module path and routes the message to the component's resolved sink.
//!
//! Sinks are shared (`Arc<dyn Log>`) and may be installed on any component;
//! components without their own sink use their nearest ancestor's.

/// Leveled message value.
pub mod message;

/// In-memory sink for tests.
pub mod queue;

/// Formatting sink over any `Write` implementor.
pub mod stream;

/// Sink forwarding to the `tracing` ecosystem.
pub mod tracing_log;

pub use message::{Level, Message};
pub use queue::QueueLog;
pub use stream::StreamLog;
pub use tracing_log::TracingLog;

/// A destination for log messages.
///
/// Implementations serialize their own internal state; `out` may be called
/// from several threads.
pub trait Log: Send + Sync {
    /// Consumes one message.
    fn out(&self, message: Message);
}

/// Logs a formatted message on behalf of a component.
///
/// Resolves the component's sink (its own, else the nearest ancestor's) and
/// does nothing when there is none. The first argument is a
/// [`ComponentTree`](crate::component::ComponentTree); inside a hook use
/// `cx.tree_ref()` and `cx.id()`.
///
/// ```ignore
/// component_log!(tree, id, Level::Info, "mapped {} bytes", len);
/// ```
#[macro_export]
macro_rules! component_log {
    ($tree:expr, $id:expr, $level:expr, $($arg:tt)+) => {
        $tree.emit($id, $level, file!(), line!(), module_path!(), format_args!($($arg)+))
    };
}
