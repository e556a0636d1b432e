//! Bridge from component logs into `tracing`.

use super::Log;
use super::message::{Level, Message};

/// Log sink forwarding every message to the `tracing` subscriber.
///
/// Install it at the root of a tree when the host application already has a
/// `tracing-subscriber` configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLog;

impl Log for TracingLog {
    fn out(&self, message: Message) {
        let component = message.component();
        let file = message.file();
        let line = message.line();
        let text = message.text();
        match message.level() {
            Level::Debug => tracing::debug!(component, file, line, "{text}"),
            Level::Info | Level::Notice => tracing::info!(component, file, line, "{text}"),
            Level::Warning => tracing::warn!(component, file, line, "{text}"),
            Level::Error => tracing::error!(component, file, line, "{text}"),
            Level::Critical => tracing::error!(component, file, line, critical = true, "{text}"),
        }
    }
}
