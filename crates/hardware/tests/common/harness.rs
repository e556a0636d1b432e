use std::sync::Arc;

use hwsim_core::common::{Address, AddressRange};
use hwsim_core::component::{ComponentId, ComponentTree};
use hwsim_core::log::{Level, Log, Message, QueueLog};
use hwsim_core::memory::LinearMemory;
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output through the test writer, so it is only shown for
/// failing tests. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A component tree with a grouping root that carries a [`QueueLog`].
pub struct TestTree {
    pub tree: ComponentTree,
    pub root: ComponentId,
    pub log: Arc<QueueLog>,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTree {
    pub fn new() -> Self {
        init_tracing();
        let mut tree = ComponentTree::new();
        let root = tree.create_group("root");
        let log = Arc::new(QueueLog::new());
        tree.set_log(root, Some(Arc::clone(&log) as Arc<dyn Log>));
        Self { tree, root, log }
    }

    /// Creates a grouping component owned by the root.
    pub fn group(&mut self, name: &str) -> ComponentId {
        let id = self.tree.create_group(name);
        self.tree.add_component(self.root, id).unwrap();
        id
    }

    /// Creates a detached zero-filled RAM covering `[start, end]`.
    pub fn ram(&mut self, name: &str, start: Address, end: Address) -> ComponentId {
        self.tree.create(name, LinearMemory::ram(AddressRange::new(start, end)))
    }

    /// Pops every queued message.
    pub fn messages(&self) -> Vec<Message> {
        self.log.drain()
    }

    /// Pops every queued message as `"[component] text"`.
    pub fn lines(&self) -> Vec<String> {
        self.messages()
            .iter()
            .map(|m| format!("[{}] {}", m.component(), m.text()))
            .collect()
    }

    /// Pops every queued message at `level` as `"[component] text"`.
    pub fn lines_at(&self, level: Level) -> Vec<String> {
        self.messages()
            .iter()
            .filter(|m| m.level() == level)
            .map(|m| format!("[{}] {}", m.component(), m.text()))
            .collect()
    }
}
