//! Hook execution context.

use super::ComponentId;
use super::tree::ComponentTree;
use crate::common::Error;

/// Handle passed to component hooks.
///
/// While a hook runs, the component's behaviour is lent out of the tree; the
/// context gives the hook its own id and mutable access to every other
/// component. Reaching back into the lent component through the tree fails
/// with [`Error::Busy`].
#[derive(Debug)]
pub struct Context<'a> {
    tree: &'a mut ComponentTree,
    id: ComponentId,
}

impl<'a> Context<'a> {
    pub(crate) const fn new(tree: &'a mut ComponentTree, id: ComponentId) -> Self {
        Self { tree, id }
    }

    /// Id of the component whose hook is running.
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// Name of the component whose hook is running.
    pub fn name(&self) -> &str {
        self.tree.name(self.id)
    }

    /// Mutable access to the whole tree.
    pub const fn tree(&mut self) -> &mut ComponentTree {
        &mut *self.tree
    }

    /// Shared access to the whole tree.
    pub const fn tree_ref(&self) -> &ComponentTree {
        &*self.tree
    }

    /// Asks the run loop to shut the system down before the next step.
    pub fn request_halt(&self) {
        self.tree.halt_token().request();
    }

    /// Builds an [`Error::Unsupported`] naming this component.
    pub fn unsupported(&self, capability: &'static str) -> Error {
        Error::Unsupported {
            component: self.name().to_owned(),
            capability,
        }
    }

    /// Builds an [`Error::MissingComponent`] naming this component.
    pub fn missing(&self, role: &'static str) -> Error {
        Error::MissingComponent {
            component: self.name().to_owned(),
            role,
        }
    }
}
