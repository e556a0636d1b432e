//! Arena-backed component tree.
//!
//! This module implements the ownership graph and lifecycle state machine of
//! every simulated component. It provides:
//! 1. **Arena:** Components live in a `Vec` and are addressed by `ComponentId`;
//!    parents hold child ids, children hold a non-owning parent id.
//! 2. **Ownership rules:** At most one parent per component, no cycles. Every
//!    mutation is validated before anything changes.
//! 3. **Lifecycle:** `prepare`, `boot`, `shutdown`, `cleanup`, each recursive over
//!    the subtree and validated over the whole subtree first.
//! 4. **Log resolution:** A component without its own sink uses its nearest
//!    ancestor's.
//! 5. **Hook dispatch:** Behaviour is lent out while a hook runs so the hook can
//!    receive mutable access to the rest of the tree.

use std::fmt::{self, Write as _};
use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Component, ComponentId, Context, Group, State};
use crate::common::{Address, AddressRange, Error, Result};
use crate::component_log;
use crate::log::{Level, Log, Message};

/// Shared flag asking the run loop to shut the system down.
///
/// Cloning yields a handle to the same flag, so a signal handler on another
/// thread can hold one while the simulation owns the tree.
#[derive(Clone, Debug, Default)]
pub struct HaltToken(Arc<AtomicBool>);

impl HaltToken {
    /// Creates a token with no pending request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a halt.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if a halt is pending.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears a pending request and returns whether there was one.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

struct Node {
    name: String,
    state: State,
    parent: Option<ComponentId>,
    children: Vec<ComponentId>,
    log: Option<Arc<dyn Log>>,
    /// `None` while one of the component's hooks is executing.
    behavior: Option<Box<dyn Component>>,
}

/// Owner of every component of a simulated machine.
///
/// Ids handed out by one tree are only meaningful to that tree. Operations
/// returning [`Result`] report an id the tree never issued as
/// [`Error::UnknownComponent`]; the plain accessors (`name`, `state`,
/// `children`, ...) panic on it. Components are never freed: removing a
/// subcomponent only detaches it.
#[derive(Default)]
pub struct ComponentTree {
    nodes: Vec<Node>,
    halt: HaltToken,
}

impl fmt::Debug for ComponentTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (index, node) in self.nodes.iter().enumerate() {
            let _ = list.entry(&format_args!(
                "#{index} {:?} {} parent={:?} children={:?}",
                node.name, node.state, node.parent, node.children
            ));
        }
        list.finish()
    }
}

impl ComponentTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of components ever created.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no component was created yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a detached component and returns its id.
    pub fn create<C: Component>(&mut self, name: impl Into<String>, behavior: C) -> ComponentId {
        self.create_boxed(name, Box::new(behavior))
    }

    /// Adds a detached, already boxed component.
    pub fn create_boxed(&mut self, name: impl Into<String>, behavior: Box<dyn Component>) -> ComponentId {
        let id = ComponentId::new(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            state: State::IDLE,
            parent: None,
            children: Vec::new(),
            log: None,
            behavior: Some(behavior),
        });
        id
    }

    /// Adds a detached component with no behaviour of its own.
    pub fn create_group(&mut self, name: impl Into<String>) -> ComponentId {
        self.create(name, Group)
    }

    /// Returns `true` if `id` was issued by this tree.
    pub fn contains(&self, id: ComponentId) -> bool {
        id.index() < self.nodes.len()
    }

    fn node(&self, id: ComponentId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: ComponentId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    fn try_node(&self, id: ComponentId) -> Result<&Node> {
        self.nodes.get(id.index()).ok_or(Error::UnknownComponent { id })
    }

    fn try_node_mut(&mut self, id: ComponentId) -> Result<&mut Node> {
        self.nodes.get_mut(id.index()).ok_or(Error::UnknownComponent { id })
    }

    fn check_known(&self, ids: &[ComponentId]) -> Result<()> {
        ids.iter().try_for_each(|&id| self.try_node(id).map(drop))
    }

    /// Returns the component's name.
    pub fn name(&self, id: ComponentId) -> &str {
        &self.node(id).name
    }

    /// Renames the component.
    pub fn set_name(&mut self, id: ComponentId, name: impl Into<String>) {
        self.node_mut(id).name = name.into();
    }

    /// Returns the component's lifecycle flags.
    pub fn state(&self, id: ComponentId) -> State {
        self.node(id).state
    }

    /// Returns `true` once the component was prepared and not yet cleaned up.
    pub fn is_prepared(&self, id: ComponentId) -> bool {
        self.node(id).state.prepared
    }

    /// Returns `true` between boot and shutdown.
    pub fn is_running(&self, id: ComponentId) -> bool {
        self.node(id).state.running
    }

    /// Returns the owning component, if attached.
    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.node(id).parent
    }

    /// Returns the owned subcomponents in insertion order.
    pub fn children(&self, id: ComponentId) -> &[ComponentId] {
        &self.node(id).children
    }

    /// Returns the halt flag polled by the run loop.
    pub const fn halt_token(&self) -> &HaltToken {
        &self.halt
    }

    /// Asks the run loop to shut the system down before the next step.
    pub fn request_halt(&self) {
        self.halt.request();
    }

    fn busy(&self, id: ComponentId) -> Error {
        Error::Busy {
            component: self.name(id).to_owned(),
        }
    }

    fn unsupported(&self, id: ComponentId, capability: &'static str) -> Error {
        Error::Unsupported {
            component: self.name(id).to_owned(),
            capability,
        }
    }

    // ---------------------------------------------------------------------
    // Ownership graph
    // ---------------------------------------------------------------------

    fn check_attachable(&self, parent: ComponentId, child: ComponentId) -> Result<()> {
        if self.node(child).parent.is_some() {
            return Err(Error::SubcomponentOwned {
                component: self.name(parent).to_owned(),
                subcomponent: self.name(child).to_owned(),
                id: child,
            });
        }
        if child == parent || self.is_subcomponent_of(parent, child, true) {
            return Err(Error::ComponentLoop {
                component: self.name(parent).to_owned(),
                subcomponent: self.name(child).to_owned(),
                id: child,
            });
        }
        Ok(())
    }

    fn position(&self, parent: ComponentId, child: ComponentId) -> Result<usize> {
        self.node(parent)
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or_else(|| Error::NotSubcomponent {
                component: self.name(parent).to_owned(),
                subcomponent: self.name(child).to_owned(),
                id: child,
            })
    }

    /// Makes `child` an owned subcomponent of `parent`, appended last.
    ///
    /// # Errors
    ///
    /// * [`Error::SubcomponentOwned`] if `child` already has a parent.
    /// * [`Error::ComponentLoop`] if `child` is `parent` or one of its ancestors.
    /// * [`Error::UnknownComponent`] if either id is foreign.
    pub fn add_component(&mut self, parent: ComponentId, child: ComponentId) -> Result<()> {
        self.check_known(&[parent, child])?;
        self.check_attachable(parent, child)?;
        component_log!(self, parent, Level::Debug, "Adding component: {}", self.name(child));
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Detaches the direct subcomponent `child` from `parent`.
    ///
    /// # Errors
    ///
    /// [`Error::NotSubcomponent`] if `child` is not a direct subcomponent.
    pub fn remove_component(&mut self, parent: ComponentId, child: ComponentId) -> Result<()> {
        self.check_known(&[parent, child])?;
        let position = self.position(parent, child)?;
        component_log!(self, parent, Level::Debug, "Removing component: {}", self.name(child));
        let _ = self.node_mut(parent).children.remove(position);
        self.node_mut(child).parent = None;
        Ok(())
    }

    /// Swaps the direct subcomponent `old` for `new`, keeping its position.
    ///
    /// Every precondition of the removal and of the addition is checked
    /// before the tree is touched, so a failed replace changes nothing.
    pub fn replace_component(&mut self, parent: ComponentId, old: ComponentId, new: ComponentId) -> Result<()> {
        self.check_known(&[parent, old, new])?;
        let position = self.position(parent, old)?;
        if old == new {
            return Ok(());
        }
        self.check_attachable(parent, new)?;
        component_log!(self, parent, Level::Debug, "Removing component: {}", self.name(old));
        component_log!(self, parent, Level::Debug, "Adding component: {}", self.name(new));
        self.node_mut(parent).children[position] = new;
        self.node_mut(new).parent = Some(parent);
        self.node_mut(old).parent = None;
        Ok(())
    }

    /// Fills a single-occupant slot of `parent`: replaces `current` when
    /// present, otherwise adds `new`.
    pub fn attach(&mut self, parent: ComponentId, current: Option<ComponentId>, new: ComponentId) -> Result<()> {
        match current {
            Some(old) => self.replace_component(parent, old, new),
            None => self.add_component(parent, new),
        }
    }

    /// Returns `true` if `candidate` is owned by `parent`, directly or, when
    /// `deep` is set, anywhere below it.
    pub fn has_subcomponent(&self, parent: ComponentId, candidate: ComponentId, deep: bool) -> bool {
        if deep {
            self.is_subcomponent_of(candidate, parent, true)
        } else {
            self.node(parent).children.contains(&candidate)
        }
    }

    /// Returns `true` if `candidate` owns `child`, directly or, when `deep`
    /// is set, as any ancestor.
    pub fn is_subcomponent_of(&self, child: ComponentId, candidate: ComponentId, deep: bool) -> bool {
        let mut current = self.node(child).parent;
        while let Some(parent) = current {
            if parent == candidate {
                return true;
            }
            if !deep {
                break;
            }
            current = self.node(parent).parent;
        }
        false
    }

    /// Returns the topmost ancestor of `id` (`id` itself when detached).
    pub fn root(&self, id: ComponentId) -> ComponentId {
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            current = parent;
        }
        current
    }

    /// Returns `id` followed by every component below it, depth first.
    pub fn subtree(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut order = Vec::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            order.push(current);
            pending.extend(self.node(current).children.iter().rev().copied());
        }
        order
    }

    // ---------------------------------------------------------------------
    // Logging
    // ---------------------------------------------------------------------

    /// Installs or removes the component's own log sink.
    pub fn set_log(&mut self, id: ComponentId, log: Option<Arc<dyn Log>>) {
        self.node_mut(id).log = log;
    }

    /// Resolves the sink used by the component: its own, else the nearest
    /// ancestor's.
    pub fn log(&self, id: ComponentId) -> Option<&Arc<dyn Log>> {
        let mut current = Some(id);
        while let Some(node) = current.map(|c| self.node(c)) {
            if node.log.is_some() {
                return node.log.as_ref();
            }
            current = node.parent;
        }
        None
    }

    /// Sends a message on behalf of `id`; a no-op without a resolved sink.
    ///
    /// Usually called through [`component_log!`](crate::component_log).
    pub fn emit(
        &self,
        id: ComponentId,
        level: Level,
        file: &'static str,
        line: u32,
        function: &'static str,
        args: fmt::Arguments<'_>,
    ) {
        if let Some(log) = self.log(id) {
            let mut message = Message::new(level, file, line, function, self.name(id));
            let _ = message.write_fmt(args);
            log.out(message);
        }
    }

    /// Logs `RUNNING` for a running component, and optionally for every
    /// running component below it.
    pub fn log_state(&self, id: ComponentId, recursive: bool, level: Level) {
        if self.is_running(id) {
            component_log!(self, id, level, "RUNNING");
        }
        if recursive {
            for &child in self.children(id) {
                self.log_state(child, true, level);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    fn check_subtree(&self, id: ComponentId, expected: State, accept: fn(State) -> bool) -> Result<()> {
        let _ = self.try_node(id)?;
        for current in self.subtree(id) {
            let node = self.node(current);
            if !accept(node.state) {
                return Err(Error::WrongState {
                    component: node.name.clone(),
                    actual: node.state,
                    expected,
                });
            }
            if node.behavior.is_none() {
                return Err(self.busy(current));
            }
        }
        Ok(())
    }

    /// Restores the flag of every component in `flipped` when a hook failed
    /// partway through a transition, so the subtree is left as it was.
    fn settle(&mut self, result: Result<()>, flipped: &[ComponentId], restore: fn(&mut State)) -> Result<()> {
        if result.is_err() {
            for &id in flipped {
                restore(&mut self.node_mut(id).state);
            }
        }
        result
    }

    /// Prepares `id` and its subtree: children first, then the component.
    ///
    /// # Errors
    ///
    /// [`Error::WrongState`] if any component of the subtree is already
    /// prepared; nothing is changed in that case. If a hook fails, every
    /// component prepared so far by this call is flagged idle again.
    pub fn prepare(&mut self, id: ComponentId) -> Result<()> {
        self.check_subtree(id, State::IDLE, |s| !s.prepared)?;
        let mut flipped = Vec::new();
        let result = self.prepare_node(id, &mut flipped);
        self.settle(result, &flipped, |s| s.prepared = false)
    }

    fn prepare_node(&mut self, id: ComponentId, flipped: &mut Vec<ComponentId>) -> Result<()> {
        component_log!(self, id, Level::Notice, "Preparing");
        for child in self.node(id).children.clone() {
            self.prepare_node(child, flipped)?;
        }
        self.with_component(id, |component, cx| component.on_prepare(cx))?;
        self.node_mut(id).state.prepared = true;
        flipped.push(id);
        Ok(())
    }

    /// Boots `id` and its subtree: children first, then the component.
    ///
    /// # Errors
    ///
    /// [`Error::WrongState`] unless every component of the subtree is
    /// prepared and not running. A failing hook leaves the whole subtree
    /// prepared and stopped.
    pub fn boot(&mut self, id: ComponentId) -> Result<()> {
        self.check_subtree(id, State::PREPARED, |s| s.prepared && !s.running)?;
        let mut flipped = Vec::new();
        let result = self.boot_node(id, &mut flipped);
        self.settle(result, &flipped, |s| s.running = false)
    }

    fn boot_node(&mut self, id: ComponentId, flipped: &mut Vec<ComponentId>) -> Result<()> {
        component_log!(self, id, Level::Notice, "Booting");
        for child in self.node(id).children.clone() {
            self.boot_node(child, flipped)?;
        }
        self.with_component(id, |component, cx| component.on_boot(cx))?;
        self.node_mut(id).state.running = true;
        flipped.push(id);
        Ok(())
    }

    /// Shuts `id` and its subtree down: the component first, then children.
    ///
    /// # Errors
    ///
    /// [`Error::WrongState`] unless every component of the subtree is running.
    /// A failing hook leaves the whole subtree running.
    pub fn shutdown(&mut self, id: ComponentId) -> Result<()> {
        self.check_subtree(id, State::RUNNING, |s| s.running)?;
        let mut flipped = Vec::new();
        let result = self.shutdown_node(id, &mut flipped);
        self.settle(result, &flipped, |s| s.running = true)
    }

    fn shutdown_node(&mut self, id: ComponentId, flipped: &mut Vec<ComponentId>) -> Result<()> {
        component_log!(self, id, Level::Notice, "Shutdown");
        self.with_component(id, |component, cx| component.on_shutdown(cx))?;
        self.node_mut(id).state.running = false;
        flipped.push(id);
        for child in self.node(id).children.clone() {
            self.shutdown_node(child, flipped)?;
        }
        Ok(())
    }

    /// Cleans `id` and its subtree up: children first, then the component.
    ///
    /// # Errors
    ///
    /// [`Error::WrongState`] unless every component of the subtree is
    /// prepared and not running. A failing hook leaves the whole subtree
    /// prepared.
    pub fn cleanup(&mut self, id: ComponentId) -> Result<()> {
        self.check_subtree(id, State::PREPARED, |s| s.prepared && !s.running)?;
        let mut flipped = Vec::new();
        let result = self.cleanup_node(id, &mut flipped);
        self.settle(result, &flipped, |s| s.prepared = true)
    }

    fn cleanup_node(&mut self, id: ComponentId, flipped: &mut Vec<ComponentId>) -> Result<()> {
        component_log!(self, id, Level::Notice, "Cleanup");
        for child in self.node(id).children.clone() {
            self.cleanup_node(child, flipped)?;
        }
        self.with_component(id, |component, cx| component.on_cleanup(cx))?;
        self.node_mut(id).state.prepared = false;
        flipped.push(id);
        Ok(())
    }

    /// Runs the component's `step` hook.
    pub fn step(&mut self, id: ComponentId, trigger: Option<ComponentId>) -> Result<()> {
        self.with_component(id, |component, cx| component.step(cx, trigger))
    }

    // ---------------------------------------------------------------------
    // Behaviour access
    // ---------------------------------------------------------------------

    /// Lends the component's behaviour to `f` together with a context for it.
    ///
    /// # Errors
    ///
    /// * [`Error::UnknownComponent`] if `id` is foreign.
    /// * [`Error::Busy`] if the behaviour is already lent out (re-entrant
    ///   access from one of the component's own hooks).
    /// * Otherwise whatever `f` returns.
    pub fn with_component<R>(
        &mut self,
        id: ComponentId,
        f: impl FnOnce(&mut dyn Component, &mut Context<'_>) -> Result<R>,
    ) -> Result<R> {
        let Some(mut behavior) = self.try_node_mut(id)?.behavior.take() else {
            return Err(self.busy(id));
        };
        let result = f(&mut *behavior, &mut Context::new(self, id));
        self.node_mut(id).behavior = Some(behavior);
        result
    }

    /// Returns the component's behaviour.
    pub fn component(&self, id: ComponentId) -> Result<&dyn Component> {
        self.try_node(id)?.behavior.as_deref().ok_or_else(|| self.busy(id))
    }

    /// Returns the component's behaviour mutably.
    pub fn component_mut(&mut self, id: ComponentId) -> Result<&mut dyn Component> {
        let node = self.try_node_mut(id)?;
        let name = &node.name;
        node.behavior
            .as_deref_mut()
            .ok_or_else(|| Error::Busy { component: name.clone() })
    }

    /// Downcasts the component's behaviour to `T`.
    pub fn get<T: Component>(&self, id: ComponentId) -> Option<&T> {
        self.nodes.get(id.index())?.behavior.as_deref()?.as_any().downcast_ref::<T>()
    }

    /// Downcasts the component's behaviour to `T` mutably.
    pub fn get_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.nodes
            .get_mut(id.index())?
            .behavior
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Downcasts the component's behaviour to `T`, reporting why it failed.
    ///
    /// # Errors
    ///
    /// * [`Error::Busy`] if the behaviour is lent out.
    /// * [`Error::Unsupported`] naming `capability` if it is not a `T`.
    pub fn require<T: Component>(&self, id: ComponentId, capability: &'static str) -> Result<&T> {
        self.component(id)?
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| self.unsupported(id, capability))
    }

    /// Mutable counterpart of [`require`](Self::require).
    pub fn require_mut<T: Component>(&mut self, id: ComponentId, capability: &'static str) -> Result<&mut T> {
        let node = self.try_node_mut(id)?;
        let name = &node.name;
        match node.behavior.as_deref_mut() {
            None => Err(Error::Busy { component: name.clone() }),
            Some(component) => component
                .as_any_mut()
                .downcast_mut::<T>()
                .ok_or_else(|| Error::Unsupported {
                    component: name.clone(),
                    capability,
                }),
        }
    }

    // ---------------------------------------------------------------------
    // Memory access
    // ---------------------------------------------------------------------

    /// Returns the address range a memory component answers for.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] if the component is not memory.
    pub fn memory_range(&self, id: ComponentId) -> Result<AddressRange> {
        self.component(id)?
            .as_memory()
            .ok_or_else(|| self.unsupported(id, "memory"))?
            .current_range(self)
    }

    /// Reads one cell of a memory component.
    pub fn read_cell(&mut self, id: ComponentId, address: Address) -> Result<u8> {
        self.with_component(id, |component, cx| {
            let memory = component.as_memory_mut().ok_or_else(|| cx.unsupported("memory"))?;
            memory.get_cell(cx, address)
        })
    }

    /// Writes one cell of a memory component.
    pub fn write_cell(&mut self, id: ComponentId, address: Address, value: u8) -> Result<()> {
        self.with_component(id, |component, cx| {
            let memory = component.as_memory_mut().ok_or_else(|| cx.unsupported("memory"))?;
            memory.set_cell(cx, address, value)
        })
    }

    /// Streams the whole content of a memory component to `out`.
    pub fn serialize_memory(&mut self, id: ComponentId, out: &mut dyn Write) -> Result<()> {
        self.with_component(id, |component, cx| {
            let memory = component.as_memory_mut().ok_or_else(|| cx.unsupported("memory"))?;
            memory.serialize(cx, out)
        })
    }

    /// Refills a memory component from `input`.
    pub fn deserialize_memory(&mut self, id: ComponentId, input: &mut dyn Read) -> Result<()> {
        self.with_component(id, |component, cx| {
            let memory = component.as_memory_mut().ok_or_else(|| cx.unsupported("memory"))?;
            memory.deserialize(cx, input)
        })
    }
}
