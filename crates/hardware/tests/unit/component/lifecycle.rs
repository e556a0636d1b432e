//! # Lifecycle Tests
//!
//! Verifies the prepare → boot → shutdown → cleanup state machine: legal
//! order, rejection of every other transition without partial mutation, the
//! bracketing order of hooks, and re-entrant access from inside a hook.

use hwsim_core::component::{Component, ComponentId, ComponentTree, Context, Lifecycle, State};
use hwsim_core::{Error, Result};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::harness::TestTree;
use crate::common::mocks::component::Recorder;
use crate::common::mocks::{entries, journal};

#[derive(Clone, Copy, Debug)]
enum Call {
    Prepare,
    Boot,
    Shutdown,
    Cleanup,
}

fn call(tree: &mut ComponentTree, id: ComponentId, call: Call) -> Result<()> {
    match call {
        Call::Prepare => tree.prepare(id),
        Call::Boot => tree.boot(id),
        Call::Shutdown => tree.shutdown(id),
        Call::Cleanup => tree.cleanup(id),
    }
}

/// Drives a fresh component through `setup`, all of which must succeed.
fn component_after(setup: &[Call]) -> (ComponentTree, ComponentId) {
    let mut tree = ComponentTree::new();
    let id = tree.create_group("dut");
    for &step in setup {
        call(&mut tree, id, step).unwrap();
    }
    (tree, id)
}

// ══════════════════════════════════════════════════════════
// 1. Legal sequence
// ══════════════════════════════════════════════════════════

#[test]
fn test_full_lifecycle_in_order() {
    let (mut tree, id) = component_after(&[]);
    assert_eq!(tree.state(id).lifecycle(), Lifecycle::Idle);

    tree.prepare(id).unwrap();
    assert_eq!(tree.state(id), State::PREPARED);
    tree.boot(id).unwrap();
    assert_eq!(tree.state(id), State::RUNNING);
    tree.shutdown(id).unwrap();
    assert_eq!(tree.state(id), State::PREPARED);
    tree.cleanup(id).unwrap();
    assert_eq!(tree.state(id), State::IDLE);
}

#[test]
fn test_reboot_after_shutdown() {
    let (mut tree, id) = component_after(&[Call::Prepare, Call::Boot, Call::Shutdown]);
    tree.boot(id).unwrap();
    assert!(tree.is_running(id));
}

#[test]
fn test_lifecycle_repeats_after_cleanup() {
    let (mut tree, id) = component_after(&[Call::Prepare, Call::Boot, Call::Shutdown, Call::Cleanup]);
    tree.prepare(id).unwrap();
    assert!(tree.is_prepared(id));
}

// ══════════════════════════════════════════════════════════
// 2. Illegal transitions
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::boot_idle(&[], Call::Boot)]
#[case::shutdown_idle(&[], Call::Shutdown)]
#[case::cleanup_idle(&[], Call::Cleanup)]
#[case::prepare_twice(&[Call::Prepare], Call::Prepare)]
#[case::shutdown_prepared(&[Call::Prepare], Call::Shutdown)]
#[case::prepare_running(&[Call::Prepare, Call::Boot], Call::Prepare)]
#[case::boot_twice(&[Call::Prepare, Call::Boot], Call::Boot)]
#[case::cleanup_running(&[Call::Prepare, Call::Boot], Call::Cleanup)]
#[case::shutdown_twice(&[Call::Prepare, Call::Boot, Call::Shutdown], Call::Shutdown)]
#[case::cleanup_twice(&[Call::Prepare, Call::Cleanup], Call::Cleanup)]
fn test_illegal_transition_is_rejected(#[case] setup: &[Call], #[case] attempt: Call) {
    let (mut tree, id) = component_after(setup);
    let before = tree.state(id);

    let err = call(&mut tree, id, attempt).unwrap_err();

    assert!(matches!(err, Error::WrongState { actual, .. } if actual == before));
    assert_eq!(tree.state(id), before);
}

#[test]
fn test_subtree_is_validated_before_any_change() {
    let mut t = TestTree::new();
    let a = t.group("a");
    let b = t.group("b");
    t.tree.prepare(b).unwrap();

    let err = t.tree.prepare(t.root).unwrap_err();

    assert!(matches!(err, Error::WrongState { ref component, .. } if component == "b"));
    assert_eq!(t.tree.state(t.root), State::IDLE);
    assert_eq!(t.tree.state(a), State::IDLE);
    assert_eq!(t.tree.state(b), State::PREPARED);
}

#[test]
fn test_transitions_cover_the_whole_subtree() {
    let mut t = TestTree::new();
    let a = t.group("a");
    let leaf = t.tree.create_group("leaf");
    t.tree.add_component(a, leaf).unwrap();

    t.tree.prepare(t.root).unwrap();
    t.tree.boot(t.root).unwrap();
    assert!(t.tree.is_running(leaf));

    t.tree.shutdown(t.root).unwrap();
    t.tree.cleanup(t.root).unwrap();
    assert_eq!(t.tree.state(leaf), State::IDLE);
}

// ══════════════════════════════════════════════════════════
// 3. Hook order
// ══════════════════════════════════════════════════════════

fn recorded_tree() -> (ComponentTree, ComponentId, crate::common::mocks::Journal) {
    let log = journal();
    let mut tree = ComponentTree::new();
    let root = tree.create("root", Recorder::new("root", &log));
    let a = tree.create("a", Recorder::new("a", &log));
    let b = tree.create("b", Recorder::new("b", &log));
    tree.add_component(root, a).unwrap();
    tree.add_component(root, b).unwrap();
    (tree, root, log)
}

#[test]
fn test_prepare_and_boot_run_children_first() {
    let (mut tree, root, log) = recorded_tree();
    tree.prepare(root).unwrap();
    tree.boot(root).unwrap();
    assert_eq!(
        entries(&log),
        vec!["a:prepare", "b:prepare", "root:prepare", "a:boot", "b:boot", "root:boot"]
    );
}

#[test]
fn test_shutdown_runs_parent_first_and_cleanup_children_first() {
    let (mut tree, root, log) = recorded_tree();
    tree.prepare(root).unwrap();
    tree.boot(root).unwrap();
    log.lock().unwrap().clear();

    tree.shutdown(root).unwrap();
    tree.cleanup(root).unwrap();
    assert_eq!(
        entries(&log),
        vec!["root:shutdown", "a:shutdown", "b:shutdown", "a:cleanup", "b:cleanup", "root:cleanup"]
    );
}

#[test]
fn test_failing_hook_leaves_own_flag_untouched() {
    let log = journal();
    let mut tree = ComponentTree::new();
    let root = tree.create("root", Recorder::new("root", &log));
    let bad = tree.create("bad", Recorder::new("bad", &log).failing("boot"));
    tree.add_component(root, bad).unwrap();
    tree.prepare(root).unwrap();

    let err = tree.boot(root).unwrap_err();

    assert!(matches!(err, Error::Unsupported { ref component, .. } if component == "bad"));
    assert_eq!(tree.state(bad), State::PREPARED);
    assert_eq!(tree.state(root), State::PREPARED);
    assert!(!entries(&log).contains(&"root:boot".to_owned()));
}

#[rstest]
#[case::prepare("prepare", &[], Call::Prepare)]
#[case::boot("boot", &[Call::Prepare], Call::Boot)]
#[case::shutdown("shutdown", &[Call::Prepare, Call::Boot], Call::Shutdown)]
#[case::cleanup("cleanup", &[Call::Prepare], Call::Cleanup)]
fn test_failing_hook_restores_sibling_flags(
    #[case] hook: &'static str,
    #[case] setup: &[Call],
    #[case] attempt: Call,
) {
    let log = journal();
    let mut tree = ComponentTree::new();
    let root = tree.create("root", Recorder::new("root", &log));
    let a = tree.create("a", Recorder::new("a", &log));
    let bad = tree.create("bad", Recorder::new("bad", &log).failing(hook));
    tree.add_component(root, a).unwrap();
    tree.add_component(root, bad).unwrap();
    for &step in setup {
        call(&mut tree, root, step).unwrap();
    }
    let states = |tree: &ComponentTree| [root, a, bad].map(|id| tree.state(id));
    let before = states(&tree);

    let err = call(&mut tree, root, attempt).unwrap_err();

    assert!(matches!(err, Error::Unsupported { ref component, .. } if component == "bad"));
    assert_eq!(states(&tree), before);

    // The subtree is not stuck: a retry fails on the same hook, and the
    // healthy sibling still moves on its own.
    let again = call(&mut tree, root, attempt).unwrap_err();
    assert!(matches!(again, Error::Unsupported { ref component, .. } if component == "bad"));
    call(&mut tree, a, attempt).unwrap();
    assert_ne!(tree.state(a), before[1]);
}

/// Captures its own flags and its child's flags from inside each hook.
struct StateProbe {
    child: Option<ComponentId>,
    seen: Vec<(State, Option<State>)>,
}

impl StateProbe {
    fn capture(&mut self, cx: &Context<'_>) {
        let own = cx.tree_ref().state(cx.id());
        let child = self.child.map(|c| cx.tree_ref().state(c));
        self.seen.push((own, child));
    }
}

impl Component for StateProbe {
    fn on_prepare(&mut self, cx: &mut Context<'_>) -> Result<()> {
        self.capture(cx);
        Ok(())
    }

    fn on_shutdown(&mut self, cx: &mut Context<'_>) -> Result<()> {
        self.capture(cx);
        Ok(())
    }
}

#[test]
fn test_hooks_observe_flags_before_their_own_flip() {
    let mut tree = ComponentTree::new();
    let child = tree.create_group("child");
    let probe = tree.create(
        "probe",
        StateProbe {
            child: Some(child),
            seen: Vec::new(),
        },
    );
    tree.add_component(probe, child).unwrap();

    tree.prepare(probe).unwrap();
    tree.boot(probe).unwrap();
    tree.shutdown(probe).unwrap();

    let seen = &tree.get::<StateProbe>(probe).unwrap().seen;
    assert_eq!(seen[0], (State::IDLE, Some(State::PREPARED)));
    assert_eq!(seen[1], (State::RUNNING, Some(State::RUNNING)));
}

// ══════════════════════════════════════════════════════════
// 4. Re-entrancy
// ══════════════════════════════════════════════════════════

/// Tries to reach itself through the tree while its own hook runs.
#[derive(Default)]
struct SelfReacher {
    outcome: Option<String>,
}

impl Component for SelfReacher {
    fn on_boot(&mut self, cx: &mut Context<'_>) -> Result<()> {
        let me = cx.id();
        self.outcome = Some(match cx.tree().step(me, None) {
            Ok(()) => "stepped".to_owned(),
            Err(e) => e.to_string(),
        });
        Ok(())
    }
}

#[test]
fn test_reentrant_access_is_busy_not_a_panic() {
    let mut tree = ComponentTree::new();
    let id = tree.create("self", SelfReacher::default());
    tree.prepare(id).unwrap();
    tree.boot(id).unwrap();

    assert_eq!(
        tree.get::<SelfReacher>(id).unwrap().outcome.as_deref(),
        Some("self: component is busy")
    );
}
