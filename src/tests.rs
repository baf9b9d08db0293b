//! Engine-level tests with scripted contents and a recording backend.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use insta::assert_snapshot;
use proptest::prelude::*;
use proptest_derive::Arbitrary;

use crate::clock::Clock;
use crate::content::{ContentChange, ContentEvents, DockContent};
use crate::geometry::{Point, Rect};
use crate::manager::{ActiveChangeCause, DockEvent, DockManager};
use crate::options::{Options, PopoutKind, TabOrder, WheelSwitching};
use crate::popout::{DockBackend, WindowKey, WindowState};
use crate::tree::RelativeDir;

#[derive(Debug)]
struct TestContentInner {
    id: String,
    title: RefCell<String>,
    can_popout: Cell<bool>,
    events: ContentEvents,
}

#[derive(Debug, Clone)]
struct TestContent(Rc<TestContentInner>);

impl TestContent {
    fn new(id: &str) -> Self {
        Self(Rc::new(TestContentInner {
            id: id.to_owned(),
            title: RefCell::new(id.to_owned()),
            can_popout: Cell::new(true),
            events: ContentEvents::new(),
        }))
    }

    fn set_title(&self, title: &str) {
        *self.0.title.borrow_mut() = title.to_owned();
        self.0.events.emit(ContentChange::Title);
    }

    fn set_can_popout(&self, value: bool) {
        self.0.can_popout.set(value);
    }
}

impl DockContent for TestContent {
    type Id = String;

    fn id(&self) -> &String {
        &self.0.id
    }

    fn title(&self) -> String {
        self.0.title.borrow().clone()
    }

    fn can_popout(&self) -> bool {
        self.0.can_popout.get()
    }

    fn events(&self) -> Option<&ContentEvents> {
        Some(&self.0.events)
    }
}

/// Backend that hands out numbered windows and records every call.
#[derive(Debug, Default)]
struct TestBackend {
    next_window: u32,
    created: Vec<(u32, PopoutKind)>,
    shown: Vec<u32>,
    hidden: Vec<u32>,
    destroyed: Vec<u32>,
}

impl DockBackend<TestContent> for TestBackend {
    type Window = u32;
    type FocusOwner = String;

    fn create_window(&mut self, kind: PopoutKind) -> u32 {
        self.next_window += 1;
        self.created.push((self.next_window, kind));
        self.next_window
    }

    fn show_window(&mut self, window: &u32, _bounds: Option<Rect>, _state: WindowState) {
        self.shown.push(*window);
    }

    fn hide_window(&mut self, window: &u32) {
        self.hidden.push(*window);
    }

    fn destroy_window(&mut self, window: u32) {
        self.destroyed.push(window);
    }

    fn resolve_focus(&self, owner: &String) -> Option<String> {
        Some(owner.clone())
    }
}

type Manager = DockManager<TestContent, TestBackend>;

// With the default options and an 800x600 main window, a full tab strip is
// (0,0)-(800,28) and every tab is 160 wide (capped by tab_max_extent).

fn main_rect() -> Rect {
    Rect::new(0.0, 0.0, 800.0, 600.0)
}

fn make_manager_with(options: Options) -> (Manager, Clock) {
    let clock = Clock::with_time(Duration::ZERO);
    let manager = DockManager::new(TestBackend::default(), main_rect(), options, clock.clone());
    (manager, clock)
}

fn make_manager() -> (Manager, Clock) {
    make_manager_with(Options::default())
}

fn main_ids(manager: &Manager) -> Vec<String> {
    manager
        .main_tree()
        .contents()
        .iter()
        .map(|c| c.id().clone())
        .collect()
}

/// Center of tab `idx` on a full-width top strip.
fn tab_center(idx: usize) -> Point {
    Point::new(160.0 * idx as f64 + 80.0, 14.0)
}

/// Presses a tab in the main window and drags it to `to`, promoting the
/// press into a live drag on the way.
fn drag_from_main(
    manager: &mut Manager,
    clock: &Clock,
    press: Point,
    over: Option<WindowKey>,
    to: Point,
) {
    manager.pointer_pressed(WindowKey::Main, press);
    clock.advance(Duration::from_millis(200));
    manager.pointer_moved(Some(WindowKey::Main), Point::new(press.x + 10.0, press.y));
    manager.pointer_moved(over, to);
    manager.pointer_released();
}

// ============================================================================
// Tabs and activation
// ============================================================================

#[test]
fn first_content_becomes_active_and_hides_the_strip() {
    let (mut manager, _clock) = make_manager();
    manager.add_content(TestContent::new("a"));

    assert_eq!(manager.active_content().unwrap().id(), "a");
    assert!(manager.is_content_visible(&"a".to_owned()));
    // Single mode: one content directly under the window root has no strip.
    assert!(manager.main_tree().tab_at(tab_center(0)).is_none());

    let events = manager.take_events();
    assert!(events.contains(&DockEvent::ContentAdded {
        id: "a".to_owned(),
        window: WindowKey::Main,
    }));
    assert!(events.contains(&DockEvent::ActiveChanged {
        id: Some("a".to_owned()),
        cause: ActiveChangeCause::Explicit,
    }));
}

#[test]
fn second_content_joins_the_active_group() {
    let (mut manager, _clock) = make_manager();
    manager.add_content(TestContent::new("a"));
    manager.add_content(TestContent::new("b"));

    assert_eq!(main_ids(&manager), ["a", "b"]);
    // The strip appears and the first tab is hittable now.
    assert!(manager.main_tree().tab_at(tab_center(0)).is_some());
    // Adding does not steal activation.
    assert_eq!(manager.active_content().unwrap().id(), "a");
    assert!(!manager.is_content_visible(&"b".to_owned()));
}

#[test]
fn activation_switches_the_visible_tab() {
    let (mut manager, _clock) = make_manager();
    manager.add_content(TestContent::new("a"));
    manager.add_content(TestContent::new("b"));
    manager.take_events();

    manager.set_active_content(&"b".to_owned());

    assert!(manager.is_content_visible(&"b".to_owned()));
    assert!(!manager.is_content_visible(&"a".to_owned()));
    let events = manager.take_events();
    assert_eq!(
        events,
        [DockEvent::ActiveChanged {
            id: Some("b".to_owned()),
            cause: ActiveChangeCause::Explicit,
        }],
    );
}

#[test]
fn focus_change_reports_its_cause() {
    let (mut manager, _clock) = make_manager();
    manager.add_content(TestContent::new("a"));
    manager.add_content(TestContent::new("b"));
    manager.take_events();

    manager.focus_owner_changed(&"b".to_owned());

    assert_eq!(manager.active_content().unwrap().id(), "b");
    let events = manager.take_events();
    assert!(events.contains(&DockEvent::ActiveChanged {
        id: Some("b".to_owned()),
        cause: ActiveChangeCause::Focus,
    }));
}

#[test]
fn removing_down_to_one_tab_restores_single_mode() {
    let (mut manager, _clock) = make_manager();
    manager.add_content(TestContent::new("a"));
    manager.add_content(TestContent::new("b"));

    let removed = manager.remove_content(&"b".to_owned()).unwrap();
    assert_eq!(removed.id(), "b");

    assert_eq!(main_ids(&manager), ["a"]);
    assert!(manager.main_tree().tab_at(tab_center(0)).is_none());
}

#[test]
fn alphabetical_order_places_new_tabs_by_title() {
    let (mut manager, _clock) = make_manager_with(Options {
        tab_order: TabOrder::Alphabetical,
        ..Options::default()
    });
    manager.add_content(TestContent::new("b"));
    manager.add_content(TestContent::new("a"));
    manager.add_content(TestContent::new("c"));

    assert_eq!(main_ids(&manager), ["a", "b", "c"]);
}

#[test]
fn relative_contents_split_the_group_around_a_tab() {
    let (mut manager, _clock) = make_manager();
    for id in ["a", "b", "c"] {
        manager.add_content(TestContent::new(id));
    }

    let id = "b".to_owned();
    let left: Vec<_> = manager
        .contents_relative_to(&id, RelativeDir::Left)
        .iter()
        .map(|c| c.id().clone())
        .collect();
    let right: Vec<_> = manager
        .contents_relative_to(&id, RelativeDir::Right)
        .iter()
        .map(|c| c.id().clone())
        .collect();
    let both: Vec<_> = manager
        .contents_relative_to(&id, RelativeDir::Both)
        .iter()
        .map(|c| c.id().clone())
        .collect();
    assert_eq!(left, ["a"]);
    assert_eq!(right, ["c"]);
    assert_eq!(both, ["a", "c"]);
}

#[test]
fn wheel_switching_wraps_around_the_group() {
    let (mut manager, _clock) = make_manager_with(Options {
        wheel_switching: WheelSwitching::Anywhere,
        ..Options::default()
    });
    for id in ["a", "b", "c"] {
        manager.add_content(TestContent::new(id));
    }
    let center = Point::new(400.0, 300.0);

    manager.wheel_scrolled(&WindowKey::Main, center, 1.0);
    assert_eq!(manager.active_content().unwrap().id(), "b");
    manager.wheel_scrolled(&WindowKey::Main, center, 1.0);
    assert_eq!(manager.active_content().unwrap().id(), "c");
    // Forward from the last tab wraps to the first.
    manager.wheel_scrolled(&WindowKey::Main, center, 1.0);
    assert_eq!(manager.active_content().unwrap().id(), "a");
    // And backward from the first wraps to the last.
    manager.wheel_scrolled(&WindowKey::Main, center, -1.0);
    assert_eq!(manager.active_content().unwrap().id(), "c");
}

#[test]
fn wheel_switching_off_is_inert() {
    let (mut manager, _clock) = make_manager();
    manager.add_content(TestContent::new("a"));
    manager.add_content(TestContent::new("b"));

    manager.wheel_scrolled(&WindowKey::Main, Point::new(400.0, 300.0), 1.0);
    assert_eq!(manager.active_content().unwrap().id(), "a");
}

#[test]
fn content_changes_surface_as_events() {
    let (mut manager, _clock) = make_manager();
    let a = TestContent::new("a");
    manager.add_content(a.clone());
    manager.take_events();

    a.set_title("alpha");

    let events = manager.take_events();
    assert_eq!(
        events,
        [DockEvent::ContentChanged {
            id: "a".to_owned(),
            change: ContentChange::Title,
        }],
    );
    assert_eq!(manager.get_content(&"a".to_owned()).unwrap().title(), "alpha");
}

// ============================================================================
// Drag and drop
// ============================================================================

#[test]
fn edge_drop_splits_and_removal_collapses_the_split() {
    let (mut manager, clock) = make_manager();
    manager.add_content(TestContent::new("a"));
    manager.add_content(TestContent::new("b"));

    // Drag b onto the left edge zone of the content area.
    drag_from_main(
        &mut manager,
        &clock,
        tab_center(1),
        Some(WindowKey::Main),
        Point::new(50.0, 300.0),
    );
    manager.verify_invariants();
    assert_snapshot!(manager.debug_layout(), @r"
    main:
    split h 0.50
      tabs [b*]
      tabs [a*]
    ");
    assert_eq!(manager.active_content().unwrap().id(), "b");

    // Removing the split-off tab collapses the split back to a bare group.
    manager.remove_content(&"b".to_owned());
    manager.verify_invariants();
    assert_snapshot!(manager.debug_layout(), @r"
    main:
    tabs [a*]
    ");
}

#[test]
fn dragging_a_tab_reorders_within_its_group() {
    let (mut manager, clock) = make_manager();
    for id in ["a", "b", "c"] {
        manager.add_content(TestContent::new(id));
    }

    // Drop a past the middle of c's tab: insertion boundary 2.
    drag_from_main(
        &mut manager,
        &clock,
        tab_center(0),
        Some(WindowKey::Main),
        Point::new(330.0, 14.0),
    );

    assert_eq!(main_ids(&manager), ["b", "a", "c"]);
    assert_eq!(manager.active_content().unwrap().id(), "a");
    manager.verify_invariants();
}

#[test]
fn dropping_a_tab_on_its_own_slot_does_nothing() {
    let (mut manager, clock) = make_manager();
    manager.add_content(TestContent::new("a"));
    manager.add_content(TestContent::new("b"));

    manager.pointer_pressed(WindowKey::Main, tab_center(0));
    clock.advance(Duration::from_millis(200));
    // Past the promotion threshold but still within a's own slot.
    let feedback = manager.pointer_moved(Some(WindowKey::Main), Point::new(90.0, 14.0));
    assert!(feedback.is_none(), "own-slot drops must not highlight");
    manager.pointer_released();

    assert_eq!(main_ids(&manager), ["a", "b"]);
    manager.verify_invariants();
}

#[test]
fn dragging_the_only_tab_of_a_group_over_itself_is_invalid() {
    let (mut manager, clock) = make_manager();
    manager.add_content(TestContent::new("a"));
    manager.add_content(TestContent::new("b"));
    // Split b off so it sits alone in its group.
    drag_from_main(
        &mut manager,
        &clock,
        tab_center(1),
        Some(WindowKey::Main),
        Point::new(750.0, 300.0),
    );
    let before = manager.debug_layout();

    // Drag b around entirely within its own group: nothing may accept it.
    manager.pointer_pressed(WindowKey::Main, Point::new(420.0, 14.0));
    clock.advance(Duration::from_millis(200));
    let feedback = manager.pointer_moved(Some(WindowKey::Main), Point::new(600.0, 300.0));
    assert!(feedback.is_none());
    manager.pointer_released();

    assert_eq!(manager.debug_layout(), before);
    manager.verify_invariants();
}

#[test]
fn releasing_outside_all_windows_tears_off_a_popout() {
    let (mut manager, clock) = make_manager();
    manager.add_content(TestContent::new("a"));
    manager.add_content(TestContent::new("b"));
    manager.take_events();

    drag_from_main(
        &mut manager,
        &clock,
        tab_center(1),
        None,
        Point::new(900.0, 300.0),
    );

    assert_eq!(main_ids(&manager), ["a"]);
    let popout = manager.popouts().next().expect("a popout opened");
    assert_eq!(popout.id.as_str(), "popout-1");
    assert_eq!(
        popout
            .tree
            .contents()
            .iter()
            .map(|c| c.id().clone())
            .collect::<Vec<_>>(),
        ["b"],
    );
    assert_eq!(manager.backend().created, [(1, PopoutKind::Frame)]);
    assert!(manager
        .take_events()
        .iter()
        .any(|e| matches!(e, DockEvent::PopoutOpened { .. })));
    manager.verify_invariants();
}

// ============================================================================
// Popout windows
// ============================================================================

#[test]
fn closed_popout_windows_are_pooled_and_reused() {
    let (mut manager, _clock) = make_manager();
    manager.add_content(TestContent::new("a"));
    manager.add_content(TestContent::new("b"));

    let pid = manager.popout(&"b".to_owned(), None).unwrap();
    assert_eq!(main_ids(&manager), ["a"]);

    manager.close_popout(&pid);
    assert_eq!(main_ids(&manager), ["a", "b"]);
    // The window was hidden and pooled, not destroyed.
    assert_eq!(manager.backend().hidden, [1]);
    assert!(manager.backend().destroyed.is_empty());

    // The next popout of the same kind reuses the pooled window.
    manager.popout(&"b".to_owned(), None).unwrap();
    assert_eq!(manager.backend().created.len(), 1);
    assert_eq!(manager.backend().shown, [1, 1]);
    manager.verify_invariants();
}

#[test]
fn closing_a_popout_returns_contents_next_to_the_active_tab() {
    let (mut manager, _clock) = make_manager();
    for id in ["a", "b", "c"] {
        manager.add_content(TestContent::new(id));
    }
    manager.set_active_content(&"c".to_owned());

    let pid = manager.popout(&"c".to_owned(), None).unwrap();
    manager.take_events();
    manager.close_popout(&pid);

    assert_eq!(main_ids(&manager), ["a", "b", "c"]);
    // c was the globally active content, so it stays selected after coming
    // back.
    assert_eq!(manager.active_content().unwrap().id(), "c");
    assert!(manager.is_content_visible(&"c".to_owned()));
    assert!(manager
        .take_events()
        .iter()
        .any(|e| matches!(e, DockEvent::PopoutClosing { .. })));
    manager.verify_invariants();
}

#[test]
fn contents_that_refuse_cannot_pop_out() {
    let (mut manager, _clock) = make_manager();
    let a = TestContent::new("a");
    a.set_can_popout(false);
    manager.add_content(a);

    assert!(manager.popout(&"a".to_owned(), None).is_none());
    assert_eq!(manager.window_of(&"a".to_owned()), Some(WindowKey::Main));
    assert!(manager.backend().created.is_empty());
}

#[test]
fn removing_the_last_popout_content_closes_the_window() {
    let (mut manager, _clock) = make_manager();
    manager.add_content(TestContent::new("a"));
    manager.add_content(TestContent::new("b"));
    let pid = manager.popout(&"b".to_owned(), None).unwrap();
    manager.take_events();

    manager.remove_content(&"b".to_owned());

    assert_eq!(manager.popouts().count(), 0);
    assert!(manager
        .take_events()
        .iter()
        .any(|e| *e == DockEvent::PopoutClosing { id: pid.clone() }));
    manager.verify_invariants();
}

#[test]
fn keep_empty_leaves_emptied_groups_and_popouts_in_place() {
    let (mut manager, _clock) = make_manager_with(Options {
        keep_empty: true,
        ..Options::default()
    });
    manager.add_content(TestContent::new("a"));
    manager.add_content(TestContent::new("b"));
    manager.popout(&"b".to_owned(), None).unwrap();

    manager.remove_content(&"b".to_owned());

    let popout = manager.popouts().next().expect("popout kept");
    assert!(popout.tree.contents().is_empty());
    manager.verify_invariants();
}

// ============================================================================
// Paths and persistence
// ============================================================================

#[test]
fn recorded_paths_replay_after_removal() {
    let (mut manager, clock) = make_manager();
    manager.add_content(TestContent::new("a"));
    manager.add_content(TestContent::new("b"));
    // Split b off to the right.
    drag_from_main(
        &mut manager,
        &clock,
        tab_center(1),
        Some(WindowKey::Main),
        Point::new(750.0, 300.0),
    );

    let path = manager.path_of(&"b".to_owned()).unwrap();
    assert_eq!(path.to_string(), "split:h2/tab:0");

    manager.remove_content(&"b".to_owned());
    assert!(manager.path_of(&"b".to_owned()).is_none());

    manager.set_target_path("b".to_owned(), path.clone());
    manager.add_content(TestContent::new("b"));

    assert_eq!(manager.path_of(&"b".to_owned()), Some(path));
    manager.verify_invariants();
}

#[test]
fn save_and_restore_preserve_structure() {
    let (mut manager, clock) = make_manager();
    for id in ["a", "b", "c"] {
        manager.add_content(TestContent::new(id));
    }
    drag_from_main(
        &mut manager,
        &clock,
        tab_center(2),
        Some(WindowKey::Main),
        Point::new(400.0, 580.0),
    );
    let pid = manager.popout(&"b".to_owned(), None).unwrap();
    manager.popout_bounds_changed(&pid, Rect::new(100.0, 100.0, 400.0, 300.0));

    let json = manager.save_json().unwrap();

    let (mut restored, _clock) = make_manager();
    let issues = restored
        .restore_json(&json, |id| Some(TestContent::new(id)))
        .unwrap();
    assert!(issues.is_empty(), "{issues:?}");

    assert_eq!(restored.debug_layout(), manager.debug_layout());
    let popout = restored.popouts().next().unwrap();
    assert_eq!(popout.id, pid);
    assert_eq!(popout.bounds, Some(Rect::new(100.0, 100.0, 400.0, 300.0)));
    restored.verify_invariants();
}

#[test]
fn restore_closes_popouts_the_layout_does_not_have() {
    let (mut manager, _clock) = make_manager();
    manager.add_content(TestContent::new("a"));
    manager.add_content(TestContent::new("b"));
    manager.popout(&"a".to_owned(), None).unwrap();

    // A layout with everything docked in the main window.
    let (mut donor, _clock) = make_manager();
    donor.add_content(TestContent::new("a"));
    donor.add_content(TestContent::new("b"));
    let layout = donor.save_layout();

    manager.take_events();
    manager.restore_layout(layout, |id| Some(TestContent::new(id)));

    assert_eq!(manager.popouts().count(), 0);
    assert_eq!(manager.window_of(&"a".to_owned()), Some(WindowKey::Main));
    assert_eq!(main_ids(&manager), ["a", "b"]);
    // The stale popout's window went back to the pool, not destroyed.
    assert_eq!(manager.backend().hidden, [1]);
    assert!(manager.backend().destroyed.is_empty());
    assert!(manager
        .take_events()
        .iter()
        .any(|e| matches!(e, DockEvent::PopoutClosing { .. })));
    manager.verify_invariants();
}

#[test]
fn restore_does_not_stack_content_subscriptions() {
    let (mut manager, _clock) = make_manager();
    let a = TestContent::new("a");
    manager.add_content(a.clone());
    let layout = manager.save_layout();

    // The resolver hands back the same live content handle.
    let handle = a.clone();
    manager.restore_layout(layout, move |_| Some(handle.clone()));
    manager.take_events();

    a.set_title("alpha");

    let events = manager.take_events();
    assert_eq!(
        events,
        [DockEvent::ContentChanged {
            id: "a".to_owned(),
            change: ContentChange::Title,
        }],
    );
}

#[test]
fn late_contents_land_in_their_saved_slot() {
    let (mut manager, _clock) = make_manager();
    manager.add_content(TestContent::new("a"));
    manager.add_content(TestContent::new("b"));
    let pid = manager.popout(&"b".to_owned(), None).unwrap();
    manager.popout_bounds_changed(&pid, Rect::new(50.0, 60.0, 640.0, 480.0));
    let layout = manager.save_layout();

    // Only a resolves up front; the popout must not open for nobody.
    let (mut restored, _clock) = make_manager();
    restored.restore_layout(layout, |id| (id == "a").then(|| TestContent::new("a")));
    assert_eq!(restored.popouts().count(), 0);
    assert_eq!(main_ids(&restored), ["a"]);

    // The straggler still lands in its saved popout, with saved geometry.
    restored.add_content(TestContent::new("b"));
    let popout = restored.popouts().next().expect("popout revived");
    assert_eq!(popout.id, pid);
    assert_eq!(popout.bounds, Some(Rect::new(50.0, 60.0, 640.0, 480.0)));
    assert_eq!(
        restored.window_of(&"b".to_owned()),
        Some(WindowKey::Popout(pid)),
    );
    restored.verify_invariants();
}

// ============================================================================
// Random operations
// ============================================================================

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Add(#[proptest(strategy = "0..8u8")] u8),
    Remove(#[proptest(strategy = "0..8u8")] u8),
    Activate(#[proptest(strategy = "0..8u8")] u8),
    Popout(#[proptest(strategy = "0..8u8")] u8),
    CloseAllPopouts,
    Press {
        #[proptest(strategy = "0..800u16")]
        x: u16,
        #[proptest(strategy = "0..600u16")]
        y: u16,
    },
    DragTo {
        #[proptest(strategy = "0..800u16")]
        x: u16,
        #[proptest(strategy = "0..600u16")]
        y: u16,
        outside: bool,
    },
    Release,
    Wheel {
        #[proptest(strategy = "0..800u16")]
        x: u16,
        #[proptest(strategy = "0..600u16")]
        y: u16,
        up: bool,
    },
    Resize {
        #[proptest(strategy = "200..1600u16")]
        w: u16,
        #[proptest(strategy = "200..1200u16")]
        h: u16,
    },
}

impl Op {
    fn apply(self, manager: &mut Manager, clock: &Clock) {
        clock.advance(Duration::from_millis(200));
        match self {
            Op::Add(n) => {
                let id = format!("c{n}");
                if manager.get_content(&id).is_none() {
                    manager.add_content(TestContent::new(&id));
                }
            }
            Op::Remove(n) => {
                manager.remove_content(&format!("c{n}"));
            }
            Op::Activate(n) => {
                let id = format!("c{n}");
                if manager.get_content(&id).is_some() {
                    manager.set_active_content(&id);
                }
            }
            Op::Popout(n) => {
                manager.popout(&format!("c{n}"), None);
            }
            Op::CloseAllPopouts => {
                let ids: Vec<_> = manager.popouts().map(|p| p.id.clone()).collect();
                for id in ids {
                    manager.close_popout(&id);
                }
            }
            Op::Press { x, y } => {
                manager.pointer_pressed(WindowKey::Main, Point::new(x.into(), y.into()));
            }
            Op::DragTo { x, y, outside } => {
                let over = (!outside).then_some(WindowKey::Main);
                manager.pointer_moved(over, Point::new(x.into(), y.into()));
            }
            Op::Release => manager.pointer_released(),
            Op::Wheel { x, y, up } => {
                let delta = if up { -1.0 } else { 1.0 };
                manager.wheel_scrolled(&WindowKey::Main, Point::new(x.into(), y.into()), delta);
            }
            Op::Resize { w, h } => {
                manager.window_resized(Rect::new(0.0, 0.0, w.into(), h.into()));
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    #[test]
    fn random_ops_keep_invariants(ops in prop::collection::vec(any::<Op>(), 1..80)) {
        let (mut manager, clock) = make_manager();
        for op in ops {
            op.apply(&mut manager, &clock);
            manager.verify_invariants();
        }
        manager.take_events();
    }

    #[test]
    fn random_ops_survive_a_save_restore_cycle(ops in prop::collection::vec(any::<Op>(), 1..40)) {
        let (mut manager, clock) = make_manager();
        for op in ops {
            op.apply(&mut manager, &clock);
        }

        let json = manager.save_json().unwrap();
        let (mut restored, _clock) = make_manager();
        let issues = restored.restore_json(&json, |id| Some(TestContent::new(id))).unwrap();
        prop_assert!(issues.is_empty(), "{issues:?}");
        restored.verify_invariants();
        prop_assert_eq!(restored.debug_layout(), manager.debug_layout());
    }
}
