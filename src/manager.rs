//! The docking manager: one per application.
//!
//! The manager owns the main window's tree, every popout window, the global
//! active content, and the drag session. Hosts feed it pointer and focus
//! events, and drain what happened through [`DockManager::take_events`]
//! after each call.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::warn;

use paneldock_persist::{BoundsSpec, DockLayout, NodeEntry, PopoutEntry, ORIENTATION_VERTICAL};

use crate::clock::Clock;
use crate::content::{ContentChange, DockContent, Subscription};
use crate::drag::{
    should_promote, DragData, DragFeedback, DragSource, DragState, DropProposal, DropTarget,
};
use crate::geometry::{Orientation, Point, Rect, SplitSide};
use crate::options::{Options, PopoutKind, WheelSwitching};
use crate::path::{DockPath, PathEntry};
use crate::popout::{DockBackend, Popout, PopoutId, PopoutRegistry, WindowKey, WindowState};
use crate::tree::{DockTree, Node, RelativeDir};

/// What triggered an active-content change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveChangeCause {
    /// A direct request: API call, tab press, wheel switch, drop.
    Explicit,
    /// The toolkit moved keyboard focus into a content.
    Focus,
}

/// Something the manager did, reported to the host.
///
/// Events accumulate in order and are drained with
/// [`DockManager::take_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum DockEvent<Id> {
    ContentAdded { id: Id, window: WindowKey },
    ContentRemoved { id: Id },
    /// A docked content announced a property change.
    ContentChanged { id: Id, change: ContentChange },
    ActiveChanged {
        id: Option<Id>,
        cause: ActiveChangeCause,
    },
    PopoutOpened { id: PopoutId },
    /// Emitted before the popout's window is hidden.
    PopoutClosing { id: PopoutId },
    /// The main window's tree became empty.
    MainEmptied,
    /// Geometry or structure changed somewhere; the host should repaint.
    LayoutChanged,
}

type PendingChanges<Id> = Rc<RefCell<Vec<(Id, ContentChange)>>>;

/// The docking engine's top-level object.
///
/// Single threaded; every method must be called from the host's UI event
/// thread. Persisted content ids are the `to_string` form of `C::Id`.
pub struct DockManager<C: DockContent, B: DockBackend<C>> {
    backend: B,
    options: Rc<Options>,
    clock: Clock,
    main: DockTree<C>,
    popouts: PopoutRegistry<C, B::Window>,
    /// The one globally active content.
    active: Option<C::Id>,
    /// Last active content per window, for reactivation when a window
    /// regains relevance.
    window_active: HashMap<WindowKey, C::Id>,
    /// Explicit placement requests for contents not yet added.
    target_paths: HashMap<C::Id, DockPath>,
    /// Layout kept from the last restore, consulted when later contents
    /// arrive.
    saved: Option<DockLayout>,
    drag: DragState<C::Id>,
    events: Vec<DockEvent<C::Id>>,
    subscriptions: HashMap<C::Id, Subscription>,
    pending_changes: PendingChanges<C::Id>,
}

impl<C, B> DockManager<C, B>
where
    C: DockContent,
    C::Id: ToString,
    B: DockBackend<C>,
{
    pub fn new(backend: B, main_bounds: Rect, options: Options, clock: Clock) -> Self {
        let options = Rc::new(options);
        Self {
            main: DockTree::new(main_bounds, options.clone()),
            backend,
            options,
            clock,
            popouts: PopoutRegistry::new(),
            active: None,
            window_active: HashMap::new(),
            target_paths: HashMap::new(),
            saved: None,
            drag: DragState::Idle,
            events: Vec::new(),
            subscriptions: HashMap::new(),
            pending_changes: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn main_tree(&self) -> &DockTree<C> {
        &self.main
    }

    pub fn popouts(&self) -> impl Iterator<Item = &Popout<C, B::Window>> {
        self.popouts.iter()
    }

    // ========================================================================
    // Adding and removing contents
    // ========================================================================

    /// Docks a content.
    ///
    /// Placement preference: an explicit target path, then the slot recorded
    /// in a restored layout, then next to the active content. The first
    /// content of the session becomes active.
    pub fn add_content(&mut self, content: C) {
        let id = content.id().clone();
        if self.window_of(&id).is_some() {
            warn!("content already docked, ignoring add");
            return;
        }
        self.subscribe(&content);

        let path = self
            .target_paths
            .remove(&id)
            .or_else(|| self.saved_path_of(&id));
        let window = match path {
            Some(path) => self.place_at_path(content, &path),
            None => self.place_next_to_active(content),
        };

        let first = self.active.is_none();
        self.push(DockEvent::ContentAdded {
            id: id.clone(),
            window,
        });
        if first {
            self.activate(&id, ActiveChangeCause::Explicit);
        }
        self.push(DockEvent::LayoutChanged);
    }

    /// Removes a content from wherever it is docked.
    pub fn remove_content(&mut self, id: &C::Id) -> Option<C> {
        let window = self.window_of(id)?;
        if let Some(sub) = self.subscriptions.remove(id) {
            if let Some(events) = self.get_content(id).and_then(|c| c.events()) {
                events.unsubscribe(sub);
            }
        }

        let removed = match &window {
            WindowKey::Main => self.main.remove_content(id),
            WindowKey::Popout(pid) => self
                .popouts
                .get_mut(pid)
                .and_then(|p| p.tree.remove_content(id)),
        };
        self.window_active.retain(|_, v| v != id);
        if self.active.as_ref() == Some(id) {
            self.active = None;
            self.push(DockEvent::ActiveChanged {
                id: None,
                cause: ActiveChangeCause::Explicit,
            });
        }
        self.handle_emptied(&window);
        self.push(DockEvent::ContentRemoved { id: id.clone() });
        self.push(DockEvent::LayoutChanged);
        removed
    }

    /// Records where a not-yet-docked content should land when added.
    pub fn set_target_path(&mut self, id: C::Id, path: DockPath) {
        self.target_paths.insert(id, path);
    }

    fn subscribe(&mut self, content: &C) {
        let Some(events) = content.events() else {
            return;
        };
        let pending = self.pending_changes.clone();
        let id = content.id().clone();
        let sub = events.subscribe(move |change| pending.borrow_mut().push((id.clone(), change)));
        self.subscriptions.insert(content.id().clone(), sub);
    }

    fn place_next_to_active(&mut self, content: C) -> WindowKey {
        if let Some(active) = self.active.clone() {
            if let Some(window) = self.window_of(&active) {
                let tree = match &window {
                    WindowKey::Main => Some(&mut self.main),
                    WindowKey::Popout(pid) => self.popouts.get_mut(pid).map(|p| &mut p.tree),
                };
                if let Some(tree) = tree {
                    match tree.insert_next_to(content, &active, false) {
                        Ok(()) => return window,
                        Err(returned) => {
                            self.main.add_content(returned, false);
                            return WindowKey::Main;
                        }
                    }
                }
            }
        }
        self.main.add_content(content, false);
        WindowKey::Main
    }

    fn place_at_path(&mut self, content: C, path: &DockPath) -> WindowKey {
        match path.popout_id() {
            None => {
                self.main
                    .insert_at_path(content, path.within_window(), false);
                WindowKey::Main
            }
            Some(pid) => {
                let pid = pid.clone();
                if self.popouts.get(&pid).is_none() {
                    // An addressed placement may revive a popout even when
                    // explicit popping out is disabled.
                    let kind = match self.options.popout_kind {
                        PopoutKind::None => PopoutKind::Frame,
                        kind => kind,
                    };
                    let (bounds, state) = self.saved_popout_geometry(&pid);
                    let options = self.options.clone();
                    self.popouts.open_popout(
                        &mut self.backend,
                        kind,
                        options,
                        Some(pid.clone()),
                        bounds,
                        state,
                    );
                    self.push(DockEvent::PopoutOpened { id: pid.clone() });
                }
                if let Some(popout) = self.popouts.get_mut(&pid) {
                    popout
                        .tree
                        .insert_at_path(content, path.within_window(), false);
                }
                WindowKey::Popout(pid)
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The window a content is docked in.
    pub fn window_of(&self, id: &C::Id) -> Option<WindowKey> {
        if self.main.contains(id) {
            return Some(WindowKey::Main);
        }
        self.popouts
            .iter()
            .find(|p| p.tree.contains(id))
            .map(|p| WindowKey::Popout(p.id.clone()))
    }

    pub fn get_content(&self, id: &C::Id) -> Option<&C> {
        self.main
            .get_content(id)
            .or_else(|| self.popouts.iter().find_map(|p| p.tree.get_content(id)))
    }

    /// Every docked content: the main window's first, then each popout's.
    pub fn contents(&self) -> Vec<&C> {
        let mut out = self.main.contents();
        for popout in self.popouts.iter() {
            out.extend(popout.tree.contents());
        }
        out
    }

    pub fn active_content(&self) -> Option<&C> {
        self.get_content(self.active.as_ref()?)
    }

    pub fn is_content_visible(&self, id: &C::Id) -> bool {
        self.main.is_content_visible(id)
            || self.popouts.iter().any(|p| p.tree.is_content_visible(id))
    }

    /// Tabs of the same group relative to a content.
    pub fn contents_relative_to(&self, id: &C::Id, dir: RelativeDir) -> Vec<&C> {
        match self.window_of(id) {
            Some(WindowKey::Main) => self.main.contents_relative_to(id, dir),
            Some(WindowKey::Popout(pid)) => self
                .popouts
                .get(&pid)
                .map(|p| p.tree.contents_relative_to(id, dir))
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// The neighboring tab of a content, wrapping around the group.
    pub fn content_tab(&self, id: &C::Id, dir: RelativeDir) -> Option<&C> {
        match self.window_of(id)? {
            WindowKey::Main => self.main.content_tab(id, dir),
            WindowKey::Popout(pid) => self.popouts.get(&pid)?.tree.content_tab(id, dir),
        }
    }

    /// The full address of a content, including a popout directive when it
    /// lives in one.
    pub fn path_of(&self, id: &C::Id) -> Option<DockPath> {
        if let Some(path) = self.main.path_of(id) {
            return Some(path);
        }
        self.popouts
            .iter()
            .find_map(|p| p.tree.path_of(id).map(|path| path.in_popout(p.id.clone())))
    }

    fn tree(&self, window: &WindowKey) -> Option<&DockTree<C>> {
        match window {
            WindowKey::Main => Some(&self.main),
            WindowKey::Popout(pid) => self.popouts.get(pid).map(|p| &p.tree),
        }
    }

    fn tree_mut(&mut self, window: &WindowKey) -> Option<&mut DockTree<C>> {
        match window {
            WindowKey::Main => Some(&mut self.main),
            WindowKey::Popout(pid) => self.popouts.get_mut(pid).map(|p| &mut p.tree),
        }
    }

    // ========================================================================
    // Activation
    // ========================================================================

    pub fn set_active_content(&mut self, id: &C::Id) {
        self.activate(id, ActiveChangeCause::Explicit);
    }

    fn activate(&mut self, id: &C::Id, cause: ActiveChangeCause) {
        let Some(window) = self.window_of(id) else {
            warn!("activation of content that is not docked");
            self.recompute_active(cause);
            return;
        };
        match &window {
            WindowKey::Main => {
                self.main.set_active_content(id);
            }
            WindowKey::Popout(pid) => {
                if let Some(popout) = self.popouts.get_mut(pid) {
                    popout.tree.set_active_content(id);
                }
            }
        }
        self.window_active.insert(window, id.clone());
        if self.active.as_ref() != Some(id) {
            self.active = Some(id.clone());
            self.push(DockEvent::ActiveChanged {
                id: Some(id.clone()),
                cause,
            });
        }
    }

    /// Falls back to whatever content the trees still consider selected.
    fn recompute_active(&mut self, cause: ActiveChangeCause) {
        let id = self
            .main
            .active_content()
            .map(|c| c.id().clone())
            .or_else(|| {
                self.popouts
                    .iter()
                    .find_map(|p| p.tree.active_content().map(|c| c.id().clone()))
            });
        match id {
            Some(id) => self.activate(&id, cause),
            None => {
                if self.active.take().is_some() {
                    self.push(DockEvent::ActiveChanged { id: None, cause });
                }
            }
        }
    }

    /// The toolkit reported a new focus owner.
    pub fn focus_owner_changed(&mut self, owner: &B::FocusOwner) {
        let Some(id) = self.backend.resolve_focus(owner) else {
            return;
        };
        if self.window_of(&id).is_some() {
            self.activate(&id, ActiveChangeCause::Focus);
        }
    }

    // ========================================================================
    // Popout windows
    // ========================================================================

    /// Moves a content into a new popout window. Returns the popout's id,
    /// or `None` when popping out is disabled or the content refuses.
    pub fn popout(&mut self, id: &C::Id, kind: Option<PopoutKind>) -> Option<PopoutId> {
        let kind = kind.unwrap_or(self.options.popout_kind);
        if kind == PopoutKind::None {
            return None;
        }
        if !self.get_content(id).is_some_and(|c| c.can_popout()) {
            return None;
        }
        let source = self.window_of(id)?;
        let content = match &source {
            WindowKey::Main => self.main.remove_content(id),
            WindowKey::Popout(pid) => self
                .popouts
                .get_mut(pid)
                .and_then(|p| p.tree.remove_content(id)),
        }?;
        self.window_active.retain(|_, v| v != id);
        self.handle_emptied(&source);

        let options = self.options.clone();
        let popout = self.popouts.open_popout(
            &mut self.backend,
            kind,
            options,
            None,
            None,
            WindowState::Normal,
        );
        let pid = popout.id.clone();
        popout.tree.add_content(content, true);
        self.window_active
            .insert(WindowKey::Popout(pid.clone()), id.clone());
        self.push(DockEvent::PopoutOpened { id: pid.clone() });
        self.push(DockEvent::LayoutChanged);
        Some(pid)
    }

    /// Closes a popout window, returning its contents to the main window
    /// next to the active content.
    pub fn close_popout(&mut self, id: &PopoutId) {
        if self.popouts.get(id).is_none() {
            return;
        }
        self.push(DockEvent::PopoutClosing { id: id.clone() });
        let Some(mut tree) = self.popouts.close_popout(&mut self.backend, id) else {
            return;
        };
        let returning = self.window_active.remove(&WindowKey::Popout(id.clone()));
        let anchor = self.active.clone().filter(|a| self.main.contains(a));
        for content in tree.drain() {
            match &anchor {
                Some(anchor) => {
                    if let Err(returned) = self.main.insert_next_to(content, anchor, false) {
                        self.main.add_content(returned, false);
                    }
                }
                None => self.main.add_content(content, false),
            }
        }
        // The popout's selected tab stays selected in its new group when it
        // was the globally active content.
        if let Some(aid) = returning {
            if self.active.as_ref() == Some(&aid) {
                self.main.set_active_content(&aid);
                self.window_active.insert(WindowKey::Main, aid);
            }
        }
        self.push(DockEvent::LayoutChanged);
    }

    /// Closes emptied windows after a removal.
    fn handle_emptied(&mut self, window: &WindowKey) {
        match window {
            WindowKey::Main => {
                if self.main.is_empty() {
                    self.push(DockEvent::MainEmptied);
                }
            }
            WindowKey::Popout(pid) => {
                let emptied = self.popouts.get(pid).is_some_and(|p| p.tree.is_empty());
                if emptied && !self.options.keep_empty {
                    self.push(DockEvent::PopoutClosing { id: pid.clone() });
                    self.popouts.close_popout(&mut self.backend, pid);
                    self.window_active.remove(&WindowKey::Popout(pid.clone()));
                }
            }
        }
    }

    // ========================================================================
    // Host geometry reports
    // ========================================================================

    pub fn window_resized(&mut self, bounds: Rect) {
        self.main.set_bounds(bounds);
        self.push(DockEvent::LayoutChanged);
    }

    pub fn popout_bounds_changed(&mut self, id: &PopoutId, bounds: Rect) {
        if let Some(popout) = self.popouts.get_mut(id) {
            popout.bounds = Some(bounds);
            popout.tree.set_bounds(Rect::from_size(bounds.size));
        }
        self.push(DockEvent::LayoutChanged);
    }

    pub fn popout_state_changed(&mut self, id: &PopoutId, state: WindowState) {
        if let Some(popout) = self.popouts.get_mut(id) {
            popout.state = state;
        }
    }

    /// Replaces the options; the new values propagate to every tree.
    pub fn set_options(&mut self, options: Options) {
        let options = Rc::new(options);
        self.options = options.clone();
        self.main.update_options(options.clone());
        for popout in self.popouts.iter_mut() {
            popout.tree.update_options(options.clone());
        }
        self.push(DockEvent::LayoutChanged);
    }

    // ========================================================================
    // Pointer input
    // ========================================================================

    /// A press in a window, in window-local coordinates. A press on a tab
    /// activates it and arms a possible drag.
    pub fn pointer_pressed(&mut self, window: WindowKey, pos: Point) {
        let Some(tree) = self.tree(&window) else {
            return;
        };
        let Some((node, index)) = tree.tab_at(pos) else {
            return;
        };
        let Some(Node::Tabs(tabs)) = tree.node(node) else {
            return;
        };
        let Some(content) = tabs.items().get(index) else {
            return;
        };
        let id = content.id().clone();
        self.activate(&id, ActiveChangeCause::Explicit);
        self.drag = DragState::Starting {
            source: DragSource {
                window,
                content: id,
                node,
                index,
            },
            press_pos: pos,
            press_time: self.clock.now(),
        };
    }

    /// Pointer motion. `over` is the window under the pointer (`None`
    /// outside all of them); `pos` is local to that window.
    ///
    /// Returns the drop overlay the host should paint, if any.
    pub fn pointer_moved(&mut self, over: Option<WindowKey>, pos: Point) -> Option<DragFeedback> {
        match &self.drag {
            DragState::Idle => None,
            DragState::Starting {
                source,
                press_pos,
                press_time,
            } => {
                // Leaving the window is always a drag; within it the press
                // must ride out both thresholds first.
                let left_window = over.as_ref() != Some(&source.window);
                if left_window
                    || should_promote(*press_pos, *press_time, pos, self.clock.now(), &self.options)
                {
                    let source = source.clone();
                    self.drag = DragState::Dragging(DragData {
                        source,
                        over: None,
                        last_pos: pos,
                        proposal: None,
                    });
                    self.update_drag(over, pos)
                } else {
                    None
                }
            }
            DragState::Dragging(_) => self.update_drag(over, pos),
        }
    }

    fn update_drag(&mut self, over: Option<WindowKey>, pos: Point) -> Option<DragFeedback> {
        let (src_window, src_node, src_index) = match self.drag.dragging() {
            Some(data) => (
                data.source.window.clone(),
                data.source.node,
                data.source.index,
            ),
            None => return None,
        };
        let proposal = over.as_ref().and_then(|window| {
            let tree = self.tree(window)?;
            let source = (*window == src_window).then_some((src_node, src_index));
            tree.find_drop(pos, source)
        });

        if let DragState::Dragging(data) = &mut self.drag {
            data.over = over.clone();
            data.last_pos = pos;
            data.proposal = proposal.clone();
        }

        // Invalid proposals paint nothing.
        let proposal = proposal.filter(DropProposal::is_valid)?;
        Some(DragFeedback {
            window: over?,
            highlight: proposal.highlight,
            fill: self.options.drop_fill,
            line: self.options.drop_line,
        })
    }

    /// The pointer was released, ending a click or a drag.
    pub fn pointer_released(&mut self) {
        let drag = std::mem::take(&mut self.drag);
        let DragState::Dragging(data) = drag else {
            // A plain click; activation already happened on press.
            return;
        };
        let source = data.source;

        match (data.over, data.proposal) {
            (Some(window), Some(proposal)) if proposal.is_valid() => {
                self.finish_drop(source, window, proposal);
            }
            (None, _) => {
                // Released outside every window: tear the tab off into a new
                // popout, when allowed.
                if self.options.drag_popout_kind != PopoutKind::None {
                    self.popout(&source.content, Some(self.options.drag_popout_kind));
                }
            }
            _ => {}
        }
    }

    fn finish_drop(&mut self, source: DragSource<C::Id>, window: WindowKey, proposal: DropProposal) {
        // A reorder within the source group moves the tab in place.
        if let DropTarget::Tab { node, index } = proposal.target {
            if window == source.window && node == source.node {
                if let Some(tree) = self.tree_mut(&window) {
                    tree.move_within(node, source.index, index);
                    self.push(DockEvent::LayoutChanged);
                }
                return;
            }
        }

        let Some(content) = (match &source.window {
            WindowKey::Main => self.main.remove_content(&source.content),
            WindowKey::Popout(pid) => self
                .popouts
                .get_mut(pid)
                .and_then(|p| p.tree.remove_content(&source.content)),
        }) else {
            warn!("dragged content vanished before drop");
            return;
        };
        self.window_active.retain(|_, v| *v != source.content);

        let outcome = match self.tree_mut(&window) {
            Some(tree) => tree.execute_drop(&proposal, content),
            None => Err(content),
        };
        match outcome {
            Ok(()) => {
                self.handle_emptied(&source.window);
                self.activate(&source.content, ActiveChangeCause::Explicit);
            }
            Err(content) => {
                warn!("drop target vanished, returning content to its window");
                match &source.window {
                    WindowKey::Main => self.main.add_content(content, true),
                    WindowKey::Popout(pid) => match self.popouts.get_mut(pid) {
                        Some(popout) => popout.tree.add_content(content, true),
                        None => self.main.add_content(content, true),
                    },
                }
            }
        }
        self.push(DockEvent::LayoutChanged);
    }

    /// Mouse wheel over a window; positive `delta` scrolls down/forward.
    pub fn wheel_scrolled(&mut self, window: &WindowKey, pos: Point, delta: f64) {
        let strip_only = match self.options.wheel_switching {
            WheelSwitching::Off => return,
            WheelSwitching::OverTabStrip => true,
            WheelSwitching::Anywhere => false,
        };
        let Some(tree) = self.tree(window) else {
            return;
        };
        let Some(key) = tree.tabs_under(pos, strip_only) else {
            return;
        };
        let Some(Node::Tabs(tabs)) = tree.node(key) else {
            return;
        };
        let Some(current) = tabs.active() else {
            return;
        };
        let dir = if delta > 0.0 {
            RelativeDir::Right
        } else {
            RelativeDir::Left
        };
        let Some(next) = tree.content_tab(current.id(), dir) else {
            return;
        };
        let next = next.id().clone();
        self.activate(&next, ActiveChangeCause::Explicit);
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Snapshot of the whole forest as a persistable layout.
    pub fn save_layout(&self) -> DockLayout {
        let mut windows = vec![PopoutEntry::new(
            None,
            None,
            WindowState::Normal,
            self.main.to_entry(),
        )];
        for popout in self.popouts.iter() {
            windows.push(PopoutEntry::new(
                Some(popout.id.as_str().to_owned()),
                popout.bounds.map(bounds_from_rect),
                popout.state,
                popout.tree.to_entry(),
            ));
        }
        DockLayout { windows }
    }

    pub fn save_json(&self) -> Result<String> {
        self.save_layout().to_json().context("encoding dock layout")
    }

    /// Restores a layout, replacing the current one. Popouts the layout does
    /// not mention are closed (their windows pooled) and existing content
    /// subscriptions are dropped before rebuilding.
    ///
    /// The resolver maps persisted content ids back to live contents. Ids
    /// it cannot resolve are skipped but stay recorded, so a later
    /// [`add_content`](Self::add_content) still lands the content in its
    /// saved slot. A popout whose contents all fail to resolve is not
    /// opened.
    pub fn restore_layout(
        &mut self,
        layout: DockLayout,
        mut resolver: impl FnMut(&str) -> Option<C>,
    ) {
        // Tear down the current layout first: detach from every content's
        // change channel, then close the open popouts (pooling the windows).
        let subs: Vec<_> = self.subscriptions.drain().collect();
        for (id, sub) in subs {
            if let Some(events) = self.get_content(&id).and_then(C::events) {
                events.unsubscribe(sub);
            }
        }
        let open: Vec<PopoutId> = self.popouts.iter().map(|p| p.id.clone()).collect();
        for pid in open {
            self.push(DockEvent::PopoutClosing { id: pid.clone() });
            let _ = self.popouts.close_popout(&mut self.backend, &pid);
        }
        self.window_active.clear();
        self.active = None;

        match layout.main_window().and_then(PopoutEntry::child) {
            Some(child) => self.main.restore_entry(child, &mut resolver),
            None => {
                self.main.drain();
            }
        }

        for window in &layout.windows {
            let Some(pid) = window.id() else {
                continue;
            };
            let Some(child) = window.child() else {
                continue;
            };
            let bounds = window.bounds().map(rect_from_bounds);
            let local = Rect::from_size(
                bounds.unwrap_or_else(|| Rect::new(0.0, 0.0, 800.0, 600.0)).size,
            );
            let mut tree = DockTree::new(local, self.options.clone());
            tree.restore_entry(child, &mut resolver);
            if tree.is_empty() {
                continue;
            }
            let kind = match self.options.popout_kind {
                PopoutKind::None => PopoutKind::Frame,
                kind => kind,
            };
            let options = self.options.clone();
            let popout = self.popouts.open_popout(
                &mut self.backend,
                kind,
                options,
                Some(PopoutId::from(pid.to_owned())),
                bounds,
                window.state(),
            );
            popout.tree = tree;
            let id = popout.id.clone();
            self.push(DockEvent::PopoutOpened { id });
        }
        self.saved = Some(layout);

        // Bookkeeping for everything that arrived.
        let mut added = Vec::new();
        for content in self.main.contents() {
            added.push((content.id().clone(), WindowKey::Main));
        }
        for popout in self.popouts.iter() {
            for content in popout.tree.contents() {
                added.push((content.id().clone(), WindowKey::Popout(popout.id.clone())));
            }
        }
        let pending = self.pending_changes.clone();
        let mut subs = Vec::new();
        for (id, window) in &added {
            let events = self
                .tree(window)
                .and_then(|tree| tree.get_content(id))
                .and_then(C::events);
            if let Some(events) = events {
                let pending = pending.clone();
                let key = id.clone();
                let sub =
                    events.subscribe(move |change| pending.borrow_mut().push((key.clone(), change)));
                subs.push((id.clone(), sub));
            }
        }
        self.subscriptions.extend(subs);
        for (id, window) in added {
            self.push(DockEvent::ContentAdded { id, window });
        }
        self.recompute_active(ActiveChangeCause::Explicit);
        self.push(DockEvent::LayoutChanged);
    }

    /// Restores a layout from JSON text, skipping corrupt branches. Returns
    /// the decode issues (also logged).
    pub fn restore_json(
        &mut self,
        text: &str,
        resolver: impl FnMut(&str) -> Option<C>,
    ) -> Result<Vec<String>> {
        let outcome = DockLayout::from_json(text).context("decoding dock layout")?;
        for issue in &outcome.issues {
            warn!("layout restore: {issue}");
        }
        self.restore_layout(outcome.layout, resolver);
        Ok(outcome.issues)
    }

    /// The saved slot of a content, from the layout of the last restore.
    fn saved_path_of(&self, id: &C::Id) -> Option<DockPath> {
        let saved = self.saved.as_ref()?;
        let key = id.to_string();
        for window in &saved.windows {
            let Some(child) = window.child() else {
                continue;
            };
            let mut entries = Vec::new();
            if entry_path(child, &key, &mut entries) {
                let path = DockPath::from_entries(entries);
                return Some(match window.id() {
                    Some(pid) => path.in_popout(PopoutId::from(pid.to_owned())),
                    None => path,
                });
            }
        }
        None
    }

    fn saved_popout_geometry(&self, id: &PopoutId) -> (Option<Rect>, WindowState) {
        let Some(entry) = self.saved.as_ref().and_then(|s| s.popout(id.as_str())) else {
            return (None, WindowState::Normal);
        };
        (entry.bounds().map(rect_from_bounds), entry.state())
    }

    // ========================================================================
    // Events and diagnostics
    // ========================================================================

    /// Drains everything that happened since the last call, including
    /// change notifications from docked contents.
    pub fn take_events(&mut self) -> Vec<DockEvent<C::Id>> {
        let pending: Vec<_> = self.pending_changes.borrow_mut().drain(..).collect();
        for (id, change) in pending {
            self.events.push(DockEvent::ContentChanged { id, change });
        }
        std::mem::take(&mut self.events)
    }

    fn push(&mut self, event: DockEvent<C::Id>) {
        self.events.push(event);
    }

    /// Structural dump of every window, for tests and debugging.
    pub fn debug_layout(&self) -> String {
        use std::fmt::Write as _;

        let mut out = String::from("main:\n");
        out.push_str(&self.main.debug_tree());
        for popout in self.popouts.iter() {
            let _ = writeln!(out, "{}:", popout.id);
            out.push_str(&popout.tree.debug_tree());
        }
        out
    }

    /// Panics when a cross-window invariant is broken. Called from tests.
    pub fn verify_invariants(&self) {
        self.main.verify_invariants();
        for popout in self.popouts.iter() {
            popout.tree.verify_invariants();
            assert!(
                self.options.keep_empty || !popout.tree.is_empty(),
                "empty popout survived",
            );
        }
        if let Some(active) = &self.active {
            assert!(
                self.window_of(active).is_some(),
                "active content is not docked anywhere",
            );
        }
        let contents = self.contents();
        let mut ids: Vec<_> = contents.iter().map(|c| c.id()).collect();
        let total = ids.len();
        ids.sort_by_key(|id| id.to_string());
        ids.dedup();
        assert_eq!(ids.len(), total, "content docked in more than one window");
    }
}

/// Builds the path of `id` within a persisted subtree.
fn entry_path(entry: &NodeEntry, id: &str, entries: &mut Vec<PathEntry>) -> bool {
    match entry {
        NodeEntry::Tabs(tabs) => match tabs.ids().iter().position(|i| i == id) {
            Some(idx) => {
                entries.push(PathEntry::Tab(idx));
                true
            }
            None => false,
        },
        NodeEntry::Split(split) => {
            let orientation = if split.orientation() == ORIENTATION_VERTICAL {
                Orientation::Vertical
            } else {
                Orientation::Horizontal
            };
            for (side, child) in [
                (SplitSide::First, split.first()),
                (SplitSide::Second, split.second()),
            ] {
                entries.push(PathEntry::Split { orientation, side });
                if entry_path(child, id, entries) {
                    return true;
                }
                entries.pop();
            }
            false
        }
    }
}

fn rect_from_bounds(bounds: BoundsSpec) -> Rect {
    Rect::new(
        bounds.x as f64,
        bounds.y as f64,
        bounds.w as f64,
        bounds.h as f64,
    )
}

fn bounds_from_rect(rect: Rect) -> BoundsSpec {
    BoundsSpec::new(
        rect.loc.x.round() as i32,
        rect.loc.y.round() as i32,
        rect.size.w.round() as i32,
        rect.size.h.round() as i32,
    )
}
