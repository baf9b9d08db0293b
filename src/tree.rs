//! The per-window docking tree.
//!
//! Each top-level window (the main window or one popout) owns a [`DockTree`]
//! — the "Base" of that window. Interior nodes are binary splits; leaves are
//! tab groups owning the actual contents. Nodes live in a [`SlotMap`] for
//! cheap keyed access.
//!
//! Structural invariants, maintained by every mutation:
//! - a split always has exactly two live, non-empty children;
//! - an emptied tab group removes itself, collapsing its parent split into
//!   the sibling (self-elimination), unless `keep_empty` is set;
//! - a content belongs to at most one tab group.

use slotmap::{new_key_type, SlotMap};
use std::rc::Rc;
use tracing::warn;

use paneldock_persist::{
    NodeEntry, SplitEntry, TabsEntry, ORIENTATION_HORIZONTAL, ORIENTATION_VERTICAL,
};

use crate::content::DockContent;
use crate::drag::{DropProposal, DropTarget};
use crate::geometry::{Orientation, Point, Rect, SplitSide};
use crate::options::{Options, TabPlacement};
use crate::path::{DockPath, PathEntry};

new_key_type! {
    /// Key of a node in a [`DockTree`].
    pub struct NodeKey;
}

/// Which tabs of a group to select relative to a content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeDir {
    /// Tabs strictly left of (before) the content.
    Left,
    /// All other tabs of the group.
    Both,
    /// Tabs strictly right of (after) the content.
    Right,
}

/// Fraction of a tab group's content area that counts as a split edge zone.
const EDGE_ZONE: f64 = 0.25;

/// Thickness of the tab insertion marker rectangle.
const INSERT_MARKER: f64 = 4.0;

/// A node of the tree.
#[derive(Debug)]
pub enum Node<C> {
    Split(SplitNode),
    Tabs(TabsNode<C>),
}

/// Binary split holding exactly two children side by side.
#[derive(Debug)]
pub struct SplitNode {
    orientation: Orientation,
    /// Share of the first child, in (0, 1).
    ratio: f64,
    children: [NodeKey; 2],
    /// Cached geometry from the last layout pass.
    rect: Rect,
}

impl SplitNode {
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn children(&self) -> [NodeKey; 2] {
        self.children
    }

    pub fn child(&self, side: SplitSide) -> NodeKey {
        self.children[side.index()]
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }
}

/// Ordered collection of contents shown as tabs.
#[derive(Debug)]
pub struct TabsNode<C> {
    items: Vec<C>,
    active_idx: usize,
    /// Cached geometry from the last layout pass.
    rect: Rect,
    /// Tab strip rectangle; `None` in single mode (one content directly
    /// under the window root shows no strip).
    strip: Option<Rect>,
}

impl<C> TabsNode<C> {
    fn new(items: Vec<C>) -> Self {
        Self {
            items,
            active_idx: 0,
            rect: Rect::default(),
            strip: None,
        }
    }

    pub fn items(&self) -> &[C] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn active_idx(&self) -> usize {
        self.active_idx
    }

    pub fn active(&self) -> Option<&C> {
        self.items.get(self.active_idx)
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// `None` while in single mode.
    pub fn strip(&self) -> Option<Rect> {
        self.strip
    }
}

/// The docking tree of one top-level window.
#[derive(Debug)]
pub struct DockTree<C: DockContent> {
    nodes: SlotMap<NodeKey, Node<C>>,
    root: Option<NodeKey>,
    /// Window content area this tree lays out into.
    rect: Rect,
    /// The tab group that last held this window's active content.
    active_tabs: Option<NodeKey>,
    options: Rc<Options>,
}

impl<C: DockContent> DockTree<C> {
    pub fn new(rect: Rect, options: Rc<Options>) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
            rect,
            active_tabs: None,
            options,
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    pub fn set_bounds(&mut self, rect: Rect) {
        self.rect = rect;
        self.recompute_layout();
    }

    pub fn bounds(&self) -> Rect {
        self.rect
    }

    pub fn update_options(&mut self, options: Rc<Options>) {
        self.options = options;
        self.recompute_layout();
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node<C>> {
        self.nodes.get(key)
    }

    pub fn root(&self) -> Option<NodeKey> {
        self.root
    }

    /// All contents in left-first depth-first order.
    pub fn contents(&self) -> Vec<&C> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.collect_contents(root, &mut out);
        }
        out
    }

    fn collect_contents<'a>(&'a self, key: NodeKey, out: &mut Vec<&'a C>) {
        match &self.nodes[key] {
            Node::Split(split) => {
                self.collect_contents(split.children[0], out);
                self.collect_contents(split.children[1], out);
            }
            Node::Tabs(tabs) => out.extend(tabs.items.iter()),
        }
    }

    pub fn contains(&self, id: &C::Id) -> bool {
        self.find_content(id).is_some()
    }

    /// The tab group and index holding this content.
    pub fn find_content(&self, id: &C::Id) -> Option<(NodeKey, usize)> {
        self.nodes.iter().find_map(|(key, node)| match node {
            Node::Tabs(tabs) => tabs
                .items
                .iter()
                .position(|c| c.id() == id)
                .map(|idx| (key, idx)),
            Node::Split(_) => None,
        })
    }

    pub fn get_content(&self, id: &C::Id) -> Option<&C> {
        let (key, idx) = self.find_content(id)?;
        match &self.nodes[key] {
            Node::Tabs(tabs) => tabs.items.get(idx),
            Node::Split(_) => None,
        }
    }

    /// The active content of this window, if any.
    pub fn active_content(&self) -> Option<&C> {
        let key = self.active_tabs?;
        match self.nodes.get(key)? {
            Node::Tabs(tabs) => tabs.active(),
            Node::Split(_) => None,
        }
    }

    /// A content is visible when it is the selected tab of its group.
    pub fn is_content_visible(&self, id: &C::Id) -> bool {
        match self.find_content(id) {
            Some((key, idx)) => match &self.nodes[key] {
                Node::Tabs(tabs) => tabs.active_idx == idx,
                Node::Split(_) => false,
            },
            None => false,
        }
    }

    /// Tabs of the same group strictly left/right/around `id`.
    pub fn contents_relative_to(&self, id: &C::Id, dir: RelativeDir) -> Vec<&C> {
        let Some((key, idx)) = self.find_content(id) else {
            return Vec::new();
        };
        let Node::Tabs(tabs) = &self.nodes[key] else {
            return Vec::new();
        };
        match dir {
            RelativeDir::Left => tabs.items[..idx].iter().collect(),
            RelativeDir::Right => tabs.items[idx + 1..].iter().collect(),
            RelativeDir::Both => tabs
                .items
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != idx)
                .map(|(_, c)| c)
                .collect(),
        }
    }

    /// The neighboring tab in the given direction, wrapping to the opposite
    /// end of the group.
    pub fn content_tab(&self, id: &C::Id, dir: RelativeDir) -> Option<&C> {
        let (key, idx) = self.find_content(id)?;
        let Node::Tabs(tabs) = &self.nodes[key] else {
            return None;
        };
        let len = tabs.items.len();
        let neighbor = match dir {
            RelativeDir::Left => (idx + len - 1) % len,
            RelativeDir::Right => (idx + 1) % len,
            RelativeDir::Both => return None,
        };
        tabs.items.get(neighbor)
    }

    /// Builds the root-to-leaf path of a content, ending in its tab index.
    pub fn path_of(&self, id: &C::Id) -> Option<DockPath> {
        let root = self.root?;
        let mut entries = Vec::new();
        if self.build_path(root, id, &mut entries) {
            Some(DockPath::from_entries(entries))
        } else {
            None
        }
    }

    fn build_path(&self, key: NodeKey, id: &C::Id, entries: &mut Vec<PathEntry>) -> bool {
        match &self.nodes[key] {
            Node::Tabs(tabs) => match tabs.items.iter().position(|c| c.id() == id) {
                Some(idx) => {
                    entries.push(PathEntry::Tab(idx));
                    true
                }
                None => false,
            },
            Node::Split(split) => {
                for side in [SplitSide::First, SplitSide::Second] {
                    entries.push(PathEntry::Split {
                        orientation: split.orientation,
                        side,
                    });
                    if self.build_path(split.children[side.index()], id, entries) {
                        return true;
                    }
                    entries.pop();
                }
                false
            }
        }
    }

    /// First tab group of a subtree, left-first.
    fn first_tabs_under(&self, key: NodeKey) -> Option<NodeKey> {
        match self.nodes.get(key)? {
            Node::Tabs(_) => Some(key),
            Node::Split(split) => {
                let [first, second] = split.children;
                self.first_tabs_under(first)
                    .or_else(|| self.first_tabs_under(second))
            }
        }
    }

    fn parent_of(&self, key: NodeKey) -> Option<(NodeKey, SplitSide)> {
        self.nodes.iter().find_map(|(parent, node)| match node {
            Node::Split(split) if split.children[0] == key => Some((parent, SplitSide::First)),
            Node::Split(split) if split.children[1] == key => Some((parent, SplitSide::Second)),
            _ => None,
        })
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Adds a content to the window's active tab group (or as the first
    /// content of an empty window).
    pub fn add_content(&mut self, content: C, activate: bool) {
        if self.root.is_none() {
            self.create_root_tabs(content);
            return;
        }

        let target = self
            .active_tabs
            .filter(|key| matches!(self.nodes.get(*key), Some(Node::Tabs(_))))
            .or_else(|| self.first_tabs_under(self.root.unwrap()));
        match target {
            Some(key) => self.insert_into(key, content, None, activate),
            None => {
                self.create_root_tabs(content);
            }
        }
    }

    fn create_root_tabs(&mut self, content: C) -> NodeKey {
        let key = self.nodes.insert(Node::Tabs(TabsNode::new(vec![content])));
        self.root = Some(key);
        self.active_tabs = Some(key);
        self.recompute_layout();
        key
    }

    /// Inserts into a tab group. Without an explicit index the position
    /// comes from the tab order policy.
    pub fn insert_into(&mut self, key: NodeKey, content: C, index: Option<usize>, activate: bool) {
        let options = self.options.clone();
        let Some(Node::Tabs(tabs)) = self.nodes.get_mut(key) else {
            warn!("insert target vanished, adding to the window's default group");
            self.add_content(content, activate);
            return;
        };

        let idx = match index {
            Some(idx) => idx.min(tabs.items.len()),
            None => {
                let title = content.title();
                let titles: Vec<String> = tabs.items.iter().map(|c| c.title()).collect();
                options
                    .tab_order
                    .insert_index(titles.iter().map(String::as_str), &title)
            }
        };

        let was_empty = tabs.items.is_empty();
        tabs.items.insert(idx, content);
        if activate || was_empty {
            tabs.active_idx = idx;
        } else if idx <= tabs.active_idx {
            // Keep the same content selected.
            tabs.active_idx += 1;
        }
        if activate {
            self.active_tabs = Some(key);
        }
        self.recompute_layout();
    }

    /// Inserts into the tab group holding `neighbor`. When the neighbor is
    /// not in this tree the content is handed back.
    pub fn insert_next_to(
        &mut self,
        content: C,
        neighbor: &C::Id,
        activate: bool,
    ) -> Result<(), C> {
        let Some((key, _)) = self.find_content(neighbor) else {
            return Err(content);
        };
        self.insert_into(key, content, None, activate);
        Ok(())
    }

    /// Places a content by replaying a recorded path, creating splits and
    /// tab groups as needed. On structural mismatch the walk degrades to the
    /// nearest tab group; placement never fails.
    pub fn insert_at_path(&mut self, content: C, entries: &[PathEntry], activate: bool) {
        if self.root.is_none() {
            self.create_root_tabs(content);
            return;
        }

        let mut key = self.root.unwrap();
        for entry in entries {
            match entry {
                // Popout routing happens above the tree.
                PathEntry::Popout(_) => continue,
                PathEntry::Split { orientation, side } => {
                    match &self.nodes[key] {
                        Node::Split(split) if split.orientation == *orientation => {
                            key = split.children[side.index()];
                        }
                        // The recorded split does not exist (yet): create it.
                        _ => {
                            self.split_node(key, *orientation, *side, content, activate);
                            return;
                        }
                    }
                }
                PathEntry::Tab(idx) => {
                    let target = match &self.nodes[key] {
                        Node::Tabs(_) => Some(key),
                        Node::Split(_) => self.first_tabs_under(key),
                    };
                    match target {
                        Some(target) => self.insert_into(target, content, Some(*idx), activate),
                        None => self.add_content(content, activate),
                    }
                    return;
                }
            }
        }

        // Path ended above a leaf; use the nearest group.
        match self.first_tabs_under(key) {
            Some(target) => self.insert_into(target, content, None, activate),
            None => self.add_content(content, activate),
        }
    }

    /// Wraps `target` in a new split, with a fresh tab group holding
    /// `content` on the given side. The divider starts at 0.5.
    pub fn split_node(
        &mut self,
        target: NodeKey,
        orientation: Orientation,
        side: SplitSide,
        content: C,
        activate: bool,
    ) -> NodeKey {
        let parent = self.parent_of(target);
        let new_tabs = self.nodes.insert(Node::Tabs(TabsNode::new(vec![content])));
        let children = match side {
            SplitSide::First => [new_tabs, target],
            SplitSide::Second => [target, new_tabs],
        };
        let split = self.nodes.insert(Node::Split(SplitNode {
            orientation,
            ratio: 0.5,
            children,
            rect: Rect::default(),
        }));

        match parent {
            None => self.root = Some(split),
            Some((parent, parent_side)) => {
                if let Node::Split(parent_split) = &mut self.nodes[parent] {
                    parent_split.children[parent_side.index()] = split;
                }
            }
        }

        if activate {
            self.active_tabs = Some(new_tabs);
        }
        self.recompute_layout();
        new_tabs
    }

    /// Removes a content. No-op (`None`) when the content is not here.
    ///
    /// An emptied tab group self-eliminates unless `keep_empty` is set; an
    /// emptied split is replaced by its surviving child, and the window's
    /// active group moves to the first group of the surviving subtree.
    pub fn remove_content(&mut self, id: &C::Id) -> Option<C> {
        let (key, idx) = self.find_content(id)?;
        let keep_empty = self.options.keep_empty;

        let Node::Tabs(tabs) = &mut self.nodes[key] else {
            return None;
        };
        let content = tabs.items.remove(idx);
        if idx < tabs.active_idx || (tabs.active_idx >= tabs.items.len() && tabs.active_idx > 0) {
            tabs.active_idx -= 1;
        }

        if tabs.items.is_empty() && !keep_empty {
            self.eliminate(key);
        }
        self.recompute_layout();
        Some(content)
    }

    /// Removes every content, leaving the tree empty. Contents come out in
    /// left-first order.
    pub fn drain(&mut self) -> Vec<C> {
        let mut out = Vec::new();
        if let Some(root) = self.root.take() {
            self.drain_subtree(root, &mut out);
        }
        self.nodes.clear();
        self.active_tabs = None;
        out
    }

    fn drain_subtree(&mut self, key: NodeKey, out: &mut Vec<C>) {
        match self.nodes.remove(key) {
            Some(Node::Split(split)) => {
                self.drain_subtree(split.children[0], out);
                self.drain_subtree(split.children[1], out);
            }
            Some(Node::Tabs(tabs)) => out.extend(tabs.items),
            None => {}
        }
    }

    /// Self-elimination of an emptied tab group: the parent split collapses
    /// into the sibling subtree.
    fn eliminate(&mut self, key: NodeKey) {
        match self.parent_of(key) {
            None => {
                // The window's last group; the window itself becomes empty.
                self.nodes.remove(key);
                self.root = None;
                self.active_tabs = None;
            }
            Some((parent, side)) => {
                let sibling = match &self.nodes[parent] {
                    Node::Split(split) => split.children[side.other().index()],
                    Node::Tabs(_) => return,
                };
                match self.parent_of(parent) {
                    None => self.root = Some(sibling),
                    Some((grand, grand_side)) => {
                        if let Node::Split(grand_split) = &mut self.nodes[grand] {
                            grand_split.children[grand_side.index()] = sibling;
                        }
                    }
                }
                self.nodes.remove(parent);
                self.nodes.remove(key);

                // Pick a new active group from the surviving subtree.
                if self.active_tabs == Some(key) || self.active_tabs.is_none() {
                    self.active_tabs = self.first_tabs_under(sibling);
                }
            }
        }
    }

    /// Makes a content the selected tab of its group. No-op when absent.
    pub fn set_active_content(&mut self, id: &C::Id) -> bool {
        let Some((key, idx)) = self.find_content(id) else {
            return false;
        };
        if let Node::Tabs(tabs) = &mut self.nodes[key] {
            tabs.active_idx = idx;
        }
        self.active_tabs = Some(key);
        true
    }

    /// Pure reorder of a tab within its own group.
    pub fn move_within(&mut self, key: NodeKey, from: usize, insert: usize) {
        let Some(Node::Tabs(tabs)) = self.nodes.get_mut(key) else {
            return;
        };
        if from >= tabs.items.len() {
            return;
        }
        let item = tabs.items.remove(from);
        let mut idx = insert.min(tabs.items.len() + 1);
        if insert > from {
            idx -= 1;
        }
        let idx = idx.min(tabs.items.len());
        tabs.items.insert(idx, item);
        tabs.active_idx = idx;
    }

    /// Executes an accepted drop with an already-detached content.
    ///
    /// On failure (the target vanished mid-drag) the content is handed back.
    pub fn execute_drop(&mut self, proposal: &DropProposal, content: C) -> Result<(), C> {
        match proposal.target {
            DropTarget::Invalid => Err(content),
            DropTarget::Root => {
                if self.root.is_none() {
                    self.create_root_tabs(content);
                } else {
                    self.add_content(content, true);
                }
                Ok(())
            }
            DropTarget::Tab { node, index } => {
                if matches!(self.nodes.get(node), Some(Node::Tabs(_))) {
                    self.insert_into(node, content, Some(index), true);
                    Ok(())
                } else {
                    warn!("tab drop target vanished");
                    Err(content)
                }
            }
            DropTarget::Split {
                node,
                orientation,
                side,
            } => {
                if self.nodes.contains_key(node) {
                    self.split_node(node, orientation, side, content, true);
                    Ok(())
                } else {
                    warn!("split drop target vanished");
                    Err(content)
                }
            }
        }
    }

    // ========================================================================
    // Layout
    // ========================================================================

    /// Recomputes cached node rectangles from the window bounds, divider
    /// ratios and tab strip settings.
    pub fn recompute_layout(&mut self) {
        let Some(root) = self.root else {
            return;
        };
        let options = self.options.clone();
        let mut stack = vec![(root, self.rect, true)];
        while let Some((key, rect, is_root)) = stack.pop() {
            match &mut self.nodes[key] {
                Node::Split(split) => {
                    split.rect = rect;
                    split.ratio = split.ratio.clamp(0.05, 0.95);
                    let (first, second) =
                        rect.split_at(split.orientation, split.ratio, options.divider_size);
                    stack.push((split.children[0], first, false));
                    stack.push((split.children[1], second, false));
                }
                Node::Tabs(tabs) => {
                    tabs.rect = rect;
                    let single = is_root && tabs.items.len() == 1;
                    tabs.strip = if single || tabs.items.is_empty() {
                        None
                    } else {
                        Some(strip_rect(rect, &options))
                    };
                }
            }
        }
    }

    pub fn set_ratio(&mut self, key: NodeKey, ratio: f64) {
        if let Some(Node::Split(split)) = self.nodes.get_mut(key) {
            split.ratio = ratio.clamp(0.05, 0.95);
        }
        self.recompute_layout();
    }

    /// The existing tab under a position, for press hit-testing.
    pub fn tab_at(&self, pos: Point) -> Option<(NodeKey, usize)> {
        let options = &self.options;
        self.nodes.iter().find_map(|(key, node)| {
            let Node::Tabs(tabs) = node else {
                return None;
            };
            let strip = tabs.strip?;
            if !strip.contains(pos) {
                return None;
            }
            let (offset, per) = strip_offsets(strip, pos, tabs.items.len(), options);
            let idx = (offset / per).floor() as usize;
            (idx < tabs.items.len()).then_some((key, idx))
        })
    }

    /// The tab group under a position; with `strip_only` the position must
    /// be on the group's tab strip.
    pub fn tabs_under(&self, pos: Point, strip_only: bool) -> Option<NodeKey> {
        self.nodes.iter().find_map(|(key, node)| {
            let Node::Tabs(tabs) = node else {
                return None;
            };
            let hit = if strip_only {
                tabs.strip.is_some_and(|strip| strip.contains(pos))
            } else {
                tabs.rect.contains(pos)
            };
            hit.then_some(key)
        })
    }

    // ========================================================================
    // Drop hit-testing
    // ========================================================================

    /// Asks this tree for a drop opinion at `pos`.
    ///
    /// `source` is the dragged tab's slot when it lives in this tree, used
    /// to mark same-slot drops with the explicit invalid sentinel.
    pub fn find_drop(
        &self,
        pos: Point,
        source: Option<(NodeKey, usize)>,
    ) -> Option<DropProposal> {
        if !self.rect.contains(pos) {
            return None;
        }
        let Some(root) = self.root else {
            return Some(DropProposal::new(DropTarget::Root, self.rect));
        };

        let mut key = root;
        loop {
            match &self.nodes[key] {
                Node::Split(split) => {
                    let next = split.children.into_iter().find(|child| {
                        self.node_rect(*child).is_some_and(|rect| rect.contains(pos))
                    });
                    match next {
                        Some(child) => key = child,
                        // On the divider: no opinion.
                        None => return None,
                    }
                }
                Node::Tabs(tabs) => return self.tabs_drop(key, tabs, pos, source),
            }
        }
    }

    fn node_rect(&self, key: NodeKey) -> Option<Rect> {
        match self.nodes.get(key)? {
            Node::Split(split) => Some(split.rect),
            Node::Tabs(tabs) => Some(tabs.rect),
        }
    }

    fn tabs_drop(
        &self,
        key: NodeKey,
        tabs: &TabsNode<C>,
        pos: Point,
        source: Option<(NodeKey, usize)>,
    ) -> Option<DropProposal> {
        let options = &self.options;
        let same_node = source.filter(|(node, _)| *node == key);
        // A group holding only the dragged tab has no legal drop anywhere on
        // itself: every spot is the slot it already occupies.
        let self_only = same_node.is_some() && tabs.items.len() == 1;

        if let Some(strip) = tabs.strip {
            if strip.contains(pos) {
                let count = tabs.items.len();
                let (offset, per) = strip_offsets(strip, pos, count, options);
                let insert = if offset >= per * count as f64 {
                    // Generous trailing zone: anything past the last tab.
                    count
                } else {
                    let idx = (offset / per).floor();
                    let within = offset / per - idx;
                    idx as usize + usize::from(within > 0.5)
                };
                let highlight = insert_marker(strip, per, insert, count, options);

                if self_only {
                    return Some(DropProposal::invalid(highlight));
                }
                if let Some((_, src)) = same_node {
                    if insert == src || insert == src + 1 {
                        return Some(DropProposal::invalid(highlight));
                    }
                }
                return Some(DropProposal::new(
                    DropTarget::Tab { node: key, index: insert },
                    highlight,
                ));
            }
        }

        let area = content_area(tabs.rect, tabs.strip, options);
        if !area.contains(pos) {
            return None;
        }

        // Edge zones propose splits; the center appends a tab.
        let edges = [
            (
                (pos.x - area.left()) / area.size.w,
                Orientation::Horizontal,
                SplitSide::First,
            ),
            (
                (area.right() - pos.x) / area.size.w,
                Orientation::Horizontal,
                SplitSide::Second,
            ),
            (
                (pos.y - area.top()) / area.size.h,
                Orientation::Vertical,
                SplitSide::First,
            ),
            (
                (area.bottom() - pos.y) / area.size.h,
                Orientation::Vertical,
                SplitSide::Second,
            ),
        ];
        let nearest = edges
            .into_iter()
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .filter(|(dist, _, _)| *dist < EDGE_ZONE);

        if let Some((_, orientation, side)) = nearest {
            let highlight = area.half(orientation, side);
            if self_only {
                return Some(DropProposal::invalid(highlight));
            }
            return Some(DropProposal::new(
                DropTarget::Split { node: key, orientation, side },
                highlight,
            ));
        }

        let insert = tabs.items.len();
        if self_only {
            return Some(DropProposal::invalid(area));
        }
        if let Some((_, src)) = same_node {
            // Appending the group's own last tab is the slot it is in.
            if src + 1 == insert {
                return Some(DropProposal::invalid(area));
            }
        }
        Some(DropProposal::new(
            DropTarget::Tab { node: key, index: insert },
            area,
        ))
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Converts the tree into a persisted entry; `None` when empty.
    pub fn to_entry(&self) -> Option<NodeEntry>
    where
        C::Id: ToString,
    {
        self.root.map(|root| self.node_entry(root))
    }

    fn node_entry(&self, key: NodeKey) -> NodeEntry
    where
        C::Id: ToString,
    {
        match &self.nodes[key] {
            Node::Split(split) => NodeEntry::Split(SplitEntry::new(
                split.ratio,
                match split.orientation {
                    Orientation::Horizontal => ORIENTATION_HORIZONTAL,
                    Orientation::Vertical => ORIENTATION_VERTICAL,
                },
                self.node_entry(split.children[0]),
                self.node_entry(split.children[1]),
            )),
            Node::Tabs(tabs) => NodeEntry::Tabs(TabsEntry::new(
                tabs.items.iter().map(|c| c.id().to_string()).collect(),
                tabs.active().map(|c| c.id().to_string()),
            )),
        }
    }

    /// Rebuilds this tree from a persisted entry, replacing any current
    /// contents.
    ///
    /// The resolver maps persisted ids to live contents; ids it cannot
    /// resolve are skipped, and groups or split sides that end up empty
    /// collapse away.
    pub fn restore_entry(
        &mut self,
        entry: &NodeEntry,
        resolver: &mut dyn FnMut(&str) -> Option<C>,
    ) where
        C::Id: ToString,
    {
        self.nodes.clear();
        self.active_tabs = None;
        self.root = self.build_entry(entry, resolver);
        if let Some(root) = self.root {
            self.active_tabs = self.first_tabs_under(root);
        }
        self.recompute_layout();
    }

    fn build_entry(
        &mut self,
        entry: &NodeEntry,
        resolver: &mut dyn FnMut(&str) -> Option<C>,
    ) -> Option<NodeKey>
    where
        C::Id: ToString,
    {
        match entry {
            NodeEntry::Tabs(tabs) => {
                let items: Vec<C> = tabs.ids().iter().filter_map(|id| resolver(id)).collect();
                if items.is_empty() {
                    return None;
                }
                let active_idx = tabs
                    .active()
                    .and_then(|active| {
                        items.iter().position(|c| c.id().to_string() == active)
                    })
                    .unwrap_or(0);
                let mut node = TabsNode::new(items);
                node.active_idx = active_idx;
                Some(self.nodes.insert(Node::Tabs(node)))
            }
            NodeEntry::Split(split) => {
                let orientation = if split.orientation() == ORIENTATION_VERTICAL {
                    Orientation::Vertical
                } else {
                    Orientation::Horizontal
                };
                let first = self.build_entry(split.first(), resolver);
                let second = self.build_entry(split.second(), resolver);
                match (first, second) {
                    (Some(first), Some(second)) => {
                        Some(self.nodes.insert(Node::Split(SplitNode {
                            orientation,
                            ratio: split.ratio(),
                            children: [first, second],
                            rect: Rect::default(),
                        })))
                    }
                    (Some(side), None) | (None, Some(side)) => Some(side),
                    (None, None) => None,
                }
            }
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Indented structural dump, for tests and debugging. The selected tab
    /// of each group is marked with `*`.
    pub fn debug_tree(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.root {
            self.debug_node(root, 0, &mut out);
        } else {
            out.push_str("empty\n");
        }
        out
    }

    fn debug_node(&self, key: NodeKey, depth: usize, out: &mut String) {
        use std::fmt::Write as _;

        let indent = "  ".repeat(depth);
        match &self.nodes[key] {
            Node::Split(split) => {
                let o = match split.orientation {
                    Orientation::Horizontal => 'h',
                    Orientation::Vertical => 'v',
                };
                let _ = writeln!(out, "{indent}split {o} {:.2}", split.ratio);
                self.debug_node(split.children[0], depth + 1, out);
                self.debug_node(split.children[1], depth + 1, out);
            }
            Node::Tabs(tabs) => {
                let mut titles = Vec::new();
                for (idx, c) in tabs.items.iter().enumerate() {
                    let mut title = c.title();
                    if idx == tabs.active_idx {
                        title.push('*');
                    }
                    titles.push(title);
                }
                let _ = writeln!(out, "{indent}tabs [{}]", titles.join(" "));
            }
        }
    }

    /// Panics when a structural invariant is broken. Called from tests after
    /// every mutation.
    pub fn verify_invariants(&self) {
        let mut reachable = 0;
        if let Some(root) = self.root {
            assert!(self.parent_of(root).is_none(), "root has a parent");
            self.verify_subtree(root, &mut reachable);
        }
        assert_eq!(reachable, self.nodes.len(), "orphan nodes in the slotmap");

        if let Some(active) = self.active_tabs {
            assert!(
                matches!(self.nodes.get(active), Some(Node::Tabs(_))),
                "active group is not a tab group",
            );
        }

        let mut seen = std::collections::HashSet::new();
        for content in self.contents() {
            assert!(seen.insert(content.id().clone()), "duplicate content in the tree");
        }
    }

    fn verify_subtree(&self, key: NodeKey, reachable: &mut usize) {
        *reachable += 1;
        match self.nodes.get(key).expect("dangling child key") {
            Node::Split(split) => {
                for child in split.children {
                    assert!(self.nodes.contains_key(child), "split child missing");
                    self.verify_subtree(child, reachable);
                }
                assert!(
                    (0.0..=1.0).contains(&split.ratio),
                    "divider ratio out of range",
                );
            }
            Node::Tabs(tabs) => {
                if !self.options.keep_empty {
                    assert!(!tabs.items.is_empty(), "empty tab group survived");
                }
                if !tabs.items.is_empty() {
                    assert!(tabs.active_idx < tabs.items.len(), "active index out of range");
                }
            }
        }
    }
}

/// Tab strip rectangle for a tab group rect.
fn strip_rect(rect: Rect, options: &Options) -> Rect {
    let extent = match options.tab_placement {
        TabPlacement::Top | TabPlacement::Bottom => options.tab_strip_extent.min(rect.size.h),
        TabPlacement::Left | TabPlacement::Right => options.tab_strip_extent.min(rect.size.w),
    };
    match options.tab_placement {
        TabPlacement::Top => Rect::new(rect.loc.x, rect.loc.y, rect.size.w, extent),
        TabPlacement::Bottom => Rect::new(
            rect.loc.x,
            rect.bottom() - extent,
            rect.size.w,
            extent,
        ),
        TabPlacement::Left => Rect::new(rect.loc.x, rect.loc.y, extent, rect.size.h),
        TabPlacement::Right => Rect::new(
            rect.right() - extent,
            rect.loc.y,
            extent,
            rect.size.h,
        ),
    }
}

/// Content area of a tab group rect: everything but the strip.
fn content_area(rect: Rect, strip: Option<Rect>, options: &Options) -> Rect {
    let Some(strip) = strip else {
        return rect;
    };
    match options.tab_placement {
        TabPlacement::Top => Rect::new(
            rect.loc.x,
            strip.bottom(),
            rect.size.w,
            rect.size.h - strip.size.h,
        ),
        TabPlacement::Bottom => Rect::new(
            rect.loc.x,
            rect.loc.y,
            rect.size.w,
            rect.size.h - strip.size.h,
        ),
        TabPlacement::Left => Rect::new(
            strip.right(),
            rect.loc.y,
            rect.size.w - strip.size.w,
            rect.size.h,
        ),
        TabPlacement::Right => Rect::new(
            rect.loc.x,
            rect.loc.y,
            rect.size.w - strip.size.w,
            rect.size.h,
        ),
    }
}

/// Along-strip offset of a position and the per-tab extent.
///
/// Tabs share the strip evenly, capped at `tab_max_extent` so short strips
/// keep a trailing end-of-strip hit-zone.
fn strip_offsets(strip: Rect, pos: Point, count: usize, options: &Options) -> (f64, f64) {
    let count = count.max(1) as f64;
    let (offset, length) = if options.tab_placement.is_horizontal() {
        (pos.x - strip.left(), strip.size.w)
    } else {
        (pos.y - strip.top(), strip.size.h)
    };
    let per = (length / count).min(options.tab_max_extent).max(1.0);
    (offset, per)
}

/// Thin marker rectangle at a tab insertion boundary.
fn insert_marker(strip: Rect, per: f64, insert: usize, count: usize, options: &Options) -> Rect {
    let along = (per * insert as f64).min(per * count as f64);
    if options.tab_placement.is_horizontal() {
        let x = (strip.left() + along - INSERT_MARKER / 2.0)
            .min(strip.right() - INSERT_MARKER)
            .max(strip.left());
        Rect::new(x, strip.top(), INSERT_MARKER, strip.size.h)
    } else {
        let y = (strip.top() + along - INSERT_MARKER / 2.0)
            .min(strip.bottom() - INSERT_MARKER)
            .max(strip.top());
        Rect::new(strip.left(), y, strip.size.w, INSERT_MARKER)
    }
}
