//! Drag session state and drop proposals.
//!
//! One drag session exists per application, driven by the manager from host
//! pointer events. A press on a tab enters [`DragState::Starting`]
//! (rubberbanding: the tab stays put); once the pointer travels far enough
//! for long enough the session promotes to [`DragState::Dragging`], and
//! every pointer move asks the tree under the cursor for a [`DropProposal`].

use std::time::Duration;

use crate::geometry::{Orientation, Point, Rect, SplitSide};
use crate::options::{Color, Options};
use crate::popout::WindowKey;
use crate::tree::NodeKey;

/// What a tree is willing to do with a drop at some position.
#[derive(Debug, Clone, PartialEq)]
pub struct DropProposal {
    pub target: DropTarget,
    /// Rectangle the host overlay should highlight.
    pub highlight: Rect,
}

impl DropProposal {
    pub fn new(target: DropTarget, highlight: Rect) -> Self {
        Self { target, highlight }
    }

    /// The explicit "matched but illegal" sentinel. It stops the target
    /// search without letting a target behind this position win.
    pub fn invalid(highlight: Rect) -> Self {
        Self::new(DropTarget::Invalid, highlight)
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self.target, DropTarget::Invalid)
    }
}

/// The structural operation a drop would perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// Drop into an empty window, becoming its first tab group.
    Root,
    /// Insert as a tab of `node` at `index`.
    Tab { node: NodeKey, index: usize },
    /// Wrap `node` in a new split, with the dropped content on `side`.
    Split {
        node: NodeKey,
        orientation: Orientation,
        side: SplitSide,
    },
    /// Geometrically matched but illegal (e.g. the slot the dragged tab
    /// already occupies).
    Invalid,
}

/// Where a drag started: the tab being dragged and its slot.
#[derive(Debug, Clone)]
pub struct DragSource<Id> {
    pub window: WindowKey,
    pub content: Id,
    pub node: NodeKey,
    pub index: usize,
}

/// The application-wide drag session.
#[derive(Debug, Clone)]
pub enum DragState<Id> {
    Idle,
    /// Pressed on a tab; the content remains in place until the pointer
    /// travels beyond the thresholds.
    Starting {
        source: DragSource<Id>,
        press_pos: Point,
        press_time: Duration,
    },
    /// Live drag; overlays are visible and drop proposals are evaluated on
    /// every pointer move.
    Dragging(DragData<Id>),
}

impl<Id> Default for DragState<Id> {
    fn default() -> Self {
        DragState::Idle
    }
}

impl<Id> DragState<Id> {
    pub fn is_idle(&self) -> bool {
        matches!(self, DragState::Idle)
    }

    pub fn dragging(&self) -> Option<&DragData<Id>> {
        match self {
            DragState::Dragging(data) => Some(data),
            _ => None,
        }
    }
}

/// State of a live drag.
#[derive(Debug, Clone)]
pub struct DragData<Id> {
    pub source: DragSource<Id>,
    /// Window currently under the pointer; `None` outside every window.
    pub over: Option<WindowKey>,
    /// Pointer position local to `over`.
    pub last_pos: Point,
    /// Proposal for the current position, if any.
    pub proposal: Option<DropProposal>,
}

/// Overlay feedback for the host: where to paint the drop highlight.
#[derive(Debug, Clone, PartialEq)]
pub struct DragFeedback {
    pub window: WindowKey,
    pub highlight: Rect,
    pub fill: Color,
    pub line: Color,
}

/// Whether a pressed tab has moved far enough, for long enough, to become a
/// live drag.
pub(crate) fn should_promote(
    press_pos: Point,
    press_time: Duration,
    pos: Point,
    now: Duration,
    options: &Options,
) -> bool {
    press_pos.distance(pos) >= options.drag_distance_threshold
        && now.saturating_sub(press_time) >= options.drag_hold_threshold
}
