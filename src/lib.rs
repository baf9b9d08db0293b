//! A toolkit-agnostic docking and tiling panel layout engine.
//!
//! Host applications hand opaque panels ("content") to a [`DockManager`],
//! which arranges them into tab groups, binary splits and secondary popout
//! windows. The engine owns the logical tree and the drag-and-drop protocol;
//! rendering, window decoration and input remain with the host, which talks
//! to the engine through two seams:
//!
//! - [`DockContent`]: implemented by each panel (identity, titles, change
//!   notification).
//! - [`DockBackend`]: implemented once per toolkit binding (window creation
//!   for popouts, focus-owner resolution).
//!
//! Everything is single threaded: all mutation happens on the host's UI
//! event thread, and time-dependent behavior reads an injectable [`Clock`]
//! instead of running timers.
//!
//! Layouts persist through the nested-list format in [`paneldock_persist`],
//! re-exported as [`persist`].

pub mod clock;
pub mod content;
pub mod drag;
pub mod geometry;
pub mod manager;
pub mod options;
pub mod path;
pub mod popout;
pub mod tree;

#[cfg(test)]
mod tests;

pub use paneldock_persist as persist;

pub use clock::Clock;
pub use content::{ContentChange, ContentEvents, DockContent, Subscription};
pub use drag::{DragFeedback, DragState, DropProposal, DropTarget};
pub use geometry::{Orientation, Point, Rect, Size, SplitSide};
pub use manager::{ActiveChangeCause, DockEvent, DockManager};
pub use options::{Color, Options, PopoutKind, TabOrder, TabOverflow, TabPlacement, WheelSwitching};
pub use path::{DockPath, PathEntry};
pub use popout::{DockBackend, PopoutId, WindowKey, WindowState};
pub use tree::{DockTree, NodeKey, RelativeDir};
