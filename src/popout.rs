//! Popout windows and the host window backend.
//!
//! A popout is a secondary top-level window carrying its own [`DockTree`].
//! Toolkit windows are expensive to create, so closed popout windows go
//! into a small pool (one spare per window kind) and are reused by the next
//! popout of the same kind.

use std::fmt;
use std::rc::Rc;

use crate::content::DockContent;
use crate::geometry::Rect;
use crate::options::{Options, PopoutKind};
use crate::tree::DockTree;

pub use paneldock_persist::WindowState;

/// Default bounds for a popout the host never positioned.
const DEFAULT_POPOUT_RECT: Rect = Rect {
    loc: crate::geometry::Point { x: 0.0, y: 0.0 },
    size: crate::geometry::Size { w: 800.0, h: 600.0 },
};

/// Stable identity of one popout window, also used in persisted layouts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PopoutId(String);

impl PopoutId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PopoutId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for PopoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One top-level window of the docking forest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WindowKey {
    Main,
    Popout(PopoutId),
}

/// The host's window toolkit, as seen by the engine.
///
/// The engine decides *when* windows appear and disappear; the backend does
/// the actual toolkit work and reports focus changes back through
/// [`resolve_focus`](Self::resolve_focus).
pub trait DockBackend<C: DockContent> {
    /// A live toolkit window.
    type Window;
    /// Whatever the toolkit reports as the newly focused component.
    type FocusOwner;

    fn create_window(&mut self, kind: PopoutKind) -> Self::Window;

    fn show_window(&mut self, window: &Self::Window, bounds: Option<Rect>, state: WindowState);

    fn hide_window(&mut self, window: &Self::Window);

    fn destroy_window(&mut self, window: Self::Window);

    /// Maps a toolkit focus owner to the docked content containing it, if
    /// any.
    fn resolve_focus(&self, owner: &Self::FocusOwner) -> Option<C::Id>;
}

/// An open popout window.
#[derive(Debug)]
pub struct Popout<C: DockContent, W> {
    pub id: PopoutId,
    pub kind: PopoutKind,
    pub tree: DockTree<C>,
    pub window: W,
    /// Last host-reported bounds; `None` until the host reports any.
    pub bounds: Option<Rect>,
    pub state: WindowState,
}

#[derive(Debug)]
struct PooledWindow<W> {
    kind: PopoutKind,
    window: W,
}

/// The open popouts plus the pool of hidden, reusable windows.
#[derive(Debug)]
pub struct PopoutRegistry<C: DockContent, W> {
    open: Vec<Popout<C, W>>,
    pool: Vec<PooledWindow<W>>,
    next_id: u64,
}

impl<C: DockContent, W> Default for PopoutRegistry<C, W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: DockContent, W> PopoutRegistry<C, W> {
    pub fn new() -> Self {
        Self {
            open: Vec::new(),
            pool: Vec::new(),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Popout<C, W>> {
        self.open.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Popout<C, W>> {
        self.open.iter_mut()
    }

    pub fn get(&self, id: &PopoutId) -> Option<&Popout<C, W>> {
        self.open.iter().find(|p| p.id == *id)
    }

    pub fn get_mut(&mut self, id: &PopoutId) -> Option<&mut Popout<C, W>> {
        self.open.iter_mut().find(|p| p.id == *id)
    }

    /// A generated id no open popout uses.
    pub fn fresh_id(&mut self) -> PopoutId {
        loop {
            self.next_id += 1;
            let id = PopoutId(format!("popout-{}", self.next_id));
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    /// How many hidden windows of this kind sit in the pool.
    pub fn pooled(&self, kind: PopoutKind) -> usize {
        self.pool.iter().filter(|p| p.kind == kind).count()
    }

    /// Opens a popout window, reusing a pooled toolkit window of the same
    /// kind when one is available.
    pub fn open_popout<B>(
        &mut self,
        backend: &mut B,
        kind: PopoutKind,
        options: Rc<Options>,
        id: Option<PopoutId>,
        bounds: Option<Rect>,
        state: WindowState,
    ) -> &mut Popout<C, W>
    where
        B: DockBackend<C, Window = W>,
    {
        let id = match id {
            Some(id) if self.get(&id).is_none() => id,
            _ => self.fresh_id(),
        };

        let window = match self.pool.iter().position(|p| p.kind == kind) {
            Some(pos) => self.pool.remove(pos).window,
            None => backend.create_window(kind),
        };
        backend.show_window(&window, bounds, state);

        // The tree lays out in window-local coordinates.
        let size = bounds.unwrap_or(DEFAULT_POPOUT_RECT).size;
        let tree = DockTree::new(Rect::from_size(size), options);
        self.open.push(Popout {
            id,
            kind,
            tree,
            window,
            bounds,
            state,
        });
        self.open.last_mut().unwrap()
    }

    /// Closes a popout, hides its window, and keeps one spare window per
    /// kind in the pool. Returns the popout's tree, contents intact.
    pub fn close_popout<B>(&mut self, backend: &mut B, id: &PopoutId) -> Option<DockTree<C>>
    where
        B: DockBackend<C, Window = W>,
    {
        let pos = self.open.iter().position(|p| p.id == *id)?;
        let popout = self.open.remove(pos);
        backend.hide_window(&popout.window);
        if self.pooled(popout.kind) == 0 {
            self.pool.push(PooledWindow {
                kind: popout.kind,
                window: popout.window,
            });
        } else {
            backend.destroy_window(popout.window);
        }
        Some(popout.tree)
    }
}
