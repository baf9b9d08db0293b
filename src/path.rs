//! Path addresses into the docking forest.
//!
//! A [`DockPath`] describes where a content currently is, or should be
//! placed once its destination exists: an ordered root-to-leaf list of
//! directives. Paths are built bottom-up by [`crate::DockTree::path_of`] and
//! consumed top-down when locating a target. They compare structurally, so a
//! path recorded from one tree can be replayed against another.

use std::fmt;

use crate::geometry::{Orientation, SplitSide};
use crate::popout::PopoutId;

/// One directive of a path, root first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathEntry {
    /// The content lives in this popout window. Only valid as the first
    /// entry.
    Popout(PopoutId),
    /// Descend into this side of a split of this orientation.
    Split {
        orientation: Orientation,
        side: SplitSide,
    },
    /// The tab index within the final tab group.
    Tab(usize),
}

/// A root-to-leaf address into the docking forest.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DockPath {
    entries: Vec<PathEntry>,
}

impl DockPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<PathEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[PathEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: PathEntry) {
        self.entries.push(entry);
    }

    /// Prepends a popout directive, addressing the same slot within that
    /// popout's window.
    pub fn in_popout(mut self, id: PopoutId) -> Self {
        self.entries.insert(0, PathEntry::Popout(id));
        self
    }

    /// The popout this path points into, if its first entry names one.
    pub fn popout_id(&self) -> Option<&PopoutId> {
        match self.entries.first() {
            Some(PathEntry::Popout(id)) => Some(id),
            _ => None,
        }
    }

    /// The entries below the window root: everything except a leading popout
    /// directive.
    pub fn within_window(&self) -> &[PathEntry] {
        match self.entries.first() {
            Some(PathEntry::Popout(_)) => &self.entries[1..],
            _ => &self.entries,
        }
    }
}

impl fmt::Display for DockPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            match entry {
                PathEntry::Popout(id) => write!(f, "popout:{id}")?,
                PathEntry::Split { orientation, side } => {
                    let o = match orientation {
                        Orientation::Horizontal => 'h',
                        Orientation::Vertical => 'v',
                    };
                    let s = match side {
                        SplitSide::First => '1',
                        SplitSide::Second => '2',
                    };
                    write!(f, "split:{o}{s}")?;
                }
                PathEntry::Tab(idx) => write!(f, "tab:{idx}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_compare_structurally() {
        let a = DockPath::from_entries(vec![
            PathEntry::Split {
                orientation: Orientation::Horizontal,
                side: SplitSide::First,
            },
            PathEntry::Tab(1),
        ]);
        let b = DockPath::from_entries(vec![
            PathEntry::Split {
                orientation: Orientation::Horizontal,
                side: SplitSide::First,
            },
            PathEntry::Tab(1),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn leading_popout_entry_is_split_off() {
        let path = DockPath::from_entries(vec![PathEntry::Tab(0)])
            .in_popout(PopoutId::from("popout-3".to_owned()));
        assert_eq!(path.popout_id().unwrap().as_str(), "popout-3");
        assert_eq!(path.within_window(), &[PathEntry::Tab(0)]);
        assert_eq!(path.to_string(), "popout:popout-3/tab:0");
    }
}
