//! Configurable properties of the docking layout.
//!
//! One [`Options`] value is shared by every tree via `Rc` and swapped
//! wholesale when the host changes a setting.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Which edge of a tab group carries the tab strip.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TabPlacement {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
}

impl TabPlacement {
    /// Whether the strip runs along a horizontal edge (tabs side by side).
    pub fn is_horizontal(self) -> bool {
        matches!(self, TabPlacement::Top | TabPlacement::Bottom)
    }
}

/// What a renderer should do when tabs outgrow the strip.
///
/// Hit-testing is unaffected; this is carried for the host's tab renderer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TabOverflow {
    #[default]
    Wrap,
    Scroll,
}

/// Mouse-wheel tab switching.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WheelSwitching {
    #[default]
    Off,
    /// Only when the pointer is over the tab strip.
    OverTabStrip,
    /// Anywhere over the tab group.
    Anywhere,
}

/// Comparator used by [`TabOrder::Custom`]; compares display titles.
pub type TabComparator = dyn Fn(&str, &str) -> Ordering;

/// Where a newly inserted content lands within a tab group.
#[derive(Default, Clone)]
pub enum TabOrder {
    /// Append in insertion order.
    #[default]
    Insertion,
    /// Case-insensitive alphabetical by title.
    Alphabetical,
    /// Host-supplied comparator over titles.
    Custom(Rc<TabComparator>),
}

impl TabOrder {
    /// Insertion index for `title` among `titles` (the group's current tab
    /// titles in order): the first index whose existing title compares
    /// greater.
    pub fn insert_index<'a>(&self, titles: impl Iterator<Item = &'a str>, title: &str) -> usize {
        match self {
            TabOrder::Insertion => titles.count(),
            TabOrder::Alphabetical => {
                let title = title.to_lowercase();
                let mut idx = 0;
                for existing in titles {
                    if existing.to_lowercase() > title {
                        return idx;
                    }
                    idx += 1;
                }
                idx
            }
            TabOrder::Custom(cmp) => {
                let mut idx = 0;
                for existing in titles {
                    if cmp(existing, title) == Ordering::Greater {
                        return idx;
                    }
                    idx += 1;
                }
                idx
            }
        }
    }
}

impl fmt::Debug for TabOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabOrder::Insertion => write!(f, "Insertion"),
            TabOrder::Alphabetical => write!(f, "Alphabetical"),
            TabOrder::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Kind of toolkit window used for popouts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PopoutKind {
    Dialog,
    #[default]
    Frame,
    /// Popping out is disabled.
    None,
}

/// Straight-alpha RGBA color for the drop highlight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Configurable properties, propagated to every node.
#[derive(Debug, Clone)]
pub struct Options {
    pub tab_placement: TabPlacement,
    pub tab_overflow: TabOverflow,
    pub wheel_switching: WheelSwitching,
    pub tab_order: TabOrder,
    /// Window kind for explicit popout requests.
    pub popout_kind: PopoutKind,
    /// Window kind for drag-outside popouts; `None` disables popout on drag.
    pub drag_popout_kind: PopoutKind,
    /// Thickness of the divider between split children.
    pub divider_size: f64,
    /// Thickness of the tab strip (height for top/bottom, width for
    /// left/right placement).
    pub tab_strip_extent: f64,
    /// Maximum extent of a single tab along the strip. Tabs share the strip
    /// evenly but never grow beyond this, which leaves a trailing hit-zone
    /// for end-of-strip drops.
    pub tab_max_extent: f64,
    pub drop_fill: Color,
    pub drop_line: Color,
    /// When set, emptied tab groups and popouts persist instead of
    /// self-eliminating.
    pub keep_empty: bool,
    /// Pointer travel before a pressed tab becomes a drag.
    pub drag_distance_threshold: f64,
    /// Hold time before a pressed tab becomes a drag.
    pub drag_hold_threshold: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tab_placement: TabPlacement::default(),
            tab_overflow: TabOverflow::default(),
            wheel_switching: WheelSwitching::default(),
            tab_order: TabOrder::default(),
            popout_kind: PopoutKind::Frame,
            drag_popout_kind: PopoutKind::Frame,
            divider_size: 5.0,
            tab_strip_extent: 28.0,
            tab_max_extent: 160.0,
            drop_fill: Color::from_rgba8(0x3d, 0x7a, 0xff, 0x40),
            drop_line: Color::from_rgba8(0x3d, 0x7a, 0xff, 0xff),
            keep_empty: false,
            drag_distance_threshold: 6.0,
            drag_hold_threshold: Duration::from_millis(120),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_appends() {
        let order = TabOrder::Insertion;
        assert_eq!(order.insert_index(["b", "a"].into_iter(), "c"), 2);
    }

    #[test]
    fn alphabetical_is_case_insensitive() {
        let order = TabOrder::Alphabetical;
        let titles = ["Alpha", "charlie"];
        assert_eq!(order.insert_index(titles.into_iter(), "Bravo"), 1);
        assert_eq!(order.insert_index(titles.into_iter(), "delta"), 2);
        assert_eq!(order.insert_index(titles.into_iter(), "AAA"), 0);
    }

    #[test]
    fn custom_comparator_wins() {
        // Reverse alphabetical.
        let order = TabOrder::Custom(Rc::new(|a: &str, b: &str| b.cmp(a)));
        let titles = ["c", "b"];
        assert_eq!(order.insert_index(titles.into_iter(), "a"), 2);
        assert_eq!(order.insert_index(titles.into_iter(), "d"), 0);
    }
}
