//! Types for persisting and restoring paneldock layouts.
//!
//! A saved layout is a recursive nested-list structure, one entry per
//! top-level window. The main window is the entry whose id is `null`.
//!
//! - Window entry: `["p", id, "x,y;w,h" | null, windowState, childList]`
//! - Split entry: `["s", dividerRatio, orientation, leftList, rightList]`
//! - Tab group entry: `["t", [contentId, ...], activeContentId]`
//!
//! The entry types are tuple structs so that the derived serde impls produce
//! exactly these JSON lists. Decoding is fault tolerant per subtree: a
//! corrupt branch is dropped and reported in [`DecodeOutcome::issues`]
//! instead of failing the whole restore.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// List tag for a top-level window entry.
pub const TAG_WINDOW: &str = "p";
/// List tag for a split entry.
pub const TAG_SPLIT: &str = "s";
/// List tag for a tab group entry.
pub const TAG_TABS: &str = "t";

/// Orientation code for a horizontal split (children side by side).
pub const ORIENTATION_HORIZONTAL: u8 = 0;
/// Orientation code for a vertical split (children stacked).
pub const ORIENTATION_VERTICAL: u8 = 1;

/// Divider ratios are clamped into this range when decoding.
const MIN_RATIO: f64 = 0.05;

/// Coarse window state of a persisted top-level window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    #[default]
    Normal,
    Minimized,
    Maximized,
}

impl WindowState {
    /// Integer code stored in the layout format.
    pub fn to_int(self) -> i32 {
        match self {
            WindowState::Normal => 0,
            WindowState::Minimized => 1,
            WindowState::Maximized => 2,
        }
    }

    /// Decodes an integer code; unknown codes map to `None`.
    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            0 => Some(WindowState::Normal),
            1 => Some(WindowState::Minimized),
            2 => Some(WindowState::Maximized),
            _ => None,
        }
    }
}

/// Window bounds encoded as `"x,y;w,h"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundsSpec {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BoundsSpec {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

impl fmt::Display for BoundsSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{};{},{}", self.x, self.y, self.w, self.h)
    }
}

impl FromStr for BoundsSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || format!("invalid bounds spec: {s:?}");
        let (pos, size) = s.split_once(';').ok_or_else(err)?;
        let (x, y) = pos.split_once(',').ok_or_else(err)?;
        let (w, h) = size.split_once(',').ok_or_else(err)?;
        Ok(Self {
            x: x.trim().parse().map_err(|_| err())?,
            y: y.trim().parse().map_err(|_| err())?,
            w: w.trim().parse().map_err(|_| err())?,
            h: h.trim().parse().map_err(|_| err())?,
        })
    }
}

impl Serialize for BoundsSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BoundsSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// One node of a persisted tree: a split or a tab group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeEntry {
    Split(SplitEntry),
    Tabs(TabsEntry),
}

impl NodeEntry {
    /// Collects the content ids of this subtree in left-first order.
    pub fn content_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.collect_content_ids(&mut ids);
        ids
    }

    fn collect_content_ids<'a>(&'a self, ids: &mut Vec<&'a str>) {
        match self {
            NodeEntry::Split(split) => {
                split.3.collect_content_ids(ids);
                split.4.collect_content_ids(ids);
            }
            NodeEntry::Tabs(tabs) => ids.extend(tabs.1.iter().map(String::as_str)),
        }
    }

    /// Validates tags and value ranges, dropping corrupt branches.
    ///
    /// A split with one corrupt side degrades to the surviving side. Returns
    /// `None` when nothing of the subtree is salvageable; every dropped or
    /// repaired piece is reported in `issues`.
    pub fn sanitize(self, issues: &mut Vec<String>) -> Option<NodeEntry> {
        match self {
            NodeEntry::Split(split) => split.sanitize(issues),
            NodeEntry::Tabs(tabs) => tabs.sanitize(issues).map(NodeEntry::Tabs),
        }
    }

    /// Decodes one node from a JSON value, recursing per child so that a
    /// corrupt child drops only its own branch, never a healthy sibling.
    fn from_value(value: &serde_json::Value, issues: &mut Vec<String>) -> Option<NodeEntry> {
        let Some(list) = value.as_array() else {
            issues.push(format!("node entry is not a list ({value}), dropping subtree"));
            return None;
        };
        match list.first().and_then(serde_json::Value::as_str) {
            Some(TAG_SPLIT) => {
                let ratio = match list.get(1).and_then(serde_json::Value::as_f64) {
                    Some(ratio) => ratio,
                    None => {
                        issues.push("split entry with a malformed ratio, using 0.5".to_owned());
                        0.5
                    }
                };
                let orientation = list
                    .get(2)
                    .and_then(serde_json::Value::as_u64)
                    .and_then(|o| u8::try_from(o).ok());
                let Some(orientation) = orientation else {
                    issues.push("split entry with a malformed orientation, dropping subtree".to_owned());
                    return None;
                };
                let first = list.get(3).and_then(|v| Self::from_value(v, issues));
                let second = list.get(4).and_then(|v| Self::from_value(v, issues));
                match (first, second) {
                    (Some(first), Some(second)) => {
                        Some(NodeEntry::Split(SplitEntry::new(ratio, orientation, first, second)))
                    }
                    (Some(side), None) | (None, Some(side)) => {
                        issues.push("split entry lost one side, keeping the other".to_owned());
                        Some(side)
                    }
                    (None, None) => None,
                }
            }
            Some(TAG_TABS) => {
                let Some(raw) = list.get(1).and_then(serde_json::Value::as_array) else {
                    issues.push("tab group entry without an id list, dropping".to_owned());
                    return None;
                };
                let ids: Vec<String> = raw
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect();
                if ids.len() != raw.len() {
                    issues.push("tab group entry with non-string ids, dropping those".to_owned());
                }
                let active = list
                    .get(2)
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_owned);
                Some(NodeEntry::Tabs(TabsEntry::new(ids, active)))
            }
            tag => {
                issues.push(format!("unknown node tag {tag:?}, dropping subtree"));
                None
            }
        }
    }
}

/// A split node: `["s", dividerRatio, orientation, leftList, rightList]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitEntry(
    pub String,
    pub f64,
    pub u8,
    pub Box<NodeEntry>,
    pub Box<NodeEntry>,
);

impl SplitEntry {
    pub fn new(ratio: f64, orientation: u8, first: NodeEntry, second: NodeEntry) -> Self {
        Self(
            TAG_SPLIT.to_owned(),
            ratio,
            orientation,
            Box::new(first),
            Box::new(second),
        )
    }

    pub fn ratio(&self) -> f64 {
        self.1
    }

    pub fn orientation(&self) -> u8 {
        self.2
    }

    pub fn first(&self) -> &NodeEntry {
        &self.3
    }

    pub fn second(&self) -> &NodeEntry {
        &self.4
    }

    fn sanitize(self, issues: &mut Vec<String>) -> Option<NodeEntry> {
        let SplitEntry(tag, mut ratio, orientation, first, second) = self;
        if tag != TAG_SPLIT {
            issues.push(format!("unknown node tag {tag:?}, dropping subtree"));
            return None;
        }
        if orientation != ORIENTATION_HORIZONTAL && orientation != ORIENTATION_VERTICAL {
            issues.push(format!("invalid split orientation {orientation}, dropping subtree"));
            return None;
        }
        if !ratio.is_finite() {
            issues.push(format!("non-finite divider ratio {ratio}, using 0.5"));
            ratio = 0.5;
        }
        let clamped = ratio.clamp(MIN_RATIO, 1.0 - MIN_RATIO);
        if clamped != ratio {
            issues.push(format!("divider ratio {ratio} out of range, clamping"));
            ratio = clamped;
        }

        let first = first.sanitize(issues);
        let second = second.sanitize(issues);
        match (first, second) {
            (Some(first), Some(second)) => {
                Some(NodeEntry::Split(SplitEntry::new(ratio, orientation, first, second)))
            }
            (Some(side), None) | (None, Some(side)) => {
                issues.push("split entry lost one side, keeping the other".to_owned());
                Some(side)
            }
            (None, None) => None,
        }
    }
}

/// A tab group node: `["t", [contentId, ...], activeContentId]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabsEntry(pub String, pub Vec<String>, pub Option<String>);

impl TabsEntry {
    pub fn new(ids: Vec<String>, active: Option<String>) -> Self {
        Self(TAG_TABS.to_owned(), ids, active)
    }

    pub fn ids(&self) -> &[String] {
        &self.1
    }

    pub fn active(&self) -> Option<&str> {
        self.2.as_deref()
    }

    fn sanitize(self, issues: &mut Vec<String>) -> Option<TabsEntry> {
        let TabsEntry(tag, ids, mut active) = self;
        if tag != TAG_TABS {
            issues.push(format!("unknown node tag {tag:?}, dropping subtree"));
            return None;
        }
        if ids.is_empty() {
            issues.push("tab group entry with no contents, dropping".to_owned());
            return None;
        }
        if let Some(id) = &active {
            if !ids.contains(id) {
                issues.push(format!("active content {id:?} not in tab group, using first"));
                active = Some(ids[0].clone());
            }
        }
        Some(TabsEntry(tag, ids, active))
    }
}

/// One persisted top-level window: `["p", id, bounds, windowState, childList]`.
///
/// `childList` holds zero entries for an empty window and one entry
/// otherwise. The main window has `id = None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopoutEntry(
    pub String,
    pub Option<String>,
    pub Option<BoundsSpec>,
    pub i32,
    pub Vec<NodeEntry>,
);

impl PopoutEntry {
    pub fn new(
        id: Option<String>,
        bounds: Option<BoundsSpec>,
        state: WindowState,
        child: Option<NodeEntry>,
    ) -> Self {
        Self(
            TAG_WINDOW.to_owned(),
            id,
            bounds,
            state.to_int(),
            child.into_iter().collect(),
        )
    }

    /// The popout id; `None` for the main window.
    pub fn id(&self) -> Option<&str> {
        self.1.as_deref()
    }

    pub fn bounds(&self) -> Option<BoundsSpec> {
        self.2
    }

    /// Window state; unknown integer codes decode as normal.
    pub fn state(&self) -> WindowState {
        WindowState::from_int(self.3).unwrap_or_default()
    }

    pub fn child(&self) -> Option<&NodeEntry> {
        self.4.first()
    }

    /// Decodes one window entry from a JSON value, salvaging whatever child
    /// structure survives.
    fn from_value(
        value: &serde_json::Value,
        idx: usize,
        issues: &mut Vec<String>,
    ) -> Option<PopoutEntry> {
        let Some(list) = value.as_array() else {
            issues.push(format!("window entry {idx} is not a list, dropping"));
            return None;
        };
        if list.first().and_then(serde_json::Value::as_str) != Some(TAG_WINDOW) {
            issues.push(format!("window entry {idx} has an unknown tag, dropping"));
            return None;
        }
        let id = match list.get(1) {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(id)) => Some(id.clone()),
            Some(other) => {
                issues.push(format!("window entry {idx} has a malformed id ({other}), dropping"));
                return None;
            }
        };
        let bounds = match list.get(2) {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(spec)) => match spec.parse() {
                Ok(bounds) => Some(bounds),
                Err(err) => {
                    issues.push(err);
                    None
                }
            },
            Some(other) => {
                issues.push(format!("window entry {idx} has malformed bounds ({other})"));
                None
            }
        };
        let state = match list
            .get(3)
            .and_then(serde_json::Value::as_i64)
            .and_then(|state| i32::try_from(state).ok())
        {
            Some(state) => state,
            None => {
                issues.push(format!("window entry {idx} has a malformed state, using normal"));
                0
            }
        };
        let children: Vec<NodeEntry> = list
            .get(4)
            .and_then(serde_json::Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| NodeEntry::from_value(entry, issues))
                    .collect()
            })
            .unwrap_or_default();
        Some(PopoutEntry(TAG_WINDOW.to_owned(), id, bounds, state, children))
    }

    fn sanitize(self, issues: &mut Vec<String>) -> Option<PopoutEntry> {
        let PopoutEntry(tag, id, bounds, state, children) = self;
        if tag != TAG_WINDOW {
            issues.push(format!("unknown window tag {tag:?}, dropping window entry"));
            return None;
        }
        if WindowState::from_int(state).is_none() {
            issues.push(format!("unknown window state {state}, using normal"));
        }
        if children.len() > 1 {
            issues.push("window entry with more than one child, keeping the first".to_owned());
        }
        let child = children
            .into_iter()
            .next()
            .and_then(|child| child.sanitize(issues));
        Some(PopoutEntry::new(
            id,
            bounds,
            WindowState::from_int(state).unwrap_or_default(),
            child,
        ))
    }
}

/// A complete persisted layout: the list of window entries.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DockLayout {
    pub windows: Vec<PopoutEntry>,
}

/// Result of a fault-tolerant decode: whatever could be salvaged, plus a
/// description of every branch that was repaired or dropped.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DecodeOutcome {
    pub layout: DockLayout,
    pub issues: Vec<String>,
}

impl DockLayout {
    /// The entry for the main window, if the layout has one.
    pub fn main_window(&self) -> Option<&PopoutEntry> {
        self.windows.iter().find(|entry| entry.id().is_none())
    }

    /// The entry for the given popout id.
    pub fn popout(&self, id: &str) -> Option<&PopoutEntry> {
        self.windows.iter().find(|entry| entry.id() == Some(id))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    /// Decodes a layout from JSON text.
    ///
    /// Only unparseable top-level JSON is an error; corrupt entries inside a
    /// well-formed list are skipped per subtree and reported in the outcome.
    pub fn from_json(text: &str) -> serde_json::Result<DecodeOutcome> {
        let value = serde_json::from_str(text)?;
        Ok(Self::from_value(&value))
    }

    /// Decodes a layout from a JSON value, skipping corrupt branches.
    pub fn from_value(value: &serde_json::Value) -> DecodeOutcome {
        let mut outcome = DecodeOutcome::default();

        let Some(entries) = value.as_array() else {
            outcome.issues.push("layout is not a list".to_owned());
            return outcome;
        };

        for (idx, entry) in entries.iter().enumerate() {
            let Some(window) = PopoutEntry::from_value(entry, idx, &mut outcome.issues) else {
                continue;
            };
            if let Some(window) = window.sanitize(&mut outcome.issues) {
                outcome.layout.windows.push(window);
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use serde_json::json;

    use super::*;

    fn sample_layout() -> DockLayout {
        DockLayout {
            windows: vec![
                PopoutEntry::new(
                    None,
                    None,
                    WindowState::Normal,
                    Some(NodeEntry::Split(SplitEntry::new(
                        0.5,
                        ORIENTATION_HORIZONTAL,
                        NodeEntry::Tabs(TabsEntry::new(
                            vec!["a".to_owned(), "b".to_owned()],
                            Some("a".to_owned()),
                        )),
                        NodeEntry::Tabs(TabsEntry::new(vec!["c".to_owned()], Some("c".to_owned()))),
                    ))),
                ),
                PopoutEntry::new(
                    Some("popout-1".to_owned()),
                    Some(BoundsSpec::new(40, 60, 800, 600)),
                    WindowState::Normal,
                    Some(NodeEntry::Tabs(TabsEntry::new(
                        vec!["d".to_owned()],
                        Some("d".to_owned()),
                    ))),
                ),
            ],
        }
    }

    #[test]
    fn bounds_spec_round_trip() {
        let bounds = BoundsSpec::new(-10, 20, 640, 480);
        let text = bounds.to_string();
        assert_eq!(text, "-10,20;640,480");
        assert_eq!(text.parse::<BoundsSpec>().unwrap(), bounds);

        assert!("10;20,30".parse::<BoundsSpec>().is_err());
        assert!("a,b;c,d".parse::<BoundsSpec>().is_err());
    }

    #[test]
    fn layout_encodes_as_nested_lists() {
        let json = sample_layout().to_json().unwrap();
        assert_snapshot!(json, @r#"[["p",null,null,0,[["s",0.5,0,["t",["a","b"],"a"],["t",["c"],"c"]]]],["p","popout-1","40,60;800,600",0,[["t",["d"],"d"]]]]"#);
    }

    #[test]
    fn layout_round_trip() {
        let layout = sample_layout();
        let json = layout.to_json().unwrap();
        let outcome = DockLayout::from_json(&json).unwrap();
        assert!(outcome.issues.is_empty(), "{:?}", outcome.issues);
        assert_eq!(outcome.layout, layout);
    }

    #[test]
    fn corrupt_branch_is_skipped_not_fatal() {
        let value = json!([
            ["p", null, null, 0, [["s", 0.5, 0, ["t", ["a"], "a"], ["x", ["b"], "b"]]]],
            ["q", "popout-1", null, 0, []],
            ["p", "popout-2", null, 7, [["t", ["c"], "nope"]]],
        ]);

        let outcome = DockLayout::from_value(&value);
        assert!(!outcome.issues.is_empty());

        // The bad half of the split degrades to the surviving side.
        let main = outcome.layout.main_window().unwrap();
        let NodeEntry::Tabs(tabs) = main.child().unwrap() else {
            panic!("expected the surviving tab group");
        };
        assert_eq!(tabs.ids(), ["a"]);

        // The window with the unknown tag is gone entirely.
        assert!(outcome.layout.popout("popout-1").is_none());

        // Unknown state and bad active id are repaired in place.
        let popout = outcome.layout.popout("popout-2").unwrap();
        assert_eq!(popout.state(), WindowState::Normal);
        let NodeEntry::Tabs(tabs) = popout.child().unwrap() else {
            panic!("expected a tab group");
        };
        assert_eq!(tabs.active(), Some("c"));
    }

    #[test]
    fn garbage_node_drops_only_its_own_branch() {
        // One side of the split is structural garbage; the healthy sibling
        // and the window itself must survive.
        let value = json!([
            ["p", null, null, 0, [["s", 0.5, 0, ["t", ["a"], "a"], 42]]],
        ]);

        let outcome = DockLayout::from_value(&value);
        assert!(!outcome.issues.is_empty());

        let main = outcome.layout.main_window().expect("main window survives");
        let NodeEntry::Tabs(tabs) = main.child().unwrap() else {
            panic!("expected the surviving tab group");
        };
        assert_eq!(tabs.ids(), ["a"]);
    }

    #[test]
    fn unparseable_window_entry_keeps_the_rest() {
        let value = json!([
            42,
            ["p", null, null, 0, [["t", ["a"], "a"]]],
        ]);

        let outcome = DockLayout::from_value(&value);
        assert_eq!(outcome.layout.windows.len(), 1);
        assert_eq!(outcome.issues.len(), 1);
    }

    #[test]
    fn content_ids_walk_left_first() {
        let layout = sample_layout();
        let ids = layout.windows[0].child().unwrap().content_ids();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
