//! Panel arrangement engine.
//!
//! Owns the local arrangement state: panel order, layout mode, maximized
//! panel, drag gesture and split shares. Layout modes only map `order` onto
//! screen regions; nothing here reorders panels except an explicit move.
//!
//! ```text
//!   dynamic      grid         focus-left      focus-top
//!  ┌──┬──┬──┐  ┌────┬────┐  ┌──────┬───┐   ┌──────────┐
//!  │a │b │c │  │ a  │ b  │  │      │ b │   │    a     │
//!  │  │  │  │  ├────┼────┤  │  a   ├───┤   ├─────┬────┤
//!  │  │  │  │  │ c  │    │  │      │ c │   │  b  │ c  │
//!  └──┴──┴──┘  └────┴────┘  └──────┴───┘   └─────┴────┘
//! ```
//!
//! Invalid gestures (drop outside a target, a divider that does not exist)
//! are absorbed as no-ops and reported through the `bool` return values.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Pointer travel before a press becomes a drag.
pub const DRAG_ACTIVATION_DISTANCE: f64 = 10.0;

/// Initial share of the primary region in the focus layouts.
pub const PRIMARY_SHARE: f64 = 0.66;

/// No pane shrinks below this fraction of its split.
pub const MIN_SHARE: f64 = 0.05;

/// Most panels the grid layout will hold.
pub const GRID_CAPACITY: usize = 4;

// ─── Layout modes ─────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    /// All panels side by side as resizable horizontal splits.
    #[default]
    #[serde(rename = "dynamic")]
    Row,
    /// Two-column wrap, one column below two panels.
    Grid,
    /// First panel fills a large left region; the rest stack on the right.
    FocusLeft,
    /// First panel fills a large top region; the rest sit side by side below.
    FocusTop,
}

impl LayoutMode {
    pub const ALL: [LayoutMode; 4] = [
        LayoutMode::Row,
        LayoutMode::Grid,
        LayoutMode::FocusLeft,
        LayoutMode::FocusTop,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            LayoutMode::Row => "Dynamic Columns",
            LayoutMode::Grid => "Grid",
            LayoutMode::FocusLeft => "Focus Left",
            LayoutMode::FocusTop => "Focus Top",
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        match self {
            LayoutMode::Grid => Some(GRID_CAPACITY),
            _ => None,
        }
    }

    /// Axis of the primary split in the focus modes.
    fn primary_axis(&self) -> Option<Axis> {
        match self {
            LayoutMode::FocusLeft => Some(Axis::Horizontal),
            LayoutMode::FocusTop => Some(Axis::Vertical),
            _ => None,
        }
    }
}

/// Direction along which a split lays out its panes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn opposite(self) -> Self {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}

// ─── Geometry ─────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    fn split(&self, axis: Axis, shares: &[f64]) -> Vec<Rect> {
        let total: f64 = shares.iter().sum();
        let mut offset = 0.0;
        shares
            .iter()
            .map(|share| {
                let fraction = if total > 0.0 { share / total } else { 0.0 };
                let rect = match axis {
                    Axis::Horizontal => Rect::new(
                        self.x + offset * self.width,
                        self.y,
                        fraction * self.width,
                        self.height,
                    ),
                    Axis::Vertical => Rect::new(
                        self.x,
                        self.y + offset * self.height,
                        self.width,
                        fraction * self.height,
                    ),
                };
                offset += fraction;
                rect
            })
            .collect()
    }
}

// ─── Plans ────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Pane {
    pub id: String,
    pub share: f64,
}

/// How the current order maps onto the surface.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutPlan {
    Empty,
    /// One panel on the whole surface; the layout mode is suppressed.
    Maximized { id: String },
    Split { axis: Axis, panes: Vec<Pane> },
    Grid { columns: usize, cells: Vec<String> },
    Focus {
        /// Axis of the primary/secondary split.
        axis: Axis,
        primary: Pane,
        secondary_share: f64,
        /// Laid out along `axis.opposite()`.
        secondary: Vec<Pane>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub id: String,
    pub rect: Rect,
}

impl LayoutPlan {
    /// Screen regions for each visible panel, in order.
    pub fn regions(&self, surface: Rect) -> Vec<Region> {
        match self {
            LayoutPlan::Empty => Vec::new(),
            LayoutPlan::Maximized { id } => vec![Region {
                id: id.clone(),
                rect: surface,
            }],
            LayoutPlan::Split { axis, panes } => {
                let shares: Vec<f64> = panes.iter().map(|p| p.share).collect();
                panes
                    .iter()
                    .zip(surface.split(*axis, &shares))
                    .map(|(pane, rect)| Region {
                        id: pane.id.clone(),
                        rect,
                    })
                    .collect()
            }
            LayoutPlan::Grid { columns, cells } => {
                let columns = (*columns).max(1);
                let rows = cells.len().div_ceil(columns).max(1);
                let cell_w = surface.width / columns as f64;
                let cell_h = surface.height / rows as f64;
                cells
                    .iter()
                    .enumerate()
                    .map(|(i, id)| Region {
                        id: id.clone(),
                        rect: Rect::new(
                            surface.x + (i % columns) as f64 * cell_w,
                            surface.y + (i / columns) as f64 * cell_h,
                            cell_w,
                            cell_h,
                        ),
                    })
                    .collect()
            }
            LayoutPlan::Focus {
                axis,
                primary,
                secondary_share,
                secondary,
            } => {
                let outer = surface.split(*axis, &[primary.share, *secondary_share]);
                let mut regions = vec![Region {
                    id: primary.id.clone(),
                    rect: outer[0],
                }];
                let shares: Vec<f64> = secondary.iter().map(|p| p.share).collect();
                regions.extend(
                    secondary
                        .iter()
                        .zip(outer[1].split(axis.opposite(), &shares))
                        .map(|(pane, rect)| Region {
                            id: pane.id.clone(),
                            rect,
                        }),
                );
                regions
            }
        }
    }
}

// ─── Gestures ─────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    /// Pointer is down on a panel handle but has not moved far enough.
    Pressed { source: String, origin: Point },
    Dragging { source: String },
}

/// Which split a divider belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SplitGroup {
    /// The single row of the dynamic layout.
    Row,
    /// Between the primary and secondary regions of a focus layout.
    Primary,
    /// Inside the secondary region of a focus layout.
    Secondary,
}

/// Divider between panes `index` and `index + 1` of a split.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DividerId {
    pub group: SplitGroup,
    pub index: usize,
}

impl DividerId {
    pub fn new(group: SplitGroup, index: usize) -> Self {
        Self { group, index }
    }
}

/// Move `source` to `target`'s position: remove, then insert. Returns the
/// input unchanged when either id is missing or they are the same.
pub fn reorder(order: &[String], source: &str, target: &str) -> Vec<String> {
    let from = order.iter().position(|id| id == source);
    let to = order.iter().position(|id| id == target);
    match (from, to) {
        (Some(from), Some(to)) if from != to => {
            let mut next = order.to_vec();
            let moved = next.remove(from);
            next.insert(to, moved);
            next
        }
        _ => order.to_vec(),
    }
}

// ─── Engine ───────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct ArrangementEngine {
    order: Vec<String>,
    layout: LayoutMode,
    maximized: Option<String>,
    resizing: Option<DividerId>,
    drag: DragState,
    /// Split shares keyed by group membership; a membership change falls back
    /// to the defaults.
    shares: HashMap<String, Vec<f64>>,
}

impl ArrangementEngine {
    pub fn new(order: impl IntoIterator<Item = String>) -> Self {
        Self {
            order: order.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn layout(&self) -> LayoutMode {
        self.layout
    }

    pub fn maximized(&self) -> Option<&str> {
        self.maximized.as_deref()
    }

    pub fn is_resizing(&self) -> bool {
        self.resizing.is_some()
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    /// Embedded content should stop taking pointer input while a divider or
    /// panel is being dragged.
    pub fn suspends_embedded_input(&self) -> bool {
        self.is_resizing() || self.is_dragging()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.order.iter().any(|p| p == id)
    }

    // ── Membership ──

    pub fn can_add(&self) -> bool {
        self.layout
            .capacity()
            .map_or(true, |cap| self.order.len() < cap)
    }

    pub fn add(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.contains(&id) {
            return false;
        }
        self.order.push(id);
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.order.len();
        self.order.retain(|p| p != id);
        if self.order.len() == before {
            return false;
        }
        self.forget_missing();
        true
    }

    /// Adopt the canonical order from the persisted panel list.
    pub fn sync_order(&mut self, ids: impl IntoIterator<Item = String>) {
        self.order = ids.into_iter().collect();
        self.forget_missing();
    }

    fn forget_missing(&mut self) {
        if let Some(id) = &self.maximized {
            if !self.order.contains(id) {
                self.maximized = None;
            }
        }
        let source = match &self.drag {
            DragState::Pressed { source, .. } | DragState::Dragging { source } => {
                Some(source.clone())
            }
            DragState::Idle => None,
        };
        if let Some(source) = source {
            if !self.contains(&source) {
                self.drag = DragState::Idle;
            }
        }
        if self.resizing.is_some_and(|d| !self.divider_exists(d)) {
            self.resizing = None;
        }
    }

    // ── Layout and maximize ──

    pub fn set_layout(&mut self, layout: LayoutMode) {
        if self.layout != layout {
            tracing::debug!("Layout {:?} -> {:?}", self.layout, layout);
            self.layout = layout;
            self.resizing = None;
        }
    }

    pub fn maximize(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.maximized = Some(id.to_string());
        self.drag = DragState::Idle;
        self.resizing = None;
        true
    }

    pub fn restore(&mut self) {
        self.maximized = None;
    }

    // ── Reorder ──

    /// Move `source` onto `target`'s slot. Disabled while a panel is maximized.
    pub fn move_panel(&mut self, source: &str, target: &str) -> bool {
        if self.maximized.is_some() {
            return false;
        }
        let next = reorder(&self.order, source, target);
        if next == self.order {
            return false;
        }
        self.order = next;
        true
    }

    /// Keyboard equivalent of a drag: shift a panel by `offset` slots,
    /// clamped to the ends.
    pub fn move_by(&mut self, id: &str, offset: isize) -> bool {
        let Some(from) = self.order.iter().position(|p| p == id) else {
            return false;
        };
        let last = self.order.len() as isize - 1;
        let to = (from as isize + offset).clamp(0, last) as usize;
        let target = self.order[to].clone();
        self.move_panel(id, &target)
    }

    pub fn pointer_down(&mut self, id: &str, at: Point) {
        if self.maximized.is_some() || !self.contains(id) {
            return;
        }
        self.drag = DragState::Pressed {
            source: id.to_string(),
            origin: at,
        };
    }

    pub fn pointer_move(&mut self, at: Point) {
        if let DragState::Pressed { source, origin } = &self.drag {
            if origin.distance(&at) > DRAG_ACTIVATION_DISTANCE {
                self.drag = DragState::Dragging {
                    source: source.clone(),
                };
            }
        }
    }

    /// Release the pointer over `over` (a panel id, or nothing). Returns
    /// whether the order changed.
    pub fn pointer_up(&mut self, over: Option<&str>) -> bool {
        let drag = std::mem::take(&mut self.drag);
        match (drag, over) {
            (DragState::Dragging { source }, Some(target)) => self.move_panel(&source, target),
            _ => false,
        }
    }

    pub fn cancel_drag(&mut self) {
        self.drag = DragState::Idle;
    }

    // ── Resize ──

    fn divider_exists(&self, divider: DividerId) -> bool {
        if self.maximized.is_some() {
            return false;
        }
        let n = self.order.len();
        match (self.layout, divider.group) {
            (LayoutMode::Row, SplitGroup::Row) => divider.index + 1 < n,
            // A focus layout with one panel renders as a plain row.
            (LayoutMode::FocusLeft | LayoutMode::FocusTop, SplitGroup::Row) => false,
            (LayoutMode::FocusLeft | LayoutMode::FocusTop, SplitGroup::Primary) => {
                n >= 2 && divider.index == 0
            }
            (LayoutMode::FocusLeft | LayoutMode::FocusTop, SplitGroup::Secondary) => {
                n >= 3 && divider.index + 2 < n
            }
            _ => false,
        }
    }

    pub fn begin_resize(&mut self, divider: DividerId) -> bool {
        if !self.divider_exists(divider) {
            return false;
        }
        self.resizing = Some(divider);
        true
    }

    /// Shift `delta` (a fraction of the split's extent) from the pane after
    /// the divider to the pane before it. Only that pair changes.
    pub fn resize_by(&mut self, divider: DividerId, delta: f64) -> bool {
        if !self.divider_exists(divider) || !delta.is_finite() {
            return false;
        }
        let key = self.group_key(divider.group);
        let mut shares = self.shares_for(divider.group);
        let (a, b) = (shares[divider.index], shares[divider.index + 1]);
        let pair = a + b;
        let next_a = (a + delta).clamp(MIN_SHARE, (pair - MIN_SHARE).max(MIN_SHARE));
        if (next_a - a).abs() < f64::EPSILON {
            return false;
        }
        shares[divider.index] = next_a;
        shares[divider.index + 1] = pair - next_a;
        self.shares.insert(key, shares);
        true
    }

    pub fn end_resize(&mut self) {
        self.resizing = None;
    }

    fn group_members(&self, group: SplitGroup) -> Vec<String> {
        match group {
            SplitGroup::Row => self.order.clone(),
            SplitGroup::Primary => self.order.iter().take(2).cloned().collect(),
            SplitGroup::Secondary => self.order.iter().skip(1).cloned().collect(),
        }
    }

    fn group_key(&self, group: SplitGroup) -> String {
        // Primary shares depend on who is primary and on the full membership.
        let members = match group {
            SplitGroup::Primary => self.order.join("-"),
            _ => self.group_members(group).join("-"),
        };
        format!("{:?}:{:?}:{}", self.layout, group, members)
    }

    /// Current shares of a split, falling back to defaults.
    pub fn shares_for(&self, group: SplitGroup) -> Vec<f64> {
        let len = match group {
            SplitGroup::Primary => 2,
            _ => self.group_members(group).len(),
        };
        if let Some(stored) = self.shares.get(&self.group_key(group)) {
            if stored.len() == len {
                return stored.clone();
            }
        }
        match group {
            SplitGroup::Primary => vec![PRIMARY_SHARE, 1.0 - PRIMARY_SHARE],
            _ if len == 0 => Vec::new(),
            _ => vec![1.0 / len as f64; len],
        }
    }

    // ── Plan ──

    pub fn plan(&self) -> LayoutPlan {
        if let Some(id) = &self.maximized {
            if self.contains(id) {
                return LayoutPlan::Maximized { id: id.clone() };
            }
        }
        if self.order.is_empty() {
            return LayoutPlan::Empty;
        }
        let count = self.order.len();
        match self.layout.primary_axis() {
            Some(axis) if count >= 2 => {
                let primary_shares = self.shares_for(SplitGroup::Primary);
                let secondary_shares = self.shares_for(SplitGroup::Secondary);
                LayoutPlan::Focus {
                    axis,
                    primary: Pane {
                        id: self.order[0].clone(),
                        share: primary_shares[0],
                    },
                    secondary_share: primary_shares[1],
                    secondary: self.order[1..]
                        .iter()
                        .zip(secondary_shares)
                        .map(|(id, share)| Pane {
                            id: id.clone(),
                            share,
                        })
                        .collect(),
                }
            }
            Some(_) => LayoutPlan::Split {
                axis: Axis::Horizontal,
                panes: vec![Pane {
                    id: self.order[0].clone(),
                    share: 1.0,
                }],
            },
            None if self.layout == LayoutMode::Grid => LayoutPlan::Grid {
                columns: if count < 2 { 1 } else { 2 },
                cells: self.order.clone(),
            },
            None => LayoutPlan::Split {
                axis: Axis::Horizontal,
                panes: self
                    .order
                    .iter()
                    .zip(self.shares_for(SplitGroup::Row))
                    .map(|(id, share)| Pane {
                        id: id.clone(),
                        share,
                    })
                    .collect(),
            },
        }
    }
}
