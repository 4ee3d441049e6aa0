use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{CallbackSet, Point, Size};
use crate::error::{ChartError, ChartResult};
use crate::layout::alignment::{XAlignment, YAlignment};
use crate::layout::content::ComponentContent;
use crate::layout::group::GroupLayout;
use crate::layout::table::TableLayout;
use crate::render::Scene;

/// Stable handle of a component inside a [`crate::layout::ComponentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(u32);

impl ComponentId {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle of the page element a tree is anchored into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RootId(u32);

impl RootId {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root#{}", self.0)
    }
}

/// Rectangle a parent offers to a child: origin relative to the parent plus
/// the available width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutOffer {
    pub origin: Point,
    pub width: f64,
    pub height: f64,
}

impl LayoutOffer {
    #[must_use]
    pub const fn new(origin: Point, width: f64, height: f64) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }

    #[must_use]
    pub const fn at(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(Point::new(x, y), width, height)
    }

    #[must_use]
    pub const fn sized(width: f64, height: f64) -> Self {
        Self::at(0.0, 0.0, width, height)
    }

    pub fn validate(self) -> ChartResult<()> {
        if !self.origin.x.is_finite() || !self.origin.y.is_finite() {
            return Err(ChartError::InvalidData(
                "layout origin must be finite".to_owned(),
            ));
        }
        if !self.width.is_finite()
            || self.width < 0.0
            || !self.height.is_finite()
            || self.height < 0.0
        {
            return Err(ChartError::InvalidData(
                "layout size must be finite and >= 0".to_owned(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Unanchored,
    Anchored,
    LaidOut,
    Rendered,
    Detached,
    Destroyed,
}

impl LifecycleState {
    #[must_use]
    pub fn is_anchored(self) -> bool {
        matches!(self, Self::Anchored | Self::LaidOut | Self::Rendered)
    }
}

/// Payload of resize callbacks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeEvent {
    pub component: ComponentId,
    pub size: Size,
}

pub(crate) enum NodeKind {
    Leaf(Box<dyn ComponentContent>),
    Group(GroupLayout),
    Table(TableLayout),
}

impl NodeKind {
    pub(crate) fn children(&self) -> Vec<ComponentId> {
        match self {
            Self::Leaf(_) => Vec::new(),
            Self::Group(group) => group.components().to_vec(),
            Self::Table(table) => table.components(),
        }
    }

    pub(crate) fn is_container(&self) -> bool {
        !matches!(self, Self::Leaf(_))
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(_) => f.write_str("Leaf"),
            Self::Group(group) => f.debug_tuple("Group").field(group).finish(),
            Self::Table(table) => f.debug_tuple("Table").field(table).finish(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct ComponentNode {
    pub(crate) kind: NodeKind,
    pub(crate) state: LifecycleState,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) root: Option<RootId>,
    pub(crate) origin: Point,
    pub(crate) size: Option<Size>,
    pub(crate) last_offer: Option<LayoutOffer>,
    pub(crate) x_alignment: XAlignment,
    pub(crate) y_alignment: YAlignment,
    pub(crate) on_anchor: CallbackSet<ComponentId>,
    pub(crate) on_detach: CallbackSet<ComponentId>,
    pub(crate) on_resize: CallbackSet<ResizeEvent>,
    pub(crate) scene: Scene,
}

impl ComponentNode {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            state: LifecycleState::Unanchored,
            parent: None,
            root: None,
            origin: Point::origin(),
            size: None,
            last_offer: None,
            x_alignment: XAlignment::default(),
            y_alignment: YAlignment::default(),
            on_anchor: CallbackSet::default(),
            on_detach: CallbackSet::default(),
            on_resize: CallbackSet::default(),
            scene: Scene::default(),
        }
    }
}
