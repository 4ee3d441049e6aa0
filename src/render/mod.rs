mod primitives;
mod recording_renderer;
mod scene;
mod svg_renderer;

pub use primitives::{AttrValue, Color};
pub use recording_renderer::RecordingRenderer;
pub use scene::{DEFAULT_FILL, Easing, Element, ElementKind, Scene, Transition};
pub use svg_renderer::SvgRenderer;

use crate::core::{Point, Size};
use crate::error::ChartResult;
use crate::layout::{ComponentId, RootId};

/// Where a painted scene belongs in the root's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintTarget {
    pub component: ComponentId,
    pub root: RootId,
    pub origin: Point,
    pub size: Size,
}

/// Contract implemented by any rendering backend.
///
/// Backends receive the fully materialized scene of one component after it
/// painted, so drawing code stays isolated from layout and plot logic.
pub trait Renderer {
    fn paint(&mut self, target: PaintTarget, scene: &Scene) -> ChartResult<()>;

    /// Drops whatever the backend retained for `component`.
    fn clear(&mut self, _component: ComponentId) {}
}
