use std::any::Any;

use crate::core::{Size, SpaceRequest};
use crate::error::ChartResult;
use crate::layout::ComponentId;
use crate::render::Scene;
use crate::scheduler::{InvalidationTopics, UpdateInbox};

/// Handle given to leaf content when it joins a tree.
///
/// Content keeps it to raise invalidations from dataset and scale callbacks,
/// which run outside of any borrow of the tree.
#[derive(Debug, Clone)]
pub struct ContentBinding {
    component: ComponentId,
    inbox: UpdateInbox,
}

impl ContentBinding {
    #[must_use]
    pub fn new(component: ComponentId, inbox: UpdateInbox) -> Self {
        Self { component, inbox }
    }

    #[must_use]
    pub fn component(&self) -> ComponentId {
        self.component
    }

    pub fn invalidate(&self, topics: impl Into<InvalidationTopics>) {
        self.inbox.push(self.component, topics.into());
    }
}

/// Geometry handed to content when it paints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    pub component: ComponentId,
    pub size: Size,
}

/// Behavior of a leaf component.
///
/// Layout asks for `requested_space` and the fixed flags; lifecycle hooks
/// default to no-ops. `render_immediately` must be idempotent for the same
/// internal state.
pub trait ComponentContent: Any {
    fn requested_space(&self, _available_width: f64, _available_height: f64) -> SpaceRequest {
        SpaceRequest::zero()
    }

    fn fixed_width(&self) -> bool {
        false
    }

    fn fixed_height(&self) -> bool {
        false
    }

    fn bind(&mut self, _binding: ContentBinding) {}

    fn on_anchor(&mut self) {}

    fn on_detach(&mut self) {}

    fn on_destroy(&mut self) {}

    fn on_layout(&mut self, _size: Size) {}

    fn invalidate(&mut self, _topics: InvalidationTopics) {}

    fn render_immediately(&mut self, context: &RenderContext, scene: &mut Scene) -> ChartResult<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Empty leaf that either fills its offer or holds a fixed size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Spacer {
    fixed: Option<Size>,
}

impl Spacer {
    #[must_use]
    pub fn flexible() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fixed(width: f64, height: f64) -> Self {
        Self {
            fixed: Some(Size::new(width, height)),
        }
    }
}

impl ComponentContent for Spacer {
    fn requested_space(&self, _available_width: f64, _available_height: f64) -> SpaceRequest {
        self.fixed.map_or(SpaceRequest::zero(), |size| {
            SpaceRequest::new(size.width, size.height)
        })
    }

    fn fixed_width(&self) -> bool {
        self.fixed.is_some()
    }

    fn fixed_height(&self) -> bool {
        self.fixed.is_some()
    }

    fn render_immediately(
        &mut self,
        _context: &RenderContext,
        _scene: &mut Scene,
    ) -> ChartResult<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
