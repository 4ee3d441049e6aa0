use std::any::Any;
use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::core::{Size, SpaceRequest};
use crate::error::ChartResult;
use crate::layout::{ComponentContent, ContentBinding, RenderContext};
use crate::plot::stacking::{stacked_extent, StackingOrder};
use crate::plot::{BarPlot, Orientation};
use crate::render::Scene;
use crate::scheduler::InvalidationTopics;

/// Bar plot whose datasets pile on top of each other per base value.
///
/// Each bar starts where the previous dataset's bar of the same sign ended.
/// The value scale receives the stacked extent and, with labels enabled,
/// every stack end gets a total label instead of per-bar labels. All other
/// bar plot settings are reached through `Deref`.
pub struct StackedBarPlot {
    plot: BarPlot,
}

impl fmt::Debug for StackedBarPlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackedBarPlot").field("plot", &self.plot).finish()
    }
}

impl Default for StackedBarPlot {
    fn default() -> Self {
        Self::new(Orientation::Vertical)
    }
}

impl StackedBarPlot {
    #[must_use]
    pub fn new(orientation: Orientation) -> Self {
        Self {
            plot: BarPlot::stacked(orientation, StackingOrder::default()),
        }
    }

    pub fn with_orientation_str(orientation: &str) -> ChartResult<Self> {
        Ok(Self::new(orientation.parse()?))
    }

    #[must_use]
    pub fn stacking_order(&self) -> StackingOrder {
        self.plot.stacking_order().unwrap_or_default()
    }

    /// Restacks every dataset and requests a redraw.
    pub fn set_stacking_order(&mut self, order: StackingOrder) {
        self.plot.set_stacking_order(order);
    }

    /// Lowest and highest stack end, both sides including zero.
    #[must_use]
    pub fn stacked_extent(&self) -> (f64, f64) {
        self.plot.stacking_result().map_or((0.0, 0.0), stacked_extent)
    }
}

impl Deref for StackedBarPlot {
    type Target = BarPlot;

    fn deref(&self) -> &BarPlot {
        &self.plot
    }
}

impl DerefMut for StackedBarPlot {
    fn deref_mut(&mut self) -> &mut BarPlot {
        &mut self.plot
    }
}

impl ComponentContent for StackedBarPlot {
    fn requested_space(&self, available_width: f64, available_height: f64) -> SpaceRequest {
        self.plot.requested_space(available_width, available_height)
    }

    fn fixed_width(&self) -> bool {
        self.plot.fixed_width()
    }

    fn fixed_height(&self) -> bool {
        self.plot.fixed_height()
    }

    fn bind(&mut self, binding: ContentBinding) {
        self.plot.bind(binding);
    }

    fn on_anchor(&mut self) {
        self.plot.on_anchor();
    }

    fn on_detach(&mut self) {
        self.plot.on_detach();
    }

    fn on_destroy(&mut self) {
        self.plot.on_destroy();
    }

    fn on_layout(&mut self, size: Size) {
        self.plot.on_layout(size);
    }

    fn invalidate(&mut self, topics: InvalidationTopics) {
        self.plot.invalidate(topics);
    }

    fn render_immediately(
        &mut self,
        context: &RenderContext,
        scene: &mut Scene,
    ) -> ChartResult<()> {
        self.plot.render_immediately(context, scene)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
