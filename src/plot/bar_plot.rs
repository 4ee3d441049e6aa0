use std::any::Any;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::core::{
    Bounds, CallbackId, Dataset, Datum, Point, Range, Scale, ScaleKind, ScaleUpdate, Size, Value,
};
use crate::error::ChartResult;
use crate::layout::{ComponentContent, ComponentId, ContentBinding, RenderContext};
use crate::plot::bar_geometry::{bar_pixel_width, nearest_bar, pixel_point, widened_base_extent};
use crate::plot::bar_labels::{place_labels, LabelRequest};
use crate::plot::drawer::{
    Animator, AttrProjector, AttrToProjector, DrawStep, EasingAnimator, NullAnimator, RectDrawer,
};
use crate::plot::stacking::{
    stack, stack_key, stacked_extent, stacked_extents, StackingOrder, StackingResult,
};
use crate::plot::text::{CachingMeasurer, Formatter, MonospaceMeasurer, TextMeasurer};
use crate::plot::{Accessor, BarPlotConfig, BarRect, Orientation, PlotEntity, ScaleBinding};
use crate::render::{AttrValue, Color, Element, Scene, DEFAULT_FILL};
use crate::scheduler::{InvalidationTopic, InvalidationTopics};

pub const BAR_CLASS: &str = "bar";
pub const BASELINE_CLASS: &str = "baseline";
pub const BASELINE_LAYER: &str = "baseline";
pub const STACK_TOTAL_CLASS: &str = "stacked-bar-label";
pub const STACK_TOTALS_LAYER: &str = "stack-totals";

pub type FillFn = Rc<dyn Fn(&Datum, usize, &Dataset) -> Color>;

type RectFn = Rc<dyn Fn(&Datum, usize, &Dataset) -> BarRect>;

/// Scaled far end and scaled start of a datum's bar along the value axis.
type SpanFn = Rc<dyn Fn(&Datum, usize, &Dataset) -> (f64, f64)>;

#[derive(Debug)]
struct Stacking {
    order: StackingOrder,
    result: Rc<StackingResult>,
}

struct DatasetSlot {
    dataset: Dataset,
    subscription: Option<CallbackId>,
    bar_layer: String,
    label_layer: String,
}

impl DatasetSlot {
    fn new(dataset: Dataset) -> Self {
        let id = dataset.id();
        Self {
            dataset,
            subscription: None,
            bar_layer: format!("bars-{id}"),
            label_layer: format!("labels-{id}"),
        }
    }

    fn subscribe(&mut self, binding: &ContentBinding) {
        if self.subscription.is_some() {
            return;
        }
        let binding = binding.clone();
        self.subscription = Some(
            self.dataset
                .on_update(Rc::new(move |_: &Dataset| binding.invalidate(InvalidationTopic::Data))),
        );
    }

    fn unsubscribe(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.dataset.off_update(id);
        }
    }
}

/// One bar resolved to pixels, before drawing.
#[derive(Debug, Clone)]
struct ProjectedBar {
    dataset: Dataset,
    dataset_index: usize,
    index: usize,
    datum: Datum,
    value: Value,
    scaled_value: f64,
    rect: BarRect,
    position: Point,
}

/// Bar chart component: one rectangle per datum, grown from a baseline
/// along the value axis and centered on its base-axis position.
///
/// For a vertical plot the base axis is x and the value axis is y; a
/// horizontal plot swaps them.
pub struct BarPlot {
    orientation: Orientation,
    config: BarPlotConfig,
    base: Option<ScaleBinding>,
    value: Option<ScaleBinding>,
    fill: Option<FillFn>,
    baseline: Option<Value>,
    datasets: Vec<DatasetSlot>,
    stacking: Option<Stacking>,
    formatter: Formatter,
    measurer: Rc<dyn TextMeasurer>,
    animator: Rc<dyn Animator>,
    baseline_animator: Rc<dyn Animator>,
    binding: Option<ContentBinding>,
    scale_subscriptions: Vec<(Rc<dyn Scale>, CallbackId)>,
    anchored: bool,
    size: Option<Size>,
    bar_pixel_width: f64,
    rendered_once: bool,
    last_draw_time_ms: f64,
}

impl fmt::Debug for BarPlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarPlot")
            .field("orientation", &self.orientation)
            .field("config", &self.config)
            .field("base", &self.base)
            .field("value", &self.value)
            .field("baseline", &self.baseline)
            .field("datasets", &self.datasets.len())
            .field("stacking", &self.stacking.as_ref().map(|stacking| stacking.order))
            .field("anchored", &self.anchored)
            .field("size", &self.size)
            .field("bar_pixel_width", &self.bar_pixel_width)
            .finish_non_exhaustive()
    }
}

impl Default for BarPlot {
    fn default() -> Self {
        Self::new(Orientation::Vertical)
    }
}

impl BarPlot {
    #[must_use]
    pub fn new(orientation: Orientation) -> Self {
        Self {
            orientation,
            config: BarPlotConfig::default(),
            base: None,
            value: None,
            fill: None,
            baseline: None,
            datasets: Vec::new(),
            stacking: None,
            formatter: Formatter::identity(),
            measurer: Rc::new(CachingMeasurer::new(MonospaceMeasurer::default())),
            animator: Rc::new(EasingAnimator::default()),
            baseline_animator: Rc::new(EasingAnimator::default()),
            binding: None,
            scale_subscriptions: Vec::new(),
            anchored: false,
            size: None,
            bar_pixel_width: 0.0,
            rendered_once: false,
            last_draw_time_ms: 0.0,
        }
    }

    pub(crate) fn stacked(orientation: Orientation, order: StackingOrder) -> Self {
        let mut plot = Self::new(orientation);
        plot.stacking = Some(Stacking {
            order,
            result: Rc::default(),
        });
        plot
    }

    /// Parses `"vertical"` or `"horizontal"`.
    pub fn with_orientation_str(orientation: &str) -> ChartResult<Self> {
        Ok(Self::new(orientation.parse()?))
    }

    pub fn with_config(mut self, config: BarPlotConfig) -> ChartResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[must_use]
    pub fn config(&self) -> &BarPlotConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: BarPlotConfig) -> ChartResult<()> {
        config.validate()?;
        self.config = config;
        self.update_bar_pixel_width();
        self.request(InvalidationTopic::Style);
        Ok(())
    }

    /// Binds the horizontal axis: the base axis of a vertical plot, the value
    /// axis of a horizontal one.
    pub fn set_x(&mut self, accessor: Accessor, scale: Option<Rc<dyn Scale>>) {
        let binding = ScaleBinding::new(accessor, scale);
        match self.orientation {
            Orientation::Vertical => self.rebind(|plot| plot.base = Some(binding)),
            Orientation::Horizontal => self.rebind(|plot| plot.value = Some(binding)),
        }
    }

    pub fn set_y(&mut self, accessor: Accessor, scale: Option<Rc<dyn Scale>>) {
        let binding = ScaleBinding::new(accessor, scale);
        match self.orientation {
            Orientation::Vertical => self.rebind(|plot| plot.value = Some(binding)),
            Orientation::Horizontal => self.rebind(|plot| plot.base = Some(binding)),
        }
    }

    #[must_use]
    pub fn x(&self) -> Option<&ScaleBinding> {
        match self.orientation {
            Orientation::Vertical => self.base.as_ref(),
            Orientation::Horizontal => self.value.as_ref(),
        }
    }

    #[must_use]
    pub fn y(&self) -> Option<&ScaleBinding> {
        match self.orientation {
            Orientation::Vertical => self.value.as_ref(),
            Orientation::Horizontal => self.base.as_ref(),
        }
    }

    pub fn set_fill(&mut self, fill: impl Fn(&Datum, usize, &Dataset) -> Color + 'static) {
        self.fill = Some(Rc::new(fill));
        self.request(InvalidationTopic::Style);
    }

    pub fn add_dataset(&mut self, dataset: Dataset) -> bool {
        if self.datasets.iter().any(|slot| slot.dataset == dataset) {
            return false;
        }
        let mut slot = DatasetSlot::new(dataset);
        if let Some(binding) = &self.binding {
            slot.subscribe(binding);
        }
        self.datasets.push(slot);
        self.data_changed();
        true
    }

    /// Removes `dataset` along with its bars and label area.
    pub fn remove_dataset(&mut self, dataset: &Dataset) -> bool {
        let Some(position) = self.datasets.iter().position(|slot| slot.dataset == *dataset) else {
            return false;
        };
        let mut slot = self.datasets.remove(position);
        slot.unsubscribe();
        self.data_changed();
        true
    }

    #[must_use]
    pub fn datasets(&self) -> Vec<Dataset> {
        self.datasets.iter().map(|slot| slot.dataset.clone()).collect()
    }

    /// Baseline value; defaults to the epoch on time value axes and to zero
    /// otherwise.
    #[must_use]
    pub fn baseline_value(&self) -> Value {
        if let Some(baseline) = &self.baseline {
            return baseline.clone();
        }
        match self.value_scale().map(|scale| scale.kind()) {
            Some(ScaleKind::Time) => Value::epoch(),
            _ => Value::Number(0.0),
        }
    }

    pub fn set_baseline_value(&mut self, baseline: impl Into<Value>) {
        self.baseline = Some(baseline.into());
        self.publish_extents();
        self.request(InvalidationTopic::Style);
    }

    #[must_use]
    pub fn labels_enabled(&self) -> bool {
        self.config.labels_enabled
    }

    pub fn set_labels_enabled(&mut self, enabled: bool) {
        self.config.labels_enabled = enabled;
        self.request(InvalidationTopic::Style);
    }

    pub fn set_hide_labels_if_any_too_wide(&mut self, hide: bool) {
        self.config.hide_labels_if_any_too_wide = hide;
        self.request(InvalidationTopic::Style);
    }

    pub fn set_label_formatter(&mut self, formatter: Formatter) {
        self.formatter = formatter;
        self.request(InvalidationTopic::Style);
    }

    pub fn set_measurer(&mut self, measurer: Rc<dyn TextMeasurer>) {
        self.measurer = measurer;
        self.request(InvalidationTopic::Style);
    }

    pub fn set_animated(&mut self, animated: bool) {
        self.config.animated = animated;
    }

    pub fn set_animator(&mut self, animator: Rc<dyn Animator>) {
        self.animator = animator;
    }

    pub fn set_baseline_animator(&mut self, animator: Rc<dyn Animator>) {
        self.baseline_animator = animator;
    }

    /// Time the most recent draw takes to settle, in milliseconds.
    #[must_use]
    pub fn last_draw_time_ms(&self) -> f64 {
        self.last_draw_time_ms
    }

    /// Per-dataset stack segments; `None` unless bars stack.
    #[must_use]
    pub fn stacking_result(&self) -> Option<&StackingResult> {
        self.stacking.as_ref().map(|stacking| stacking.result.as_ref())
    }

    pub(crate) fn stacking_order(&self) -> Option<StackingOrder> {
        self.stacking.as_ref().map(|stacking| stacking.order)
    }

    pub(crate) fn set_stacking_order(&mut self, order: StackingOrder) {
        if let Some(stacking) = &mut self.stacking {
            stacking.order = order;
        }
        self.data_changed();
    }

    #[must_use]
    pub fn bar_pixel_width(&self) -> f64 {
        self.bar_pixel_width
    }

    /// Recomputes the cached bar width from the base scale and data.
    pub fn update_bar_pixel_width(&mut self) {
        let Some(base) = &self.base else {
            self.bar_pixel_width = 0.0;
            return;
        };
        let Some(scale) = &base.scale else {
            self.bar_pixel_width = 0.0;
            return;
        };
        let extent = self
            .size
            .map_or(0.0, |size| self.orientation.base_extent(size));
        let values = self.axis_values(base);
        self.bar_pixel_width = bar_pixel_width(scale.as_ref(), &values, extent, &self.config);
        trace!(width = self.bar_pixel_width, "bar pixel width updated");
    }

    /// Every drawable bar, in dataset then datum order.
    #[must_use]
    pub fn entities(&self) -> Vec<PlotEntity> {
        self.project_all()
            .into_iter()
            .map(|bar| self.to_entity(bar))
            .collect()
    }

    /// Entity nearest to `query` among bars visible in the plot area.
    ///
    /// Distance along the value axis decides; the base axis breaks exact
    /// ties. Queries inside a bar (within the hit tolerance) match it with
    /// zero distance.
    #[must_use]
    pub fn entity_nearest(&self, query: Point) -> Option<PlotEntity> {
        let size = self.size?;
        let mut visible: Vec<ProjectedBar> = self
            .project_all()
            .into_iter()
            .filter(|bar| bar.rect.visible_within(size))
            .collect();
        let index = nearest_bar(
            self.orientation,
            visible.iter().map(|bar| (&bar.rect, bar.position)),
            query,
            self.config.hit_tolerance,
        )?;
        Some(self.to_entity(visible.swap_remove(index)))
    }

    /// Entities whose bar covers `point`, within the hit tolerance.
    #[must_use]
    pub fn entities_at(&self, point: Point) -> Vec<PlotEntity> {
        self.entities_in_ranges(Range::point(point.x), Range::point(point.y))
    }

    #[must_use]
    pub fn entities_in(&self, bounds: Bounds) -> Vec<PlotEntity> {
        self.entities_in_ranges(bounds.x_range(), bounds.y_range())
    }

    /// Entities whose bar intersects both pixel ranges.
    #[must_use]
    pub fn entities_in_ranges(&self, x: Range, y: Range) -> Vec<PlotEntity> {
        let tolerance = self.config.hit_tolerance;
        self.project_all()
            .into_iter()
            .filter(|bar| bar.rect.intersects(x, y, tolerance))
            .map(|bar| self.to_entity(bar))
            .collect()
    }

    fn to_entity(&self, bar: ProjectedBar) -> PlotEntity {
        PlotEntity {
            dataset: bar.dataset,
            dataset_index: bar.dataset_index,
            index: bar.index,
            datum: bar.datum,
            position: bar.position,
            bounds: bar.rect.bounds(),
            component: self.provider(),
        }
    }

    fn provider(&self) -> Option<ComponentId> {
        self.binding.as_ref().map(ContentBinding::component)
    }

    fn request(&self, topic: InvalidationTopic) {
        if let Some(binding) = &self.binding {
            binding.invalidate(topic);
        }
    }

    fn value_scale(&self) -> Option<&Rc<dyn Scale>> {
        self.value.as_ref().and_then(|binding| binding.scale.as_ref())
    }

    fn scales(&self) -> Vec<Rc<dyn Scale>> {
        [&self.base, &self.value]
            .into_iter()
            .flatten()
            .filter_map(|binding| binding.scale.clone())
            .collect()
    }

    fn rebind(&mut self, assign: impl FnOnce(&mut Self)) {
        let anchored = self.anchored;
        if anchored {
            self.uninstall_scales();
        }
        assign(self);
        self.update_stacking();
        self.update_bar_pixel_width();
        if anchored {
            self.install_scales();
        }
        self.request(InvalidationTopic::Scale);
    }

    fn data_changed(&mut self) {
        self.update_stacking();
        self.update_bar_pixel_width();
        self.publish_extents();
        self.request(InvalidationTopic::Data);
    }

    fn update_stacking(&mut self) {
        let Some(stacking) = &mut self.stacking else {
            return;
        };
        let (Some(base), Some(value)) = (&self.base, &self.value) else {
            stacking.result = Rc::default();
            return;
        };
        let datasets: Vec<Dataset> =
            self.datasets.iter().map(|slot| slot.dataset.clone()).collect();
        let result = stack(&datasets, &base.accessor, &value.accessor, stacking.order);
        stacking.result = Rc::new(result);
    }

    fn install_scales(&mut self) {
        let Some(binding) = self.binding.clone() else {
            return;
        };
        for scale in self.scales() {
            let binding = binding.clone();
            let id = scale.on_update(Rc::new(move |_: &ScaleUpdate| {
                binding.invalidate(InvalidationTopic::Scale);
            }));
            self.scale_subscriptions.push((scale, id));
        }
        self.publish_extents();
    }

    fn uninstall_scales(&mut self) {
        for (scale, id) in self.scale_subscriptions.drain(..) {
            scale.off_update(id);
        }
        if let Some(provider) = self.provider() {
            for scale in self.scales() {
                scale.remove_provider(provider);
            }
        }
    }

    /// Pushes data extents, the baseline and its padding exception to the
    /// bound scales. Base extents on quantitative scales are widened by half
    /// a bar on each side; stacked value extents cover the stack totals.
    fn publish_extents(&self) {
        if !self.anchored {
            return;
        }
        let Some(provider) = self.provider() else {
            return;
        };
        if let Some(base) = &self.base {
            if let Some(scale) = &base.scale {
                let values = self.axis_values(base);
                let extent = if scale.kind().is_quantitative() {
                    widened_base_extent(scale.as_ref(), &values, self.bar_pixel_width)
                } else {
                    values
                };
                scale.set_extents(provider, extent);
            }
        }
        if let Some(value) = &self.value {
            if let Some(scale) = &value.scale {
                let extent = match &self.stacking {
                    Some(stacking) => {
                        let (low, high) = stacked_extent(&stacking.result);
                        vec![Value::Number(low), Value::Number(high)]
                    }
                    None => self.axis_values(value),
                };
                scale.set_extents(provider, extent);
                let baseline = vec![self.baseline_value()];
                scale.set_included_values(provider, baseline.clone());
                scale.set_padding_exceptions(provider, baseline);
            }
        }
    }

    fn axis_values(&self, binding: &ScaleBinding) -> Vec<Value> {
        let mut values = Vec::new();
        for slot in &self.datasets {
            for (index, datum) in slot.dataset.data().iter().enumerate() {
                let value = binding.accessor.value(datum, index, &slot.dataset);
                if !value.is_missing() {
                    values.push(value);
                }
            }
        }
        values
    }

    fn scaled_baseline(&self) -> f64 {
        self.value
            .as_ref()
            .map_or(f64::NAN, |value| value.project_value(&self.baseline_value()))
    }

    /// Value-axis span of each bar: from the baseline, or along its stack.
    fn span_projector(&self) -> Option<SpanFn> {
        let (Some(base), Some(value)) = (self.base.clone(), self.value.clone()) else {
            return None;
        };
        let span: SpanFn = match &self.stacking {
            None => {
                let scaled_baseline = self.scaled_baseline();
                Rc::new(move |datum: &Datum, index: usize, dataset: &Dataset| {
                    (value.project(datum, index, dataset), scaled_baseline)
                })
            }
            Some(stacking) => {
                let stacks = Rc::clone(&stacking.result);
                Rc::new(move |datum: &Datum, index: usize, dataset: &Dataset| {
                    let key = stack_key(&base.accessor.value(datum, index, dataset));
                    stacks.get(dataset.id(), &key).map_or((f64::NAN, f64::NAN), |segment| {
                        (
                            value.project_value(&Value::Number(segment.end())),
                            value.project_value(&Value::Number(segment.offset)),
                        )
                    })
                })
            }
        };
        Some(span)
    }

    fn project_all(&self) -> Vec<ProjectedBar> {
        let (Some(base), Some(value)) = (&self.base, &self.value) else {
            return Vec::new();
        };
        let Some(span) = self.span_projector() else {
            return Vec::new();
        };
        let mut bars = Vec::new();
        for (dataset_index, slot) in self.datasets.iter().enumerate() {
            let dataset = &slot.dataset;
            for (index, datum) in dataset.data().into_iter().enumerate() {
                let datum_value = value.accessor.value(&datum, index, dataset);
                let (scaled_value, scaled_start) = span(&datum, index, dataset);
                let rect = BarRect::new(
                    self.orientation,
                    base.project(&datum, index, dataset),
                    scaled_value,
                    scaled_start,
                    self.bar_pixel_width,
                );
                if !rect.is_finite() {
                    continue;
                }
                bars.push(ProjectedBar {
                    dataset: dataset.clone(),
                    dataset_index,
                    index,
                    datum,
                    value: datum_value,
                    scaled_value,
                    position: pixel_point(self.orientation, &rect, scaled_value, scaled_start),
                    rect,
                });
            }
        }
        bars
    }

    fn rect_projector(&self, reset: bool) -> Option<RectFn> {
        let base = self.base.clone()?;
        let span = self.span_projector()?;
        let orientation = self.orientation;
        let width = self.bar_pixel_width;
        let scaled_baseline = self.scaled_baseline();
        let rect: RectFn = Rc::new(move |datum: &Datum, index: usize, dataset: &Dataset| {
            let (scaled_value, scaled_start) = if reset {
                (scaled_baseline, scaled_baseline)
            } else {
                span(datum, index, dataset)
            };
            BarRect::new(
                orientation,
                base.project(datum, index, dataset),
                scaled_value,
                scaled_start,
                width,
            )
        });
        Some(rect)
    }

    fn bar_attrs(&self, reset: bool) -> Option<AttrToProjector> {
        let rect = self.rect_projector(reset)?;
        let mut attrs = AttrToProjector::new();
        let fields: [(&'static str, fn(&BarRect) -> f64); 4] = [
            ("x", |rect| rect.x),
            ("y", |rect| rect.y),
            ("width", |rect| rect.width),
            ("height", |rect| rect.height),
        ];
        for (name, field) in fields {
            let rect = Rc::clone(&rect);
            let projector: AttrProjector =
                Rc::new(move |datum: &Datum, index: usize, dataset: &Dataset| {
                    AttrValue::from(field(&rect(datum, index, dataset)))
                });
            attrs.insert(name, projector);
        }
        let fill: AttrProjector = match self.fill.clone() {
            Some(fill) => Rc::new(move |datum: &Datum, index: usize, dataset: &Dataset| {
                AttrValue::from(fill(datum, index, dataset))
            }),
            None => Rc::new(|_: &Datum, _: usize, _: &Dataset| AttrValue::from(DEFAULT_FILL)),
        };
        attrs.insert("fill", fill);
        Some(attrs)
    }

    fn draw_steps(&self) -> Option<Vec<DrawStep>> {
        let main = self.bar_attrs(false)?;
        if !self.config.animated {
            return Some(vec![DrawStep {
                attrs: main,
                animator: Rc::new(NullAnimator),
            }]);
        }
        let mut steps = Vec::with_capacity(2);
        if !self.rendered_once {
            steps.push(DrawStep {
                attrs: self.bar_attrs(true)?,
                animator: Rc::new(NullAnimator),
            });
        }
        steps.push(DrawStep {
            attrs: main,
            animator: Rc::clone(&self.animator),
        });
        Some(steps)
    }

    fn fill_of(&self, bar: &ProjectedBar) -> Color {
        self.fill
            .as_ref()
            .map_or(DEFAULT_FILL, |fill| fill(&bar.datum, bar.index, &bar.dataset))
    }

    fn draw_value_labels(
        &self,
        bars: &[ProjectedBar],
        scaled_baseline: f64,
        context: &RenderContext,
        scene: &mut Scene,
    ) {
        let requests: Vec<LabelRequest> = bars
            .iter()
            .map(|bar| {
                let text = self.formatter.format(&bar.value);
                LabelRequest {
                    measured: self.measurer.measure(&text),
                    text,
                    rect: bar.rect,
                    scaled_value: bar.scaled_value,
                    scaled_baseline,
                    fill: self.fill_of(bar),
                }
            })
            .collect();
        let placements = place_labels(&requests, self.orientation, context.size, &self.config);
        if placements.is_empty() && !requests.is_empty() {
            debug!(
                component = %context.component,
                "a label is wider than its bar, all labels hidden"
            );
        }
        for (bar, placement) in bars.iter().zip(&placements) {
            scene.push(&self.datasets[bar.dataset_index].label_layer, placement.to_element());
        }
    }

    /// One total per stack end that is off the baseline, placed just past
    /// the end: above or right of the positive end, below or left of the
    /// negative one.
    fn draw_stack_totals(&self, stacking: &Stacking, context: &RenderContext, scene: &mut Scene) {
        let (Some(base), Some(value)) = (&self.base, &self.value) else {
            return;
        };
        let baseline = self.baseline_value().as_f64();
        let origin = value.project_value(&Value::Number(0.0));
        let extents = stacked_extents(&stacking.result);
        let requests: Vec<LabelRequest> = extents
            .maximum
            .values()
            .chain(extents.minimum.values())
            .filter(|end| Some(end.extent) != baseline)
            .filter_map(|end| {
                let total = Value::Number(end.extent);
                let scaled_end = value.project_value(&total);
                let rect = BarRect::new(
                    self.orientation,
                    base.project_value(&end.axis_value),
                    scaled_end,
                    scaled_end,
                    self.bar_pixel_width,
                );
                if !rect.is_finite() {
                    return None;
                }
                let text = self.formatter.format(&total);
                Some(LabelRequest {
                    measured: self.measurer.measure(&text),
                    text,
                    rect,
                    scaled_value: scaled_end,
                    scaled_baseline: origin,
                    fill: DEFAULT_FILL,
                })
            })
            .collect();
        let placements = place_labels(&requests, self.orientation, context.size, &self.config);
        if placements.is_empty() && !requests.is_empty() {
            debug!(
                component = %context.component,
                "a stack total is wider than its bar, all totals hidden"
            );
        }
        for placement in &placements {
            scene.push(STACK_TOTALS_LAYER, placement.to_element().with_class(STACK_TOTAL_CLASS));
        }
    }

    fn baseline_element(&self, size: Size, scaled_baseline: f64) -> Element {
        let (from, to) = match self.orientation {
            Orientation::Vertical => (
                Point::new(0.0, scaled_baseline),
                Point::new(size.width, scaled_baseline),
            ),
            Orientation::Horizontal => (
                Point::new(scaled_baseline, 0.0),
                Point::new(scaled_baseline, size.height),
            ),
        };
        let mut line = Element::line(from, to).with_class(BASELINE_CLASS);
        let animator: Rc<dyn Animator> = if self.config.animated {
            Rc::clone(&self.baseline_animator)
        } else {
            Rc::new(NullAnimator)
        };
        animator.animate(std::slice::from_mut(&mut line), 0.0);
        line
    }
}

impl ComponentContent for BarPlot {
    fn bind(&mut self, binding: ContentBinding) {
        for slot in &mut self.datasets {
            slot.subscribe(&binding);
        }
        self.binding = Some(binding);
    }

    fn on_anchor(&mut self) {
        if self.anchored {
            return;
        }
        self.anchored = true;
        self.update_bar_pixel_width();
        self.install_scales();
    }

    fn on_detach(&mut self) {
        self.uninstall_scales();
        self.anchored = false;
    }

    fn on_destroy(&mut self) {
        self.uninstall_scales();
        self.anchored = false;
        for slot in &mut self.datasets {
            slot.unsubscribe();
        }
    }

    fn on_layout(&mut self, size: Size) {
        self.size = Some(size);
        if self.config.auto_scale_ranges {
            if let Some(scale) = self.x().and_then(|binding| binding.scale.clone()) {
                scale.set_range(0.0, size.width);
            }
            if let Some(scale) = self.y().and_then(|binding| binding.scale.clone()) {
                if scale.kind() == ScaleKind::Category {
                    scale.set_range(0.0, size.height);
                } else {
                    scale.set_range(size.height, 0.0);
                }
            }
        }
        self.update_bar_pixel_width();
        self.publish_extents();
    }

    fn invalidate(&mut self, topics: InvalidationTopics) {
        if topics.contains_topic(InvalidationTopic::Data) {
            self.update_stacking();
            self.update_bar_pixel_width();
            self.publish_extents();
        } else if topics.contains_topic(InvalidationTopic::Scale) {
            self.update_bar_pixel_width();
        }
    }

    fn render_immediately(
        &mut self,
        context: &RenderContext,
        scene: &mut Scene,
    ) -> ChartResult<()> {
        let Some(steps) = self.draw_steps() else {
            debug!(component = %context.component, "bar plot has no x or y binding, nothing drawn");
            return Ok(());
        };
        let size = context.size;
        let scaled_baseline = self.scaled_baseline();
        if scaled_baseline.is_finite() {
            scene.push(BASELINE_LAYER, self.baseline_element(size, scaled_baseline));
        }

        let drawer = RectDrawer::new(BAR_CLASS);
        let bars = self.project_all();
        let mut draw_time: f64 = 0.0;
        for (dataset_index, slot) in self.datasets.iter().enumerate() {
            let data: Vec<(usize, Datum)> = bars
                .iter()
                .filter(|bar| bar.dataset_index == dataset_index)
                .map(|bar| (bar.index, bar.datum.clone()))
                .collect();
            let outcome = drawer.draw(&data, &slot.dataset, &steps);
            draw_time = draw_time.max(outcome.total_time_ms);
            for element in outcome.into_settled() {
                scene.push(&slot.bar_layer, element);
            }
        }

        if self.config.labels_enabled {
            match &self.stacking {
                Some(stacking) => self.draw_stack_totals(stacking, context, scene),
                None => self.draw_value_labels(&bars, scaled_baseline, context, scene),
            }
        }

        self.rendered_once = true;
        self.last_draw_time_ms = draw_time;
        trace!(component = %context.component, bars = bars.len(), "bar plot rendered");
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use serde_json::json;

    use super::BarPlot;
    use crate::core::{Dataset, LinearScale, Point, Scale, Size, Value};
    use crate::layout::{ComponentContent, ComponentId, RenderContext};
    use crate::plot::{Accessor, Orientation};
    use crate::render::Scene;

    fn horizontal_plot() -> BarPlot {
        let x: Rc<dyn Scale> = Rc::new(
            LinearScale::new()
                .with_domain(0.0, 10.0)
                .and_then(|scale| scale.with_range(0.0, 100.0))
                .expect("x scale"),
        );
        let y: Rc<dyn Scale> = Rc::new(
            LinearScale::new()
                .with_domain(0.0, 10.0)
                .and_then(|scale| scale.with_range(100.0, 0.0))
                .expect("y scale"),
        );
        let mut plot = BarPlot::new(Orientation::Horizontal);
        plot.set_x(Accessor::field("v"), Some(x));
        plot.set_y(Accessor::field("k"), Some(y));
        plot.add_dataset(Dataset::new(vec![json!({"k": 2, "v": 4}), json!({"k": 6, "v": -1})]));
        plot.on_layout(Size::new(100.0, 100.0));
        plot
    }

    #[test]
    fn horizontal_plot_grows_along_x() {
        let plot = horizontal_plot();
        let entities = plot.entities();
        assert_eq!(entities.len(), 2);
        // 40 px gap between k=2 and k=6, times the 0.95 width ratio.
        assert!((plot.bar_pixel_width() - 38.0).abs() < 1e-9);
        assert_eq!(entities[0].bounds.top_left, Point::new(0.0, 61.0));
        assert_eq!(entities[0].position, Point::new(40.0, 80.0));
        assert_eq!(entities[1].position.x, -10.0);
    }

    #[test]
    fn render_draws_bars_and_baseline() {
        let mut plot = horizontal_plot();
        let mut scene = Scene::new(Size::new(100.0, 100.0));
        let context = RenderContext {
            component: ComponentId::from_raw(1),
            size: Size::new(100.0, 100.0),
        };
        plot.render_immediately(&context, &mut scene).expect("render");
        assert_eq!(scene.elements_with_class("bar").count(), 2);
        let baseline = &scene.layer("baseline")[0];
        assert_eq!(baseline.number("x1"), Some(0.0));
        assert_eq!(plot.baseline_value(), Value::Number(0.0));
    }
}
