use indexmap::IndexSet;
use tracing::{debug, error, trace};

use crate::error::ChartError;
use crate::layout::ComponentId;
use crate::telemetry::soft_warn;

use super::policy::{AnimationFramePolicy, FlushTiming, RenderPolicy, RenderPolicyKind};
use super::SchedulerConfig;

/// Work a render controller drives during a flush.
pub trait FlushTarget {
    /// Turns queued out-of-band invalidations into controller registrations.
    fn absorb_updates(&mut self, _controller: &mut RenderController) {}

    /// Re-runs layout for `component` using its last layout offer.
    fn compute_layout(&mut self, component: ComponentId) -> Result<(), ChartError>;

    /// Registers `component` (and, for containers, its children) for painting.
    fn render(&mut self, component: ComponentId, controller: &mut RenderController);

    /// Paints `component`. Registrations made here land in the next flush.
    fn render_immediately(
        &mut self,
        component: ComponentId,
        controller: &mut RenderController,
    ) -> Result<(), ChartError>;
}

/// Outcome of a render registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushRequest {
    /// The policy asked for a synchronous flush; the caller must flush now.
    FlushNow,
    /// A flush was scheduled for later; the host reads it with `take_wakeup`.
    Deferred(FlushTiming),
    /// A flush was already pending and will include this request.
    AlreadyScheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPhase {
    Layout,
    Paint,
}

#[derive(Debug)]
pub struct RenderFailure {
    pub component: ComponentId,
    pub phase: FlushPhase,
    pub error: ChartError,
}

#[derive(Debug, Default)]
pub struct FlushReport {
    pub flushed: bool,
    pub laid_out: Vec<ComponentId>,
    pub rendered: Vec<ComponentId>,
    pub failures: Vec<RenderFailure>,
}

impl FlushReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn failed_components(&self) -> Vec<ComponentId> {
        self.failures.iter().map(|failure| failure.component).collect()
    }
}

/// Coalesces layout and render requests into flushes.
///
/// Cycle: idle -> scheduled -> flushing -> idle. Within one flush all layout
/// runs before any render registration, which runs before any paint.
#[derive(Debug)]
pub struct RenderController {
    policy: Box<dyn RenderPolicy>,
    needs_layout: IndexSet<ComponentId>,
    needs_render: IndexSet<ComponentId>,
    scheduled: bool,
    flushing: bool,
    wakeup: Option<FlushTiming>,
}

impl Default for RenderController {
    fn default() -> Self {
        Self::new(Box::new(AnimationFramePolicy))
    }
}

impl RenderController {
    #[must_use]
    pub fn new(policy: Box<dyn RenderPolicy>) -> Self {
        Self {
            policy,
            needs_layout: IndexSet::new(),
            needs_render: IndexSet::new(),
            scheduled: false,
            flushing: false,
            wakeup: None,
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> crate::error::ChartResult<Self> {
        config.validate()?;
        crate::telemetry::set_warnings_enabled(config.warnings_enabled);
        Ok(Self::new(config.build_policy()))
    }

    #[must_use]
    pub fn render_policy(&self) -> RenderPolicyKind {
        self.policy.kind()
    }

    /// Replaces the policy. A flush that is already scheduled keeps its timing.
    pub fn set_render_policy(&mut self, policy: Box<dyn RenderPolicy>) {
        self.policy = policy;
    }

    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    #[must_use]
    pub fn is_flushing(&self) -> bool {
        self.flushing
    }

    #[must_use]
    pub fn needs_render(&self, component: ComponentId) -> bool {
        self.needs_render.contains(&component)
    }

    #[must_use]
    pub fn needs_layout(&self, component: ComponentId) -> bool {
        self.needs_layout.contains(&component)
    }

    #[must_use]
    pub fn pending_renders(&self) -> Vec<ComponentId> {
        self.needs_render.iter().copied().collect()
    }

    /// Returns and clears the deferred flush the host should arm a callback for.
    pub fn take_wakeup(&mut self) -> Option<FlushTiming> {
        self.wakeup.take()
    }

    pub fn register_to_render(&mut self, component: ComponentId) -> FlushRequest {
        if self.flushing {
            soft_warn(
                "registered to render while other components are flushing: request may be ignored",
            );
        }
        self.needs_render.insert(component);
        self.request_render()
    }

    /// Marks `component` for layout; layout always implies a render.
    pub fn register_to_compute_layout(&mut self, component: ComponentId) -> FlushRequest {
        self.needs_layout.insert(component);
        self.register_to_render(component)
    }

    pub fn register_to_compute_layout_and_render(
        &mut self,
        component: ComponentId,
    ) -> FlushRequest {
        self.register_to_compute_layout(component)
    }

    /// Drops every pending request for `component`.
    pub fn forget(&mut self, component: ComponentId) {
        self.needs_layout.shift_remove(&component);
        self.needs_render.shift_remove(&component);
    }

    fn request_render(&mut self) -> FlushRequest {
        if self.scheduled {
            return FlushRequest::AlreadyScheduled;
        }
        self.scheduled = true;
        match self.policy.render() {
            FlushTiming::Immediate => FlushRequest::FlushNow,
            timing => {
                self.wakeup = Some(timing);
                FlushRequest::Deferred(timing)
            }
        }
    }

    /// Runs one flush against `target`. Does nothing unless a flush is scheduled.
    ///
    /// Components whose paint fails stay registered for the next flush; every
    /// other registration made after the layout phase started is kept as well.
    pub fn flush(&mut self, target: &mut dyn FlushTarget) -> FlushReport {
        let mut report = FlushReport::default();
        target.absorb_updates(self);
        if !self.scheduled {
            return report;
        }
        report.flushed = true;

        let layout_queue: Vec<ComponentId> =
            std::mem::take(&mut self.needs_layout).into_iter().collect();
        debug!(
            layout = layout_queue.len(),
            render = self.needs_render.len(),
            "flush started"
        );
        for component in layout_queue {
            match target.compute_layout(component) {
                Ok(()) => report.laid_out.push(component),
                Err(err) => {
                    error!(%component, error = %err, "layout failed during flush");
                    report.failures.push(RenderFailure {
                        component,
                        phase: FlushPhase::Layout,
                        error: err,
                    });
                }
            }
        }

        // Layout hooks may have pushed fresh invalidations.
        target.absorb_updates(self);
        let render_queue: Vec<ComponentId> = self.needs_render.iter().copied().collect();
        for component in render_queue {
            target.render(component, self);
        }

        self.flushing = true;
        let paint_queue = std::mem::take(&mut self.needs_render);
        let mut failed = IndexSet::new();
        for component in paint_queue {
            trace!(%component, "render_immediately");
            match target.render_immediately(component, self) {
                Ok(()) => report.rendered.push(component),
                Err(err) => {
                    error!(%component, error = %err, "render failed, retrying on next flush");
                    failed.insert(component);
                    report.failures.push(RenderFailure {
                        component,
                        phase: FlushPhase::Paint,
                        error: err,
                    });
                }
            }
        }

        let registered_while_painting = std::mem::take(&mut self.needs_render);
        failed.extend(registered_while_painting);
        self.needs_render = failed;
        self.scheduled = false;
        self.flushing = false;
        self.wakeup = None;
        debug!(
            rendered = report.rendered.len(),
            failed = report.failures.len(),
            "flush finished"
        );
        report
    }
}
