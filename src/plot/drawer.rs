use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::core::{Dataset, Datum};
use crate::error::{ChartError, ChartResult};
use crate::render::{AttrValue, Easing, Element, ElementKind, Transition};

pub type AttrProjector = Rc<dyn Fn(&Datum, usize, &Dataset) -> AttrValue>;

/// Attribute name to per-datum projector, applied in insertion order.
pub type AttrToProjector = IndexMap<&'static str, AttrProjector>;

/// Attaches transition timing to drawn elements.
pub trait Animator: fmt::Debug {
    /// Animates one step of `elements` starting `offset_ms` after the draw
    /// began. Returns the time the step takes.
    fn animate(&self, elements: &mut [Element], offset_ms: f64) -> f64;

    fn total_time(&self, element_count: usize) -> f64;
}

/// Applies attributes with no transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullAnimator;

impl Animator for NullAnimator {
    fn animate(&self, elements: &mut [Element], _offset_ms: f64) -> f64 {
        for element in elements {
            element.transition = None;
        }
        0.0
    }

    fn total_time(&self, _element_count: usize) -> f64 {
        0.0
    }
}

/// Staggered eased transitions: element `i` starts
/// `start_delay + i * iterative_delay` after the step begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EasingAnimator {
    start_delay_ms: f64,
    step_duration_ms: f64,
    step_delay_ms: f64,
    max_total_duration_ms: Option<f64>,
    easing: Easing,
}

impl Default for EasingAnimator {
    fn default() -> Self {
        Self {
            start_delay_ms: 0.0,
            step_duration_ms: 300.0,
            step_delay_ms: 15.0,
            max_total_duration_ms: None,
            easing: Easing::ExpOut,
        }
    }
}

impl EasingAnimator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_delay_ms(mut self, delay: f64) -> ChartResult<Self> {
        validate_duration("start delay", delay)?;
        self.start_delay_ms = delay;
        Ok(self)
    }

    pub fn with_step_duration_ms(mut self, duration: f64) -> ChartResult<Self> {
        validate_duration("step duration", duration)?;
        self.step_duration_ms = duration;
        Ok(self)
    }

    pub fn with_step_delay_ms(mut self, delay: f64) -> ChartResult<Self> {
        validate_duration("step delay", delay)?;
        self.step_delay_ms = delay;
        Ok(self)
    }

    pub fn with_max_total_duration_ms(mut self, duration: f64) -> ChartResult<Self> {
        validate_duration("max total duration", duration)?;
        self.max_total_duration_ms = Some(duration);
        Ok(self)
    }

    #[must_use]
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    #[must_use]
    pub fn step_duration_ms(&self) -> f64 {
        match self.max_total_duration_ms {
            Some(max) => self.step_duration_ms.min(max),
            None => self.step_duration_ms,
        }
    }

    fn adjusted_iterative_delay(&self, element_count: usize) -> f64 {
        let Some(max_total) = self.max_total_duration_ms else {
            return self.step_delay_ms;
        };
        let interval = (max_total - self.step_duration_ms()).max(0.0);
        let max_possible = interval / element_count.saturating_sub(1).max(1) as f64;
        self.step_delay_ms.min(max_possible)
    }
}

impl Animator for EasingAnimator {
    fn animate(&self, elements: &mut [Element], offset_ms: f64) -> f64 {
        let delay = self.adjusted_iterative_delay(elements.len());
        for (index, element) in elements.iter_mut().enumerate() {
            element.transition = Some(Transition {
                delay_ms: offset_ms + self.start_delay_ms + delay * index as f64,
                duration_ms: self.step_duration_ms(),
                easing: self.easing,
            });
        }
        self.total_time(elements.len())
    }

    fn total_time(&self, element_count: usize) -> f64 {
        let delay = self.adjusted_iterative_delay(element_count);
        self.start_delay_ms
            + delay * element_count.saturating_sub(1) as f64
            + self.step_duration_ms()
    }
}

fn validate_duration(name: &str, value: f64) -> ChartResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ChartError::InvalidData(format!(
            "animator {name} must be finite and >= 0"
        )));
    }
    Ok(())
}

/// One pass of attribute projection plus the animator that times it.
#[derive(Clone)]
pub struct DrawStep {
    pub attrs: AttrToProjector,
    pub animator: Rc<dyn Animator>,
}

impl fmt::Debug for DrawStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawStep")
            .field("attrs", &self.attrs.keys().collect::<Vec<_>>())
            .field("animator", &self.animator)
            .finish()
    }
}

/// Elements produced by every step of a draw, plus its total time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawOutcome {
    pub steps: Vec<Vec<Element>>,
    pub total_time_ms: f64,
}

impl DrawOutcome {
    /// Elements in their settled state (the last step).
    #[must_use]
    pub fn settled(&self) -> &[Element] {
        self.steps.last().map_or(&[][..], Vec::as_slice)
    }

    #[must_use]
    pub fn into_settled(mut self) -> Vec<Element> {
        self.steps.pop().unwrap_or_default()
    }
}

/// Builds one rect element per datum for each draw step.
#[derive(Debug, Clone)]
pub struct RectDrawer {
    class: String,
}

impl RectDrawer {
    #[must_use]
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
        }
    }

    /// `data` carries each datum with its index in the dataset.
    #[must_use]
    pub fn draw(
        &self,
        data: &[(usize, Datum)],
        dataset: &Dataset,
        steps: &[DrawStep],
    ) -> DrawOutcome {
        let mut outcome = DrawOutcome::default();
        for step in steps {
            let mut elements: Vec<Element> = data
                .iter()
                .map(|(index, datum)| {
                    let mut element =
                        Element::new(ElementKind::Rect).with_class(self.class.as_str());
                    for (name, projector) in &step.attrs {
                        element.set_attr(*name, projector(datum, *index, dataset));
                    }
                    element
                })
                .collect();
            outcome.total_time_ms += step.animator.animate(&mut elements, outcome.total_time_ms);
            outcome.steps.push(elements);
        }
        outcome
    }
}
