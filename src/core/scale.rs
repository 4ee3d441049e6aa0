use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::callbacks::{CallbackId, CallbackSet};
use crate::core::primitives::{Value, unix_millis_to_datetime};
use crate::error::{ChartError, ChartResult};
use crate::layout::ComponentId;

const CHANGE_EPSILON: f64 = 1e-9;
const DAY_MILLIS: f64 = 86_400_000.0;

static NEXT_SCALE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScaleId(u64);

impl ScaleId {
    pub(crate) fn next_id() -> Self {
        Self(NEXT_SCALE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ScaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scale#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleKind {
    Linear,
    Time,
    Category,
}

impl ScaleKind {
    #[must_use]
    pub fn is_quantitative(self) -> bool {
        matches!(self, Self::Linear | Self::Time)
    }
}

/// Payload delivered to scale update callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleUpdate {
    pub scale: ScaleId,
}

/// Domain-to-pixel mapping shared between plots.
///
/// Scales are shared as `Rc<dyn Scale>` and mutate through `&self`. Plots push
/// the values they want the auto-domain to cover (`set_extents`), values that
/// must always be inside it (`set_included_values`) and values padding must not
/// extend past (`set_padding_exceptions`), keyed by the providing component.
pub trait Scale: fmt::Debug {
    fn id(&self) -> ScaleId;
    fn kind(&self) -> ScaleKind;

    /// Maps a domain value to pixel space. Unmappable values yield `NaN`.
    fn scale(&self, value: &Value) -> f64;
    fn invert(&self, pixel: f64) -> Option<Value>;

    fn domain(&self) -> Vec<Value>;
    fn range(&self) -> (f64, f64);
    fn set_range(&self, start: f64, end: f64);

    /// Band width for discrete scales, `None` for continuous ones.
    fn band_width(&self) -> Option<f64> {
        None
    }

    fn set_extents(&self, provider: ComponentId, values: Vec<Value>);
    fn set_included_values(&self, provider: ComponentId, values: Vec<Value>);
    fn set_padding_exceptions(&self, provider: ComponentId, values: Vec<Value>);
    fn remove_provider(&self, provider: ComponentId);

    fn on_update(&self, callback: Rc<dyn Fn(&ScaleUpdate)>) -> CallbackId;
    fn off_update(&self, id: CallbackId) -> bool;
}

fn changed(a: f64, b: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return a.is_nan() != b.is_nan();
    }
    (a - b).abs() > CHANGE_EPSILON
}

fn validate_range(start: f64, end: f64) -> ChartResult<()> {
    if !start.is_finite() || !end.is_finite() {
        return Err(ChartError::InvalidData(
            "scale range must be finite".to_owned(),
        ));
    }
    Ok(())
}

#[derive(Debug)]
struct LinearState {
    temporal: bool,
    explicit_domain: Option<(f64, f64)>,
    extents: IndexMap<ComponentId, Vec<f64>>,
    included: IndexMap<ComponentId, Vec<f64>>,
    padding_exceptions: IndexMap<ComponentId, Vec<f64>>,
    pad_proportion: f64,
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearState {
    fn auto_domain(&self) -> (f64, f64) {
        if let Some(domain) = self.explicit_domain {
            return domain;
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in self
            .extents
            .values()
            .chain(self.included.values())
            .flatten()
            .copied()
            .filter(|value| value.is_finite())
        {
            min = min.min(value);
            max = max.max(value);
        }
        if !min.is_finite() || !max.is_finite() {
            return (0.0, 1.0);
        }
        self.pad_domain(min, max)
    }

    fn pad_domain(&self, min: f64, max: f64) -> (f64, f64) {
        if min == max {
            if self.temporal {
                return expand_single_time_value(min);
            }
            return (min - 1.0, max + 1.0);
        }
        if self.pad_proportion == 0.0 {
            return (min, max);
        }

        let half = self.pad_proportion / 2.0;
        let span = max - min;
        let is_exception =
            |value: f64| self.padding_exceptions.values().flatten().any(|e| *e == value);
        let padded_min = if is_exception(min) {
            min
        } else {
            min - span * half
        };
        let padded_max = if is_exception(max) {
            max
        } else {
            max + span * half
        };
        (padded_min, padded_max)
    }
}

/// Continuous scale over numbers or instants (milliseconds since the epoch).
pub struct LinearScale {
    id: ScaleId,
    state: RefCell<LinearState>,
    callbacks: RefCell<CallbackSet<ScaleUpdate>>,
}

impl fmt::Debug for LinearScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("LinearScale")
            .field("id", &self.id)
            .field("temporal", &state.temporal)
            .field("domain", &state.domain)
            .field("range", &state.range)
            .finish()
    }
}

impl Default for LinearScale {
    fn default() -> Self {
        Self::with_temporal(false)
    }
}

impl LinearScale {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scale whose domain values are UTC instants.
    #[must_use]
    pub fn time() -> Self {
        Self::with_temporal(true)
    }

    fn with_temporal(temporal: bool) -> Self {
        Self {
            id: ScaleId::next_id(),
            state: RefCell::new(LinearState {
                temporal,
                explicit_domain: None,
                extents: IndexMap::new(),
                included: IndexMap::new(),
                padding_exceptions: IndexMap::new(),
                pad_proportion: 0.05,
                domain: (0.0, 1.0),
                range: (0.0, 1.0),
            }),
            callbacks: RefCell::new(CallbackSet::default()),
        }
    }

    /// Builder form of [`LinearScale::set_domain`].
    pub fn with_domain(self, start: f64, end: f64) -> ChartResult<Self> {
        self.set_domain(start, end)?;
        Ok(self)
    }

    pub fn with_range(self, start: f64, end: f64) -> ChartResult<Self> {
        validate_range(start, end)?;
        self.set_range(start, end);
        Ok(self)
    }

    /// Pins the domain, overriding auto-domain computation.
    pub fn set_domain(&self, start: f64, end: f64) -> ChartResult<()> {
        if !start.is_finite() || !end.is_finite() || start == end {
            return Err(ChartError::InvalidData(
                "scale domain must be finite and non-zero".to_owned(),
            ));
        }
        self.update(|state| state.explicit_domain = Some((start, end)));
        Ok(())
    }

    /// Returns to auto-domain computation.
    pub fn auto_domain(&self) {
        self.update(|state| state.explicit_domain = None);
    }

    pub fn set_pad_proportion(&self, proportion: f64) -> ChartResult<()> {
        if !proportion.is_finite() || proportion < 0.0 {
            return Err(ChartError::InvalidData(
                "pad proportion must be finite and >= 0".to_owned(),
            ));
        }
        self.update(|state| state.pad_proportion = proportion);
        Ok(())
    }

    #[must_use]
    pub fn numeric_domain(&self) -> (f64, f64) {
        self.state.borrow().domain
    }

    #[must_use]
    pub fn scale_number(&self, value: f64) -> f64 {
        let state = self.state.borrow();
        let (d0, d1) = state.domain;
        let (r0, r1) = state.range;
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }

    #[must_use]
    pub fn invert_number(&self, pixel: f64) -> f64 {
        let state = self.state.borrow();
        let (d0, d1) = state.domain;
        let (r0, r1) = state.range;
        if r0 == r1 {
            return d0;
        }
        d0 + (pixel - r0) / (r1 - r0) * (d1 - d0)
    }

    fn is_temporal(&self) -> bool {
        self.state.borrow().temporal
    }

    fn numbers(values: &[Value]) -> Vec<f64> {
        values.iter().filter_map(Value::as_f64).collect()
    }

    fn update(&self, mutate: impl FnOnce(&mut LinearState)) {
        let fire = {
            let mut state = self.state.borrow_mut();
            let before = (state.domain, state.range);
            mutate(&mut state);
            state.domain = state.auto_domain();
            let after = (state.domain, state.range);
            changed(before.0.0, after.0.0)
                || changed(before.0.1, after.0.1)
                || changed(before.1.0, after.1.0)
                || changed(before.1.1, after.1.1)
        };
        if fire {
            self.notify();
        }
    }

    fn notify(&self) {
        let callbacks = self.callbacks.borrow().snapshot();
        let update = ScaleUpdate { scale: self.id };
        for callback in callbacks {
            callback(&update);
        }
    }
}

impl Scale for LinearScale {
    fn id(&self) -> ScaleId {
        self.id
    }

    fn kind(&self) -> ScaleKind {
        if self.is_temporal() {
            ScaleKind::Time
        } else {
            ScaleKind::Linear
        }
    }

    fn scale(&self, value: &Value) -> f64 {
        value
            .as_f64()
            .map_or(f64::NAN, |number| self.scale_number(number))
    }

    fn invert(&self, pixel: f64) -> Option<Value> {
        if !pixel.is_finite() {
            return None;
        }
        let number = self.invert_number(pixel);
        if self.is_temporal() {
            unix_millis_to_datetime(number).map(Value::Time)
        } else {
            Some(Value::Number(number))
        }
    }

    fn domain(&self) -> Vec<Value> {
        let (start, end) = self.numeric_domain();
        if self.is_temporal() {
            [start, end]
                .into_iter()
                .filter_map(unix_millis_to_datetime)
                .map(Value::Time)
                .collect()
        } else {
            vec![Value::Number(start), Value::Number(end)]
        }
    }

    fn range(&self) -> (f64, f64) {
        self.state.borrow().range
    }

    fn set_range(&self, start: f64, end: f64) {
        if validate_range(start, end).is_err() {
            return;
        }
        self.update(|state| state.range = (start, end));
    }

    fn set_extents(&self, provider: ComponentId, values: Vec<Value>) {
        let numbers = Self::numbers(&values);
        self.update(|state| {
            state.extents.insert(provider, numbers);
        });
    }

    fn set_included_values(&self, provider: ComponentId, values: Vec<Value>) {
        let numbers = Self::numbers(&values);
        self.update(|state| {
            state.included.insert(provider, numbers);
        });
    }

    fn set_padding_exceptions(&self, provider: ComponentId, values: Vec<Value>) {
        let numbers = Self::numbers(&values);
        self.update(|state| {
            state.padding_exceptions.insert(provider, numbers);
        });
    }

    fn remove_provider(&self, provider: ComponentId) {
        self.update(|state| {
            state.extents.shift_remove(&provider);
            state.included.shift_remove(&provider);
            state.padding_exceptions.shift_remove(&provider);
        });
    }

    fn on_update(&self, callback: Rc<dyn Fn(&ScaleUpdate)>) -> CallbackId {
        self.callbacks.borrow_mut().add(callback)
    }

    fn off_update(&self, id: CallbackId) -> bool {
        self.callbacks.borrow_mut().remove(id)
    }
}

/// Widens a single-value time domain by one day on each side.
#[must_use]
fn expand_single_time_value(millis: f64) -> (f64, f64) {
    (millis - DAY_MILLIS, millis + DAY_MILLIS)
}
