use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::core::callbacks::{CallbackId, CallbackSet};
use crate::core::primitives::Value;
use crate::core::scale::{Scale, ScaleId, ScaleKind, ScaleUpdate};
use crate::error::{ChartError, ChartResult};
use crate::layout::ComponentId;

const CHANGE_EPSILON: f64 = 1e-9;

#[derive(Debug)]
struct CategoryState {
    explicit_domain: Option<Vec<String>>,
    extents: IndexMap<ComponentId, Vec<String>>,
    included: IndexMap<ComponentId, Vec<String>>,
    padding_inner: f64,
    padding_outer: f64,
    domain: Vec<String>,
    range: (f64, f64),
}

impl CategoryState {
    fn resolve_domain(&self) -> Vec<String> {
        if let Some(domain) = &self.explicit_domain {
            return domain.clone();
        }
        let mut seen = IndexSet::new();
        for name in self
            .extents
            .values()
            .chain(self.included.values())
            .flatten()
        {
            seen.insert(name.clone());
        }
        seen.into_iter().collect()
    }

    /// Distance between the starts of consecutive bands.
    fn step(&self) -> f64 {
        let count = self.domain.len() as f64;
        let (start, end) = self.range;
        let slots = (count - self.padding_inner + 2.0 * self.padding_outer).max(1.0);
        (end - start).abs() / slots
    }

    fn band_width(&self) -> f64 {
        self.step() * (1.0 - self.padding_inner)
    }

    fn band_start(&self, index: usize) -> f64 {
        let (start, end) = self.range;
        let step = self.step();
        let offset = step * self.padding_outer + step * index as f64;
        if end >= start {
            start + offset
        } else {
            start - offset - self.band_width()
        }
    }
}

/// Discrete scale splitting its range into equal bands, one per category.
///
/// Padding values are fractions of the step: `padding_inner` between bands,
/// `padding_outer` before the first and after the last band.
pub struct CategoryScale {
    id: ScaleId,
    state: RefCell<CategoryState>,
    callbacks: RefCell<CallbackSet<ScaleUpdate>>,
}

impl fmt::Debug for CategoryScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("CategoryScale")
            .field("id", &self.id)
            .field("domain", &state.domain)
            .field("range", &state.range)
            .finish()
    }
}

impl Default for CategoryScale {
    fn default() -> Self {
        Self {
            id: ScaleId::next_id(),
            state: RefCell::new(CategoryState {
                explicit_domain: None,
                extents: IndexMap::new(),
                included: IndexMap::new(),
                padding_inner: 0.3,
                padding_outer: 0.5,
                domain: Vec::new(),
                range: (0.0, 1.0),
            }),
            callbacks: RefCell::new(CallbackSet::default()),
        }
    }
}

impl CategoryScale {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_padding(self, inner: f64, outer: f64) -> ChartResult<Self> {
        self.set_padding(inner, outer)?;
        Ok(self)
    }

    pub fn with_domain<I, S>(self, domain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_domain(domain);
        self
    }

    #[must_use]
    pub fn with_range(self, start: f64, end: f64) -> Self {
        self.set_range(start, end);
        self
    }

    pub fn set_padding(&self, inner: f64, outer: f64) -> ChartResult<()> {
        if !inner.is_finite() || !(0.0..1.0).contains(&inner) {
            return Err(ChartError::InvalidData(
                "inner padding must be finite and in [0, 1)".to_owned(),
            ));
        }
        if !outer.is_finite() || outer < 0.0 {
            return Err(ChartError::InvalidData(
                "outer padding must be finite and >= 0".to_owned(),
            ));
        }
        self.update(|state| {
            state.padding_inner = inner;
            state.padding_outer = outer;
        });
        Ok(())
    }

    pub fn set_domain<I, S>(&self, domain: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique = IndexSet::new();
        for name in domain {
            unique.insert(name.into());
        }
        self.update(|state| state.explicit_domain = Some(unique.into_iter().collect()));
    }

    #[must_use]
    pub fn step_width(&self) -> f64 {
        self.state.borrow().step()
    }

    fn categories(values: &[Value]) -> Vec<String> {
        values
            .iter()
            .filter(|value| !value.is_missing())
            .map(ToString::to_string)
            .collect()
    }

    fn update(&self, mutate: impl FnOnce(&mut CategoryState)) {
        let fire = {
            let mut state = self.state.borrow_mut();
            let before_domain = state.domain.clone();
            let before_range = state.range;
            let before_band = state.band_width();
            mutate(&mut state);
            state.domain = state.resolve_domain();
            before_domain != state.domain
                || (before_range.0 - state.range.0).abs() > CHANGE_EPSILON
                || (before_range.1 - state.range.1).abs() > CHANGE_EPSILON
                || (before_band - state.band_width()).abs() > CHANGE_EPSILON
        };
        if fire {
            let callbacks = self.callbacks.borrow().snapshot();
            let update = ScaleUpdate { scale: self.id };
            for callback in callbacks {
                callback(&update);
            }
        }
    }
}

impl Scale for CategoryScale {
    fn id(&self) -> ScaleId {
        self.id
    }

    fn kind(&self) -> ScaleKind {
        ScaleKind::Category
    }

    fn scale(&self, value: &Value) -> f64 {
        if value.is_missing() {
            return f64::NAN;
        }
        let key = value.to_string();
        let state = self.state.borrow();
        state
            .domain
            .iter()
            .position(|name| *name == key)
            .map_or(f64::NAN, |index| {
                state.band_start(index) + state.band_width() / 2.0
            })
    }

    /// Returns the category whose band center is closest to `pixel`.
    fn invert(&self, pixel: f64) -> Option<Value> {
        if !pixel.is_finite() {
            return None;
        }
        let state = self.state.borrow();
        let half = state.band_width() / 2.0;
        state
            .domain
            .iter()
            .enumerate()
            .map(|(index, name)| ((state.band_start(index) + half - pixel).abs(), name))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, name)| Value::Category(name.clone()))
    }

    fn domain(&self) -> Vec<Value> {
        self.state
            .borrow()
            .domain
            .iter()
            .cloned()
            .map(Value::Category)
            .collect()
    }

    fn range(&self) -> (f64, f64) {
        self.state.borrow().range
    }

    fn set_range(&self, start: f64, end: f64) {
        if !start.is_finite() || !end.is_finite() {
            return;
        }
        self.update(|state| state.range = (start, end));
    }

    fn band_width(&self) -> Option<f64> {
        Some(self.state.borrow().band_width())
    }

    fn set_extents(&self, provider: ComponentId, values: Vec<Value>) {
        let names = Self::categories(&values);
        self.update(|state| {
            state.extents.insert(provider, names);
        });
    }

    fn set_included_values(&self, provider: ComponentId, values: Vec<Value>) {
        let names = Self::categories(&values);
        self.update(|state| {
            state.included.insert(provider, names);
        });
    }

    // Discrete domains are never padded.
    fn set_padding_exceptions(&self, _provider: ComponentId, _values: Vec<Value>) {}

    fn remove_provider(&self, provider: ComponentId) {
        self.update(|state| {
            state.extents.shift_remove(&provider);
            state.included.shift_remove(&provider);
        });
    }

    fn on_update(&self, callback: Rc<dyn Fn(&ScaleUpdate)>) -> CallbackId {
        self.callbacks.borrow_mut().add(callback)
    }

    fn off_update(&self, id: CallbackId) -> bool {
        self.callbacks.borrow_mut().remove(id)
    }
}
