use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::{Dataset, DatasetId, Value};
use crate::error::{ChartError, ChartResult};
use crate::plot::Accessor;

/// Order datasets are stacked in.
///
/// `BottomUp` puts the first dataset next to zero and stacks later ones
/// outward; `TopDown` reverses that, matching legend order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackingOrder {
    #[default]
    BottomUp,
    TopDown,
}

impl StackingOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BottomUp => "bottomup",
            Self::TopDown => "topdown",
        }
    }
}

impl fmt::Display for StackingOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StackingOrder {
    type Err = ChartError;

    fn from_str(text: &str) -> ChartResult<Self> {
        match text {
            "bottomup" => Ok(Self::BottomUp),
            "topdown" => Ok(Self::TopDown),
            other => Err(ChartError::InvalidData(format!("unknown stacking order `{other}`"))),
        }
    }
}

/// Key datums are stacked under: the display form of their base value.
#[must_use]
pub fn stack_key(value: &Value) -> String {
    value.to_string()
}

/// One datum's segment: it runs from `offset` to `offset + value`.
#[derive(Debug, Clone, PartialEq)]
pub struct StackedDatum {
    pub value: f64,
    pub offset: f64,
    pub axis_value: Value,
}

impl StackedDatum {
    #[must_use]
    pub fn end(&self) -> f64 {
        self.offset + self.value
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.offset.min(self.end())
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.offset.max(self.end())
    }
}

/// Outer end of one stack and the base value it sits on.
#[derive(Debug, Clone, PartialEq)]
pub struct StackExtent {
    pub extent: f64,
    pub axis_value: Value,
}

/// Segments of every dataset, keyed by stack key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackingResult {
    stacks: IndexMap<DatasetId, IndexMap<String, StackedDatum>>,
}

impl StackingResult {
    #[must_use]
    pub fn get(&self, dataset: DatasetId, key: &str) -> Option<&StackedDatum> {
        self.stacks.get(&dataset).and_then(|stack| stack.get(key))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stacks.values().all(IndexMap::is_empty)
    }

    pub fn segments(&self) -> impl Iterator<Item = (&str, &StackedDatum)> {
        self.stacks
            .values()
            .flat_map(|stack| stack.iter().map(|(key, datum)| (key.as_str(), datum)))
    }
}

/// Stacks `datasets` per base key.
///
/// Non-negative values pile up on the positive side of zero and negative
/// values on the negative side, each starting where the previous dataset's
/// segment with the same sign ended. Datums without a finite value are not
/// stacked.
#[must_use]
pub fn stack(
    datasets: &[Dataset],
    key: &Accessor,
    value: &Accessor,
    order: StackingOrder,
) -> StackingResult {
    let mut positive: IndexMap<String, f64> = IndexMap::new();
    let mut negative: IndexMap<String, f64> = IndexMap::new();
    let mut ordered: Vec<&Dataset> = datasets.iter().collect();
    if order == StackingOrder::TopDown {
        ordered.reverse();
    }

    let mut result = StackingResult::default();
    for dataset in ordered {
        let mut stack = IndexMap::new();
        for (index, datum) in dataset.data().iter().enumerate() {
            let Some(amount) = value.value(datum, index, dataset).as_f64() else {
                continue;
            };
            let axis_value = key.value(datum, index, dataset);
            let normalized = stack_key(&axis_value);
            let offsets = if amount >= 0.0 { &mut positive } else { &mut negative };
            let running = offsets.entry(normalized.clone()).or_insert(0.0);
            let offset = *running;
            *running += amount;
            stack.insert(
                normalized,
                StackedDatum {
                    value: amount,
                    offset,
                    axis_value,
                },
            );
        }
        result.stacks.insert(dataset.id(), stack);
    }
    result
}

/// Largest and smallest stack end of every stack key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackedExtents {
    pub maximum: IndexMap<String, StackExtent>,
    pub minimum: IndexMap<String, StackExtent>,
}

#[must_use]
pub fn stacked_extents(result: &StackingResult) -> StackedExtents {
    let mut extents = StackedExtents::default();
    for (key, datum) in result.segments() {
        let (high, low) = (datum.max(), datum.min());
        let maximum = extents.maximum.entry(key.to_owned()).or_insert_with(|| StackExtent {
            extent: high,
            axis_value: datum.axis_value.clone(),
        });
        if maximum.extent < high {
            maximum.extent = high;
            maximum.axis_value = datum.axis_value.clone();
        }
        let minimum = extents.minimum.entry(key.to_owned()).or_insert_with(|| StackExtent {
            extent: low,
            axis_value: datum.axis_value.clone(),
        });
        if minimum.extent > low {
            minimum.extent = low;
            minimum.axis_value = datum.axis_value.clone();
        }
    }
    extents
}

/// Value range covered by every stack, always including zero.
#[must_use]
pub fn stacked_extent(result: &StackingResult) -> (f64, f64) {
    result
        .segments()
        .map(|(_, datum)| datum.end())
        .fold((0.0, 0.0), |(low, high), end| (low.min(end), high.max(end)))
}
