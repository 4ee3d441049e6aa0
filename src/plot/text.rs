use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::core::{Size, Value};

/// Measures the pixel box a string occupies when written.
pub trait TextMeasurer: fmt::Debug {
    fn measure(&self, text: &str) -> Size;
}

/// Fixed advance per character; no font backend required.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMeasurer {
    pub char_width: f64,
    pub line_height: f64,
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            line_height: 12.0,
        }
    }
}

impl MonospaceMeasurer {
    #[must_use]
    pub fn new(char_width: f64, line_height: f64) -> Self {
        Self {
            char_width,
            line_height,
        }
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure(&self, text: &str) -> Size {
        if text.is_empty() {
            return Size::default();
        }
        Size::new(text.chars().count() as f64 * self.char_width, self.line_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeasureCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

#[derive(Debug, Default)]
struct MeasureCache {
    entries: HashMap<String, Size>,
    hits: u64,
    misses: u64,
}

/// Memoizes another measurer; labels repeat across renders.
#[derive(Debug)]
pub struct CachingMeasurer<M: TextMeasurer> {
    inner: M,
    cache: RefCell<MeasureCache>,
}

impl<M: TextMeasurer> CachingMeasurer<M> {
    const MAX_ENTRIES: usize = 4096;

    #[must_use]
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            cache: RefCell::new(MeasureCache::default()),
        }
    }

    pub fn clear(&self) {
        self.cache.borrow_mut().entries.clear();
    }

    #[must_use]
    pub fn stats(&self) -> MeasureCacheStats {
        let cache = self.cache.borrow();
        MeasureCacheStats {
            hits: cache.hits,
            misses: cache.misses,
            size: cache.entries.len(),
        }
    }
}

impl<M: TextMeasurer> TextMeasurer for CachingMeasurer<M> {
    fn measure(&self, text: &str) -> Size {
        let mut cache = self.cache.borrow_mut();
        if let Some(size) = cache.entries.get(text).copied() {
            cache.hits = cache.hits.saturating_add(1);
            return size;
        }
        cache.misses = cache.misses.saturating_add(1);
        let size = self.inner.measure(text);
        if cache.entries.len() >= Self::MAX_ENTRIES {
            cache.entries.clear();
        }
        cache.entries.insert(text.to_owned(), size);
        size
    }
}

/// Turns a label value into display text.
#[derive(Clone)]
pub struct Formatter {
    format: Rc<dyn Fn(&Value) -> String>,
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Formatter")
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::identity()
    }
}

impl Formatter {
    pub fn new(format: impl Fn(&Value) -> String + 'static) -> Self {
        Self {
            format: Rc::new(format),
        }
    }

    /// `Display` of the value.
    #[must_use]
    pub fn identity() -> Self {
        Self::new(|value: &Value| value.to_string())
    }

    /// Numbers rounded half away from zero to `precision` decimals.
    #[must_use]
    pub fn fixed(precision: u32) -> Self {
        Self::new(move |value| match value {
            Value::Number(number) => format_fixed(*number, precision),
            other => other.to_string(),
        })
    }

    #[must_use]
    pub fn format(&self, value: &Value) -> String {
        (self.format)(value)
    }
}

fn format_fixed(value: f64, precision: u32) -> String {
    if !value.is_finite() {
        return "nan".to_owned();
    }
    let digits = precision as usize;
    match Decimal::from_f64(value) {
        Some(decimal) => {
            let rounded =
                decimal.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
            format!("{rounded:.digits$}")
        }
        None => format!("{value:.digits$}"),
    }
}

#[cfg(test)]
mod tests {
    use super::{CachingMeasurer, Formatter, MonospaceMeasurer, TextMeasurer};
    use crate::core::Value;

    #[test]
    fn fixed_formatter_rounds_half_away_from_zero() {
        let formatter = Formatter::fixed(2);
        assert_eq!(formatter.format(&Value::Number(-2.5)), "-2.50");
        assert_eq!(Formatter::fixed(1).format(&Value::Number(1.25)), "1.3");
        assert_eq!(formatter.format(&Value::Category("A".to_owned())), "A");
        assert_eq!(Formatter::identity().format(&Value::Number(5.0)), "5");
    }

    #[test]
    fn caching_measurer_counts_hits() {
        let measurer = CachingMeasurer::new(MonospaceMeasurer::new(6.0, 10.0));
        assert_eq!(measurer.measure("abc").width, 18.0);
        assert_eq!(measurer.measure("abc").height, 10.0);
        let stats = measurer.stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
    }
}
