use std::fmt;
use std::str::FromStr;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::{Bounds, Point, Range, Scale, Size, Value};
use crate::error::{ChartError, ChartResult};
use crate::plot::BarPlotConfig;

/// Direction bars grow in. Vertical bars sit on the x axis and grow along y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

impl Orientation {
    #[must_use]
    pub fn is_vertical(self) -> bool {
        self == Self::Vertical
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vertical => "vertical",
            Self::Horizontal => "horizontal",
        }
    }

    /// Extent of `size` along the base axis.
    #[must_use]
    pub fn base_extent(self, size: Size) -> f64 {
        match self {
            Self::Vertical => size.width,
            Self::Horizontal => size.height,
        }
    }

    /// Extent of `size` along the value axis.
    #[must_use]
    pub fn value_extent(self, size: Size) -> f64 {
        match self {
            Self::Vertical => size.height,
            Self::Horizontal => size.width,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = ChartError;

    fn from_str(text: &str) -> ChartResult<Self> {
        match text {
            "vertical" => Ok(Self::Vertical),
            "horizontal" => Ok(Self::Horizontal),
            other => Err(ChartError::InvalidOrientation(other.to_owned())),
        }
    }
}

/// Pixel rectangle of one bar in plot-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BarRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BarRect {
    /// Places a bar of `bar_width` centered on `scaled_base`, spanning from
    /// `scaled_baseline` to `scaled_value` along the value axis.
    #[must_use]
    pub fn new(
        orientation: Orientation,
        scaled_base: f64,
        scaled_value: f64,
        scaled_baseline: f64,
        bar_width: f64,
    ) -> Self {
        let position = scaled_value.min(scaled_baseline);
        let length = (scaled_value - scaled_baseline).abs();
        let secondary = scaled_base - bar_width / 2.0;
        match orientation {
            Orientation::Vertical => Self {
                x: secondary,
                y: position,
                width: bar_width,
                height: length,
            },
            Orientation::Horizontal => Self {
                x: position,
                y: secondary,
                width: length,
                height: bar_width,
            },
        }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::from_origin_size(Point::new(self.x, self.y), Size::new(self.width, self.height))
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[must_use]
    pub fn contains(&self, point: Point, tolerance: f64) -> bool {
        self.intersects(Range::point(point.x), Range::point(point.y), tolerance)
    }

    /// Whether the rect overlaps both ranges, each widened by `tolerance`.
    #[must_use]
    pub fn intersects(&self, x: Range, y: Range, tolerance: f64) -> bool {
        self.x <= x.max + tolerance
            && self.x + self.width >= x.min - tolerance
            && self.y <= y.max + tolerance
            && self.y + self.height >= y.min - tolerance
    }

    /// Whether any part of the rect lies inside a plot of `size`.
    #[must_use]
    pub fn visible_within(&self, size: Size) -> bool {
        self.intersects(Range::new(0.0, size.width), Range::new(0.0, size.height), 0.0)
    }

    fn secondary_range(&self, orientation: Orientation) -> Range {
        match orientation {
            Orientation::Vertical => Range::new(self.x, self.x + self.width),
            Orientation::Horizontal => Range::new(self.y, self.y + self.height),
        }
    }
}

/// Point at the far end of the bar, centered on the base axis.
///
/// Vertical bars above the baseline report their top edge and bars below it
/// their bottom edge; horizontal bars report their right or left edge.
#[must_use]
pub fn pixel_point(
    orientation: Orientation,
    rect: &BarRect,
    scaled_value: f64,
    scaled_baseline: f64,
) -> Point {
    match orientation {
        Orientation::Vertical => {
            let y = if scaled_value <= scaled_baseline {
                rect.y
            } else {
                rect.y + rect.height
            };
            Point::new(rect.x + rect.width / 2.0, y)
        }
        Orientation::Horizontal => {
            let x = if scaled_value >= scaled_baseline {
                rect.x + rect.width
            } else {
                rect.x
            };
            Point::new(x, rect.y + rect.height / 2.0)
        }
    }
}

/// Pixel width of every bar.
///
/// Banded scales hand out their band width. On continuous scales the width
/// is the smallest pixel gap between adjacent distinct base values, or a
/// share of the plot's base extent when fewer than two values exist, scaled
/// by the configured ratio.
#[must_use]
pub fn bar_pixel_width(
    base_scale: &dyn Scale,
    base_values: &[Value],
    base_extent: f64,
    config: &BarPlotConfig,
) -> f64 {
    if let Some(band) = base_scale.band_width() {
        return band;
    }

    let mut scaled: Vec<OrderedFloat<f64>> = base_values
        .iter()
        .map(|value| base_scale.scale(value))
        .filter(|pixel| pixel.is_finite())
        .map(OrderedFloat)
        .collect();
    scaled.sort_unstable();
    scaled.dedup();

    let gap = scaled
        .windows(2)
        .map(|pair| (pair[1].0 - pair[0].0).abs())
        .min_by(f64::total_cmp);
    let width = match gap {
        Some(gap) => gap,
        None => base_extent * config.single_bar_ratio,
    };
    if width.is_finite() {
        width * config.bar_width_ratio
    } else {
        0.0
    }
}

/// Base-axis extent of the data widened by half a bar on both sides, so
/// the outermost bars are not clipped by the domain ends.
///
/// Returns the raw values when the scale cannot invert the widened pixels.
#[must_use]
pub fn widened_base_extent(
    base_scale: &dyn Scale,
    base_values: &[Value],
    bar_width: f64,
) -> Vec<Value> {
    let numeric = || base_values.iter().filter_map(Value::as_f64).map(OrderedFloat);
    let (Some(min), Some(max)) = (numeric().min(), numeric().max()) else {
        return base_values.to_vec();
    };
    let pick = |number: f64| {
        base_values
            .iter()
            .find(|value| value.as_f64() == Some(number))
            .cloned()
            .unwrap_or(Value::Number(number))
    };
    let (min_value, max_value) = (pick(min.0), pick(max.0));
    if bar_width.is_nan() || bar_width <= 0.0 {
        return vec![min_value, max_value];
    }

    let half = bar_width / 2.0;
    let min_pixel = base_scale.scale(&min_value);
    let max_pixel = base_scale.scale(&max_value);
    let candidates = [
        base_scale.invert(min_pixel - half),
        base_scale.invert(min_pixel + half),
        base_scale.invert(max_pixel - half),
        base_scale.invert(max_pixel + half),
    ];
    let inverted: Option<Vec<Value>> = candidates.into_iter().collect();
    let Some(inverted) = inverted else {
        return vec![min_value, max_value];
    };
    let lowest = inverted
        .iter()
        .filter(|value| value.as_f64().is_some())
        .min_by_key(|value| value.as_f64().map(OrderedFloat));
    let highest = inverted
        .iter()
        .filter(|value| value.as_f64().is_some())
        .max_by_key(|value| value.as_f64().map(OrderedFloat));
    match (lowest, highest) {
        (Some(lowest), Some(highest)) => vec![lowest.clone(), highest.clone()],
        _ => vec![min_value, max_value],
    }
}

/// Primary and secondary distance of a query from one bar.
///
/// The primary axis is the value axis. A query inside the bar (within
/// `tolerance`) is at distance zero on both axes; a query within the bar's
/// base span has zero secondary distance.
#[must_use]
pub fn hit_distance(
    orientation: Orientation,
    rect: &BarRect,
    position: Point,
    query: Point,
    tolerance: f64,
) -> (f64, f64) {
    if rect.contains(query, tolerance) {
        return (0.0, 0.0);
    }
    let (query_primary, query_secondary, position_primary, position_secondary) = match orientation {
        Orientation::Vertical => (query.y, query.x, position.y, position.x),
        Orientation::Horizontal => (query.x, query.y, position.x, position.y),
    };
    let primary = (query_primary - position_primary).abs();
    let span = rect.secondary_range(orientation);
    let within = query_secondary >= span.min - tolerance && query_secondary <= span.max + tolerance;
    let secondary = if within {
        0.0
    } else {
        (query_secondary - position_secondary).abs()
    };
    (primary, secondary)
}

/// Index of the candidate closest to `query`.
///
/// A candidate wins with a strictly smaller primary distance; on an exact
/// primary tie the smaller secondary distance wins, and on a full tie the
/// earlier candidate is kept.
#[must_use]
pub fn nearest_bar<'a>(
    orientation: Orientation,
    candidates: impl IntoIterator<Item = (&'a BarRect, Point)>,
    query: Point,
    tolerance: f64,
) -> Option<usize> {
    let mut best: Option<(usize, f64, f64)> = None;
    for (index, (rect, position)) in candidates.into_iter().enumerate() {
        let (primary, secondary) = hit_distance(orientation, rect, position, query, tolerance);
        let closer = match best {
            None => true,
            Some((_, best_primary, best_secondary)) => {
                primary < best_primary || (primary == best_primary && secondary < best_secondary)
            }
        };
        if closer {
            best = Some((index, primary, secondary));
        }
    }
    best.map(|(index, _, _)| index)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{bar_pixel_width, nearest_bar, pixel_point, BarRect, Orientation};
    use crate::core::{CategoryScale, LinearScale, Point, Value};
    use crate::plot::BarPlotConfig;

    #[test]
    fn vertical_rect_spans_value_and_baseline() {
        let up = BarRect::new(Orientation::Vertical, 30.0, 50.0, 100.0, 40.0);
        assert_eq!(up, BarRect { x: 10.0, y: 50.0, width: 40.0, height: 50.0 });
        assert_eq!(pixel_point(Orientation::Vertical, &up, 50.0, 100.0), Point::new(30.0, 50.0));

        let down = BarRect::new(Orientation::Vertical, 30.0, 120.0, 100.0, 40.0);
        assert_eq!(down.y, 100.0);
        assert_eq!(
            pixel_point(Orientation::Vertical, &down, 120.0, 100.0),
            Point::new(30.0, 120.0)
        );
    }

    #[test]
    fn horizontal_rect_swaps_axes() {
        let rect = BarRect::new(Orientation::Horizontal, 20.0, 80.0, 0.0, 10.0);
        assert_eq!(rect, BarRect { x: 0.0, y: 15.0, width: 80.0, height: 10.0 });
        assert_eq!(pixel_point(Orientation::Horizontal, &rect, 80.0, 0.0), Point::new(80.0, 20.0));
        assert!("diagonal".parse::<Orientation>().is_err());
        assert_eq!("horizontal".parse::<Orientation>().ok(), Some(Orientation::Horizontal));
    }

    #[test]
    fn category_width_is_band_width() {
        let scale = CategoryScale::new()
            .with_padding(0.0, 0.25)
            .expect("padding")
            .with_domain(["A", "B"])
            .with_range(0.0, 100.0);
        let width = bar_pixel_width(&scale, &[], 100.0, &BarPlotConfig::default());
        assert_relative_eq!(width, 40.0, epsilon = 1e-9);
    }

    #[test]
    fn continuous_width_uses_tightest_gap() {
        let scale = LinearScale::new()
            .with_domain(0.0, 10.0)
            .and_then(|scale| scale.with_range(0.0, 100.0))
            .expect("scale");
        let config = BarPlotConfig::default();
        let values = [1.0, 3.0, 3.0, 4.0].map(Value::Number);
        assert_relative_eq!(bar_pixel_width(&scale, &values, 100.0, &config), 9.5, epsilon = 1e-9);

        let single = [Value::Number(2.0)];
        assert_relative_eq!(bar_pixel_width(&scale, &single, 100.0, &config), 38.0, epsilon = 1e-9);
    }

    #[test]
    fn nearest_prefers_value_axis_then_base_axis() {
        let left = BarRect::new(Orientation::Vertical, 20.0, 50.0, 100.0, 10.0);
        let right = BarRect::new(Orientation::Vertical, 60.0, 50.0, 100.0, 10.0);
        let candidates = [(&left, Point::new(20.0, 50.0)), (&right, Point::new(60.0, 50.0))];

        let query = Point::new(50.0, 20.0);
        assert_eq!(nearest_bar(Orientation::Vertical, candidates, query, 0.5), Some(1));
        let inside = Point::new(20.0, 70.0);
        assert_eq!(nearest_bar(Orientation::Vertical, candidates, inside, 0.5), Some(0));
        assert_eq!(nearest_bar(Orientation::Vertical, [], inside, 0.5), None);
    }
}
