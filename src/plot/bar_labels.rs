use crate::core::{Bounds, Point, Size};
use crate::plot::{BarPlotConfig, BarRect, Orientation};
use crate::render::{Color, Element};

pub const ON_BAR_CLASS: &str = "on-bar-label";
pub const OFF_BAR_CLASS: &str = "off-bar-label";
pub const DARK_CLASS: &str = "dark-label";
pub const LIGHT_CLASS: &str = "light-label";

/// Everything label placement needs to know about one bar.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRequest {
    pub text: String,
    pub measured: Size,
    pub rect: BarRect,
    pub scaled_value: f64,
    pub scaled_baseline: f64,
    pub fill: Color,
}

/// Where a bar's value label goes and how it is styled.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPlacement {
    pub text: String,
    pub origin: Point,
    pub size: Size,
    pub on_bar: bool,
    /// Dark text on a light bar. Only set for labels drawn inside the bar.
    pub dark: Option<bool>,
    /// False when the label would leave the plot area.
    pub visible: bool,
    /// The label does not fit across the bar's base-axis thickness.
    pub too_wide: bool,
}

impl LabelPlacement {
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::from_origin_size(self.origin, self.size)
    }

    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut element = Element::text(self.text.as_str(), self.origin.x, self.origin.y)
            .with_attr("width", self.size.width)
            .with_attr("height", self.size.height)
            .with_visible(self.visible);
        element = match self.dark {
            Some(true) => element.with_class(ON_BAR_CLASS).with_class(DARK_CLASS),
            Some(false) => element.with_class(ON_BAR_CLASS).with_class(LIGHT_CLASS),
            None => element.with_class(OFF_BAR_CLASS),
        };
        element
    }
}

/// Places a label inside its bar near the far end when it fits in the
/// visible part of the bar, otherwise just past the far end.
///
/// A bar whose value is at or above the baseline counts as growing toward
/// the top (vertical) or right (horizontal) for off-bar placement.
#[must_use]
pub fn place_label(
    request: &LabelRequest,
    orientation: Orientation,
    plot_size: Size,
    config: &BarPlotConfig,
) -> LabelPlacement {
    let rect = &request.rect;
    let padding = config.label_padding;
    let (primary_pos, primary_len, secondary_pos, secondary_len) = match orientation {
        Orientation::Vertical => (rect.y, rect.height, rect.x, rect.width),
        Orientation::Horizontal => (rect.x, rect.width, rect.y, rect.height),
    };
    let (label_primary, label_secondary) = match orientation {
        Orientation::Vertical => (request.measured.height, request.measured.width),
        Orientation::Horizontal => (request.measured.width, request.measured.height),
    };
    let plot_primary = orientation.value_extent(plot_size);

    let visible_len = if primary_pos + primary_len > plot_primary {
        plot_primary - primary_pos
    } else if primary_pos < 0.0 {
        primary_pos + primary_len
    } else {
        primary_len
    };
    let on_bar = label_primary + 2.0 * padding <= visible_len;

    // Toward the low pixel end: up for vertical bars, left for horizontal.
    let toward_min = match orientation {
        Orientation::Vertical => request.scaled_value <= request.scaled_baseline,
        Orientation::Horizontal => request.scaled_value < request.scaled_baseline,
    };
    let primary = match (on_bar, toward_min) {
        (true, true) => primary_pos + padding,
        (true, false) => primary_pos + primary_len - padding - label_primary,
        (false, true) => primary_pos - padding - label_primary,
        (false, false) => primary_pos + primary_len + padding,
    };
    let secondary = secondary_pos + secondary_len / 2.0 - label_secondary / 2.0;
    let origin = match orientation {
        Orientation::Vertical => Point::new(secondary, primary),
        Orientation::Horizontal => Point::new(primary, secondary),
    };

    let size = request.measured;
    let visible = origin.x >= 0.0
        && origin.y >= 0.0
        && origin.x + size.width <= plot_size.width
        && origin.y + size.height <= plot_size.height;
    let dark = on_bar.then(|| {
        Color::WHITE.contrast_ratio(request.fill) * config.dark_label_contrast_bias
            < Color::BLACK.contrast_ratio(request.fill)
    });

    LabelPlacement {
        text: request.text.clone(),
        origin,
        size,
        on_bar,
        dark,
        visible,
        too_wide: secondary_len < label_secondary + 2.0 * padding,
    }
}

/// Places every label; returns none at all when any label is too wide for
/// its bar and `hide_labels_if_any_too_wide` is set.
#[must_use]
pub fn place_labels(
    requests: &[LabelRequest],
    orientation: Orientation,
    plot_size: Size,
    config: &BarPlotConfig,
) -> Vec<LabelPlacement> {
    let placements: Vec<LabelPlacement> = requests
        .iter()
        .map(|request| place_label(request, orientation, plot_size, config))
        .collect();
    if config.hide_labels_if_any_too_wide && placements.iter().any(|placement| placement.too_wide) {
        return Vec::new();
    }
    placements
}

#[cfg(test)]
mod tests {
    use super::{place_label, place_labels, LabelRequest};
    use crate::core::{Point, Size};
    use crate::plot::{BarPlotConfig, BarRect, Orientation};
    use crate::render::{Color, DEFAULT_FILL};

    fn request(
        rect: BarRect,
        scaled_value: f64,
        scaled_baseline: f64,
        measured: Size,
    ) -> LabelRequest {
        LabelRequest {
            text: "5".to_owned(),
            measured,
            rect,
            scaled_value,
            scaled_baseline,
            fill: DEFAULT_FILL,
        }
    }

    #[test]
    fn fitting_label_sits_inside_near_the_top() {
        let rect = BarRect::new(Orientation::Vertical, 30.0, 50.0, 100.0, 40.0);
        let placement = place_label(
            &request(rect, 50.0, 100.0, Size::new(7.0, 12.0)),
            Orientation::Vertical,
            Size::new(100.0, 100.0),
            &BarPlotConfig::default(),
        );
        assert!(placement.on_bar);
        assert_eq!(placement.origin, Point::new(26.5, 55.0));
        assert_eq!(placement.dark, Some(false));
        assert!(placement.visible);
        assert!(!placement.too_wide);
    }

    #[test]
    fn short_bar_puts_label_past_its_end() {
        let rect = BarRect::new(Orientation::Vertical, 30.0, 95.0, 100.0, 40.0);
        let placement = place_label(
            &request(rect, 95.0, 100.0, Size::new(7.0, 12.0)),
            Orientation::Vertical,
            Size::new(100.0, 100.0),
            &BarPlotConfig::default(),
        );
        assert!(!placement.on_bar);
        assert_eq!(placement.origin.y, 78.0);
        assert_eq!(placement.dark, None);

        let tall = BarRect::new(Orientation::Vertical, 30.0, 2.0, 100.0, 40.0);
        let clipped = place_label(
            &request(tall, 2.0, 100.0, Size::new(7.0, 12.0)),
            Orientation::Vertical,
            Size::new(100.0, 100.0),
            &BarPlotConfig::default(),
        );
        assert!(clipped.on_bar);
        assert_eq!(clipped.origin.y, 7.0);
    }

    #[test]
    fn negative_horizontal_bar_label_goes_left() {
        let rect = BarRect::new(Orientation::Horizontal, 50.0, 40.0, 50.0, 20.0);
        let placement = place_label(
            &request(rect, 40.0, 50.0, Size::new(14.0, 12.0)),
            Orientation::Horizontal,
            Size::new(100.0, 100.0),
            &BarPlotConfig::default(),
        );
        assert!(!placement.on_bar);
        assert_eq!(placement.origin, Point::new(21.0, 44.0));
    }

    #[test]
    fn light_fill_gets_dark_text() {
        let rect = BarRect::new(Orientation::Vertical, 30.0, 0.0, 100.0, 40.0);
        let mut light = request(rect, 0.0, 100.0, Size::new(7.0, 12.0));
        light.fill = Color::rgb(0.95, 0.95, 0.8);
        let placement = place_label(
            &light,
            Orientation::Vertical,
            Size::new(100.0, 100.0),
            &BarPlotConfig::default(),
        );
        assert_eq!(placement.dark, Some(true));
    }

    #[test]
    fn one_too_wide_label_hides_all() {
        let wide = BarRect::new(Orientation::Vertical, 30.0, 50.0, 100.0, 10.0);
        let narrow = BarRect::new(Orientation::Vertical, 70.0, 50.0, 100.0, 40.0);
        let requests = [
            request(wide, 50.0, 100.0, Size::new(7.0, 12.0)),
            request(narrow, 50.0, 100.0, Size::new(7.0, 12.0)),
        ];
        let plot = Size::new(100.0, 100.0);
        let config = BarPlotConfig::default();
        assert!(place_labels(&requests, Orientation::Vertical, plot, &config).is_empty());

        let keep = BarPlotConfig::default().with_hide_labels_if_any_too_wide(false);
        assert_eq!(place_labels(&requests, Orientation::Vertical, plot, &keep).len(), 2);
    }
}
