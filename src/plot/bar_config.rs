use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

fn default_bar_width_ratio() -> f64 {
    0.95
}

fn default_single_bar_ratio() -> f64 {
    0.4
}

fn default_label_padding() -> f64 {
    5.0
}

fn default_hit_tolerance() -> f64 {
    0.5
}

fn default_true() -> bool {
    true
}

fn default_dark_label_contrast_bias() -> f64 {
    1.6
}

/// Tunables of a bar plot. Pixel constants are visual-fit values that depend
/// on the rendering environment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarPlotConfig {
    /// Share of the tightest gap between adjacent bars used as bar width on
    /// continuous base scales.
    #[serde(default = "default_bar_width_ratio")]
    pub bar_width_ratio: f64,
    /// Share of the plot's base dimension used when fewer than two distinct
    /// base values exist.
    #[serde(default = "default_single_bar_ratio")]
    pub single_bar_ratio: f64,
    #[serde(default = "default_label_padding")]
    pub label_padding: f64,
    /// Slack around bars when hit testing.
    #[serde(default = "default_hit_tolerance")]
    pub hit_tolerance: f64,
    #[serde(default)]
    pub labels_enabled: bool,
    /// Drop every label when any one of them is wider than its bar.
    #[serde(default = "default_true")]
    pub hide_labels_if_any_too_wide: bool,
    #[serde(default = "default_dark_label_contrast_bias")]
    pub dark_label_contrast_bias: f64,
    /// Keep scale ranges in sync with the plot size.
    #[serde(default = "default_true")]
    pub auto_scale_ranges: bool,
    #[serde(default)]
    pub animated: bool,
}

impl Default for BarPlotConfig {
    fn default() -> Self {
        Self {
            bar_width_ratio: default_bar_width_ratio(),
            single_bar_ratio: default_single_bar_ratio(),
            label_padding: default_label_padding(),
            hit_tolerance: default_hit_tolerance(),
            labels_enabled: false,
            hide_labels_if_any_too_wide: true,
            dark_label_contrast_bias: default_dark_label_contrast_bias(),
            auto_scale_ranges: true,
            animated: false,
        }
    }
}

impl BarPlotConfig {
    #[must_use]
    pub fn with_labels_enabled(mut self, enabled: bool) -> Self {
        self.labels_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_label_padding(mut self, padding: f64) -> Self {
        self.label_padding = padding;
        self
    }

    #[must_use]
    pub fn with_hit_tolerance(mut self, tolerance: f64) -> Self {
        self.hit_tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_hide_labels_if_any_too_wide(mut self, hide: bool) -> Self {
        self.hide_labels_if_any_too_wide = hide;
        self
    }

    #[must_use]
    pub fn with_auto_scale_ranges(mut self, enabled: bool) -> Self {
        self.auto_scale_ranges = enabled;
        self
    }

    #[must_use]
    pub fn with_animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }

    pub fn validate(&self) -> ChartResult<()> {
        for (name, value) in [
            ("bar width ratio", self.bar_width_ratio),
            ("single bar ratio", self.single_bar_ratio),
        ] {
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return Err(ChartError::InvalidData(format!(
                    "{name} must be finite and in (0, 1]"
                )));
            }
        }
        for (name, value) in [
            ("label padding", self.label_padding),
            ("hit tolerance", self.hit_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ChartError::InvalidData(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        if !self.dark_label_contrast_bias.is_finite() || self.dark_label_contrast_bias <= 0.0 {
            return Err(ChartError::InvalidData(
                "dark label contrast bias must be finite and > 0".to_owned(),
            ));
        }
        Ok(())
    }
}
