//! Bar plots: data projection, bar geometry, stacking, value labels and hit testing.

pub mod accessor;
pub mod bar_config;
pub mod bar_geometry;
pub mod bar_labels;
pub mod bar_plot;
pub mod drawer;
pub mod entity;
pub mod stacked_bar_plot;
pub mod stacking;
pub mod text;

pub use accessor::{Accessor, AccessorFn, ScaleBinding};
pub use bar_config::BarPlotConfig;
pub use bar_geometry::{BarRect, Orientation};
pub use bar_labels::{LabelPlacement, LabelRequest};
pub use bar_plot::{BarPlot, FillFn};
pub use drawer::{Animator, DrawOutcome, DrawStep, EasingAnimator, NullAnimator, RectDrawer};
pub use entity::PlotEntity;
pub use stacked_bar_plot::StackedBarPlot;
pub use stacking::{StackedDatum, StackingOrder, StackingResult};
pub use text::{CachingMeasurer, Formatter, MonospaceMeasurer, TextMeasurer};
