//! plotframe: declarative charting core.
//!
//! Components negotiate space through a two-phase layout pass, a render
//! controller coalesces layout and paint requests into flushes, and the bar
//! plot turns datasets and scales into bars, labels and hit-test entities.

pub mod core;
pub mod error;
pub mod layout;
pub mod plot;
pub mod render;
pub mod scheduler;
pub mod telemetry;

pub use error::{ChartError, ChartResult};
pub use layout::{ComponentId, ComponentTree};
pub use plot::{BarPlot, BarPlotConfig, Orientation, StackedBarPlot};
pub use scheduler::{RenderController, RenderPolicyKind, SchedulerConfig};
