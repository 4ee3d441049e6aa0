use crate::core::{Bounds, Dataset, Datum, Point};
use crate::layout::ComponentId;

/// One drawn bar correlated back to the datum it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotEntity {
    pub dataset: Dataset,
    /// Position of `dataset` among the plot's datasets.
    pub dataset_index: usize,
    /// Index of `datum` inside `dataset`.
    pub index: usize,
    pub datum: Datum,
    /// Pixel point at the far end of the bar, centered on the base axis.
    pub position: Point,
    pub bounds: Bounds,
    pub component: Option<ComponentId>,
}
