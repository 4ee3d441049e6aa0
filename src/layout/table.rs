use tracing::debug;

use crate::core::{Point, SpaceRequest};
use crate::error::{ChartError, ChartResult};
use crate::layout::{ComponentId, LayoutOffer};

const MAX_REFINEMENTS: usize = 5;
const FIXED_HEURISTIC_WEIGHT: f64 = 0.5;
const WANTS_SPACE_WEIGHT: f64 = 0.1;

/// Per-child space request callback used by the allocation pass.
pub type RequestFn<'a> = dyn Fn(ComponentId, f64, f64) -> SpaceRequest + 'a;

/// Per-child `(fixed_width, fixed_height)` callback.
pub type FixityFn<'a> = dyn Fn(ComponentId) -> (bool, bool) + 'a;

/// Result of splitting a table's rectangle between its rows and columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableAllocation {
    pub guaranteed_widths: Vec<f64>,
    pub guaranteed_heights: Vec<f64>,
    pub column_proportional: Vec<f64>,
    pub row_proportional: Vec<f64>,
    pub wants_width: bool,
    pub wants_height: bool,
}

impl TableAllocation {
    #[must_use]
    pub fn guaranteed_width(&self) -> f64 {
        self.guaranteed_widths.iter().sum()
    }

    #[must_use]
    pub fn guaranteed_height(&self) -> f64 {
        self.guaranteed_heights.iter().sum()
    }

    #[must_use]
    pub fn column_widths(&self) -> Vec<f64> {
        add_clamped(&self.guaranteed_widths, &self.column_proportional)
    }

    #[must_use]
    pub fn row_heights(&self) -> Vec<f64> {
        add_clamped(&self.guaranteed_heights, &self.row_proportional)
    }
}

struct Guarantees {
    widths: Vec<f64>,
    heights: Vec<f64>,
    column_wants: Vec<bool>,
    row_wants: Vec<bool>,
}

/// Sparse grid of components with row/column weights and padding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableLayout {
    rows: Vec<Vec<Option<ComponentId>>>,
    row_weights: Vec<Option<f64>>,
    column_weights: Vec<Option<f64>>,
    row_padding: f64,
    column_padding: f64,
}

impl TableLayout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Occupied cells in row-major order.
    #[must_use]
    pub fn components(&self) -> Vec<ComponentId> {
        self.rows.iter().flatten().flatten().copied().collect()
    }

    #[must_use]
    pub fn has(&self, component: ComponentId) -> bool {
        self.cell_of(component).is_some()
    }

    #[must_use]
    pub fn cell_of(&self, component: ComponentId) -> Option<(usize, usize)> {
        self.rows.iter().enumerate().find_map(|(row, cells)| {
            cells
                .iter()
                .position(|cell| *cell == Some(component))
                .map(|column| (row, column))
        })
    }

    /// Returns the occupant of a cell; `None` when empty or out of range.
    #[must_use]
    pub fn component_at(&self, row: usize, column: usize) -> Option<ComponentId> {
        self.rows.get(row)?.get(column).copied().flatten()
    }

    /// Places `component` in a cell, growing the grid as needed.
    pub fn add(&mut self, component: ComponentId, row: usize, column: usize) -> ChartResult<()> {
        if self.component_at(row, column).is_some() {
            return Err(ChartError::CellOccupied { row, column });
        }
        let rows = self.row_count().max(row + 1);
        let columns = self.column_count().max(column + 1);
        self.rows.resize_with(rows, Vec::new);
        for cells in &mut self.rows {
            cells.resize(columns, None);
        }
        if self.row_weights.len() < rows {
            self.row_weights.resize(rows, None);
        }
        if self.column_weights.len() < columns {
            self.column_weights.resize(columns, None);
        }
        self.rows[row][column] = Some(component);
        Ok(())
    }

    pub fn remove(&mut self, component: ComponentId) -> bool {
        match self.cell_of(component) {
            Some((row, column)) => {
                self.rows[row][column] = None;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn row_padding(&self) -> f64 {
        self.row_padding
    }

    #[must_use]
    pub fn column_padding(&self) -> f64 {
        self.column_padding
    }

    pub fn set_row_padding(&mut self, padding: f64) -> ChartResult<()> {
        validate_spacing("row padding", padding)?;
        self.row_padding = padding;
        Ok(())
    }

    pub fn set_column_padding(&mut self, padding: f64) -> ChartResult<()> {
        validate_spacing("column padding", padding)?;
        self.column_padding = padding;
        Ok(())
    }

    /// Explicit weight of a row; `None` means the fixity heuristic applies.
    #[must_use]
    pub fn row_weight(&self, index: usize) -> Option<f64> {
        self.row_weights.get(index).copied().flatten()
    }

    #[must_use]
    pub fn column_weight(&self, index: usize) -> Option<f64> {
        self.column_weights.get(index).copied().flatten()
    }

    pub fn set_row_weight(&mut self, index: usize, weight: f64) -> ChartResult<()> {
        validate_spacing("row weight", weight)?;
        set_weight(&mut self.row_weights, index, weight);
        Ok(())
    }

    pub fn set_column_weight(&mut self, index: usize, weight: f64) -> ChartResult<()> {
        validate_spacing("column weight", weight)?;
        set_weight(&mut self.column_weights, index, weight);
        Ok(())
    }

    fn columns(&self) -> Vec<Vec<Option<ComponentId>>> {
        (0..self.column_count())
            .map(|column| self.rows.iter().map(|cells| cells[column]).collect())
            .collect()
    }

    /// A table is fixed in a dimension when every cell is empty or fixed.
    #[must_use]
    pub fn fixed_width(&self, fixity: &FixityFn<'_>) -> bool {
        self.components()
            .into_iter()
            .all(|component| fixity(component).0)
    }

    #[must_use]
    pub fn fixed_height(&self, fixity: &FixityFn<'_>) -> bool {
        self.components()
            .into_iter()
            .all(|component| fixity(component).1)
    }

    #[must_use]
    pub fn requested_space(
        &self,
        available_width: f64,
        available_height: f64,
        request: &RequestFn<'_>,
        fixity: &FixityFn<'_>,
    ) -> SpaceRequest {
        let allocation =
            self.iterate_layout(available_width, available_height, false, request, fixity);
        SpaceRequest::new(allocation.guaranteed_width(), allocation.guaranteed_height())
    }

    /// Allocation for a table resolved to `width` x `height`.
    ///
    /// `offered_*` is the space the table itself was offered; when the
    /// guarantees computed against it do not fit the resolved size, the pass is
    /// re-run with requests clamped to what each cell is offered.
    #[must_use]
    pub fn allocate(
        &self,
        offered_width: f64,
        offered_height: f64,
        width: f64,
        height: f64,
        request: &RequestFn<'_>,
        fixity: &FixityFn<'_>,
    ) -> TableAllocation {
        let allocation = self.iterate_layout(offered_width, offered_height, false, request, fixity);
        if allocation.guaranteed_width() > width || allocation.guaranteed_height() > height {
            return self.iterate_layout(width, height, true, request, fixity);
        }
        allocation
    }

    /// Offers handed to each occupied cell, relative to the table origin.
    #[must_use]
    pub fn cell_offers(&self, allocation: &TableAllocation) -> Vec<(ComponentId, LayoutOffer)> {
        let widths = allocation.column_widths();
        let heights = allocation.row_heights();
        let mut offers = Vec::new();
        let mut y = 0.0;
        for (row, cells) in self.rows.iter().enumerate() {
            let row_height = heights.get(row).copied().unwrap_or(0.0);
            let mut x = 0.0;
            for (column, cell) in cells.iter().enumerate() {
                let column_width = widths.get(column).copied().unwrap_or(0.0);
                if let Some(component) = cell {
                    offers.push((
                        *component,
                        LayoutOffer::new(Point::new(x, y), column_width, row_height),
                    ));
                }
                x += column_width + self.column_padding;
            }
            y += row_height + self.row_padding;
        }
        offers
    }

    /// Iteratively splits the available space between rows and columns.
    ///
    /// Fixed-size cells first receive what they request (their guarantee);
    /// the free remainder is divided by weight. Rows or columns whose cells
    /// were not satisfied get extra weight on the next pass. The loop stops
    /// once the free space stops changing or after a bounded number of passes,
    /// then redistributes the free space with the real weights.
    #[must_use]
    pub fn iterate_layout(
        &self,
        available_width: f64,
        available_height: f64,
        final_offer: bool,
        request: &RequestFn<'_>,
        fixity: &FixityFn<'_>,
    ) -> TableAllocation {
        let column_count = self.column_count();
        let row_count = self.row_count();
        let width_after_padding =
            available_width - self.column_padding * column_count.saturating_sub(1) as f64;
        let height_after_padding =
            available_height - self.row_padding * row_count.saturating_sub(1) as f64;

        let row_weights = component_weights(&self.row_weights, &self.rows, |component| {
            fixity(component).1
        });
        let column_weights = component_weights(&self.column_weights, &self.columns(), |component| {
            fixity(component).0
        });

        let heuristic = |weights: &[f64]| -> Vec<f64> {
            weights
                .iter()
                .map(|weight| if *weight == 0.0 { FIXED_HEURISTIC_WEIGHT } else { *weight })
                .collect()
        };
        let mut column_proportional =
            proportional_space(&heuristic(&column_weights), width_after_padding);
        let mut row_proportional =
            proportional_space(&heuristic(&row_weights), height_after_padding);

        let mut guarantees = Guarantees {
            widths: vec![0.0; column_count],
            heights: vec![0.0; row_count],
            column_wants: vec![false; column_count],
            row_wants: vec![false; row_count],
        };
        let mut free_width: Option<f64> = None;
        let mut free_height: Option<f64> = None;
        let mut wants_width;
        let mut wants_height;
        let mut passes = 0;

        loop {
            let offered_widths = add(&guarantees.widths, &column_proportional);
            let offered_heights = add(&guarantees.heights, &row_proportional);
            guarantees =
                self.determine_guarantees(&offered_widths, &offered_heights, final_offer, request);
            wants_width = guarantees.column_wants.iter().any(|wants| *wants);
            wants_height = guarantees.row_wants.iter().any(|wants| *wants);

            let last_free_width = free_width;
            let last_free_height = free_height;
            let next_free_width = width_after_padding - guarantees.widths.iter().sum::<f64>();
            let next_free_height = height_after_padding - guarantees.heights.iter().sum::<f64>();
            free_width = Some(next_free_width);
            free_height = Some(next_free_height);

            let column_pass_weights = if wants_width {
                boost_wanting(&column_weights, &guarantees.column_wants)
            } else {
                column_weights.clone()
            };
            let row_pass_weights = if wants_height {
                boost_wanting(&row_weights, &guarantees.row_wants)
            } else {
                row_weights.clone()
            };
            column_proportional = proportional_space(&column_pass_weights, next_free_width);
            row_proportional = proportional_space(&row_pass_weights, next_free_height);
            passes += 1;

            let can_improve_width = next_free_width > 0.0 && last_free_width != free_width;
            let can_improve_height = next_free_height > 0.0 && last_free_height != free_height;
            if !(can_improve_width || can_improve_height) {
                break;
            }
            if passes > MAX_REFINEMENTS {
                debug!(passes, "table layout stopped at the refinement cap");
                break;
            }
        }

        let free_width = width_after_padding - guarantees.widths.iter().sum::<f64>();
        let free_height = height_after_padding - guarantees.heights.iter().sum::<f64>();
        TableAllocation {
            column_proportional: proportional_space(&column_weights, free_width),
            row_proportional: proportional_space(&row_weights, free_height),
            guaranteed_widths: guarantees.widths,
            guaranteed_heights: guarantees.heights,
            wants_width,
            wants_height,
        }
    }

    fn determine_guarantees(
        &self,
        offered_widths: &[f64],
        offered_heights: &[f64],
        final_offer: bool,
        request: &RequestFn<'_>,
    ) -> Guarantees {
        let column_count = self.column_count();
        let row_count = self.row_count();
        let mut guarantees = Guarantees {
            widths: vec![0.0; column_count],
            heights: vec![0.0; row_count],
            column_wants: vec![false; column_count],
            row_wants: vec![false; row_count],
        };

        for (row, cells) in self.rows.iter().enumerate() {
            for (column, cell) in cells.iter().enumerate() {
                let offered_width = offered_widths[column];
                let offered_height = offered_heights[row];
                let space = cell.map_or(SpaceRequest::zero(), |component| {
                    request(component, offered_width, offered_height).sanitized()
                });

                let width = if final_offer {
                    space.min_width.min(offered_width)
                } else {
                    space.min_width
                };
                guarantees.widths[column] = guarantees.widths[column].max(width);

                let height = if final_offer {
                    space.min_height.min(offered_height)
                } else {
                    space.min_height
                };
                guarantees.heights[row] = guarantees.heights[row].max(height);

                guarantees.column_wants[column] |= space.min_width > offered_width;
                guarantees.row_wants[row] |= space.min_height > offered_height;
            }
        }
        guarantees
    }
}

fn validate_spacing(name: &'static str, value: f64) -> ChartResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ChartError::InvalidSpacing { name, value });
    }
    Ok(())
}

fn set_weight(weights: &mut Vec<Option<f64>>, index: usize, weight: f64) {
    if weights.len() <= index {
        weights.resize(index + 1, None);
    }
    weights[index] = Some(weight);
}

/// Explicit weights win; otherwise 0 when every cell of the group is empty
/// or fixed, else 1.
fn component_weights(
    explicit: &[Option<f64>],
    groups: &[Vec<Option<ComponentId>>],
    is_fixed: impl Fn(ComponentId) -> bool,
) -> Vec<f64> {
    groups
        .iter()
        .enumerate()
        .map(|(index, cells)| {
            if let Some(weight) = explicit.get(index).copied().flatten() {
                return weight;
            }
            let all_fixed = cells.iter().all(|cell| cell.is_none_or(&is_fixed));
            if all_fixed { 0.0 } else { 1.0 }
        })
        .collect()
}

fn proportional_space(weights: &[f64], free_space: f64) -> Vec<f64> {
    let weight_sum: f64 = weights.iter().sum();
    if weight_sum == 0.0 {
        return vec![0.0; weights.len()];
    }
    weights
        .iter()
        .map(|weight| free_space * weight / weight_sum)
        .collect()
}

fn boost_wanting(weights: &[f64], wants: &[bool]) -> Vec<f64> {
    weights
        .iter()
        .zip(wants)
        .map(|(weight, wants)| if *wants { weight + WANTS_SPACE_WEIGHT } else { *weight })
        .collect()
}

fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(a, b)| a + b).collect()
}

fn add_clamped(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(a, b)| (a + b).max(0.0)).collect()
}
