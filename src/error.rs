use thiserror::Error;

use crate::layout::ComponentId;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("unknown component {0}")]
    UnknownComponent(ComponentId),

    #[error("anchor() must be called before compute_layout() on component {0}")]
    NotAnchored(ComponentId),

    #[error("component {0} has no layout offer: only anchored root components can infer one")]
    MissingLayoutOffer(ComponentId),

    #[error("component {0} was destroyed and cannot be reused")]
    Destroyed(ComponentId),

    #[error("unsupported alignment: {0}")]
    InvalidAlignment(String),

    #[error("{0} is not a valid orientation for bar plots")]
    InvalidOrientation(String),

    #[error("component {container} is not a container")]
    NotAContainer { container: ComponentId },

    #[error("container {container} does not contain component {component}")]
    InvalidParent {
        container: ComponentId,
        component: ComponentId,
    },

    #[error("a component cannot contain itself or one of its ancestors ({0})")]
    ContainmentCycle(ComponentId),

    #[error("table cell ({row}, {column}) is occupied")]
    CellOccupied { row: usize, column: usize },

    #[error("{name} must be a non-negative finite value, got {value}")]
    InvalidSpacing { name: &'static str, value: f64 },

    #[error("render of component {component} failed: {message}")]
    RenderFailed {
        component: ComponentId,
        message: String,
    },
}

impl ChartError {
    /// Returns `true` for programmer-misuse errors that are surfaced synchronously.
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        !matches!(
            self,
            Self::InvalidData(_) | Self::InvalidViewport { .. } | Self::RenderFailed { .. }
        )
    }
}
