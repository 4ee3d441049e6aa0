pub mod callbacks;
pub mod category_scale;
pub mod dataset;
pub mod primitives;
pub mod scale;
pub mod types;

pub use callbacks::{CallbackId, CallbackSet};
pub use category_scale::CategoryScale;
pub use dataset::{Dataset, DatasetId, Datum};
pub use primitives::Value;
pub use scale::{LinearScale, Scale, ScaleId, ScaleKind, ScaleUpdate};
pub use types::{Bounds, Point, Range, Size, SpaceRequest, Viewport};
