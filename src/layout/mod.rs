//! Component tree: layout negotiation, containers and lifecycle.

pub mod alignment;
pub mod content;
pub mod group;
pub mod node;
mod store;
pub mod table;
pub mod tree;

pub use alignment::{XAlignment, YAlignment};
pub use content::{ComponentContent, ContentBinding, RenderContext, Spacer};
pub use group::GroupLayout;
pub use node::{ComponentId, LayoutOffer, LifecycleState, ResizeEvent, RootId};
pub use table::{TableAllocation, TableLayout};
pub use tree::ComponentTree;
