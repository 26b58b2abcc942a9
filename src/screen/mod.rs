//! Screen observation: UI tree snapshots, elements and lookups.

mod element;
pub mod hierarchy;
mod node;
mod observation;
mod observer;

pub use element::{Bounds, ElementKind, UiElement};
pub use hierarchy::parse_hierarchy;
pub use node::{PreOrder, UiNode, UiTreeSource};
pub use observation::Observation;
pub use observer::ScreenObserver;
