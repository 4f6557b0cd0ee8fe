//! Force-directed knowledge graph drawn on a canvas.

mod charge_spring;
mod component;
mod layout;
mod render;
mod simulation;
mod state;
mod types;
mod view;

pub use component::ForceGraphCanvas;
pub use layout::{ChargeSpringParams, LayoutConfig, LayoutKind, Point};
pub use simulation::{Phase, Simulation};
pub use state::ForceGraphState;
pub use types::{GraphEdge, GraphModel, GraphNode, GraphResponse, NodeId};
pub use view::{ViewState, ViewTransform, ZOOM_MAX, ZOOM_MIN, ZOOM_STEP};
