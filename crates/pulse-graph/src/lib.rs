//! City graph and signal propagation for Pulse Globe.
//!
//! Everything here is CPU-side and GPU-agnostic:
//!
//! - [`coords`]: latitude/longitude to unit-sphere positions
//! - [`graph`]: the directed proximity graph with its edge and arc arenas
//! - [`arc`]: sampled, bulging flight-path curves for each edge
//! - [`propagation`]: per-edge signal state and the cascade rule
//! - [`cities`]: per-frame point data for cities the signal has reached
//! - [`simulation`]: graph + engine bundled behind one constructor
//! - [`city_list`]: the built-in set of world cities

pub mod arc;
pub mod cities;
pub mod city_list;
pub mod coords;
pub mod graph;
pub mod propagation;
pub mod simulation;

pub use arc::{ARC_SAMPLES, ArcVertex, arc_height, build_arc};
pub use cities::{CityVertex, lit_city_count, write_lit_cities};
pub use city_list::world_cities;
pub use coords::{GeoCoord, to_position};
pub use graph::{Edge, EdgeId, Graph, GraphParams, Vertex, VertexId};
pub use propagation::{EdgeSignal, PropagationEngine, PropagationParams, SignalView, TickReport};
pub use simulation::{Simulation, SimulationParams};
