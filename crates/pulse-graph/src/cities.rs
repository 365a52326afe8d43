//! Per-frame point data for cities the signal has reached.

use bytemuck::{Pod, Zeroable};

use crate::graph::{Graph, Vertex};
use crate::propagation::SignalView;

/// One lit city: where it is and how bright it should glow.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CityVertex {
    pub position: [f32; 3],
    pub intensity: f32,
}

/// Highest progress among the edges leaving `vertex`, 0 if it has none.
fn max_outgoing_elapsed(vertex: &Vertex, view: &SignalView<'_>) -> f32 {
    vertex
        .edges
        .clone()
        .map(|edge| view.elapsed(edge))
        .fold(0.0, f32::max)
}

/// Write one entry per lit city into `out` and return how many were written.
///
/// A city is lit when some edge leaving it has progressed past 0; its
/// intensity is `min(1, 2 * elapsed)` of the furthest such edge. Cities
/// without edges are never lit. At most `out.len()` entries are written, so
/// a buffer sized to the vertex count always suffices.
pub fn write_lit_cities(graph: &Graph, view: &SignalView<'_>, out: &mut [CityVertex]) -> usize {
    let mut written = 0;
    for vertex in graph.vertices() {
        if written == out.len() {
            break;
        }
        let elapsed = max_outgoing_elapsed(vertex, view);
        if elapsed <= 0.0 {
            continue;
        }
        out[written] = CityVertex {
            position: vertex.position.to_array(),
            intensity: (elapsed * 2.0).min(1.0),
        };
        written += 1;
    }
    written
}

/// Number of cities [`write_lit_cities`] would write given unlimited room.
pub fn lit_city_count(graph: &Graph, view: &SignalView<'_>) -> usize {
    graph
        .vertices()
        .iter()
        .filter(|v| max_outgoing_elapsed(v, view) > 0.0)
        .count()
}
