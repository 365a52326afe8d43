//! Directed proximity graph over city positions.
//!
//! Topology and arc geometry live in two flat arenas: each [`Vertex`] owns a
//! contiguous range of the edge arena, and each [`Edge`] owns a contiguous
//! range of the arc-vertex arena. Nothing here changes after [`Graph::build`];
//! per-edge signal state is kept separately by the propagation engine.

use std::ops::Range;

use glam::Vec3;

use crate::arc::{ARC_SAMPLES, ArcVertex, arc_height, build_arc};
use crate::coords::GeoCoord;

pub type VertexId = u32;
pub type EdgeId = u32;

/// Construction parameters for [`Graph::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct GraphParams {
    /// Chord length below which two cities are connected.
    pub threshold: f32,
    /// Arc bulge for coincident cities.
    pub min_height: f32,
    /// Arc bulge for cities exactly `threshold` apart.
    pub max_height: f32,
    /// Samples per arc.
    pub arc_samples: usize,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            min_height: 0.05,
            max_height: 0.3,
            arc_samples: ARC_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    /// Outgoing edges, as a range into [`Graph::edges`].
    pub edges: Range<u32>,
}

impl Vertex {
    pub fn out_degree(&self) -> usize {
        self.edges.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: VertexId,
    pub target: VertexId,
    /// Chord length between the endpoints.
    pub distance: f32,
    /// Samples of this edge's arc, as a range into [`Graph::arc_vertices`].
    pub arc: Range<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    arc_vertices: Vec<ArcVertex>,
}

impl Graph {
    /// Build the graph for `coords`, one vertex per coordinate in input order.
    ///
    /// Every ordered pair `(i, j)` with `i != j` whose chord is shorter than
    /// `params.threshold` gets a directed edge `i -> j`. Edges of a vertex are
    /// stored in ascending target order. An empty input yields an empty graph.
    pub fn build(coords: &[GeoCoord], params: &GraphParams) -> Self {
        let positions: Vec<Vec3> = coords.iter().map(GeoCoord::position).collect();
        Self::from_positions(&positions, params)
    }

    /// Same as [`Graph::build`] for positions already on the unit sphere.
    pub fn from_positions(positions: &[Vec3], params: &GraphParams) -> Self {
        let mut vertices = Vec::with_capacity(positions.len());
        let mut edges = Vec::new();
        let mut arc_vertices = Vec::new();

        for (i, &from) in positions.iter().enumerate() {
            let first_edge = edges.len() as u32;

            for (j, &to) in positions.iter().enumerate() {
                if i == j {
                    continue;
                }
                let distance = from.distance(to);
                if distance >= params.threshold {
                    continue;
                }

                let height = arc_height(distance, params);
                let arc_start = arc_vertices.len() as u32;
                arc_vertices.extend(build_arc(from, to, height, params.arc_samples));

                edges.push(Edge {
                    source: i as VertexId,
                    target: j as VertexId,
                    distance,
                    arc: arc_start..arc_vertices.len() as u32,
                });
            }

            vertices.push(Vertex {
                position: from,
                edges: first_edge..edges.len() as u32,
            });
        }

        debug_assert!(
            edges
                .iter()
                .all(|e| (e.target as usize) < vertices.len() && e.source != e.target)
        );

        log::debug!(
            "built graph: {} vertices, {} edges, {} arc vertices",
            vertices.len(),
            edges.len(),
            arc_vertices.len()
        );

        Self {
            vertices,
            edges,
            arc_vertices,
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id as usize]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id as usize]
    }

    /// Edge ids leaving `vertex`, in stored order.
    pub fn edge_range(&self, vertex: VertexId) -> Range<EdgeId> {
        self.vertices[vertex as usize].edges.clone()
    }

    /// Edges leaving `vertex`, in stored order.
    pub fn edges_of(&self, vertex: VertexId) -> &[Edge] {
        let range = &self.vertices[vertex as usize].edges;
        &self.edges[range.start as usize..range.end as usize]
    }

    /// The flat arena of every edge's arc samples.
    pub fn arc_vertices(&self) -> &[ArcVertex] {
        &self.arc_vertices
    }

    /// The arc samples belonging to `edge`.
    pub fn arc_of(&self, edge: EdgeId) -> &[ArcVertex] {
        let range = &self.edges[edge as usize].arc;
        &self.arc_vertices[range.start as usize..range.end as usize]
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Largest out-degree in the graph, 0 when empty.
    pub fn max_out_degree(&self) -> usize {
        self.vertices
            .iter()
            .map(Vertex::out_degree)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GraphParams {
        GraphParams {
            arc_samples: 8,
            ..GraphParams::default()
        }
    }

    #[test]
    fn test_empty_input_builds_empty_graph() {
        let graph = Graph::build(&[], &params());
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.arc_vertices().is_empty());
        assert_eq!(graph.max_out_degree(), 0);
    }

    #[test]
    fn test_close_pair_gets_both_directions() {
        let coords = [GeoCoord::new(51.51, -0.13), GeoCoord::new(48.86, 2.35)];
        let graph = Graph::build(&coords, &params());

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edges_of(0)[0].target, 1);
        assert_eq!(graph.edges_of(1)[0].target, 0);
        assert_eq!(graph.edge(0).source, 0);
        assert_eq!(graph.edge(1).source, 1);
    }

    #[test]
    fn test_far_pair_stays_disconnected() {
        // London and Sydney are nearly antipodal.
        let coords = [GeoCoord::new(51.51, -0.13), GeoCoord::new(-33.87, 151.21)];
        let graph = Graph::build(&coords, &params());
        assert_eq!(graph.vertex_count(), 2);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.edges_of(0).is_empty());
    }

    #[test]
    fn test_threshold_is_strict() {
        let a = Vec3::X;
        let b = Vec3::Y;
        let exact = GraphParams {
            threshold: a.distance(b),
            ..params()
        };
        assert_eq!(Graph::from_positions(&[a, b], &exact).edge_count(), 0);

        let above = GraphParams {
            threshold: a.distance(b) + 1e-4,
            ..params()
        };
        assert_eq!(Graph::from_positions(&[a, b], &above).edge_count(), 2);
    }

    #[test]
    fn test_edges_are_contiguous_and_ordered() {
        let coords = [
            GeoCoord::new(0.0, 0.0),
            GeoCoord::new(0.0, 5.0),
            GeoCoord::new(0.0, 10.0),
            GeoCoord::new(0.0, 15.0),
        ];
        let graph = Graph::build(&coords, &params());

        let mut expected_start = 0;
        for (id, vertex) in graph.vertices().iter().enumerate() {
            assert_eq!(vertex.edges.start, expected_start);
            expected_start = vertex.edges.end;

            let targets: Vec<_> = graph.edges_of(id as VertexId).iter().map(|e| e.target).collect();
            let mut sorted = targets.clone();
            sorted.sort_unstable();
            assert_eq!(targets, sorted);
            assert!(!targets.contains(&(id as VertexId)));
        }
        assert_eq!(expected_start as usize, graph.edge_count());
        assert_eq!(graph.max_out_degree(), 3);
    }

    #[test]
    fn test_each_edge_owns_its_arc() {
        let coords = [
            GeoCoord::new(40.71, -74.01),
            GeoCoord::new(42.36, -71.06),
            GeoCoord::new(39.95, -75.17),
        ];
        let graph = Graph::build(&coords, &params());
        assert_eq!(graph.arc_vertices().len(), graph.edge_count() * 8);

        for (id, edge) in graph.edges().iter().enumerate() {
            let arc = graph.arc_of(id as EdgeId);
            assert_eq!(arc.len(), 8);
            let start = Vec3::from_array(arc[0].position);
            let end = Vec3::from_array(arc[7].position);
            assert!((start - graph.vertex(edge.source).position).length() < 1e-5);
            assert!((end - graph.vertex(edge.target).position).length() < 1e-5);
        }
    }

    #[test]
    fn test_edge_distance_is_recorded() {
        let coords = [GeoCoord::new(51.51, -0.13), GeoCoord::new(48.86, 2.35)];
        let graph = Graph::build(&coords, &params());
        let expected = graph.vertex(0).position.distance(graph.vertex(1).position);
        assert!((graph.edge(0).distance - expected).abs() < 1e-6);
    }
}
