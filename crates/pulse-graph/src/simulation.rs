//! Graph and propagation engine behind one constructor.

use rand::Rng;

use crate::cities::{CityVertex, write_lit_cities};
use crate::coords::GeoCoord;
use crate::graph::{Graph, GraphParams};
use crate::propagation::{PropagationEngine, PropagationParams, SignalView, TickReport};

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub graph: GraphParams,
    pub propagation: PropagationParams,
    /// Each edge starts active with probability `1 / seed_one_in`; 0 disables seeding.
    pub seed_one_in: u32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            graph: GraphParams::default(),
            propagation: PropagationParams::default(),
            seed_one_in: 150,
        }
    }
}

pub struct Simulation {
    graph: Graph,
    engine: PropagationEngine,
}

impl Simulation {
    /// Build the graph for `coords` and seed its initial signals from `rng`.
    pub fn new<R: Rng + ?Sized>(coords: &[GeoCoord], params: &SimulationParams, rng: &mut R) -> Self {
        let graph = Graph::build(coords, &params.graph);
        let mut engine = PropagationEngine::new(&graph, params.propagation.clone());
        let seeded = engine.seed_random(rng, params.seed_one_in);

        log::info!(
            "simulation ready: {} cities, {} connections (max out-degree {}), {} seeded",
            graph.vertex_count(),
            graph.edge_count(),
            graph.max_out_degree(),
            seeded
        );
        if graph.edge_count() == 0 {
            log::warn!("no two cities are closer than {}; nothing will propagate", params.graph.threshold);
        }

        Self { graph, engine }
    }

    /// Wrap an already built graph and engine.
    pub fn from_parts(graph: Graph, engine: PropagationEngine) -> Self {
        Self { graph, engine }
    }

    /// Run one propagation tick.
    pub fn step(&mut self) -> TickReport {
        let report = self.engine.tick(&self.graph);
        if report.completed > 0 {
            log::trace!(
                "tick {}: {} completed, {} activated",
                self.engine.ticks(),
                report.completed,
                report.activated
            );
        }
        report
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn signals(&self) -> SignalView<'_> {
        self.engine.view()
    }

    pub fn engine(&self) -> &PropagationEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PropagationEngine {
        &mut self.engine
    }

    pub fn ticks(&self) -> u64 {
        self.engine.ticks()
    }

    /// Fill `out` with the currently lit cities; see [`write_lit_cities`].
    pub fn write_lit_cities(&self, out: &mut [CityVertex]) -> usize {
        write_lit_cities(&self.graph, &self.engine.view(), out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::city_list::world_cities;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_same_seed_same_run() {
        let params = SimulationParams::default();
        let mut a = Simulation::new(world_cities(), &params, &mut ChaCha8Rng::seed_from_u64(42));
        let mut b = Simulation::new(world_cities(), &params, &mut ChaCha8Rng::seed_from_u64(42));

        for _ in 0..200 {
            assert_eq!(a.step(), b.step());
        }
        let lit_a: Vec<_> = a.signals().active_edges().collect();
        let lit_b: Vec<_> = b.signals().active_edges().collect();
        assert_eq!(lit_a, lit_b);
        assert_eq!(a.ticks(), 200);
    }

    #[test]
    fn test_empty_city_list_runs() {
        let mut sim = Simulation::new(&[], &SimulationParams::default(), &mut ChaCha8Rng::seed_from_u64(0));
        assert!(sim.graph().is_empty());
        assert_eq!(sim.step(), TickReport::default());
        assert_eq!(sim.write_lit_cities(&mut []), 0);
    }

    #[test]
    fn test_unseeded_world_stays_dark() {
        let params = SimulationParams {
            seed_one_in: 0,
            ..SimulationParams::default()
        };
        let mut sim = Simulation::new(world_cities(), &params, &mut ChaCha8Rng::seed_from_u64(9));
        for _ in 0..100 {
            sim.step();
        }
        assert_eq!(sim.signals().active_count(), 0);
        let mut out = vec![CityVertex::default(); sim.graph().vertex_count()];
        assert_eq!(sim.write_lit_cities(&mut out), 0);
    }
}
