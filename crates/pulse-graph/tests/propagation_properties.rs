//! End-to-end properties of graph construction, propagation and lit cities.

use glam::Vec3;
use pulse_graph::{
    ARC_SAMPLES, CityVertex, GeoCoord, Graph, GraphParams, PropagationEngine, PropagationParams,
    Simulation, SimulationParams, build_arc, lit_city_count, world_cities, write_lit_cities,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn seeded_world(seed: u64) -> Simulation {
    let params = SimulationParams {
        seed_one_in: 20,
        ..SimulationParams::default()
    };
    Simulation::new(world_cities(), &params, &mut ChaCha8Rng::seed_from_u64(seed))
}

#[test]
fn every_close_pair_is_connected() {
    let params = GraphParams::default();
    let graph = Graph::build(world_cities(), &params);

    for (i, a) in graph.vertices().iter().enumerate() {
        for (j, b) in graph.vertices().iter().enumerate() {
            if i == j {
                continue;
            }
            let connected = graph.edges_of(i as u32).iter().any(|e| e.target == j as u32);
            let close = a.position.distance(b.position) < params.threshold;
            assert_eq!(connected, close, "pair {i} -> {j}");
        }
    }
}

#[test]
fn elapsed_never_decreases_and_never_exceeds_one() {
    let mut sim = seeded_world(11);
    let mut previous: Vec<(bool, f32)> = (0..sim.graph().edge_count() as u32)
        .map(|e| (sim.signals().is_active(e), sim.signals().elapsed(e)))
        .collect();

    for _ in 0..400 {
        sim.step();
        let view = sim.signals();
        for (e, prev) in previous.iter_mut().enumerate() {
            let e = e as u32;
            let elapsed = view.elapsed(e);
            assert!(elapsed <= 1.0);
            assert!(view.signal(e).elapsed <= 1.0);
            if prev.0 {
                assert!(view.is_active(e), "edge {e} was deactivated");
                assert!(elapsed >= prev.1, "edge {e} went backwards");
            }
            *prev = (view.is_active(e), elapsed);
        }
    }
}

#[test]
fn cascades_activate_at_most_fan_out_previously_inactive_edges() {
    let mut sim = seeded_world(5);
    let fan_out = sim.engine().params().fan_out;

    for _ in 0..300 {
        let before: Vec<bool> = (0..sim.graph().edge_count() as u32)
            .map(|e| sim.signals().is_active(e))
            .collect();
        let completing: Vec<u32> = (0..sim.graph().edge_count() as u32)
            .filter(|&e| sim.signals().signal(e).is_activating())
            .collect();

        let report = sim.step();
        let graph = sim.graph();
        let view = sim.signals();

        let newly_active: Vec<u32> = (0..graph.edge_count() as u32)
            .filter(|&e| !before[e as usize] && view.is_active(e))
            .collect();
        assert_eq!(newly_active.len(), report.activated);

        let completed: Vec<u32> = completing
            .into_iter()
            .filter(|&e| view.signal(e).is_completed())
            .collect();
        assert_eq!(completed.len(), report.completed);
        assert!(report.activated <= completed.len() * fan_out);

        // Every new activation sits at the target of something that just completed.
        for e in &newly_active {
            let source = graph.edge(*e).source;
            assert!(completed.iter().any(|&c| graph.edge(c).target == source));
            assert_eq!(view.elapsed(*e), 0.0);
        }

        // No target vertex gains more than fan_out per completing edge into it.
        for vertex in 0..graph.vertex_count() as u32 {
            let gained = newly_active
                .iter()
                .filter(|&&e| graph.edge(e).source == vertex)
                .count();
            let arrivals = completed
                .iter()
                .filter(|&&c| graph.edge(c).target == vertex)
                .count();
            assert!(gained <= arrivals * fan_out);
        }
    }
}

#[test]
fn lit_city_count_matches_vertices_with_progress() {
    let mut sim = seeded_world(3);
    let mut out = vec![CityVertex::default(); sim.graph().vertex_count()];

    for _ in 0..250 {
        sim.step();
        let graph = sim.graph();
        let view = sim.signals();

        let expected = graph
            .vertices()
            .iter()
            .filter(|v| v.edges.clone().any(|e| view.elapsed(e) > 0.0))
            .count();

        let written = write_lit_cities(graph, &view, &mut out);
        assert!(written <= graph.vertex_count());
        assert_eq!(written, expected);
        assert_eq!(lit_city_count(graph, &view), expected);
        for city in &out[..written] {
            assert!(city.intensity > 0.0 && city.intensity <= 1.0);
        }
    }
}

#[test]
fn arc_profile_lifts_only_the_middle() {
    let from = GeoCoord::new(35.68, 139.69).position();
    let to = GeoCoord::new(37.57, 126.98).position();
    let height = 0.2;
    let arc = build_arc(from, to, height, ARC_SAMPLES);

    assert_eq!(arc.len(), ARC_SAMPLES);
    assert!((Vec3::from_array(arc[0].position).length() - 1.0).abs() < 1e-5);
    assert!((Vec3::from_array(arc[ARC_SAMPLES - 1].position).length() - 1.0).abs() < 1e-5);
    assert_eq!(arc, build_arc(from, to, height, ARC_SAMPLES));
}

#[test]
fn two_city_scenario_hands_the_signal_back() {
    let coords = [GeoCoord::new(51.51, -0.13), GeoCoord::new(48.86, 2.35)];
    let graph = Graph::build(&coords, &GraphParams::default());
    assert_eq!(graph.edge_count(), 2);
    assert_eq!(graph.edge(0).source, 0);
    assert_eq!(graph.edge(0).target, 1);
    assert_eq!(graph.edge(1).source, 1);
    assert_eq!(graph.edge(1).target, 0);

    let mut engine = PropagationEngine::new(&graph, PropagationParams::default());
    engine.activate(0);

    for _ in 0..49 {
        engine.tick(&graph);
    }
    assert!(engine.view().elapsed(0) < 1.0);
    assert!(!engine.view().is_active(1));

    let report = engine.tick(&graph);
    assert_eq!(report.completed, 1);
    assert_eq!(report.activated, 1);
    assert_eq!(engine.view().elapsed(0), 1.0);
    assert!(engine.view().is_active(1));
    assert_eq!(engine.view().elapsed(1), 0.0);
}

#[test]
fn isolated_city_is_never_lit() {
    let coords = [
        GeoCoord::new(51.51, -0.13),
        GeoCoord::new(48.86, 2.35),
        // Far from both.
        GeoCoord::new(-33.87, 151.21),
    ];
    let graph = Graph::build(&coords, &GraphParams::default());
    assert!(graph.edges_of(2).is_empty());

    let mut engine = PropagationEngine::new(&graph, PropagationParams::default());
    engine.seed_random(&mut ChaCha8Rng::seed_from_u64(0), 1);
    let isolated = graph.vertex(2).position.to_array();
    let mut out = vec![CityVertex::default(); graph.vertex_count()];

    for _ in 0..500 {
        engine.tick(&graph);
        let written = write_lit_cities(&graph, &engine.view(), &mut out);
        assert!(out[..written].iter().all(|c| c.position != isolated));
    }
}
