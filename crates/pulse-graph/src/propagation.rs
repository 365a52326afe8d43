//! Signal propagation over graph edges.
//!
//! Each edge is inactive, activating (`0 <= elapsed < 1`) or completed
//! (`elapsed == 1`). Activating edges advance by a fixed step once per tick.
//! When an edge completes, up to `fan_out` inactive edges leaving its target
//! are activated. Edges are never deactivated.
//!
//! The signal table is owned by [`PropagationEngine`] and is the only mutable
//! simulation state. Readers get a [`SignalView`], which has no way to write.

use rand::Rng;

use crate::graph::{EdgeId, Graph};

#[derive(Debug, Clone, PartialEq)]
pub struct PropagationParams {
    /// Progress added to each activating edge per tick.
    pub step: f32,
    /// Activations a completing edge may trigger at its target.
    pub fan_out: usize,
}

impl Default for PropagationParams {
    fn default() -> Self {
        Self {
            step: 0.02,
            fan_out: 3,
        }
    }
}

/// Per-edge signal state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EdgeSignal {
    pub active: bool,
    /// Ticks this edge has advanced since activation.
    pub steps: u32,
    /// Progress along the edge, in `[0, 1]`.
    pub elapsed: f32,
}

impl EdgeSignal {
    pub fn is_activating(&self) -> bool {
        self.active && self.elapsed < 1.0
    }

    pub fn is_completed(&self) -> bool {
        self.active && self.elapsed >= 1.0
    }
}

/// What a single [`PropagationEngine::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Edges that moved forward.
    pub advanced: usize,
    /// Edges that reached the end on this tick.
    pub completed: usize,
    /// Edges switched on by cascades on this tick.
    pub activated: usize,
}

pub struct PropagationEngine {
    params: PropagationParams,
    signals: Vec<EdgeSignal>,
    ticks: u64,
    completed_scratch: Vec<EdgeId>,
}

impl PropagationEngine {
    /// An engine for `graph` with every edge inactive.
    ///
    /// A `step` that is not a positive finite number is replaced by the
    /// default so active edges always move forward and eventually complete.
    pub fn new(graph: &Graph, mut params: PropagationParams) -> Self {
        if !(params.step.is_finite() && params.step > 0.0) {
            let fallback = PropagationParams::default().step;
            log::warn!("propagation step {} must be positive, using {}", params.step, fallback);
            params.step = fallback;
        }
        Self {
            params,
            signals: vec![EdgeSignal::default(); graph.edge_count()],
            ticks: 0,
            completed_scratch: Vec::new(),
        }
    }

    pub fn params(&self) -> &PropagationParams {
        &self.params
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Activate each edge independently with probability `1 / one_in`.
    ///
    /// `one_in == 0` seeds nothing. Returns the number of edges activated.
    pub fn seed_random<R: Rng + ?Sized>(&mut self, rng: &mut R, one_in: u32) -> usize {
        if one_in == 0 {
            return 0;
        }
        let mut seeded = 0;
        for signal in &mut self.signals {
            if rng.random_ratio(1, one_in) && !signal.active {
                signal.active = true;
                seeded += 1;
            }
        }
        seeded
    }

    /// Switch `edge` on with zero progress.
    ///
    /// Returns `false` if the edge was already active; its progress is kept.
    pub fn activate(&mut self, edge: EdgeId) -> bool {
        let signal = &mut self.signals[edge as usize];
        if signal.active {
            return false;
        }
        *signal = EdgeSignal {
            active: true,
            steps: 0,
            elapsed: 0.0,
        };
        true
    }

    /// Advance the simulation by one frame.
    ///
    /// Every activating edge moves forward one step. Then, for each edge that
    /// completed on this tick (in edge order), the edges leaving its target
    /// are scanned in stored order and the first `fan_out` inactive ones are
    /// activated. Edges switched on here start advancing on the next tick.
    ///
    /// Panics if `graph` is not the graph this engine was built for.
    pub fn tick(&mut self, graph: &Graph) -> TickReport {
        assert_eq!(
            graph.edge_count(),
            self.signals.len(),
            "propagation engine used with a different graph"
        );

        let mut report = TickReport::default();
        self.completed_scratch.clear();

        let step = self.params.step;
        for (id, signal) in self.signals.iter_mut().enumerate() {
            if !signal.is_activating() {
                continue;
            }
            signal.steps += 1;
            signal.elapsed = (signal.steps as f32 * step).min(1.0);
            report.advanced += 1;
            if signal.elapsed >= 1.0 {
                self.completed_scratch.push(id as EdgeId);
            }
        }
        report.completed = self.completed_scratch.len();

        for &edge in &self.completed_scratch {
            let target = graph.edge(edge).target;
            let mut budget = self.params.fan_out;
            for sibling in graph.edge_range(target) {
                if budget == 0 {
                    break;
                }
                let signal = &mut self.signals[sibling as usize];
                if signal.active {
                    continue;
                }
                *signal = EdgeSignal {
                    active: true,
                    steps: 0,
                    elapsed: 0.0,
                };
                budget -= 1;
                report.activated += 1;
            }
        }

        self.ticks += 1;
        report
    }

    /// Read-only access to the signal table.
    pub fn view(&self) -> SignalView<'_> {
        SignalView {
            signals: &self.signals,
        }
    }
}

/// Read-only view of the signal table, indexed by edge id.
#[derive(Clone, Copy)]
pub struct SignalView<'a> {
    signals: &'a [EdgeSignal],
}

impl<'a> SignalView<'a> {
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn signal(&self, edge: EdgeId) -> EdgeSignal {
        self.signals[edge as usize]
    }

    /// Progress of `edge`, never above 1.
    pub fn elapsed(&self, edge: EdgeId) -> f32 {
        self.signals[edge as usize].elapsed.min(1.0)
    }

    pub fn is_active(&self, edge: EdgeId) -> bool {
        self.signals[edge as usize].active
    }

    /// Active edges (activating or completed) with their progress, in edge order.
    pub fn active_edges(self) -> impl Iterator<Item = (EdgeId, f32)> + 'a {
        self.signals
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(id, s)| (id as EdgeId, s.elapsed.min(1.0)))
    }

    pub fn active_count(&self) -> usize {
        self.signals.iter().filter(|s| s.active).count()
    }

    pub fn completed_count(&self) -> usize {
        self.signals.iter().filter(|s| s.is_completed()).count()
    }
}
