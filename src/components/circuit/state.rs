use log::debug;

use super::node::Node;
use super::rng::RandomSource;

pub const NODE_AREA_DIVISOR: f64 = 20000.0;
pub const MAX_NODES: usize = 50;

/// Connection reach as a fraction of the smaller viewport dimension.
pub const CONNECTION_DISTANCE_FACTOR: f64 = 0.25;
pub const CONNECTION_PROBABILITY: f64 = 0.3;
pub const CONNECTION_PROBABILITY_CAP: f64 = 0.85;

pub const PULSE_SPEED: f64 = 0.02;
pub const PULSE_SPAWN_PROBABILITY: f64 = 0.002;

/// Intensity ramp steps per tick; up and down are deliberately asymmetric so
/// turbo snaps in a little faster than it fades out.
pub const RAMP_UP: f64 = 0.02;
pub const RAMP_DOWN: f64 = 0.015;

// How far intensity=1 pushes each dial past its baseline.
pub const VELOCITY_GAIN: f64 = 1.5;
pub const RADIUS_GAIN: f64 = 0.8;
pub const PULSE_SPEED_GAIN: f64 = 2.0;
pub const PULSE_SPAWN_GAIN: f64 = 4.0;
pub const DISTANCE_GAIN: f64 = 0.5;
pub const PROBABILITY_GAIN: f64 = 1.0;

pub const JITTER_AMPLITUDE: f64 = 1.5;
pub const JITTER_FREQ: f64 = 7.0;

/// Chance per ramping tick of re-rolling the connection graph.
pub const REROLL_PROBABILITY: f64 = 0.05;
pub const GLOW_THRESHOLD: f64 = 0.3;
pub const TICK_DT: f64 = 0.016;

/// Current canvas dimensions in CSS pixels plus the device-pixel-ratio.
#[derive(Clone, Debug)]
pub struct Viewport {
	pub width: f64,
	pub height: f64,
	pub dpr: f64,
}

/// Transient visual-mode state, owned by the engine and read by every node.
///
/// `intensity` ramps toward 1 while turbo is requested and back to 0 while it
/// is not; it never leaves `[0, 1]`. `time` is the shared clock the jitter
/// oscillators read.
#[derive(Clone, Debug, Default)]
pub struct ModeState {
	pub turbo_requested: bool,
	pub intensity: f64,
	pub alt_theme: bool,
	pub time: f64,
}

/// The whole simulation: node arena, viewport, mode state and randomness.
///
/// Ticked by the component's animation-frame callback; resize and gesture
/// handlers call in strictly between ticks.
pub struct CircuitState {
	pub nodes: Vec<Node>,
	pub viewport: Viewport,
	pub mode: ModeState,
	rng: Box<dyn RandomSource>,
}

/// Node budget for a viewport: one node per 20000 px², at most 50.
pub fn node_count(viewport: &Viewport) -> usize {
	((viewport.width * viewport.height / NODE_AREA_DIVISOR) as usize).min(MAX_NODES)
}

impl CircuitState {
	pub fn new(width: f64, height: f64, dpr: f64, rng: Box<dyn RandomSource>) -> Self {
		let mut state = Self {
			nodes: Vec::new(),
			viewport: Viewport { width, height, dpr },
			mode: ModeState::default(),
			rng,
		};
		state.reinit_nodes();
		state
	}

	/// Advance one tick: ramp intensity, maybe refresh the graph, move nodes.
	pub fn tick(&mut self) {
		self.mode.time += TICK_DT;

		let prev = self.mode.intensity;
		if self.mode.turbo_requested {
			self.mode.intensity = (self.mode.intensity + RAMP_UP).min(1.0);
		} else {
			self.mode.intensity = (self.mode.intensity - RAMP_DOWN).max(0.0);
		}

		if self.mode.intensity != prev {
			if self.mode.intensity == 0.0 {
				// Ramp-down just finished: snap back to the baseline graph.
				self.rebuild_connections();
			} else if self.rng.next_f64() < REROLL_PROBABILITY {
				self.rebuild_connections();
			}
		}

		let Self {
			nodes,
			viewport,
			mode,
			rng,
		} = self;
		for node in nodes.iter_mut() {
			node.update(viewport, mode, rng.as_mut());
		}
	}

	/// Full clear-and-rebuild of every node's connection list, with reach and
	/// acceptance scaled by the current intensity.
	pub fn rebuild_connections(&mut self) {
		let (max_dist, accept) = self.connection_params();
		self.rebuild_connections_with(max_dist, accept);
	}

	fn connection_params(&self) -> (f64, f64) {
		let reach = self.viewport.width.min(self.viewport.height) * CONNECTION_DISTANCE_FACTOR;
		let max_dist = reach * (1.0 + self.mode.intensity * DISTANCE_GAIN);
		let accept = (CONNECTION_PROBABILITY * (1.0 + self.mode.intensity * PROBABILITY_GAIN))
			.min(CONNECTION_PROBABILITY_CAP);
		(max_dist, accept)
	}

	fn rebuild_connections_with(&mut self, max_dist: f64, accept: f64) {
		let positions: Vec<(f64, f64)> = self.nodes.iter().map(|n| (n.x, n.y)).collect();
		for i in 0..positions.len() {
			self.nodes[i].connections.clear();
			for (j, &(jx, jy)) in positions.iter().enumerate() {
				if i == j {
					continue;
				}
				let (dx, dy) = (positions[i].0 - jx, positions[i].1 - jy);
				let dist = (dx * dx + dy * dy).sqrt();
				// Directed on purpose: i may link j without the reverse.
				if dist < max_dist && self.rng.next_f64() < accept {
					self.nodes[i].connections.push(j);
				}
			}
		}
	}

	/// Replace the viewport and rebuild the node arena from scratch.
	pub fn resize(&mut self, width: f64, height: f64, dpr: f64) {
		self.viewport = Viewport { width, height, dpr };
		self.reinit_nodes();
	}

	fn reinit_nodes(&mut self) {
		let count = node_count(&self.viewport);
		self.nodes.clear();
		let Self { nodes, viewport, rng, .. } = self;
		for _ in 0..count {
			nodes.push(Node::spawn(viewport, rng.as_mut()));
		}
		self.rebuild_connections();
		debug!(
			"circuit reinitialized: {} nodes in {:.0}x{:.0}",
			self.nodes.len(),
			self.viewport.width,
			self.viewport.height
		);
	}

	/// Invert the turbo request. Visible change flows only through the ramp,
	/// so rapid double-toggles invert twice and never double-apply.
	pub fn toggle_turbo(&mut self) {
		self.mode.turbo_requested = !self.mode.turbo_requested;
		debug!("turbo requested: {}", self.mode.turbo_requested);
	}

	/// Swap between the base and alternate palettes.
	pub fn toggle_theme(&mut self) {
		self.mode.alt_theme = !self.mode.alt_theme;
		debug!("alt theme: {}", self.mode.alt_theme);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::circuit::rng::SequenceRandom;

	fn new_state(width: f64, height: f64) -> CircuitState {
		// Seven rolls against eight draws per spawn, so positions drift
		// across the cycle instead of stacking every node on one point.
		let rng = SequenceRandom::new(vec![0.13, 0.87, 0.41, 0.66, 0.29, 0.52, 0.74]);
		CircuitState::new(width, height, 1.0, Box::new(rng))
	}

	#[test]
	fn resize_spawns_budgeted_node_count_in_bounds() {
		let state = new_state(800.0, 600.0);
		assert_eq!(state.nodes.len(), 24);
		for node in &state.nodes {
			assert!(node.x >= 0.0 && node.x <= 800.0);
			assert!(node.y >= 0.0 && node.y <= 600.0);
		}
	}

	#[test]
	fn node_budget_caps_at_fifty() {
		let state = new_state(2000.0, 2000.0);
		assert_eq!(state.nodes.len(), 50);
	}

	#[test]
	fn empty_viewport_is_valid_and_empty() {
		let mut state = new_state(0.0, 0.0);
		assert!(state.nodes.is_empty());
		state.tick();
		assert!(state.nodes.is_empty());
	}

	#[test]
	fn resize_discards_the_old_arena() {
		let mut state = new_state(800.0, 600.0);
		state.nodes[0].x = -999.0;
		state.resize(400.0, 400.0, 2.0);
		assert_eq!(state.nodes.len(), 8);
		assert_eq!(state.viewport.dpr, 2.0);
		for node in &state.nodes {
			assert!(node.x >= 0.0 && node.x <= 400.0);
			assert!(node.y >= 0.0 && node.y <= 400.0);
		}
	}

	#[test]
	fn zero_threshold_yields_no_connections() {
		let mut state = new_state(800.0, 600.0);
		state.rebuild_connections_with(0.0, 1.0);
		assert!(state.nodes.iter().all(|n| n.connections.is_empty()));
	}

	#[test]
	fn full_threshold_and_certain_acceptance_connect_everything() {
		let mut state = new_state(800.0, 600.0);
		let diagonal = (800.0f64 * 800.0 + 600.0 * 600.0).sqrt();
		state.rebuild_connections_with(diagonal + 1.0, 1.0);
		let n = state.nodes.len();
		let directed: usize = state.nodes.iter().map(|node| node.connections.len()).sum();
		assert_eq!(directed, n * (n - 1));
		// No self-links anywhere.
		for (i, node) in state.nodes.iter().enumerate() {
			assert!(!node.connections.contains(&i));
		}
	}

	#[test]
	fn intensity_ramps_to_one_and_back_to_zero() {
		let mut state = new_state(0.0, 0.0);
		state.toggle_turbo();

		let mut prev = 0.0;
		for _ in 0..100 {
			state.tick();
			assert!(state.mode.intensity >= prev);
			assert!((0.0..=1.0).contains(&state.mode.intensity));
			prev = state.mode.intensity;
		}
		assert_eq!(state.mode.intensity, 1.0);

		state.toggle_turbo();
		for _ in 0..100 {
			state.tick();
			assert!(state.mode.intensity <= prev);
			assert!((0.0..=1.0).contains(&state.mode.intensity));
			prev = state.mode.intensity;
		}
		assert_eq!(state.mode.intensity, 0.0);
	}

	#[test]
	fn double_toggle_mid_ramp_changes_nothing() {
		let mut state = new_state(0.0, 0.0);
		state.toggle_turbo();
		for _ in 0..10 {
			state.tick();
		}
		let before = state.mode.intensity;

		state.toggle_turbo();
		state.toggle_turbo();
		assert!(state.mode.turbo_requested);
		assert_eq!(state.mode.intensity, before);
	}

	#[test]
	fn on_then_off_within_one_tick_leaves_requested_false() {
		let mut state = new_state(0.0, 0.0);
		for _ in 0..5 {
			state.tick();
		}
		let before = state.mode.intensity;

		// No tick between the two flips: no instantaneous snap.
		state.toggle_turbo();
		state.toggle_turbo();
		assert!(!state.mode.turbo_requested);
		assert_eq!(state.mode.intensity, before);
	}

	/// Two unconnected nodes 20px apart in a 100x100 viewport, close enough
	/// that any rebuild with passing acceptance rolls links them both ways.
	fn close_pair(rng: SequenceRandom) -> CircuitState {
		let mut state = CircuitState {
			nodes: Vec::new(),
			viewport: Viewport {
				width: 100.0,
				height: 100.0,
				dpr: 1.0,
			},
			mode: ModeState::default(),
			rng: Box::new(rng),
		};
		let mut a = Node::spawn(&state.viewport, &mut SequenceRandom::constant(0.1));
		let mut b = Node::spawn(&state.viewport, &mut SequenceRandom::constant(0.2));
		(a.x, a.y) = (40.0, 50.0);
		(b.x, b.y) = (60.0, 50.0);
		state.nodes = vec![a, b];
		state
	}

	#[test]
	fn finishing_a_ramp_down_snaps_the_graph_to_baseline() {
		// Every acceptance roll passes, every spawn roll fires.
		let mut state = close_pair(SequenceRandom::constant(0.0));
		assert!(state.nodes.iter().all(|n| n.connections.is_empty()));

		// One tick from zero, ramping down: hitting 0 must rebuild.
		state.mode.intensity = RAMP_DOWN;
		state.tick();
		assert_eq!(state.mode.intensity, 0.0);
		assert_eq!(state.nodes[0].connections, vec![1]);
		assert_eq!(state.nodes[1].connections, vec![0]);
	}

	#[test]
	fn ramping_tick_can_reroll_the_graph() {
		// Re-roll draw of 0.0 lands under REROLL_PROBABILITY.
		let mut state = close_pair(SequenceRandom::constant(0.0));
		state.toggle_turbo();
		state.tick();
		assert!(state.mode.intensity > 0.0);
		assert_eq!(state.nodes[0].connections, vec![1]);
		assert_eq!(state.nodes[1].connections, vec![0]);
	}

	#[test]
	fn ramping_tick_keeps_the_graph_when_the_reroll_misses() {
		// 0.5 is above REROLL_PROBABILITY, so the lists stay as they were.
		let mut state = close_pair(SequenceRandom::constant(0.5));
		state.toggle_turbo();
		state.tick();
		assert!(state.mode.intensity > 0.0);
		assert!(state.nodes.iter().all(|n| n.connections.is_empty()));
	}

	#[test]
	fn connection_params_scale_with_intensity() {
		let mut state = new_state(800.0, 600.0);
		let (base_dist, base_p) = state.connection_params();
		assert_eq!(base_dist, 150.0);
		assert_eq!(base_p, CONNECTION_PROBABILITY);

		state.mode.intensity = 1.0;
		let (hot_dist, hot_p) = state.connection_params();
		assert_eq!(hot_dist, 150.0 * (1.0 + DISTANCE_GAIN));
		assert_eq!(hot_p, 0.6);
		assert!(hot_p < CONNECTION_PROBABILITY_CAP);
	}
}
