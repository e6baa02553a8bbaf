use super::render::Surface;
use super::rng::RandomSource;
use super::state::{
	GLOW_THRESHOLD, JITTER_AMPLITUDE, JITTER_FREQ, ModeState, PULSE_SPAWN_GAIN,
	PULSE_SPAWN_PROBABILITY, PULSE_SPEED, PULSE_SPEED_GAIN, RADIUS_GAIN, VELOCITY_GAIN, Viewport,
};

const PALETTE: &[&str; 4] = &["#bc9eff", "#8a6aff", "#6d4dff", "#5d3dff"];
const ALT_PALETTE: &[&str; 4] = &["#9effbc", "#6aff8a", "#4dff6d", "#3dff5d"];

/// RGB of the connection/pulse tint for the active theme.
pub(super) fn tint(mode: &ModeState) -> (u8, u8, u8) {
	if mode.alt_theme {
		(158, 255, 176)
	} else {
		(188, 158, 255)
	}
}

/// A transient traveling along one of its source node's connections.
///
/// `target` is a stable index into the engine's node arena, never a
/// reference, so arena rebuilds cannot leave it dangling.
#[derive(Clone, Debug)]
pub struct Pulse {
	pub target: usize,
	pub progress: f64,
}

/// A moving point entity with outgoing proximity connections.
///
/// Velocity is kept in two layers: `base_vx`/`base_vy` is the ground truth
/// and the only thing boundary reflection touches; the effective velocity
/// applied each tick is the base scaled by the current intensity, so ramping
/// intensity back to zero restores the original motion exactly.
#[derive(Clone, Debug)]
pub struct Node {
	pub x: f64,
	pub y: f64,
	pub base_vx: f64,
	pub base_vy: f64,
	pub radius: f64,
	pub base_radius: f64,
	pub color: usize,
	pub phase_x: f64,
	pub phase_y: f64,
	pub connections: Vec<usize>,
	pub pulses: Vec<Pulse>,
}

impl Node {
	/// Spawn a node uniformly inside the viewport.
	///
	/// Draw order from `rng`: x, y, vx, vy, radius, color, phase_x, phase_y.
	pub fn spawn(viewport: &Viewport, rng: &mut dyn RandomSource) -> Self {
		let x = rng.next_f64() * viewport.width;
		let y = rng.next_f64() * viewport.height;
		let base_vx = (rng.next_f64() - 0.5) * 0.5;
		let base_vy = (rng.next_f64() - 0.5) * 0.5;
		let base_radius = rng.next_f64() * 3.0 + 1.0;
		let color = ((rng.next_f64() * PALETTE.len() as f64) as usize).min(PALETTE.len() - 1);
		let phase_x = rng.next_f64() * std::f64::consts::TAU;
		let phase_y = rng.next_f64() * std::f64::consts::TAU;

		Self {
			x,
			y,
			base_vx,
			base_vy,
			radius: base_radius,
			base_radius,
			color,
			phase_x,
			phase_y,
			connections: Vec::new(),
			pulses: Vec::new(),
		}
	}

	/// Advance one tick: move, jitter, reflect, age pulses, maybe spawn one.
	///
	/// Draw order from `rng`: spawn roll, then (only when it fires) target roll.
	pub fn update(&mut self, viewport: &Viewport, mode: &ModeState, rng: &mut dyn RandomSource) {
		let boost = 1.0 + mode.intensity * VELOCITY_GAIN;
		self.x += self.base_vx * boost;
		self.y += self.base_vy * boost;

		if mode.intensity > 0.0 {
			let amp = JITTER_AMPLITUDE * mode.intensity;
			self.x += (mode.time * JITTER_FREQ + self.phase_x).sin() * amp;
			self.y += (mode.time * JITTER_FREQ + self.phase_y).sin() * amp;
		}
		self.radius = self.base_radius * (1.0 + mode.intensity * RADIUS_GAIN);

		// Flip only while still heading outward: exactly one reversal per
		// crossing per axis, even if the position overshoots for a few ticks.
		if (self.x < 0.0 && self.base_vx < 0.0)
			|| (self.x > viewport.width && self.base_vx > 0.0)
		{
			self.base_vx = -self.base_vx;
		}
		if (self.y < 0.0 && self.base_vy < 0.0)
			|| (self.y > viewport.height && self.base_vy > 0.0)
		{
			self.base_vy = -self.base_vy;
		}

		let rate = PULSE_SPEED * (1.0 + mode.intensity * PULSE_SPEED_GAIN);
		for pulse in &mut self.pulses {
			pulse.progress += rate;
		}
		self.pulses.retain(|pulse| pulse.progress <= 1.0);

		// A pulse needs somewhere to go; an isolated node never fires.
		let spawn_p = PULSE_SPAWN_PROBABILITY * (1.0 + mode.intensity * PULSE_SPAWN_GAIN);
		if !self.connections.is_empty() && rng.next_f64() < spawn_p {
			let len = self.connections.len();
			let pick = ((rng.next_f64() * len as f64) as usize).min(len - 1);
			self.pulses.push(Pulse {
				target: self.connections[pick],
				progress: 0.0,
			});
		}
	}

	/// First render pass: lines to every connected peer.
	pub fn render_connections<S: Surface>(&self, nodes: &[Node], surface: &mut S, mode: &ModeState) {
		let (r, g, b) = tint(mode);
		let alpha = 0.15 + 0.35 * mode.intensity;
		let width = 0.5 + 1.0 * mode.intensity;
		let color = format!("rgba({}, {}, {}, {})", r, g, b, alpha);
		for &peer in &self.connections {
			let Some(other) = nodes.get(peer) else {
				continue;
			};
			surface.stroke_line(self.x, self.y, other.x, other.y, &color, width);
		}
	}

	/// Second render pass, part one: the node disc itself.
	pub fn render_body<S: Surface>(&self, surface: &mut S, mode: &ModeState) {
		let palette = if mode.alt_theme { ALT_PALETTE } else { PALETTE };
		surface.fill_circle(self.x, self.y, self.radius, palette[self.color % palette.len()]);
	}

	/// Second render pass, part two: pulse markers along their connections.
	pub fn render_pulses<S: Surface>(&self, nodes: &[Node], surface: &mut S, mode: &ModeState) {
		let (r, g, b) = tint(mode);
		let alpha = (0.8 + 0.2 * mode.intensity).min(1.0);
		let marker = 2.0 * (1.0 + mode.intensity);
		for pulse in &self.pulses {
			let Some(target) = nodes.get(pulse.target) else {
				continue;
			};
			let x = self.x + (target.x - self.x) * pulse.progress;
			let y = self.y + (target.y - self.y) * pulse.progress;

			if mode.intensity > GLOW_THRESHOLD {
				let halo = format!("rgba({}, {}, {}, {})", r, g, b, 0.25 * mode.intensity);
				surface.fill_circle(x, y, marker * 2.5, &halo);
			}
			let color = format!("rgba({}, {}, {}, {})", r, g, b, alpha);
			surface.fill_circle(x, y, marker, &color);
		}
	}
}
