use web_sys::CanvasRenderingContext2d;

use super::state::CircuitState;

const BACKGROUND: &str = "#0d0a1a";

/// Draw primitives the simulation renders through.
///
/// The production implementation is [`CanvasSurface`]; tests substitute a
/// recording surface to assert draw order without a canvas.
pub trait Surface {
	fn clear(&mut self, width: f64, height: f64);
	fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: &str);
	fn fill_circle(&mut self, x: f64, y: f64, radius: f64, color: &str);
	fn stroke_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: &str, width: f64);
	fn set_glow(&mut self, blur: f64, color: &str);
	fn clear_glow(&mut self);
}

/// Paint one frame.
///
/// Two passes: every node's connections first, then every disc and its
/// pulses, so lines never occlude the discs they attach to.
pub fn render<S: Surface>(state: &CircuitState, surface: &mut S) {
	let vp = &state.viewport;
	surface.clear(vp.width, vp.height);
	surface.fill_rect(0.0, 0.0, vp.width, vp.height, BACKGROUND);

	if state.mode.intensity > 0.0 {
		let (r, g, b) = super::node::tint(&state.mode);
		let color = format!("rgba({}, {}, {}, {})", r, g, b, 0.6 * state.mode.intensity);
		surface.set_glow(16.0 * state.mode.intensity, &color);
	}

	for node in &state.nodes {
		node.render_connections(&state.nodes, surface, &state.mode);
	}
	for node in &state.nodes {
		node.render_body(surface, &state.mode);
		node.render_pulses(&state.nodes, surface, &state.mode);
	}

	surface.clear_glow();
}

/// [`Surface`] over a 2d canvas context.
pub struct CanvasSurface<'a> {
	ctx: &'a CanvasRenderingContext2d,
}

impl<'a> CanvasSurface<'a> {
	pub fn new(ctx: &'a CanvasRenderingContext2d) -> Self {
		Self { ctx }
	}
}

impl Surface for CanvasSurface<'_> {
	fn clear(&mut self, width: f64, height: f64) {
		self.ctx.clear_rect(0.0, 0.0, width, height);
	}

	fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: &str) {
		self.ctx.set_fill_style_str(color);
		self.ctx.fill_rect(x, y, width, height);
	}

	fn fill_circle(&mut self, x: f64, y: f64, radius: f64, color: &str) {
		self.ctx.begin_path();
		let _ = self
			.ctx
			.arc(x, y, radius, 0.0, 2.0 * std::f64::consts::PI);
		self.ctx.set_fill_style_str(color);
		self.ctx.fill();
	}

	fn stroke_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: &str, width: f64) {
		self.ctx.begin_path();
		self.ctx.move_to(x1, y1);
		self.ctx.line_to(x2, y2);
		self.ctx.set_stroke_style_str(color);
		self.ctx.set_line_width(width);
		self.ctx.stroke();
	}

	fn set_glow(&mut self, blur: f64, color: &str) {
		self.ctx.set_shadow_blur(blur);
		self.ctx.set_shadow_color(color);
	}

	fn clear_glow(&mut self) {
		// Transparent black is the context default for shadowColor.
		self.ctx.set_shadow_blur(0.0);
		self.ctx.set_shadow_color("rgba(0, 0, 0, 0)");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::circuit::node::Pulse;
	use crate::components::circuit::rng::SequenceRandom;

	#[derive(Debug, PartialEq, Eq, Clone, Copy)]
	enum Op {
		Clear,
		Rect,
		Circle,
		Line,
		Glow,
		GlowOff,
	}

	#[derive(Default)]
	struct RecordingSurface {
		ops: Vec<Op>,
	}

	impl Surface for RecordingSurface {
		fn clear(&mut self, _: f64, _: f64) {
			self.ops.push(Op::Clear);
		}
		fn fill_rect(&mut self, _: f64, _: f64, _: f64, _: f64, _: &str) {
			self.ops.push(Op::Rect);
		}
		fn fill_circle(&mut self, _: f64, _: f64, _: f64, _: &str) {
			self.ops.push(Op::Circle);
		}
		fn stroke_line(&mut self, _: f64, _: f64, _: f64, _: f64, _: &str, _: f64) {
			self.ops.push(Op::Line);
		}
		fn set_glow(&mut self, _: f64, _: &str) {
			self.ops.push(Op::Glow);
		}
		fn clear_glow(&mut self) {
			self.ops.push(Op::GlowOff);
		}
	}

	fn connected_state() -> CircuitState {
		let rng = SequenceRandom::new(vec![0.13, 0.87, 0.41, 0.66, 0.29, 0.52, 0.74]);
		let mut state = CircuitState::new(800.0, 600.0, 1.0, Box::new(rng));
		// Deterministic fully-connected graph for the draw-order checks.
		let n = state.nodes.len();
		for i in 0..n {
			state.nodes[i].connections = (0..n).filter(|&j| j != i).collect();
		}
		state
	}

	#[test]
	fn connections_paint_under_discs() {
		let state = connected_state();
		let mut surface = RecordingSurface::default();
		render(&state, &mut surface);

		let last_line = surface.ops.iter().rposition(|&op| op == Op::Line);
		let first_circle = surface.ops.iter().position(|&op| op == Op::Circle);
		let (Some(last_line), Some(first_circle)) = (last_line, first_circle) else {
			panic!("expected both lines and discs");
		};
		assert!(last_line < first_circle);
	}

	#[test]
	fn frame_starts_with_clear_then_background() {
		let state = connected_state();
		let mut surface = RecordingSurface::default();
		render(&state, &mut surface);
		assert_eq!(&surface.ops[..2], &[Op::Clear, Op::Rect]);
		assert_eq!(surface.ops.last(), Some(&Op::GlowOff));
	}

	#[test]
	fn glow_only_while_intensity_is_up() {
		let mut state = connected_state();
		let mut surface = RecordingSurface::default();
		render(&state, &mut surface);
		assert!(!surface.ops.contains(&Op::Glow));

		state.mode.intensity = 0.5;
		let mut surface = RecordingSurface::default();
		render(&state, &mut surface);
		assert!(surface.ops.contains(&Op::Glow));
	}

	#[test]
	fn pulse_gains_halo_past_threshold() {
		let mut state = connected_state();
		state.nodes[0].pulses.push(Pulse {
			target: 1,
			progress: 0.5,
		});
		let n = state.nodes.len();

		let mut surface = RecordingSurface::default();
		render(&state, &mut surface);
		let circles = surface.ops.iter().filter(|&&op| op == Op::Circle).count();
		// One disc per node plus the pulse marker, no halo at intensity 0.
		assert_eq!(circles, n + 1);

		state.mode.intensity = 0.4;
		let mut surface = RecordingSurface::default();
		render(&state, &mut surface);
		let circles = surface.ops.iter().filter(|&&op| op == Op::Circle).count();
		assert_eq!(circles, n + 2);
	}
}
