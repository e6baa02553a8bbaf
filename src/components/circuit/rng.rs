//! Injectable randomness for the simulation.

/// Source of uniform random numbers in `[0, 1)`.
///
/// The engine never calls `Math.random` directly; it draws from whatever
/// source it was constructed with, so tests can substitute a fixed sequence
/// and assert exact node layouts and adjacencies.
pub trait RandomSource {
	fn next_f64(&mut self) -> f64;
}

/// Production source backed by `Math.random`.
pub struct JsRandom;

impl RandomSource for JsRandom {
	fn next_f64(&mut self) -> f64 {
		js_sys::Math::random()
	}
}

/// Replays a fixed sequence of values, cycling when exhausted.
pub struct SequenceRandom {
	values: Vec<f64>,
	cursor: usize,
}

impl SequenceRandom {
	pub fn new(values: Vec<f64>) -> Self {
		Self { values, cursor: 0 }
	}

	/// A source that always returns the same value.
	pub fn constant(value: f64) -> Self {
		Self::new(vec![value])
	}
}

impl RandomSource for SequenceRandom {
	fn next_f64(&mut self) -> f64 {
		if self.values.is_empty() {
			return 0.0;
		}
		let v = self.values[self.cursor % self.values.len()];
		self.cursor += 1;
		v
	}
}
