mod component;
mod node;
mod render;
mod rng;
mod state;

pub use component::CircuitCanvas;
