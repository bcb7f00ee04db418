//! Screen model and the diff renderer.

pub mod renderer;
pub mod screen;
pub mod sgr;

pub use renderer::DiffRenderer;
pub use screen::{CursorShape, CursorState, Screen, Window};
