//! Data model shared by the input, render and graphics layers.

pub mod capabilities;
pub mod cell;
pub mod color;
pub mod event;
pub mod grid;
pub mod key;
pub mod mouse;
pub mod style;
pub mod terminal;
pub mod token;
