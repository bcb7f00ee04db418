//! Token to event decoding.

pub mod decoder;

pub use decoder::{Decoder, Dialect};
