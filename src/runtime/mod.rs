//! Engine orchestration: negotiation, the event queue and the top-level owner.

pub mod engine;
pub mod negotiate;
pub mod queue;

pub use engine::Engine;
pub use queue::Queue;
