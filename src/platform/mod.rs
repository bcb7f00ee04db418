//! Byte-level terminal plumbing.

pub mod process_terminal;
pub mod tokenizer;

pub use process_terminal::ProcessTerminal;
pub use tokenizer::Tokenizer;
