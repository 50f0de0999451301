//! Streaming chunker and bottom-up composition.

pub mod compose;
pub mod parse;
pub mod window;

pub use compose::{ComposeMode, Composition};
pub use parse::{Parse, Parser};
pub use window::MemoryWindow;
