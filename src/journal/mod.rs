//! Journal entry creation, posting, and reversal

pub mod builder;
pub mod engine;

pub use builder::*;
pub use engine::*;
