//! Shared types for tapbin.
//!
//! Everything here is plain data: platform triples, validated checksums and
//! the per-platform release records a formula is made of. Loading, network
//! and filesystem concerns live in `tapbin-core`.

pub mod hash;
pub mod platform;
pub mod types;

// Re-exports
pub use hash::*;
pub use platform::*;
pub use types::*;
