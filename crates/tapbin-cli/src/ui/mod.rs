//! Terminal output.
//!
//! Status and progress go to stderr so stdout stays machine-readable for
//! `resolve`, `info`, `hash` and `import`.

pub mod console;
pub mod theme;

pub use console::ConsoleReporter;
pub use theme::{Theme, format_size};
