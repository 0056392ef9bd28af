//! Built-in models — Beep, Counter and Janitor.
//!
//! Small reference behaviors used by the kernel tests and the demo
//! binary. Each one records what the kernel did to it so tests can
//! assert on call counts.

pub mod beep;
pub mod counter;
pub mod janitor;

pub use beep::Beep;
pub use counter::Counter;
pub use janitor::Janitor;
