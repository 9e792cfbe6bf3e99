//! Timeout race operator.
//!
//! [`Timeout`] forwards items from a main source while a deadline source races each
//! pending item. Whichever of "item arrived", "deadline fired", "deadline failed",
//! "upstream terminated" or "downstream cancelled" wins the generation compare-and-swap
//! happens; everything else becomes a dropped signal.

mod fallback;
mod indexed;
mod timeout;
mod watcher;

pub use indexed::{IndexedCancellable, TERMINATED};
pub use timeout::{DeadlineFactory, DeadlineResult, RaceHandle, RaceState, Timeout};
