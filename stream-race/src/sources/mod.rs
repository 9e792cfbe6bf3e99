//! Ready-made sources: finite sequences, trivial terminals, timers and adapted
//! `futures::Stream`s.

mod iter;
mod stream;
mod terminal;
mod timer;

pub use iter::{iter, IterSource};
pub use stream::{from_stream, StreamSource};
pub use terminal::{empty, error, never, EmptySource, ErrorSource, NeverSource};
pub use timer::{timer, TimerSource};

use crate::protocol::SharedSink;

/// Sized holder so a `dyn` sink can live in an `ArcSwapOption`.
pub(crate) struct SinkCell<T>(pub(crate) SharedSink<T>);
