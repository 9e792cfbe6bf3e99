//! Runtime integration layer.
//!
//! Time-based sources and the stream bridge need a Tokio runtime to park their tasks on.
//! When the caller is already inside one, tasks go there; otherwise they go to a small
//! crate-owned runtime so the synchronous API keeps working from plain threads.

pub(crate) mod timer_runtime;
