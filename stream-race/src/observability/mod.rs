//! Canonical structured-event vocabulary for `stream-race`.
//!
//! Library code emits `tracing` events carrying an `event` name from [`events`] and a
//! `component` field; it never installs a global subscriber.

pub mod events;
pub mod fields;
