//! Serialized delivery: many concurrent producers, one sequential downstream view.

mod serialized_sink;

pub use serialized_sink::SerializedSink;
