/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! # stream-race
//!
//! `stream-race` is a small push-based streaming runtime with back-pressure, built around
//! one operator: a race between a source's next item and a deadline source, with an
//! optional fallback source that takes over when the deadline wins.
//!
//! Typical usage goes through [`SourceExt`]: wrap any [`Source`] with `timeout*` and
//! subscribe a [`Sink`].
//!
//! ## Timer deadlines with a fallback
//!
//! ```
//! use futures::StreamExt;
//! use std::time::Duration;
//! use stream_race::{bridge, sources, SourceExt, TimeoutConfig};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let config = TimeoutConfig::uniform(Duration::from_millis(20));
//! let slow = sources::never();
//! let raced = slow.timeout_after_or(config, sources::iter(["cached"]).into_shared());
//!
//! let items: Vec<_> = bridge::into_stream(&raced).collect().await;
//! assert_eq!(items, vec![Ok("cached")]);
//! # });
//! ```
//!
//! ## Item-derived deadlines
//!
//! The deadline for each item after the first is derived from the item before it. A
//! deadline fires when its source emits or completes; if it fails, the race fails with
//! that error instead.
//!
//! ```
//! use futures::StreamExt;
//! use std::time::Duration;
//! use stream_race::{bridge, sources, SourceExt, StreamError};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let raced = sources::iter([5u64, 10, 15]).timeout(
//!     sources::timer(Duration::from_secs(1)).into_shared(),
//!     |item: &u64| Ok(Some(sources::timer(Duration::from_millis(*item)).into_shared())),
//! );
//!
//! let items: Vec<Result<u64, StreamError>> = bridge::into_stream(&raced).collect().await;
//! assert_eq!(items, vec![Ok(5), Ok(10), Ok(15)]);
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - Protocol: `Source`/`Sink`/`Subscription` traits and demand arithmetic
//! - Serialized: a sink wrapper that turns concurrent signals into one ordered sequence
//! - Arbiter: a swappable upstream subscription that carries outstanding demand across swaps
//! - Race: generation-indexed watchers and the timeout operator itself
//! - Sources and operators: building blocks, `SourceExt` and the `futures::Stream` bridge
//! - Runtime: where timers and stream-driven sources run
//!
//! ## Observability model
//!
//! Library code emits `tracing` events with an `event` and a `component` field and never
//! installs a global subscriber. Signals lost to a race are reported through the
//! `signal_dropped` event and the optional [`hooks::set_drop_hook`] callback.

pub mod arbiter;
pub mod bridge;
pub mod config;
mod error;
pub mod hooks;
#[doc(hidden)]
pub mod observability;
pub mod operators;
pub mod protocol;
pub mod race;
mod runtime;
pub mod serialized;
pub mod sources;

pub use arbiter::SubscriptionArbiter;
pub use config::TimeoutConfig;
pub use error::StreamError;
pub use operators::{Next, SourceExt};
pub use protocol::{
    EmptySubscription, SharedSink, SharedSource, SharedSubscription, Sink, Source, Subscription,
    UNBOUNDED,
};
pub use race::{DeadlineFactory, DeadlineResult, RaceHandle, RaceState, Timeout};
pub use serialized::SerializedSink;
