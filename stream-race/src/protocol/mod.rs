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

//! Signal protocol shared by every source, sink and operator in the crate.
//!
//! A [`Source`] delivers to exactly one [`Sink`] per `subscribe` call. The sink first
//! receives `on_subscribe` with the [`Subscription`] it uses to request more items or to
//! cancel, then zero or more `on_next` calls followed by at most one of `on_error` /
//! `on_complete`. Every method takes `&self` because signals may arrive from any thread.

mod demand;
mod empty;
mod slot;

pub use demand::{add_cap, produced, UNBOUNDED};
pub(crate) use demand::add_cap_atomic;
pub use empty::EmptySubscription;
pub(crate) use slot::{SetOnce, SubscriptionSlot};

use crate::error::StreamError;
use std::sync::Arc;

/// Back-channel a sink uses to request items or cancel.
///
/// Both methods must be safe to call repeatedly, concurrently, and after the source
/// terminated. `request(0)` is a protocol violation.
pub trait Subscription: Send + Sync {
    fn request(&self, n: u64);

    fn cancel(&self);
}

/// Consumer side of the protocol.
pub trait Sink<T>: Send + Sync {
    fn on_subscribe(&self, subscription: SharedSubscription);

    fn on_next(&self, value: T);

    fn on_error(&self, error: StreamError);

    fn on_complete(&self);
}

/// Producer side of the protocol.
pub trait Source<T>: Send + Sync {
    fn subscribe(&self, sink: SharedSink<T>);
}

pub type SharedSource<T> = Arc<dyn Source<T>>;
pub type SharedSink<T> = Arc<dyn Sink<T>>;
pub type SharedSubscription = Arc<dyn Subscription>;

impl<T, S> Source<T> for Arc<S>
where
    S: Source<T> + ?Sized,
{
    fn subscribe(&self, sink: SharedSink<T>) {
        (**self).subscribe(sink)
    }
}
