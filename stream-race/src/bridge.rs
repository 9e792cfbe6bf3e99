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

//! Bridge from the signal protocol to `futures::Stream`.

use crate::error::StreamError;
use crate::protocol::{SetOnce, SharedSubscription, Sink, Source, SubscriptionSlot, UNBOUNDED};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Subscribes to `source` with unbounded demand and exposes its signals as a stream.
///
/// Items arrive as `Ok`, a failure as a final `Err`; completion ends the stream.
/// Dropping the stream cancels the subscription.
pub fn into_stream<T, S>(source: &S) -> SignalStream<T>
where
    T: Send + 'static,
    S: Source<T> + ?Sized,
{
    let (tx, rx) = mpsc::unbounded();
    let bridge = Arc::new(BridgeSink {
        tx,
        upstream: SubscriptionSlot::new(),
    });
    source.subscribe(bridge.clone());

    SignalStream { rx, bridge }
}

/// Stream returned by [`into_stream`].
pub struct SignalStream<T> {
    rx: UnboundedReceiver<Result<T, StreamError>>,
    bridge: Arc<BridgeSink<T>>,
}

impl<T> SignalStream<T> {
    /// Cancels the subscription; items already buffered are still yielded.
    pub fn cancel(&self) {
        self.bridge.upstream.cancel();
    }
}

impl<T> Stream for SignalStream<T> {
    type Item = Result<T, StreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_next_unpin(cx)
    }
}

impl<T> Drop for SignalStream<T> {
    fn drop(&mut self) {
        self.bridge.upstream.cancel();
    }
}

struct BridgeSink<T> {
    tx: UnboundedSender<Result<T, StreamError>>,
    upstream: SubscriptionSlot,
}

impl<T: Send> Sink<T> for BridgeSink<T> {
    fn on_subscribe(&self, subscription: SharedSubscription) {
        if let SetOnce::Installed = self.upstream.set_once(subscription) {
            self.upstream.request(UNBOUNDED);
        }
    }

    fn on_next(&self, value: T) {
        // A closed channel means the stream was dropped and cancellation is underway.
        let _ = self.tx.unbounded_send(Ok(value));
    }

    fn on_error(&self, error: StreamError) {
        let _ = self.tx.unbounded_send(Err(error));
        self.tx.close_channel();
    }

    fn on_complete(&self) {
        self.tx.close_channel();
    }
}
