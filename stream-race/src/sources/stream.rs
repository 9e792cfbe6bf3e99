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

use super::SinkCell;
use crate::error::StreamError;
use crate::protocol::{add_cap_atomic, SharedSink, Source, Subscription, UNBOUNDED};
use crate::runtime::timer_runtime;
use arc_swap::ArcSwapOption;
use futures::{Stream, StreamExt};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::AbortHandle;

/// Adapts a `futures::Stream` into a [`Source`].
///
/// `factory` builds a fresh stream for every subscription. The stream is polled on the
/// ambient Tokio runtime (or the crate's timer runtime) and only while demand is
/// outstanding. `Err` items fail the source; the end of the stream completes it.
pub struct StreamSource<F, T> {
    factory: Arc<F>,
    _item: PhantomData<fn() -> T>,
}

pub fn from_stream<F, S, T>(factory: F) -> StreamSource<F, T>
where
    F: Fn() -> S + Send + Sync + 'static,
    S: Stream<Item = Result<T, StreamError>> + Send + 'static,
    T: Send + 'static,
{
    StreamSource {
        factory: Arc::new(factory),
        _item: PhantomData,
    }
}

impl<F, T> Clone for StreamSource<F, T> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            _item: PhantomData,
        }
    }
}

impl<F, S, T> Source<T> for StreamSource<F, T>
where
    F: Fn() -> S + Send + Sync + 'static,
    S: Stream<Item = Result<T, StreamError>> + Send + 'static,
    T: Send + 'static,
{
    fn subscribe(&self, sink: SharedSink<T>) {
        let subscription = Arc::new(StreamSubscription {
            requested: AtomicU64::new(0),
            demand: Notify::new(),
            cancelled: AtomicBool::new(false),
            sink: ArcSwapOption::from_pointee(SinkCell(sink.clone())),
            task: ArcSwapOption::empty(),
        });

        sink.on_subscribe(subscription.clone());
        if subscription.is_cancelled() {
            return;
        }

        let stream = (self.factory)();
        let driver = subscription.clone();
        let handle = timer_runtime::spawn_task(async move { driver.drive(stream).await });
        subscription.task.store(Some(Arc::new(handle)));
        if subscription.is_cancelled() {
            subscription.abort_task();
        }
    }
}

struct StreamSubscription<T> {
    requested: AtomicU64,
    demand: Notify,
    cancelled: AtomicBool,
    sink: ArcSwapOption<SinkCell<T>>,
    task: ArcSwapOption<AbortHandle>,
}

impl<T> StreamSubscription<T>
where
    T: Send + 'static,
{
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn abort_task(&self) {
        if let Some(handle) = self.task.swap(None) {
            handle.abort();
        }
    }

    async fn drive<S>(&self, stream: S)
    where
        S: Stream<Item = Result<T, StreamError>> + Send,
    {
        let mut stream = Box::pin(stream);

        loop {
            while self.requested.load(Ordering::Acquire) == 0 {
                if self.is_cancelled() {
                    return;
                }
                self.demand.notified().await;
            }
            if self.is_cancelled() {
                return;
            }

            match stream.next().await {
                Some(Ok(value)) => {
                    let Some(sink) = self.sink.load_full() else {
                        return;
                    };
                    if self.requested.load(Ordering::Acquire) != UNBOUNDED {
                        self.requested.fetch_sub(1, Ordering::AcqRel);
                    }
                    sink.0.on_next(value);
                }
                Some(Err(error)) => {
                    if let Some(sink) = self.sink.swap(None) {
                        sink.0.on_error(error);
                    }
                    return;
                }
                None => {
                    if let Some(sink) = self.sink.swap(None) {
                        sink.0.on_complete();
                    }
                    return;
                }
            }
        }
    }
}

impl<T> Subscription for StreamSubscription<T>
where
    T: Send + 'static,
{
    fn request(&self, n: u64) {
        if n == 0 {
            self.cancelled.store(true, Ordering::Release);
            self.abort_task();
            if let Some(sink) = self.sink.swap(None) {
                sink.0.on_error(StreamError::protocol_violation(
                    "request amount must be positive",
                ));
            }
            return;
        }

        add_cap_atomic(&self.requested, n);
        self.demand.notify_one();
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.sink.store(None);
        self.demand.notify_one();
        self.abort_task();
    }
}
