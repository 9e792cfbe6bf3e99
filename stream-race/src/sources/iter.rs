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
use crate::protocol::{add_cap_atomic, SharedSink, Source, Subscription};
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Emits clones of a fixed sequence, never more than requested, then completes.
#[derive(Clone, Debug)]
pub struct IterSource<T> {
    items: Arc<[T]>,
}

pub fn iter<T, I>(items: I) -> IterSource<T>
where
    I: IntoIterator<Item = T>,
{
    IterSource {
        items: items.into_iter().collect(),
    }
}

impl<T> IterSource<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Source<T> for IterSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn subscribe(&self, sink: SharedSink<T>) {
        let subscription = Arc::new(IterSubscription {
            items: self.items.clone(),
            index: AtomicUsize::new(0),
            requested: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            sink: ArcSwapOption::from_pointee(SinkCell(sink.clone())),
        });

        sink.on_subscribe(subscription.clone());
        if subscription.items.is_empty() {
            subscription.complete();
        }
    }
}

struct IterSubscription<T> {
    items: Arc<[T]>,
    index: AtomicUsize,
    requested: AtomicU64,
    cancelled: AtomicBool,
    sink: ArcSwapOption<SinkCell<T>>,
}

impl<T> IterSubscription<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn complete(&self) {
        if let Some(sink) = self.sink.swap(None) {
            sink.0.on_complete();
        }
    }

    /// Only the caller that moved `requested` off zero runs this loop.
    fn emit(&self) {
        let mut emitted = 0u64;
        let mut requested = self.requested.load(Ordering::Acquire);

        loop {
            while emitted != requested {
                if self.cancelled.load(Ordering::Acquire) {
                    return;
                }
                let index = self.index.load(Ordering::Relaxed);
                if index == self.items.len() {
                    self.complete();
                    return;
                }
                let Some(sink) = self.sink.load_full() else {
                    return;
                };
                self.index.store(index + 1, Ordering::Relaxed);
                sink.0.on_next(self.items[index].clone());
                emitted += 1;
            }

            if self.index.load(Ordering::Relaxed) == self.items.len() {
                if !self.cancelled.load(Ordering::Acquire) {
                    self.complete();
                }
                return;
            }

            requested = self.requested.load(Ordering::Acquire);
            if requested == emitted {
                requested = self.requested.fetch_sub(emitted, Ordering::AcqRel) - emitted;
                if requested == 0 {
                    return;
                }
                emitted = 0;
            }
        }
    }
}

impl<T> Subscription for IterSubscription<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        if n == 0 {
            self.cancelled.store(true, Ordering::Release);
            if let Some(sink) = self.sink.swap(None) {
                sink.0.on_error(StreamError::protocol_violation(
                    "request amount must be positive",
                ));
            }
            return;
        }

        if add_cap_atomic(&self.requested, n) == 0 {
            self.emit();
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.sink.store(None);
    }
}
