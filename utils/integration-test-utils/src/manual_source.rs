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

use crate::CountingSubscription;
use std::sync::{Arc, Mutex};
use stream_race::{SharedSink, Source, StreamError};

/// Source driven by hand from the test body.
///
/// Each `subscribe` replaces the current sink and hands it a fresh
/// [`CountingSubscription`]. Emission ignores demand, so tests can also push signals the
/// sink never asked for.
pub struct ManualSource<T> {
    sink: Mutex<Option<SharedSink<T>>>,
    subscription: Mutex<Arc<CountingSubscription>>,
    subscribe_count: Mutex<usize>,
}

impl<T> Default for ManualSource<T> {
    fn default() -> Self {
        Self {
            sink: Mutex::new(None),
            subscription: Mutex::new(Arc::new(CountingSubscription::new())),
            subscribe_count: Mutex::new(0),
        }
    }
}

impl<T> ManualSource<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&self) -> Option<SharedSink<T>> {
        self.sink.lock().unwrap().clone()
    }

    pub fn emit(&self, value: T) {
        if let Some(sink) = self.current() {
            sink.on_next(value);
        }
    }

    pub fn complete(&self) {
        if let Some(sink) = self.current() {
            sink.on_complete();
        }
    }

    pub fn fail(&self, error: StreamError) {
        if let Some(sink) = self.current() {
            sink.on_error(error);
        }
    }

    /// Offers another subscription to the current sink.
    pub fn resubscribe_sink(&self, subscription: Arc<CountingSubscription>) {
        if let Some(sink) = self.current() {
            sink.on_subscribe(subscription);
        }
    }

    /// Subscription handed to the latest subscriber.
    pub fn subscription(&self) -> Arc<CountingSubscription> {
        self.subscription.lock().unwrap().clone()
    }

    pub fn is_subscribed(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }

    pub fn subscribe_count(&self) -> usize {
        *self.subscribe_count.lock().unwrap()
    }

    pub fn total_requested(&self) -> u64 {
        self.subscription().total_requested()
    }

    pub fn is_cancelled(&self) -> bool {
        self.subscription().is_cancelled()
    }
}

impl<T> Source<T> for ManualSource<T>
where
    T: Send,
{
    fn subscribe(&self, sink: SharedSink<T>) {
        let subscription = Arc::new(CountingSubscription::new());
        *self.subscription.lock().unwrap() = subscription.clone();
        *self.sink.lock().unwrap() = Some(sink.clone());
        *self.subscribe_count.lock().unwrap() += 1;
        sink.on_subscribe(subscription);
    }
}
