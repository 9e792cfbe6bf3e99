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

use crate::error::StreamError;
use crate::hooks::{self, DroppedSignal};
use crate::observability::{events, fields};
use crate::protocol::{
    SetOnce, SharedSink, SharedSource, SharedSubscription, Sink, Source, Subscription,
    SubscriptionSlot, UNBOUNDED,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

const COMPONENT: &str = "next";

/// Emits at most the first item of `source`, then cancels it and completes.
///
/// An empty source completes; an error before the first item is relayed. Any positive
/// request asks the upstream for unbounded demand once.
pub struct Next<T> {
    source: SharedSource<T>,
}

impl<T> Next<T> {
    pub fn new(source: SharedSource<T>) -> Self {
        Self { source }
    }
}

impl<T> Source<T> for Next<T>
where
    T: Send + 'static,
{
    fn subscribe(&self, sink: SharedSink<T>) {
        let next = Arc::new(NextSink {
            downstream: sink.clone(),
            upstream: SubscriptionSlot::new(),
            requested: AtomicBool::new(false),
            done: AtomicBool::new(false),
        });
        sink.on_subscribe(next.clone());
        self.source.subscribe(next);
    }
}

struct NextSink<T> {
    downstream: SharedSink<T>,
    upstream: SubscriptionSlot,
    requested: AtomicBool,
    done: AtomicBool,
}

impl<T> NextSink<T> {
    fn finish(&self) -> bool {
        !self.done.swap(true, Ordering::AcqRel)
    }
}

impl<T> Sink<T> for NextSink<T>
where
    T: Send + 'static,
{
    fn on_subscribe(&self, subscription: SharedSubscription) {
        match self.upstream.set_once(subscription) {
            SetOnce::Installed => {
                if self.requested.load(Ordering::Acquire) {
                    self.upstream.request(UNBOUNDED);
                }
            }
            SetOnce::Duplicate => hooks::signal_dropped(
                COMPONENT,
                fields::REASON_DUPLICATE_SUBSCRIPTION,
                DroppedSignal::Subscription,
            ),
            SetOnce::Cancelled => {}
        }
    }

    fn on_next(&self, value: T) {
        if !self.finish() {
            hooks::next_dropped(COMPONENT, fields::REASON_AFTER_TERMINAL, value);
            return;
        }
        self.upstream.cancel();
        self.downstream.on_next(value);
        self.downstream.on_complete();
    }

    fn on_error(&self, error: StreamError) {
        if !self.finish() {
            hooks::signal_dropped(
                COMPONENT,
                fields::REASON_AFTER_TERMINAL,
                DroppedSignal::Error(error),
            );
            return;
        }
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        if !self.finish() {
            hooks::signal_dropped(
                COMPONENT,
                fields::REASON_AFTER_TERMINAL,
                DroppedSignal::Complete,
            );
            return;
        }
        self.downstream.on_complete();
    }
}

impl<T> Subscription for NextSink<T>
where
    T: Send + 'static,
{
    fn request(&self, n: u64) {
        if n == 0 {
            self.upstream.cancel();
            if self.finish() {
                warn!(
                    event = events::PROTOCOL_VIOLATION,
                    component = COMPONENT,
                    reason = fields::REASON_ZERO_REQUEST,
                    "downstream requested zero items"
                );
                self.downstream.on_error(StreamError::protocol_violation(
                    "request amount must be positive",
                ));
            }
            return;
        }

        if !self.requested.swap(true, Ordering::AcqRel) {
            self.upstream.request(UNBOUNDED);
        }
    }

    fn cancel(&self) {
        self.done.store(true, Ordering::Release);
        self.upstream.cancel();
    }
}
