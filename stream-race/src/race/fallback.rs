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

use crate::arbiter::SubscriptionArbiter;
use crate::error::StreamError;
use crate::protocol::{SharedSink, SharedSubscription, Sink};
use std::sync::Arc;

/// Relays a fallback source to the race's downstream once the race switched over.
///
/// The fallback's subscription is installed in the same arbiter the main source used, so
/// demand the downstream issued and that the main source never fulfilled carries over.
pub(crate) struct FallbackSink<T> {
    downstream: SharedSink<T>,
    arbiter: Arc<SubscriptionArbiter>,
}

impl<T> FallbackSink<T> {
    pub(crate) fn new(downstream: SharedSink<T>, arbiter: Arc<SubscriptionArbiter>) -> Self {
        Self {
            downstream,
            arbiter,
        }
    }
}

impl<T: Send> Sink<T> for FallbackSink<T> {
    fn on_subscribe(&self, subscription: SharedSubscription) {
        self.arbiter.set(subscription);
    }

    fn on_next(&self, value: T) {
        self.downstream.on_next(value);
        self.arbiter.produced(1);
    }

    fn on_error(&self, error: StreamError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}
