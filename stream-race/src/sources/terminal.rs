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
use crate::protocol::{EmptySubscription, SharedSink, Source};
use std::sync::Arc;

/// Completes immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptySource;

/// Fails immediately with a fixed error.
#[derive(Clone, Debug)]
pub struct ErrorSource {
    error: StreamError,
}

/// Subscribes and then stays silent forever.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverSource;

pub fn empty() -> EmptySource {
    EmptySource
}

pub fn error(error: StreamError) -> ErrorSource {
    ErrorSource { error }
}

pub fn never() -> NeverSource {
    NeverSource
}

impl<T> Source<T> for EmptySource {
    fn subscribe(&self, sink: SharedSink<T>) {
        sink.on_subscribe(Arc::new(EmptySubscription));
        sink.on_complete();
    }
}

impl<T> Source<T> for ErrorSource {
    fn subscribe(&self, sink: SharedSink<T>) {
        sink.on_subscribe(Arc::new(EmptySubscription));
        sink.on_error(self.error.clone());
    }
}

impl<T> Source<T> for NeverSource {
    fn subscribe(&self, sink: SharedSink<T>) {
        sink.on_subscribe(Arc::new(EmptySubscription));
    }
}
