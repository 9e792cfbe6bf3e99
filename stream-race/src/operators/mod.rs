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

//! Operators and the [`SourceExt`] combinator trait.

mod next;

pub use next::Next;

use crate::config::TimeoutConfig;
use crate::protocol::{SharedSource, Source};
use crate::race::{DeadlineResult, Timeout};
use crate::sources::timer;
use std::sync::Arc;

/// Combinators available on every `'static` source.
pub trait SourceExt<T: 'static>: Source<T> + Sized + 'static {
    /// Fails with [`StreamError::Timeout`](crate::StreamError::Timeout) when
    /// `first_deadline` fires before the first item, or the source derived by
    /// `next_deadline` fires before the following one.
    fn timeout<U, V, F>(
        self,
        first_deadline: SharedSource<U>,
        next_deadline: F,
    ) -> Timeout<T, U, V>
    where
        F: Fn(&T) -> DeadlineResult<V> + Send + Sync + 'static,
    {
        Timeout::new(self.into_shared(), first_deadline, next_deadline)
    }

    /// Like [`timeout`](Self::timeout), but switches to `fallback` instead of failing.
    fn timeout_or<U, V, F>(
        self,
        first_deadline: SharedSource<U>,
        next_deadline: F,
        fallback: SharedSource<T>,
    ) -> Timeout<T, U, V>
    where
        F: Fn(&T) -> DeadlineResult<V> + Send + Sync + 'static,
    {
        self.timeout(first_deadline, next_deadline).with_fallback(fallback)
    }

    /// Timer-based deadlines taken from `config`.
    fn timeout_after(self, config: TimeoutConfig) -> Timeout<T, (), ()> {
        let item_timeout = config.item_timeout();
        self.timeout(
            timer(config.first_item_timeout()).into_shared(),
            move |_item: &T| Ok(Some(timer(item_timeout).into_shared())),
        )
    }

    fn timeout_after_or(
        self,
        config: TimeoutConfig,
        fallback: SharedSource<T>,
    ) -> Timeout<T, (), ()> {
        self.timeout_after(config).with_fallback(fallback)
    }

    /// First item only; see [`Next`].
    fn next(self) -> Next<T> {
        Next::new(self.into_shared())
    }

    fn into_shared(self) -> SharedSource<T> {
        Arc::new(self)
    }
}

impl<T: 'static, S> SourceExt<T> for S where S: Source<T> + 'static {}
