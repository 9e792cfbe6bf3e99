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

//! Process-wide diagnostic hook for signals that lost a race and were not delivered.
//!
//! Dropping late or duplicate signals is part of normal operation (an item that arrives
//! after a timeout won, a second terminal signal, a subscription offered after
//! cancellation). Drops are never delivered downstream, but they are always emitted as a
//! `signal_dropped` tracing event and passed to the installed hook, if any.

use crate::error::StreamError;
use crate::observability::{events, fields};
use arc_swap::ArcSwapOption;
use lazy_static::lazy_static;
use std::sync::Arc;
use tracing::debug;

/// A signal that was discarded instead of delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DroppedSignal {
    /// An item; the value itself is released, only its type name is reported.
    Next { type_name: &'static str },
    Error(StreamError),
    Complete,
    /// A subscription offered to a sink that already had one or was cancelled.
    Subscription,
}

impl DroppedSignal {
    pub fn kind(&self) -> &'static str {
        match self {
            DroppedSignal::Next { .. } => "next",
            DroppedSignal::Error(_) => "error",
            DroppedSignal::Complete => "complete",
            DroppedSignal::Subscription => "subscription",
        }
    }
}

type DropHookFn = dyn Fn(&DroppedSignal) + Send + Sync;

struct DropHook(Box<DropHookFn>);

lazy_static! {
    static ref DROP_HOOK: ArcSwapOption<DropHook> = ArcSwapOption::empty();
}

/// Installs `hook`, replacing any previous one.
pub fn set_drop_hook<F>(hook: F)
where
    F: Fn(&DroppedSignal) + Send + Sync + 'static,
{
    DROP_HOOK.store(Some(Arc::new(DropHook(Box::new(hook)))));
}

/// Removes the installed hook. Drops are still traced.
pub fn reset_drop_hook() {
    DROP_HOOK.store(None);
}

pub(crate) fn signal_dropped(component: &'static str, reason: &'static str, signal: DroppedSignal) {
    debug!(
        event = events::SIGNAL_DROPPED,
        component,
        reason,
        signal = signal.kind(),
        "signal dropped"
    );

    if let Some(hook) = DROP_HOOK.load().as_ref() {
        (hook.0)(&signal);
    }
}

pub(crate) fn next_dropped<T>(component: &'static str, reason: &'static str, value: T) {
    drop(value);
    signal_dropped(
        component,
        reason,
        DroppedSignal::Next {
            type_name: fields::short_type_name::<T>(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::DroppedSignal;
    use crate::error::StreamError;

    #[test]
    fn kinds_are_stable_labels() {
        assert_eq!(DroppedSignal::Next { type_name: "u8" }.kind(), "next");
        assert_eq!(DroppedSignal::Error(StreamError::Timeout).kind(), "error");
        assert_eq!(DroppedSignal::Complete.kind(), "complete");
        assert_eq!(DroppedSignal::Subscription.kind(), "subscription");
    }
}
