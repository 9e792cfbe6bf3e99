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

//! Error kinds surfaced to sinks by the protocol primitives and the race operator.

use thiserror::Error;

/// Failure delivered through [`Sink::on_error`](crate::Sink::on_error).
///
/// Only the kinds the arbitration and race logic itself produces are distinguished;
/// application failures raised by sources travel as [`StreamError::Upstream`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum StreamError {
    /// A participant broke the signal protocol (double `on_subscribe`, `request(0)`, ...).
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    /// A deadline source fired before the next item arrived and no fallback was configured.
    #[error("no item arrived before the deadline")]
    Timeout,
    /// The per-item deadline factory failed or did not produce a source.
    #[error("deadline derivation failed: {0}")]
    Derivation(String),
    /// Failure raised by an upstream source.
    #[error("upstream failed: {0}")]
    Upstream(String),
}

impl StreamError {
    pub fn upstream(reason: impl Into<String>) -> Self {
        StreamError::Upstream(reason.into())
    }

    pub fn protocol_violation(reason: impl Into<String>) -> Self {
        StreamError::ProtocolViolation(reason.into())
    }

    /// Stable short label used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamError::ProtocolViolation(_) => "protocol_violation",
            StreamError::Timeout => "timeout",
            StreamError::Derivation(_) => "derivation",
            StreamError::Upstream(_) => "upstream",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StreamError::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::StreamError;

    #[test]
    fn display_includes_reason() {
        let err = StreamError::upstream("disk unplugged");

        assert_eq!(err.to_string(), "upstream failed: disk unplugged");
        assert_eq!(err.kind(), "upstream");
    }

    #[test]
    fn timeout_is_distinct_kind() {
        assert!(StreamError::Timeout.is_timeout());
        assert!(!StreamError::Derivation("none".to_string()).is_timeout());
        assert_eq!(StreamError::Timeout.kind(), "timeout");
    }
}
