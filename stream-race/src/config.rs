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

//! Serde-facing timeout configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Deadlines for [`SourceExt::timeout_after`](crate::operators::SourceExt::timeout_after),
/// in milliseconds.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Time allowed for the first item.
    pub first_item_timeout_ms: u64,
    /// Time allowed between consecutive items. Defaults to the first-item deadline.
    #[serde(default)]
    pub item_timeout_ms: Option<u64>,
}

impl TimeoutConfig {
    pub fn new(first_item_timeout: Duration, item_timeout: Duration) -> Self {
        Self {
            first_item_timeout_ms: millis(first_item_timeout),
            item_timeout_ms: Some(millis(item_timeout)),
        }
    }

    /// Same deadline for the first and every following item.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            first_item_timeout_ms: millis(timeout),
            item_timeout_ms: None,
        }
    }

    pub fn first_item_timeout(&self) -> Duration {
        Duration::from_millis(self.first_item_timeout_ms)
    }

    pub fn item_timeout(&self) -> Duration {
        Duration::from_millis(self.item_timeout_ms.unwrap_or(self.first_item_timeout_ms))
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::TimeoutConfig;
    use std::time::Duration;

    #[test]
    fn item_timeout_defaults_to_first_item_timeout() {
        let config: TimeoutConfig =
            serde_json::from_str(r#"{ "first_item_timeout_ms": 250 }"#).unwrap();

        assert_eq!(config.first_item_timeout(), Duration::from_millis(250));
        assert_eq!(config.item_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn explicit_item_timeout_wins() {
        let config: TimeoutConfig = serde_json::from_str(
            r#"{ "first_item_timeout_ms": 1000, "item_timeout_ms": 40 }"#,
        )
        .unwrap();

        assert_eq!(
            config,
            TimeoutConfig::new(Duration::from_secs(1), Duration::from_millis(40))
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = serde_json::from_str::<TimeoutConfig>(
            r#"{ "first_item_timeout_ms": 1, "item_timout_ms": 2 }"#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn uniform_uses_one_deadline() {
        let config = TimeoutConfig::uniform(Duration::from_millis(75));
        assert_eq!(config.item_timeout(), Duration::from_millis(75));
        assert_eq!(config.item_timeout_ms, None);
    }
}
