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

use serde::{Deserialize, Serialize};
use std::path::Path;
use stream_race::TimeoutConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to parse config file: {0}")]
    Parse(#[from] json5::Error),
    #[error("unable to render summary: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    pub(crate) timeout: TimeoutConfig,
    pub(crate) main: MainSourceConfig,
    #[serde(default)]
    pub(crate) fallback: Option<FallbackConfig>,
    /// Keep only the first item of the raced sequence.
    #[serde(default)]
    pub(crate) first_only: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct MainSourceConfig {
    pub(crate) items: Vec<DelayedItem>,
    /// Fail with this message after the last item instead of completing.
    #[serde(default)]
    pub(crate) fail_with: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct DelayedItem {
    pub(crate) value: String,
    pub(crate) delay_ms: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct FallbackConfig {
    pub(crate) items: Vec<String>,
}

impl ScenarioConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(json5::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::ScenarioConfig;

    #[test]
    fn bundled_scenario_parses() {
        let config = ScenarioConfig::load(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/configs/fallback-scenario.json5"
        ))
        .unwrap();

        assert_eq!(config.main.items.len(), 3);
        assert!(config.fallback.is_some());
        assert!(!config.first_only);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed = json5::from_str::<ScenarioConfig>(
            r#"{
                timeout: { first_item_timeout_ms: 10 },
                main: { items: [] },
                retries: 3,
            }"#,
        );

        assert!(parsed.is_err());
    }
}
