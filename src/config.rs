// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs::read_to_string;
use std::path::Path;

use serde::Deserialize;

use crate::error::Fallible;
use crate::error::fail;

/// Name of the optional configuration file in a collection directory.
pub const CONFIG_FILE: &str = "lingorecall.toml";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Database file name, relative to the collection directory.
    pub database: String,
    pub proficiency: ProficiencyConfig,
    pub telemetry: TelemetryConfig,
}

/// Bounds of the running proficiency score, per language.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProficiencyConfig {
    pub initial: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Maximum number of live samples.
    pub capacity: usize,
    /// Samples untouched for this long are dropped.
    pub idle_timeout_minutes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: "lingorecall.db".to_string(),
            proficiency: ProficiencyConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Default for ProficiencyConfig {
    fn default() -> Self {
        Self {
            initial: 0.0,
            min: 0.0,
            max: 5.0,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            idle_timeout_minutes: 30,
        }
    }
}

impl ProficiencyConfig {
    pub fn clamp(&self, score: f64) -> f64 {
        score.clamp(self.min, self.max)
    }
}

impl TelemetryConfig {
    pub fn idle_timeout_ms(&self) -> u64 {
        self.idle_timeout_minutes.saturating_mul(60_000)
    }
}

impl Config {
    /// Load the configuration from `directory`, falling back to the defaults
    /// if there is no configuration file.
    pub fn load(directory: &Path) -> Fallible<Self> {
        let path = directory.join(CONFIG_FILE);
        let config = if path.exists() {
            log::debug!("Loading configuration from {}.", path.display());
            let content = read_to_string(&path)?;
            Self::parse(&content)?
        } else {
            Self::default()
        };
        Ok(config)
    }

    pub fn parse(content: &str) -> Fallible<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Fallible<()> {
        if self.database.trim().is_empty() {
            return fail("database file name is empty.");
        }
        let p = &self.proficiency;
        if !(p.min.is_finite() && p.max.is_finite() && p.initial.is_finite()) {
            return fail("proficiency bounds must be finite.");
        }
        if p.min > p.max {
            return fail("proficiency min is greater than max.");
        }
        if p.initial < p.min || p.initial > p.max {
            return fail("initial proficiency is outside the bounds.");
        }
        if self.telemetry.capacity == 0 {
            return fail("telemetry capacity must be positive.");
        }
        Ok(())
    }
}
