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

use serde::Deserialize;
use serde::Serialize;

use crate::types::level::CefrLevel;

/// Reading telemetry for one content unit (a paragraph, a caption, ...).
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensionSample {
    /// Time the unit was visible in a foregrounded tab.
    pub engagement_ms: u64,
    /// Intrinsic difficulty of the unit's text.
    pub difficulty: CefrLevel,
    pub word_count: u32,
    /// Translations or simplifications of (part of) the unit, in the order
    /// they happened.
    #[serde(default)]
    pub struggle_events: Vec<StruggleEvent>,
}

/// One lookup the learner needed while reading a unit.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StruggleEvent {
    pub difficulty: CefrLevel,
    pub word_count: u32,
}

impl ComprehensionSample {
    pub fn new(difficulty: CefrLevel, word_count: u32) -> Self {
        Self {
            engagement_ms: 0,
            difficulty,
            word_count,
            struggle_events: Vec::new(),
        }
    }
}
