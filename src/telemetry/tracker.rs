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

use crate::error::Fallible;
use crate::proficiency::compute_delta;
use crate::telemetry::store::Entry;
use crate::telemetry::store::SampleStore;
use crate::types::level::CefrLevel;
use crate::types::sample::ComprehensionSample;
use crate::types::sample::StruggleEvent;
use crate::types::timestamp::Timestamp;

/// What the text-difficulty classifier says about a piece of text.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Classification {
    pub level: CefrLevel,
    pub word_count: u32,
}

/// A change to apply to the learner's proficiency in one language.
#[derive(Clone, PartialEq, Debug)]
pub struct ProficiencyUpdate {
    pub unit: String,
    pub language: String,
    pub delta: f64,
}

/// Follows content units from the moment they are classified until their
/// telemetry is finalized.
pub struct Tracker {
    store: SampleStore,
}

impl Tracker {
    pub fn new(store: SampleStore) -> Self {
        Self { store }
    }

    /// Start tracking a unit. Idle samples are evicted first, and so is the
    /// least recently touched one if the store is full. Returns the final
    /// updates of evicted samples whose score had not been handed out yet.
    pub fn open(
        &mut self,
        unit: &str,
        language: &str,
        classification: Classification,
        now: Timestamp,
    ) -> Fallible<Vec<ProficiencyUpdate>> {
        let mut evicted = self.store.evict_idle(now);
        let sample = ComprehensionSample::new(classification.level, classification.word_count);
        evicted.extend(self.store.insert(unit, language, sample, now)?);
        log::debug!(
            "Tracking unit {unit} ({language}, {}, {} words), {} live.",
            classification.level,
            classification.word_count,
            self.store.len()
        );
        Ok(flush_entries(evicted))
    }

    pub fn is_tracking(&self, unit: &str) -> bool {
        self.store.contains(unit)
    }

    /// Add visible, foregrounded reading time to a unit.
    pub fn engage(&mut self, unit: &str, ms: u64, now: Timestamp) -> Fallible<()> {
        let entry = self.store.touch(unit, now)?;
        entry.sample.engagement_ms = entry.sample.engagement_ms.saturating_add(ms);
        Ok(())
    }

    /// Record that the learner translated or simplified (part of) a unit.
    pub fn struggle(
        &mut self,
        unit: &str,
        classification: Classification,
        now: Timestamp,
    ) -> Fallible<()> {
        let entry = self.store.touch(unit, now)?;
        entry.sample.struggle_events.push(StruggleEvent {
            difficulty: classification.level,
            word_count: classification.word_count,
        });
        Ok(())
    }

    /// Score the unit's sample as it stands. The sample stays live, and the
    /// returned delta is only what changed since the unit was last
    /// finalized, so summing every update never counts a sample twice.
    pub fn finalize(&mut self, unit: &str, now: Timestamp) -> Fallible<ProficiencyUpdate> {
        let entry = self.store.touch(unit, now)?;
        let total = compute_delta(&entry.sample);
        let delta = total - entry.applied_delta;
        entry.applied_delta = total;
        log::debug!("Unit {unit}: total delta {total:+.5}, change {delta:+.5}.");
        Ok(ProficiencyUpdate {
            unit: unit.to_string(),
            language: entry.language.clone(),
            delta,
        })
    }

    /// Stop tracking every unit, returning the updates still pending.
    pub fn flush(&mut self) -> Vec<ProficiencyUpdate> {
        flush_entries(self.store.drain())
    }

    #[cfg(test)]
    pub fn store(&self) -> &SampleStore {
        &self.store
    }
}

/// The updates owed by samples that are leaving the store. Samples whose
/// score was fully handed out produce nothing.
fn flush_entries(entries: Vec<(String, Entry)>) -> Vec<ProficiencyUpdate> {
    entries
        .into_iter()
        .filter_map(|(unit, entry)| {
            let delta = compute_delta(&entry.sample) - entry.applied_delta;
            if delta == 0.0 {
                return None;
            }
            log::debug!("Flushing unit {unit}: change {delta:+.5}.");
            Some(ProficiencyUpdate {
                unit,
                language: entry.language,
                delta,
            })
        })
        .collect()
}
