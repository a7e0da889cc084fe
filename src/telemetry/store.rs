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

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::Fallible;
use crate::error::fail;
use crate::types::sample::ComprehensionSample;
use crate::types::timestamp::Timestamp;

/// Identifies a content unit for as long as its page is open.
pub type UnitId = String;

pub struct Entry {
    pub sample: ComprehensionSample,
    /// Language code of the unit's text.
    pub language: String,
    pub last_touched: Timestamp,
    /// Sum of the deltas already handed out for this sample.
    pub applied_delta: f64,
}

/// The live comprehension samples, keyed by content unit.
///
/// A sample is created once per unit. When the store is full, inserting a
/// new sample evicts the entry that was touched least recently; entries
/// idle for longer than `idle_timeout_ms` are dropped by `evict_idle`.
pub struct SampleStore {
    entries: HashMap<UnitId, Entry>,
    capacity: usize,
    idle_timeout_ms: u64,
}

impl SampleStore {
    pub fn new(capacity: usize, idle_timeout_ms: u64) -> Fallible<Self> {
        if capacity == 0 {
            return fail("sample store capacity must be positive.");
        }
        Ok(Self {
            entries: HashMap::new(),
            capacity,
            idle_timeout_ms,
        })
    }

    /// Insert a new sample, returning the entry evicted to make room, if
    /// any. If the unit already has a sample, returns an error.
    pub fn insert(
        &mut self,
        unit: &str,
        language: &str,
        sample: ComprehensionSample,
        now: Timestamp,
    ) -> Fallible<Option<(UnitId, Entry)>> {
        if self.entries.contains_key(unit) {
            return fail(format!("unit {unit} already has a sample."));
        }
        let evicted = if self.entries.len() >= self.capacity {
            self.evict_least_recent()
        } else {
            None
        };
        self.entries.insert(
            unit.to_string(),
            Entry {
                sample,
                language: language.to_string(),
                last_touched: now,
                applied_delta: 0.0,
            },
        );
        Ok(evicted)
    }

    /// Look up a unit's entry and mark it as touched. If the unit has no
    /// sample, returns an error.
    pub fn touch(&mut self, unit: &str, now: Timestamp) -> Fallible<&mut Entry> {
        match self.entries.get_mut(unit) {
            Some(entry) => {
                entry.last_touched = now;
                Ok(entry)
            }
            None => fail(format!("no sample for unit {unit}.")),
        }
    }

    #[cfg(test)]
    pub fn get(&self, unit: &str) -> Option<&Entry> {
        self.entries.get(unit)
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.entries.contains_key(unit)
    }

    /// Remove every entry idle for longer than the timeout and return them,
    /// oldest first.
    pub fn evict_idle(&mut self, now: Timestamp) -> Vec<(UnitId, Entry)> {
        let timeout = self.idle_timeout_ms;
        let idle: Vec<UnitId> = self
            .entries
            .iter()
            .filter(|(_, entry)| now.millis_since(entry.last_touched) > timeout)
            .map(|(unit, _)| unit.clone())
            .collect();
        let mut evicted: Vec<(UnitId, Entry)> = idle
            .into_iter()
            .filter_map(|unit| self.entries.remove_entry(&unit))
            .collect();
        evicted.sort_by(by_last_touched);
        for (unit, _) in &evicted {
            log::debug!("Evicting idle sample for unit {unit}.");
        }
        evicted
    }

    /// Remove and return every entry, oldest first.
    pub fn drain(&mut self) -> Vec<(UnitId, Entry)> {
        let mut entries: Vec<(UnitId, Entry)> = self.entries.drain().collect();
        entries.sort_by(by_last_touched);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn evict_least_recent(&mut self) -> Option<(UnitId, Entry)> {
        let oldest = self
            .entries
            .iter()
            .min_by(|(a_unit, a), (b_unit, b)| {
                a.last_touched
                    .cmp(&b.last_touched)
                    .then_with(|| a_unit.cmp(b_unit))
            })
            .map(|(unit, _)| unit.clone());
        let unit = oldest?;
        log::debug!("Sample store full, evicting unit {unit}.");
        self.entries.remove_entry(&unit)
    }
}

/// Least recently touched first, ties broken by unit id.
fn by_last_touched((a_unit, a): &(UnitId, Entry), (b_unit, b): &(UnitId, Entry)) -> Ordering {
    a.last_touched
        .cmp(&b.last_touched)
        .then_with(|| a_unit.cmp(b_unit))
}
