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

//! Replay of JSON Lines telemetry logs through the tracker.

use std::io::BufRead;

use serde::Deserialize;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::telemetry::tracker::Classification;
use crate::telemetry::tracker::ProficiencyUpdate;
use crate::telemetry::tracker::Tracker;
use crate::types::level::CefrLevel;
use crate::types::timestamp::Timestamp;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Event {
    /// A unit was displayed and classified.
    Open {
        unit: String,
        language: String,
        level: CefrLevel,
        word_count: u32,
        at: Timestamp,
    },
    /// The unit was read for `ms` milliseconds.
    Engage { unit: String, ms: u64, at: Timestamp },
    /// The learner translated or simplified (part of) the unit.
    Struggle {
        unit: String,
        level: CefrLevel,
        word_count: u32,
        at: Timestamp,
    },
    /// The unit's sample should be scored.
    Finalize { unit: String, at: Timestamp },
}

impl Event {
    pub fn unit(&self) -> &str {
        match self {
            Event::Open { unit, .. }
            | Event::Engage { unit, .. }
            | Event::Struggle { unit, .. }
            | Event::Finalize { unit, .. } => unit,
        }
    }

    /// Apply the event, returning any updates it produced: the score of a
    /// finalized unit, or the pending scores of units evicted by an open.
    pub fn apply(self, tracker: &mut Tracker) -> Fallible<Vec<ProficiencyUpdate>> {
        match self {
            Event::Open {
                unit,
                language,
                level,
                word_count,
                at,
            } => tracker.open(&unit, &language, Classification { level, word_count }, at),
            Event::Engage { unit, ms, at } => {
                tracker.engage(&unit, ms, at)?;
                Ok(Vec::new())
            }
            Event::Struggle {
                unit,
                level,
                word_count,
                at,
            } => {
                tracker.struggle(&unit, Classification { level, word_count }, at)?;
                Ok(Vec::new())
            }
            Event::Finalize { unit, at } => Ok(vec![tracker.finalize(&unit, at)?]),
        }
    }
}

/// Feed every event in the log to the tracker, returning the updates it
/// produced in log order, followed by the pending scores of the units still
/// live at the end of the log. Blank lines are skipped, and so are events
/// for units that were evicted or never opened.
pub fn replay_log(reader: impl BufRead, tracker: &mut Tracker) -> Fallible<Vec<ProficiencyUpdate>> {
    let mut updates = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_number = index + 1;
        let event: Event = serde_json::from_str(&line)
            .map_err(|e| ErrorReport::new(&format!("line {line_number}: {e}")))?;
        if !matches!(event, Event::Open { .. }) && !tracker.is_tracking(event.unit()) {
            log::warn!(
                "line {line_number}: skipping event for unit {}, which is not being tracked.",
                event.unit()
            );
            continue;
        }
        let produced = event
            .apply(tracker)
            .map_err(|e| ErrorReport::new(&format!("line {line_number}: {}", e.message())))?;
        updates.extend(produced);
    }
    updates.extend(tracker.flush());
    Ok(updates)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::telemetry::store::SampleStore;

    fn tracker() -> Fallible<Tracker> {
        Ok(Tracker::new(SampleStore::new(16, 60_000)?))
    }

    #[test]
    fn test_replay() -> Fallible<()> {
        let log = r#"
{"type":"open","unit":"p1","language":"es","level":"B2","wordCount":200,"at":"2026-01-01T10:00:00Z"}
{"type":"engage","unit":"p1","ms":60000,"at":"2026-01-01T10:01:00Z"}
{"type":"finalize","unit":"p1","at":"2026-01-01T10:01:00Z"}

{"type":"open","unit":"p2","language":"fr","level":"A2","wordCount":20,"at":"2026-01-01T10:02:00Z"}
{"type":"engage","unit":"p2","ms":6000,"at":"2026-01-01T10:02:06Z"}
{"type":"struggle","unit":"p2","level":"B1","wordCount":20,"at":"2026-01-01T10:02:07Z"}
{"type":"finalize","unit":"p2","at":"2026-01-01T10:02:08Z"}
"#;
        let mut tracker = tracker()?;
        let updates = replay_log(Cursor::new(log), &mut tracker)?;
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].language, "es");
        assert!((updates[0].delta - 0.015).abs() < 1e-12);
        assert_eq!(updates[1].language, "fr");
        assert!((updates[1].delta - (-0.03)).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_malformed_line_reports_line_number() -> Fallible<()> {
        let log = "\n{\"type\":\"explode\"}\n";
        let mut tracker = tracker()?;
        let err = replay_log(Cursor::new(log), &mut tracker).err().unwrap();
        assert!(err.to_string().starts_with("error: line 2:"));
        Ok(())
    }

    #[test]
    fn test_event_for_unopened_unit_is_skipped() -> Fallible<()> {
        let log = r#"{"type":"engage","unit":"p9","ms":10,"at":"2026-01-01T10:00:00Z"}"#;
        let mut tracker = tracker()?;
        assert!(replay_log(Cursor::new(log), &mut tracker)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_late_event_for_evicted_unit_keeps_the_log() -> Fallible<()> {
        let log = r#"{"type":"open","unit":"p1","language":"es","level":"C1","wordCount":100,"at":"2026-01-01T10:00:00Z"}
{"type":"engage","unit":"p1","ms":30000,"at":"2026-01-01T10:00:30Z"}
{"type":"finalize","unit":"p1","at":"2026-01-01T10:00:30Z"}
{"type":"open","unit":"p2","language":"es","level":"B2","wordCount":100,"at":"2026-01-01T10:40:00Z"}
{"type":"engage","unit":"p2","ms":30000,"at":"2026-01-01T10:40:30Z"}
{"type":"finalize","unit":"p2","at":"2026-01-01T10:40:30Z"}
{"type":"engage","unit":"p1","ms":5000,"at":"2026-01-01T10:41:00Z"}
{"type":"finalize","unit":"p1","at":"2026-01-01T10:41:05Z"}
"#;
        let mut tracker = tracker()?;
        let updates = replay_log(Cursor::new(log), &mut tracker)?;
        let units: Vec<&str> = updates.iter().map(|update| update.unit.as_str()).collect();
        assert_eq!(units, vec!["p1", "p2"]);
        assert!((updates[0].delta - 0.02).abs() < 1e-12);
        assert!((updates[1].delta - 0.015).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_unfinalized_units_are_flushed_at_the_end() -> Fallible<()> {
        let log = r#"{"type":"open","unit":"p1","language":"de","level":"B2","wordCount":100,"at":"2026-01-01T10:00:00Z"}
{"type":"engage","unit":"p1","ms":30000,"at":"2026-01-01T10:00:30Z"}
"#;
        let mut tracker = tracker()?;
        let updates = replay_log(Cursor::new(log), &mut tracker)?;
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].language, "de");
        assert!((updates[0].delta - 0.015).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_tracker_error_is_not_double_prefixed() -> Fallible<()> {
        let log = r#"{"type":"open","unit":"p1","language":"es","level":"C1","wordCount":10,"at":"2026-01-01T10:00:00Z"}
{"type":"open","unit":"p1","language":"es","level":"C1","wordCount":10,"at":"2026-01-01T10:00:01Z"}
"#;
        let mut tracker = tracker()?;
        let err = replay_log(Cursor::new(log), &mut tracker).err().unwrap();
        assert_eq!(err.to_string(), "error: line 2: unit p1 already has a sample.");
        Ok(())
    }
}
