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

use std::fs::read;
use std::io::Cursor;
use std::path::Path;

use crate::collection::Collection;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::telemetry::event_log::replay_log;
use crate::telemetry::store::SampleStore;
use crate::telemetry::tracker::Tracker;
use crate::types::timestamp::Timestamp;

/// Replay a telemetry log and fold every resulting delta into the
/// proficiency store. Returns the final score of each language touched,
/// in the order first touched. The log's blake3 hash is recorded alongside
/// the scores, and a log with the same contents is never applied twice.
pub fn ingest_log(directory: Option<String>, log_path: &Path) -> Fallible<Vec<(String, f64)>> {
    let mut collection = Collection::new(directory)?;
    let telemetry = &collection.config.telemetry;
    let store = SampleStore::new(telemetry.capacity, telemetry.idle_timeout_ms())?;
    let mut tracker = Tracker::new(store);

    let contents = read(log_path)
        .map_err(|e| ErrorReport::new(&format!("cannot read {}: {e}", log_path.display())))?;
    let log_hash = blake3::hash(&contents).to_hex().to_string();
    let updates = replay_log(Cursor::new(contents), &mut tracker)?;
    log::info!(
        "Replayed {} updates from {} into {}.",
        updates.len(),
        log_path.display(),
        collection.directory.display()
    );
    for update in &updates {
        log::debug!("Unit {} ({}): {:+.5}", update.unit, update.language, update.delta);
    }

    let bounds = collection.config.proficiency.clone();
    collection
        .db
        .apply_log(&log_hash, &updates, &bounds, Timestamp::now())
        .map_err(|e| ErrorReport::new(&format!("{}: {}", log_path.display(), e.message())))
}

pub fn print_ingest(directory: Option<String>, log_path: &Path) -> Fallible<()> {
    let scores = ingest_log(directory, log_path)?;
    if scores.is_empty() {
        println!("No proficiency updates.");
    }
    for (language, score) in scores {
        println!("{language}: {score:.4}");
    }
    Ok(())
}
