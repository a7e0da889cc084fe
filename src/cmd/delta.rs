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

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::proficiency::compute_delta;
use crate::proficiency::confidence;
use crate::types::sample::ComprehensionSample;

pub fn load_sample(path: &Path) -> Fallible<ComprehensionSample> {
    let content = read_to_string(path)
        .map_err(|e| ErrorReport::new(&format!("cannot read {}: {e}", path.display())))?;
    let sample: ComprehensionSample = serde_json::from_str(&content)?;
    Ok(sample)
}

pub fn print_sample_delta(path: &Path) -> Fallible<()> {
    let sample = load_sample(path)?;
    let delta = compute_delta(&sample);
    log::debug!("Confidence: {:.3}", confidence(&sample));
    println!("{delta:+.6}");
    Ok(())
}
