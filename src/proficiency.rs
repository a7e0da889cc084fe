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

//! Turns passive reading telemetry into a small signed adjustment of the
//! learner's proficiency estimate.

use crate::types::sample::ComprehensionSample;

/// Reading speed of an average reader, in words per minute.
const WORDS_PER_MINUTE: f64 = 200.0;

const MS_PER_MINUTE: f64 = 60_000.0;

/// Samples read for less than this fraction of the expected time are
/// treated as scrolled past and carry no signal.
const MIN_CONFIDENCE: f64 = 0.10;

/// Reward per difficulty level for a unit read without help.
const SUCCESS_RATE: f64 = 0.005;

/// Penalty per difficulty level, scaled by how much of the unit needed
/// help.
const STRUGGLE_RATE: f64 = 0.015;

/// How long an average reader needs for `word_count` words.
pub fn expected_reading_ms(word_count: u32) -> f64 {
    f64::from(word_count) / WORDS_PER_MINUTE * MS_PER_MINUTE
}

/// Fraction of the expected reading time actually spent on the unit,
/// capped at 1.
pub fn confidence(sample: &ComprehensionSample) -> f64 {
    let expected_ms = expected_reading_ms(sample.word_count);
    if expected_ms == 0.0 {
        return 0.0;
    }
    (sample.engagement_ms as f64 / expected_ms).min(1.0)
}

/// The proficiency delta of one sample.
///
/// A sample with any struggle event is scored entirely on its struggles,
/// however small they were; only a clean read earns the success reward.
/// The result is scaled by confidence, so it lies within
/// [-0.075, 0.025].
pub fn compute_delta(sample: &ComprehensionSample) -> f64 {
    if sample.word_count == 0 {
        return 0.0;
    }
    let confidence = confidence(sample);
    if confidence < MIN_CONFIDENCE {
        log::debug!("Discarding sample with confidence {confidence:.3}.");
        return 0.0;
    }
    let base = if sample.struggle_events.is_empty() {
        SUCCESS_RATE * f64::from(sample.difficulty.ordinal())
    } else {
        -STRUGGLE_RATE * struggle_ratio(sample) * average_struggle_difficulty(sample)
    };
    base * confidence
}

/// Share of the unit's words that needed a lookup, capped at 1.
fn struggle_ratio(sample: &ComprehensionSample) -> f64 {
    let words = total_struggle_words(sample) as f64;
    (words / f64::from(sample.word_count)).min(1.0)
}

/// Word-weighted mean difficulty of the looked-up text.
fn average_struggle_difficulty(sample: &ComprehensionSample) -> f64 {
    let total = total_struggle_words(sample);
    if total == 0 {
        return 0.0;
    }
    let weighted: f64 = sample
        .struggle_events
        .iter()
        .map(|event| f64::from(event.difficulty.ordinal()) * f64::from(event.word_count))
        .sum();
    weighted / total as f64
}

fn total_struggle_words(sample: &ComprehensionSample) -> u64 {
    sample
        .struggle_events
        .iter()
        .map(|event| u64::from(event.word_count))
        .sum()
}
