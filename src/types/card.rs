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

use serde::Serialize;

use crate::types::card_hash::CardHash;
use crate::types::grade::Grade;
use crate::types::timestamp::Timestamp;

/// A saved vocabulary item and its full review log.
#[derive(Clone, Debug, Serialize)]
pub struct Card {
    /// The surface form in the target language.
    pub text: String,
    /// The meaning in the learner's base language.
    pub translation: String,
    /// When the card was captured. An unreviewed card is due from here.
    pub created_at: Timestamp,
    /// Every review of this card, in no particular order.
    pub reviews: Vec<CardReview>,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct CardReview {
    pub timestamp: Timestamp,
    pub grade: Grade,
}

impl Card {
    pub fn new(
        text: impl Into<String>,
        translation: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            text: text.into().trim().to_string(),
            translation: translation.into().trim().to_string(),
            created_at,
            reviews: Vec::new(),
        }
    }

    pub fn hash(&self) -> CardHash {
        CardHash::of(&self.text, &self.translation)
    }
}
