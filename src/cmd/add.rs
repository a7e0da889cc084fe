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

use crate::collection::Collection;
use crate::error::Fallible;
use crate::error::fail;
use crate::types::card::Card;
use crate::types::card_hash::CardHash;
use crate::types::timestamp::Timestamp;

pub fn add_card(
    directory: Option<String>,
    text: &str,
    translation: &str,
    now: Timestamp,
) -> Fallible<CardHash> {
    let card = Card::new(text, translation, now);
    if card.text.is_empty() || card.translation.is_empty() {
        return fail("text and translation must not be empty.");
    }
    let mut collection = Collection::new(directory)?;
    collection.db.add_card(&card)
}
