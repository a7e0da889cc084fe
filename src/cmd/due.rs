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

use crate::cmd::OutputFormat;
use crate::collection::Collection;
use crate::error::Fallible;
use crate::scheduler::compute_next_due_timestamp;
use crate::scheduler::select_due_cards;
use crate::types::card::Card;
use crate::types::card_hash::CardHash;
use crate::types::timestamp::Timestamp;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueCard {
    hash: CardHash,
    text: String,
    translation: String,
    due_at: Timestamp,
    review_count: usize,
}

impl DueCard {
    fn new(card: &Card) -> Self {
        Self {
            hash: card.hash(),
            text: card.text.clone(),
            translation: card.translation.clone(),
            due_at: compute_next_due_timestamp(card),
            review_count: card.reviews.len(),
        }
    }
}

/// The cards due at `now`, most overdue first.
pub fn due_cards(directory: Option<String>, now: Timestamp) -> Fallible<Vec<DueCard>> {
    let collection = Collection::new(directory)?;
    let cards = collection.db.cards()?;
    Ok(select_due_cards(&cards, now)
        .into_iter()
        .map(DueCard::new)
        .collect())
}

pub fn print_due_cards(directory: Option<String>, format: OutputFormat) -> Fallible<()> {
    let due = due_cards(directory, Timestamp::now())?;
    match format {
        OutputFormat::Text => {
            if due.is_empty() {
                println!("No cards due.");
            }
            for card in &due {
                let short = card.hash.to_hex();
                println!(
                    "{}  {} = {}  (due {})",
                    &short[..8],
                    card.text,
                    card.translation,
                    card.due_at
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&due)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::cmd::add::add_card;
    use crate::cmd::review::review_card;
    use crate::types::grade::Grade;
    use crate::types::timestamp::DAY_MS;

    fn day(n: i64) -> Timestamp {
        Timestamp::from_millis(n * DAY_MS).unwrap()
    }

    #[test]
    fn test_due_cards() -> Fallible<()> {
        let directory = tempdir()?;
        let dir = Some(directory.path().display().to_string());
        add_card(dir.clone(), "uno", "one", day(0))?;
        let dos = add_card(dir.clone(), "dos", "two", day(0))?;
        add_card(dir.clone(), "tres", "three", day(3))?;
        review_card(dir.clone(), &dos.to_hex(), Grade::Easy, day(1))?;

        // uno is due at day 0, dos at day 2, tres at day 3.
        let due = due_cards(dir.clone(), day(2))?;
        let texts: Vec<&str> = due.iter().map(|card| card.text.as_str()).collect();
        assert_eq!(texts, vec!["uno", "dos"]);
        assert_eq!(due[1].review_count, 1);

        let json = serde_json::to_value(&due)?;
        assert_eq!(json[1]["dueAt"], "1970-01-03T00:00:00.000Z");
        Ok(())
    }
}
