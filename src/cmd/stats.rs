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

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cmd::OutputFormat;
use crate::collection::Collection;
use crate::error::Fallible;
use crate::scheduler::select_due_cards;
use crate::types::timestamp::Timestamp;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    card_count: usize,
    review_count: usize,
    due_count: usize,
    proficiency: BTreeMap<String, f64>,
}

pub fn collection_stats(directory: Option<String>, now: Timestamp) -> Fallible<Stats> {
    let collection = Collection::new(directory)?;
    let cards = collection.db.cards()?;
    Ok(Stats {
        card_count: cards.len(),
        review_count: collection.db.review_count()?,
        due_count: select_due_cards(&cards, now).len(),
        proficiency: collection.db.proficiencies()?.into_iter().collect(),
    })
}

pub fn print_stats(directory: Option<String>, format: OutputFormat) -> Fallible<()> {
    let stats = collection_stats(directory, Timestamp::now())?;
    match format {
        OutputFormat::Text => {
            println!("Cards:   {}", stats.card_count);
            println!("Reviews: {}", stats.review_count);
            println!("Due:     {}", stats.due_count);
            for (language, score) in &stats.proficiency {
                println!("Proficiency ({language}): {score:.4}");
            }
        }
        OutputFormat::Json => {
            let stats_json = serde_json::to_string_pretty(&stats)?;
            println!("{}", stats_json);
        }
    }
    Ok(())
}
