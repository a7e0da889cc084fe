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
use crate::types::card::CardReview;
use crate::types::card_hash::CardHash;
use crate::types::grade::Grade;
use crate::types::timestamp::Timestamp;

/// Record a review. The card may be named by any unambiguous prefix of its
/// hash.
pub fn review_card(
    directory: Option<String>,
    hash_prefix: &str,
    grade: Grade,
    now: Timestamp,
) -> Fallible<CardHash> {
    let mut collection = Collection::new(directory)?;
    let hashes = collection.db.card_hashes()?;
    let card_hash = resolve_prefix(hashes, hash_prefix)?;
    collection.db.add_review(
        card_hash,
        CardReview {
            timestamp: now,
            grade,
        },
    )?;
    Ok(card_hash)
}

fn resolve_prefix(hashes: impl IntoIterator<Item = CardHash>, prefix: &str) -> Fallible<CardHash> {
    let prefix = prefix.trim().to_lowercase();
    if prefix.is_empty() {
        return fail("empty card hash.");
    }
    let mut matches: Vec<CardHash> = hashes
        .into_iter()
        .filter(|hash| hash.to_hex().starts_with(&prefix))
        .collect();
    match matches.len() {
        0 => fail(format!("no card matches {prefix}.")),
        1 => Ok(matches.remove(0)),
        n => fail(format!("{n} cards match {prefix}, use a longer prefix.")),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::cmd::add::add_card;

    #[test]
    fn test_resolve_prefix() -> Fallible<()> {
        let a =
            CardHash::from_hex("ab00000000000000000000000000000000000000000000000000000000000000")?;
        let b =
            CardHash::from_hex("ac00000000000000000000000000000000000000000000000000000000000000")?;
        assert_eq!(resolve_prefix([a, b], "AB")?, a);
        assert!(resolve_prefix([a, b], "a").is_err());
        assert!(resolve_prefix([a, b], "ff").is_err());
        assert!(resolve_prefix([a, b], "").is_err());
        Ok(())
    }

    #[test]
    fn test_review_card() -> Fallible<()> {
        let directory = tempdir()?;
        let dir = Some(directory.path().display().to_string());
        let hash = add_card(dir.clone(), "libro", "book", Timestamp::now())?;
        let prefix = &hash.to_hex()[..8];
        assert_eq!(review_card(dir.clone(), prefix, Grade::Medium, Timestamp::now())?, hash);
        let collection = Collection::new(dir)?;
        assert_eq!(collection.db.review_count()?, 1);
        Ok(())
    }
}
