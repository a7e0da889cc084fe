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

use std::collections::HashMap;
use std::collections::HashSet;

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::config::DbConfig;

use crate::config::ProficiencyConfig;
use crate::error::Fallible;
use crate::error::fail;
use crate::telemetry::tracker::ProficiencyUpdate;
use crate::types::card::Card;
use crate::types::card::CardReview;
use crate::types::card_hash::CardHash;
use crate::types::grade::Grade;
use crate::types::timestamp::Timestamp;

/// The card store and the proficiency store.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(database_path: &str) -> Fallible<Self> {
        let mut conn = Connection::open(database_path)?;
        conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY, true)?;
        {
            let tx = conn.transaction()?;
            if !schema_exists(&tx)? {
                log::debug!("Creating schema in {database_path}.");
                tx.execute_batch(include_str!("schema.sql"))?;
                tx.commit()?;
            }
        }
        Ok(Self { conn })
    }

    /// Insert a new card, returning its hash.
    ///
    /// If a card with the same text and translation exists, returns an
    /// error.
    pub fn add_card(&mut self, card: &Card) -> Fallible<CardHash> {
        let card_hash = card.hash();
        let tx = self.conn.transaction()?;
        if card_exists(&tx, card_hash)? {
            return fail(format!("card already exists: {card_hash}"));
        }
        log::debug!("Adding new card: {card_hash}");
        tx.execute(
            "insert into cards (card_hash, text, translation, created_at) values (?, ?, ?, ?);",
            (card_hash, &card.text, &card.translation, card.created_at),
        )?;
        for review in &card.reviews {
            insert_review(&tx, card_hash, review)?;
        }
        tx.commit()?;
        Ok(card_hash)
    }

    /// Append a review to a card's log.
    ///
    /// If no card with the given hash exists, returns an error.
    pub fn add_review(&mut self, card_hash: CardHash, review: CardReview) -> Fallible<()> {
        let tx = self.conn.transaction()?;
        if !card_exists(&tx, card_hash)? {
            return fail(format!("no such card: {card_hash}"));
        }
        log::debug!("Recording {} review of {card_hash}", review.grade);
        insert_review(&tx, card_hash, &review)?;
        tx.commit()?;
        Ok(())
    }

    /// Return the set of all card hashes in the database.
    pub fn card_hashes(&self) -> Fallible<HashSet<CardHash>> {
        let mut hashes = HashSet::new();
        let mut stmt = self.conn.prepare("select card_hash from cards;")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let hash: CardHash = row.get(0)?;
            hashes.insert(hash);
        }
        Ok(hashes)
    }

    /// Load every card with its full review log, oldest card first.
    pub fn cards(&self) -> Fallible<Vec<Card>> {
        let mut cards: Vec<Card> = Vec::new();
        let mut index: HashMap<CardHash, usize> = HashMap::new();
        {
            let sql = "select card_hash, text, translation, created_at from cards order by created_at, card_hash;";
            let mut stmt = self.conn.prepare(sql)?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let card_hash: CardHash = row.get(0)?;
                let text: String = row.get(1)?;
                let translation: String = row.get(2)?;
                let created_at: Timestamp = row.get(3)?;
                index.insert(card_hash, cards.len());
                cards.push(Card {
                    text,
                    translation,
                    created_at,
                    reviews: Vec::new(),
                });
            }
        }
        let sql = "select card_hash, reviewed_at, grade from reviews order by review_id;";
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let card_hash: CardHash = row.get(0)?;
            let timestamp: Timestamp = row.get(1)?;
            let grade: Grade = row.get(2)?;
            if let Some(i) = index.get(&card_hash) {
                cards[*i].reviews.push(CardReview { timestamp, grade });
            }
        }
        Ok(cards)
    }

    pub fn review_count(&self) -> Fallible<usize> {
        let count: i64 = self
            .conn
            .query_row("select count(*) from reviews;", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Every language's proficiency score, by language code.
    pub fn proficiencies(&self) -> Fallible<Vec<(String, f64)>> {
        let mut result = Vec::new();
        let mut stmt = self
            .conn
            .prepare("select language, score from proficiency order by language;")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            result.push((row.get(0)?, row.get(1)?));
        }
        Ok(result)
    }

    /// Fold the updates replayed from one telemetry log into the proficiency
    /// store, and record the log's hash, in a single transaction. A log whose
    /// hash is already recorded is refused. Returns the final score of each
    /// language touched, in the order first touched.
    pub fn apply_log(
        &mut self,
        log_hash: &str,
        updates: &[ProficiencyUpdate],
        bounds: &ProficiencyConfig,
        now: Timestamp,
    ) -> Fallible<Vec<(String, f64)>> {
        if let Some(update) = updates.iter().find(|update| !update.delta.is_finite()) {
            return fail(format!(
                "refusing to apply non-finite delta {} for unit {}.",
                update.delta, update.unit
            ));
        }
        let tx = self.conn.transaction()?;
        if log_ingested(&tx, log_hash)? {
            return fail("log already ingested.");
        }
        let mut scores: Vec<(String, f64)> = Vec::new();
        for update in updates {
            let score = apply_delta(&tx, &update.language, update.delta, bounds, now)?;
            match scores
                .iter()
                .position(|(language, _)| *language == update.language)
            {
                Some(i) => scores[i].1 = score,
                None => scores.push((update.language.clone(), score)),
            }
        }
        tx.execute(
            "insert into ingested_logs (log_hash, ingested_at) values (?, ?);",
            (log_hash, now),
        )?;
        tx.commit()?;
        Ok(scores)
    }
}

/// Add a delta to a language's score, starting from the initial score and
/// clamping to the bounds. Returns the new score.
fn apply_delta(
    tx: &Transaction,
    language: &str,
    delta: f64,
    bounds: &ProficiencyConfig,
    now: Timestamp,
) -> Fallible<f64> {
    let current: Option<f64> = tx
        .query_row(
            "select score from proficiency where language = ?;",
            [language],
            |row| row.get(0),
        )
        .optional()?;
    let score = bounds.clamp(current.unwrap_or(bounds.initial) + delta);
    tx.execute(
        "insert into proficiency (language, score, updated_at) values (?, ?, ?) on conflict (language) do update set score = excluded.score, updated_at = excluded.updated_at;",
        (language, score, now),
    )?;
    log::debug!("Proficiency in {language}: {score:.4} ({delta:+.5}).");
    Ok(score)
}

fn log_ingested(tx: &Transaction, log_hash: &str) -> Fallible<bool> {
    let sql = "select count(*) from ingested_logs where log_hash = ?;";
    let count: i64 = tx.query_row(sql, [log_hash], |row| row.get(0))?;
    Ok(count > 0)
}

fn card_exists(tx: &Transaction, card_hash: CardHash) -> Fallible<bool> {
    let sql = "select count(*) from cards where card_hash = ?;";
    let count: i64 = tx.query_row(sql, [card_hash], |row| row.get(0))?;
    Ok(count > 0)
}

fn insert_review(tx: &Transaction, card_hash: CardHash, review: &CardReview) -> Fallible<()> {
    let sql = "insert into reviews (card_hash, reviewed_at, grade) values (?, ?, ?);";
    tx.execute(sql, (card_hash, review.timestamp, review.grade))?;
    Ok(())
}

fn schema_exists(tx: &Transaction) -> Fallible<bool> {
    let sql = "select count(*) from sqlite_master where type='table' AND name=?;";
    let count: i64 = tx.query_row(sql, ["cards"], |row| row.get(0))?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use tempfile::tempdir;

    use super::*;
    use crate::types::timestamp::DAY_MS;

    fn day(n: i64) -> Timestamp {
        Timestamp::from_millis(n * DAY_MS).unwrap()
    }

    fn open() -> Fallible<(TempDir, Database)> {
        let directory = tempdir()?;
        let path = directory.path().join("test.db");
        let db = Database::new(path.to_str().unwrap())?;
        Ok((directory, db))
    }

    #[test]
    fn test_reopen_keeps_data() -> Fallible<()> {
        let directory = tempdir()?;
        let path = directory.path().join("test.db");
        let path = path.to_str().unwrap();
        {
            let mut db = Database::new(path)?;
            db.add_card(&Card::new("perro", "dog", day(0)))?;
        }
        let db = Database::new(path)?;
        assert_eq!(db.cards()?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_add_card_twice() -> Fallible<()> {
        let (_directory, mut db) = open()?;
        let card = Card::new("perro", "dog", day(0));
        let hash = db.add_card(&card)?;
        assert_eq!(hash, card.hash());
        assert!(db.add_card(&card).is_err());
        assert_eq!(db.card_hashes()?, HashSet::from([hash]));
        Ok(())
    }

    #[test]
    fn test_reviews_round_trip() -> Fallible<()> {
        let (_directory, mut db) = open()?;
        let hash = db.add_card(&Card::new("gato", "cat", day(0)))?;
        db.add_card(&Card::new("casa", "house", day(1)))?;
        db.add_review(
            hash,
            CardReview {
                timestamp: day(2),
                grade: Grade::Hard,
            },
        )?;
        db.add_review(
            hash,
            CardReview {
                timestamp: day(3),
                grade: Grade::Easy,
            },
        )?;
        let cards = db.cards()?;
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].text, "gato");
        assert_eq!(cards[0].reviews.len(), 2);
        assert_eq!(cards[0].reviews[0].grade, Grade::Hard);
        assert_eq!(cards[0].reviews[1].timestamp, day(3));
        assert!(cards[1].reviews.is_empty());
        assert_eq!(db.review_count()?, 2);
        Ok(())
    }

    #[test]
    fn test_review_unknown_card() -> Fallible<()> {
        let (_directory, mut db) = open()?;
        let review = CardReview {
            timestamp: day(0),
            grade: Grade::Easy,
        };
        assert!(db.add_review(CardHash::of("no", "such"), review).is_err());
        Ok(())
    }

    fn update(language: &str, delta: f64) -> ProficiencyUpdate {
        ProficiencyUpdate {
            unit: "p1".to_string(),
            language: language.to_string(),
            delta,
        }
    }

    #[test]
    fn test_apply_log() -> Fallible<()> {
        let (_directory, mut db) = open()?;
        let bounds = ProficiencyConfig {
            initial: 1.0,
            min: 0.0,
            max: 1.05,
        };
        assert!(db.proficiencies()?.is_empty());
        let scores = db.apply_log("a", &[update("es", 0.02)], &bounds, day(0))?;
        assert!((scores[0].1 - 1.02).abs() < 1e-12);
        let updates = [update("es", 0.05), update("fr", -2.0)];
        let scores = db.apply_log("b", &updates, &bounds, day(1))?;
        assert_eq!(
            scores,
            vec![("es".to_string(), 1.05), ("fr".to_string(), 0.0)]
        );
        assert_eq!(db.proficiencies()?, scores);
        Ok(())
    }

    #[test]
    fn test_apply_log_twice() -> Fallible<()> {
        let (_directory, mut db) = open()?;
        let bounds = ProficiencyConfig::default();
        db.apply_log("a", &[update("es", 0.5)], &bounds, day(0))?;
        let err = db
            .apply_log("a", &[update("es", 0.5)], &bounds, day(1))
            .err()
            .unwrap();
        assert_eq!(err.message(), "log already ingested.");
        assert_eq!(db.proficiencies()?, vec![("es".to_string(), 0.5)]);
        Ok(())
    }

    #[test]
    fn test_apply_non_finite_delta() -> Fallible<()> {
        let (_directory, mut db) = open()?;
        let bounds = ProficiencyConfig::default();
        let updates = [update("es", 0.5), update("fr", f64::NAN)];
        assert!(db.apply_log("a", &updates, &bounds, day(0)).is_err());
        assert!(db.proficiencies()?.is_empty());
        // Nothing was recorded, so the log can still be ingested once fixed.
        db.apply_log("a", &[update("es", 0.5)], &bounds, day(0))?;
        Ok(())
    }
}
