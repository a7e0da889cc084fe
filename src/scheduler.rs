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

//! SM-2 review scheduling.
//!
//! Nothing here is persisted: the scheduling state of a card is replayed
//! from its full review log every time it is needed.

use crate::types::card::Card;
use crate::types::grade::Quality;
use crate::types::timestamp::Timestamp;

/// The easiness factor of a card that has never been reviewed.
const INITIAL_EASINESS: f64 = 2.5;

/// The easiness factor never drops below this.
const MIN_EASINESS: f64 = 1.3;

/// Interval after the first success in a streak.
const FIRST_INTERVAL_DAYS: i64 = 1;

/// Interval after the second success in a streak.
const SECOND_INTERVAL_DAYS: i64 = 6;

/// Scheduling state after replaying a review history.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SchedulerState {
    pub easiness_factor: f64,
    pub consecutive_successes: u32,
    pub last_interval_days: i64,
    pub last_review_at: Timestamp,
}

/// Replay a review history, oldest first regardless of the order given.
/// Returns `None` if there are no reviews.
pub fn replay(history: impl IntoIterator<Item = (Timestamp, Quality)>) -> Option<SchedulerState> {
    let mut history: Vec<(Timestamp, Quality)> = history.into_iter().collect();
    history.sort_by_key(|(timestamp, _)| *timestamp);

    let (first_at, _) = *history.first()?;
    let mut state = SchedulerState {
        easiness_factor: INITIAL_EASINESS,
        consecutive_successes: 0,
        last_interval_days: 0,
        last_review_at: first_at,
    };
    for (timestamp, quality) in history {
        step(&mut state, timestamp, quality);
    }
    Some(state)
}

fn step(state: &mut SchedulerState, timestamp: Timestamp, quality: Quality) {
    state.easiness_factor = next_easiness(state.easiness_factor, quality);
    if quality.is_success() {
        state.consecutive_successes += 1;
        state.last_interval_days = match state.consecutive_successes {
            1 => FIRST_INTERVAL_DAYS,
            2 => SECOND_INTERVAL_DAYS,
            // Float to int casts saturate, so a runaway streak caps out.
            _ => (state.last_interval_days as f64 * state.easiness_factor).ceil() as i64,
        };
    } else {
        state.consecutive_successes = 0;
        state.last_interval_days = 0;
    }
    state.last_review_at = timestamp;
}

fn next_easiness(easiness: f64, quality: Quality) -> f64 {
    let miss = f64::from(Quality::MAX - quality.value());
    (easiness + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASINESS)
}

/// Days from the last review until the card is due again.
pub fn next_interval_days(state: &SchedulerState) -> i64 {
    if state.consecutive_successes == 0 {
        FIRST_INTERVAL_DAYS
    } else {
        state.last_interval_days
    }
}

/// When the card next becomes due. A card that has never been reviewed is
/// due from the moment it was created.
pub fn compute_next_due_timestamp(card: &Card) -> Timestamp {
    let history = card
        .reviews
        .iter()
        .map(|review| (review.timestamp, review.grade.quality()));
    match replay(history) {
        Some(state) => state.last_review_at.plus_days(next_interval_days(&state)),
        None => card.created_at,
    }
}

/// The cards due at `now`, most overdue first.
pub fn select_due_cards(cards: &[Card], now: Timestamp) -> Vec<&Card> {
    let mut due: Vec<(Timestamp, &Card)> = cards
        .iter()
        .map(|card| (compute_next_due_timestamp(card), card))
        .filter(|(due_at, _)| *due_at <= now)
        .collect();
    due.sort_by_key(|(due_at, _)| *due_at);
    log::debug!("{} of {} cards due at {now}.", due.len(), cards.len());
    due.into_iter().map(|(_, card)| card).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Fallible;
    use crate::types::card::CardReview;
    use crate::types::grade::Grade;
    use crate::types::timestamp::DAY_MS;

    fn day(n: i64) -> Timestamp {
        Timestamp::from_millis(n * DAY_MS).unwrap()
    }

    fn card(text: &str, created_at: i64, reviews: &[(i64, Grade)]) -> Card {
        let mut card = Card::new(text, "translation", day(created_at));
        card.reviews = reviews
            .iter()
            .map(|(d, grade)| CardReview {
                timestamp: day(*d),
                grade: *grade,
            })
            .collect();
        card
    }

    #[test]
    fn test_unreviewed_card_is_due_at_creation() {
        let card = card("hola", 3, &[]);
        assert_eq!(compute_next_due_timestamp(&card), day(3));
    }

    #[test]
    fn test_replay_empty_history() {
        assert_eq!(replay(Vec::<(Timestamp, Quality)>::new()), None);
    }

    #[test]
    fn test_failure_resets_streak() -> Fallible<()> {
        let history = vec![
            (day(0), Quality::try_from(5u8)?),
            (day(1), Quality::try_from(5u8)?),
            (day(7), Quality::try_from(5u8)?),
            (day(30), Quality::try_from(2u8)?),
        ];
        let state = replay(history).unwrap();
        assert_eq!(state.consecutive_successes, 0);
        assert_eq!(state.last_interval_days, 0);
        assert_eq!(next_interval_days(&state), 1);
        Ok(())
    }

    #[test]
    fn test_success_after_failure_restarts_at_one_day() -> Fallible<()> {
        let history = vec![
            (day(0), Quality::try_from(5u8)?),
            (day(1), Quality::try_from(5u8)?),
            (day(7), Quality::try_from(0u8)?),
            (day(8), Quality::try_from(4u8)?),
        ];
        let state = replay(history).unwrap();
        assert_eq!(state.consecutive_successes, 1);
        assert_eq!(next_interval_days(&state), 1);
        Ok(())
    }

    #[test]
    fn test_fail_grade_resets_card() {
        let card = card("gato", 0, &[(0, Grade::Easy), (1, Grade::Easy), (7, Grade::Fail)]);
        assert_eq!(compute_next_due_timestamp(&card), day(8));
    }

    #[test]
    fn test_interval_growth() {
        let card = card("casa", 0, &[(0, Grade::Easy), (1, Grade::Easy), (7, Grade::Easy)]);
        let history = card
            .reviews
            .iter()
            .map(|review| (review.timestamp, review.grade.quality()));
        let state = replay(history).unwrap();
        // 2.5 + 0.1 per perfect review.
        assert!((state.easiness_factor - 2.8).abs() < 1e-9);
        // ceil(6 * 2.8) = ceil(16.8)
        assert_eq!(state.last_interval_days, 17);
        assert_eq!(compute_next_due_timestamp(&card), day(24));
    }

    #[test]
    fn test_first_two_intervals() {
        let once = card("uno", 0, &[(0, Grade::Easy)]);
        assert_eq!(compute_next_due_timestamp(&once), day(1));
        let twice = card("dos", 0, &[(0, Grade::Easy), (1, Grade::Easy)]);
        assert_eq!(compute_next_due_timestamp(&twice), day(7));
    }

    #[test]
    fn test_hard_then_easy() {
        let card = card("mesa", 0, &[(1, Grade::Hard), (8, Grade::Easy)]);
        let history = card
            .reviews
            .iter()
            .map(|review| (review.timestamp, review.grade.quality()));
        let state = replay(history).unwrap();
        // 2.5 - 0.14 after the hard review, + 0.1 after the easy one.
        assert!((state.easiness_factor - 2.46).abs() < 1e-9);
        assert_eq!(state.consecutive_successes, 2);
        assert_eq!(compute_next_due_timestamp(&card), day(14));
    }

    #[test]
    fn test_reviews_are_replayed_in_timestamp_order() {
        let sorted = card("libro", 0, &[(1, Grade::Hard), (8, Grade::Easy)]);
        let shuffled = card("libro", 0, &[(8, Grade::Easy), (1, Grade::Hard)]);
        assert_eq!(
            compute_next_due_timestamp(&sorted),
            compute_next_due_timestamp(&shuffled)
        );
    }

    #[test]
    fn test_easiness_floor() -> Fallible<()> {
        let quality = Quality::try_from(0u8)?;
        let history: Vec<(Timestamp, Quality)> = (0..20).map(|d| (day(d), quality)).collect();
        let state = replay(history).unwrap();
        assert!((state.easiness_factor - MIN_EASINESS).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_long_streak_does_not_overflow() {
        let reviews: Vec<(i64, Grade)> = (0..200).map(|d| (d, Grade::Easy)).collect();
        let card = card("siempre", 0, &reviews);
        assert!(compute_next_due_timestamp(&card) > day(199));
    }

    #[test]
    fn test_select_due_cards_filters_and_orders() {
        // Due at day 8, day 5 and day 11 respectively.
        let a = card("a", 0, &[(7, Grade::Easy)]);
        let b = card("b", 5, &[]);
        let c = card("c", 0, &[(4, Grade::Easy), (5, Grade::Easy)]);
        let cards = vec![a, b, c];
        let due = select_due_cards(&cards, day(10));
        let texts: Vec<&str> = due.iter().map(|card| card.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "a"]);
    }

    #[test]
    fn test_select_due_cards_is_inclusive() {
        let cards = vec![card("now", 10, &[])];
        assert_eq!(select_due_cards(&cards, day(10)).len(), 1);
        assert!(select_due_cards(&cards, day(9)).is_empty());
    }

    #[test]
    fn test_select_due_cards_is_pure() {
        let cards = vec![
            card("x", 0, &[(3, Grade::Medium), (1, Grade::Hard)]),
            card("y", 2, &[]),
        ];
        let before = format!("{cards:?}");
        let first: Vec<String> = select_due_cards(&cards, day(30))
            .iter()
            .map(|card| card.text.clone())
            .collect();
        let second: Vec<String> = select_due_cards(&cards, day(30))
            .iter()
            .map(|card| card.text.clone())
            .collect();
        assert_eq!(first, second);
        assert_eq!(before, format!("{cards:?}"));
    }
}
