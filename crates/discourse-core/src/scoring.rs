//! Canonical windowed scoring rules.
//!
//! Every function here scores the item at `position` against the entries of
//! `history` around it. The engine calls them with the live history, and the
//! [`Scorer`](crate::scorer::Scorer) calls them with hypothetical histories,
//! so both always agree.
//!
//! # Window rules
//!
//! - Windows never cross a pause or the start of history.
//! - Coherence looks at most [`COHERENCE_SPAN`] entries back (and, at final
//!   scoring, [`COHERENCE_SPAN`] entries forward).
//! - Freshness only applies directly after a pause and compares against the
//!   [`FRESHNESS_SPAN`] slots ending with that pause.
//! - Non-monotonousness compares against exactly the previous
//!   [`MONOTONY_SPAN`] entries.

use std::collections::BTreeMap;

use discourse_types::{Item, ScoreBreakdown, Subject, Turn};

/// Maximum number of entries examined on each side for coherence.
pub const COHERENCE_SPAN: usize = 3;

/// Number of history slots (ending with the pause) examined for freshness.
pub const FRESHNESS_SPAN: usize = 6;

/// Number of preceding entries that must all share a subject to count as a hot streak.
pub const MONOTONY_SPAN: usize = 3;

/// Which side(s) of the coherence window are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoherenceWindow {
    /// Only preceding entries. Used while the conversation is being played.
    PastOnly,
    /// Preceding and following entries. Used for the final, canonical score.
    TwoSided,
}

/// Whether an item with the same id occurs anywhere in `history`.
pub fn is_repeated(item: &Item, history: &[Turn]) -> bool {
    history
        .iter()
        .flatten()
        .any(|earlier| earlier.id == item.id)
}

/// Subject counts over the coherence window around `position`.
///
/// Walks backwards from `position - 1` and (for [`CoherenceWindow::TwoSided`])
/// forwards from `position + 1`, stopping at the first pause or history
/// boundary in each direction.
pub fn context_window(
    history: &[Turn],
    position: usize,
    window: CoherenceWindow,
) -> BTreeMap<Subject, usize> {
    let mut counts = BTreeMap::new();

    let past_start = position.saturating_sub(COHERENCE_SPAN);
    for j in (past_start..position).rev() {
        match history.get(j) {
            Some(Some(entry)) => count_subjects(&mut counts, entry),
            _ => break,
        }
    }

    if window == CoherenceWindow::TwoSided {
        let future_start = position.saturating_add(1);
        let future_end = future_start.saturating_add(COHERENCE_SPAN);
        for j in future_start..future_end {
            match history.get(j) {
                Some(Some(entry)) => count_subjects(&mut counts, entry),
                _ => break,
            }
        }
    }

    counts
}

fn count_subjects(counts: &mut BTreeMap<Subject, usize>, item: &Item) {
    for subject in item.subjects.iter() {
        let entry = counts.entry(subject).or_insert(0);
        *entry = entry.saturating_add(1);
    }
}

/// Coherence of `item` placed at `position`: `-1` if any of its subjects is
/// missing from the window, `+1` if every subject appears at least twice,
/// otherwise `0`.
pub fn coherence(item: &Item, position: usize, history: &[Turn], window: CoherenceWindow) -> f64 {
    let counts = context_window(history, position, window);
    let occurrences = |subject: Subject| counts.get(&subject).copied().unwrap_or(0);

    if item.subjects.iter().any(|s| occurrences(s) == 0) {
        -1.0
    } else if item.subjects.iter().all(|s| occurrences(s) >= 2) {
        1.0
    } else {
        0.0
    }
}

/// Freshness of `item` placed at `position`.
///
/// Zero unless the slot immediately before `position` is a pause. Otherwise
/// the number of the item's subjects that do not occur in the
/// [`FRESHNESS_SPAN`] slots ending with that pause.
pub fn freshness(item: &Item, position: usize, history: &[Turn]) -> f64 {
    let Some(pause_at) = position.checked_sub(1) else {
        return 0.0;
    };
    match history.get(pause_at) {
        Some(None) => {}
        _ => return 0.0,
    }

    let start = position.saturating_sub(FRESHNESS_SPAN);
    let prior = history.get(start..pause_at).unwrap_or_default();
    let novel = item
        .subjects
        .iter()
        .filter(|subject| {
            !prior
                .iter()
                .flatten()
                .any(|earlier| earlier.subjects.contains(*subject))
        })
        .count();
    novel as f64
}

/// Non-monotonousness of `item` placed at `position`.
///
/// `-1` for a repeat, or when each of the previous [`MONOTONY_SPAN`] entries
/// is an item sharing a subject with `item`. Otherwise `0`.
pub fn nonmonotonousness(item: &Item, position: usize, history: &[Turn], repeated: bool) -> f64 {
    if repeated {
        return -1.0;
    }
    let Some(start) = position.checked_sub(MONOTONY_SPAN) else {
        return 0.0;
    };
    let Some(previous) = history.get(start..position) else {
        return 0.0;
    };
    let hot_streak = previous.iter().all(|entry| match entry {
        Some(earlier) => earlier.subjects.intersects(&item.subjects),
        None => false,
    });
    if hot_streak { -1.0 } else { 0.0 }
}

/// Private preference bonus: the mean over the item's subjects of
/// `1 - rank / |preferences|`. Subjects absent from `preferences` are skipped.
pub fn individual_bonus(item: &Item, preferences: &[Subject]) -> f64 {
    if preferences.is_empty() {
        return 0.0;
    }
    let total = preferences.len() as f64;
    let bonuses: Vec<f64> = item
        .subjects
        .iter()
        .filter_map(|subject| preferences.iter().position(|p| *p == subject))
        .map(|rank| 1.0 - rank as f64 / total)
        .collect();
    if bonuses.is_empty() {
        return 0.0;
    }
    bonuses.iter().sum::<f64>() / bonuses.len() as f64
}

/// Shared score components for `item` placed at `position`.
///
/// Repeat detection only considers `history[..position]`, so the same
/// function scores a live candidate (`position == history.len()`) and an
/// entry of a finished history.
pub fn shared_breakdown(
    item: &Item,
    position: usize,
    history: &[Turn],
    window: CoherenceWindow,
) -> ScoreBreakdown {
    let prefix = history.get(..position).unwrap_or(history);
    let repeated = is_repeated(item, prefix);
    let nonmonotonousness = nonmonotonousness(item, position, history, repeated);

    if repeated {
        return ScoreBreakdown {
            importance: 0.0,
            coherence: 0.0,
            freshness: 0.0,
            nonmonotonousness,
        };
    }

    ScoreBreakdown {
        importance: item.importance,
        coherence: coherence(item, position, history, window),
        freshness: freshness(item, position, history),
        nonmonotonousness,
    }
}

/// Score the entry at `position` of a history. `None` for a pause or an
/// out-of-range position.
pub fn score_at(history: &[Turn], position: usize, window: CoherenceWindow) -> Option<ScoreBreakdown> {
    let item = history.get(position).copied().flatten()?;
    Some(shared_breakdown(&item, position, history, window))
}

/// Shared components of the whole history, each entry scored in place.
pub fn score_history(history: &[Turn], window: CoherenceWindow) -> ScoreBreakdown {
    let mut total = ScoreBreakdown::default();
    for position in 0..history.len() {
        if let Some(breakdown) = score_at(history, position, window) {
            total += breakdown;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use discourse_types::{ItemId, PlayerId, Subjects};

    use super::*;

    const EPS: f64 = 1e-12;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    fn item(tag: u8, subjects: Subjects) -> Item {
        Item {
            id: ItemId::from_random_bytes([tag; 16]),
            player_id: PlayerId::from_random_bytes([0; 16]),
            importance: 0.5,
            subjects,
        }
    }

    #[test]
    fn coherence_missing_subject_is_negative() {
        let history = vec![Some(item(1, Subjects::one(1))), Some(item(2, Subjects::one(2)))];
        let candidate = item(3, Subjects::two(1, 9));
        assert!(approx(
            coherence(&candidate, 2, &history, CoherenceWindow::PastOnly),
            -1.0
        ));
    }

    #[test]
    fn coherence_double_support_is_positive() {
        let history = vec![
            Some(item(1, Subjects::one(4))),
            Some(item(2, Subjects::two(4, 5))),
            Some(item(3, Subjects::one(5))),
        ];
        let candidate = item(9, Subjects::two(4, 5));
        assert!(approx(
            coherence(&candidate, 3, &history, CoherenceWindow::PastOnly),
            1.0
        ));
    }

    #[test]
    fn coherence_single_support_is_neutral() {
        let history = vec![Some(item(1, Subjects::one(4)))];
        let candidate = item(9, Subjects::one(4));
        assert!(approx(
            coherence(&candidate, 1, &history, CoherenceWindow::PastOnly),
            0.0
        ));
    }

    #[test]
    fn coherence_window_stops_at_pause() {
        let history = vec![
            Some(item(1, Subjects::one(4))),
            Some(item(2, Subjects::one(4))),
            None,
            Some(item(3, Subjects::one(4))),
        ];
        let candidate = item(9, Subjects::one(4));
        // Only the entry after the pause is visible.
        assert!(approx(
            coherence(&candidate, 4, &history, CoherenceWindow::PastOnly),
            0.0
        ));
    }

    #[test]
    fn coherence_window_is_at_most_three_back() {
        let history = vec![
            Some(item(1, Subjects::one(7))),
            Some(item(2, Subjects::one(1))),
            Some(item(3, Subjects::one(2))),
            Some(item(4, Subjects::one(3))),
        ];
        let candidate = item(9, Subjects::one(7));
        assert!(approx(
            coherence(&candidate, 4, &history, CoherenceWindow::PastOnly),
            -1.0
        ));
    }

    #[test]
    fn two_sided_window_sees_following_entries() {
        let history = vec![
            Some(item(1, Subjects::one(4))),
            Some(item(2, Subjects::one(4))),
            Some(item(3, Subjects::one(4))),
        ];
        let first = item(1, Subjects::one(4));
        assert!(approx(
            coherence(&first, 0, &history, CoherenceWindow::PastOnly),
            -1.0
        ));
        assert!(approx(
            coherence(&first, 0, &history, CoherenceWindow::TwoSided),
            1.0
        ));
    }

    #[test]
    fn freshness_requires_preceding_pause() {
        let history = vec![Some(item(1, Subjects::one(1)))];
        let candidate = item(9, Subjects::two(5, 6));
        assert!(approx(freshness(&candidate, 1, &history), 0.0));
        assert!(approx(freshness(&candidate, 0, &[]), 0.0));
    }

    #[test]
    fn freshness_counts_novel_subjects_after_pause() {
        let history = vec![
            Some(item(1, Subjects::one(1))),
            Some(item(2, Subjects::two(2, 5))),
            None,
        ];
        assert!(approx(freshness(&item(9, Subjects::two(5, 6)), 3, &history), 1.0));
        assert!(approx(freshness(&item(9, Subjects::two(7, 6)), 3, &history), 2.0));
    }

    #[test]
    fn freshness_ignores_slots_beyond_span() {
        let mut history = vec![Some(item(1, Subjects::one(5)))];
        for tag in 2..7 {
            history.push(Some(item(tag, Subjects::one(1))));
        }
        history.push(None);
        // Position 7: span covers slots 1..=6 (pause included), so slot 0 is out of reach.
        assert!(approx(freshness(&item(9, Subjects::one(5)), 7, &history), 1.0));
    }

    #[test]
    fn nonmonotonousness_hot_streak() {
        let history = vec![
            Some(item(1, Subjects::one(3))),
            Some(item(2, Subjects::two(3, 4))),
            Some(item(3, Subjects::one(3))),
        ];
        let candidate = item(9, Subjects::one(3));
        assert!(approx(nonmonotonousness(&candidate, 3, &history, false), -1.0));
        assert!(approx(nonmonotonousness(&candidate, 2, &history, false), 0.0));
    }

    #[test]
    fn nonmonotonousness_broken_by_pause() {
        let history = vec![
            Some(item(1, Subjects::one(3))),
            None,
            Some(item(3, Subjects::one(3))),
        ];
        assert!(approx(
            nonmonotonousness(&item(9, Subjects::one(3)), 3, &history, false),
            0.0
        ));
    }

    #[test]
    fn repeat_zeroes_components() {
        let said = item(1, Subjects::one(3));
        let history = vec![Some(said), None];
        let breakdown = shared_breakdown(&said, 2, &history, CoherenceWindow::PastOnly);
        assert!(approx(breakdown.importance, 0.0));
        assert!(approx(breakdown.coherence, 0.0));
        assert!(approx(breakdown.freshness, 0.0));
        assert!(approx(breakdown.nonmonotonousness, -1.0));
    }

    #[test]
    fn first_occurrence_in_finished_history_is_not_a_repeat() {
        let said = item(1, Subjects::one(3));
        let history = vec![Some(said), Some(said)];
        let first = score_at(&history, 0, CoherenceWindow::TwoSided);
        let second = score_at(&history, 1, CoherenceWindow::TwoSided);
        assert!(first.is_some_and(|b| approx(b.importance, 0.5)));
        assert!(second.is_some_and(|b| approx(b.importance, 0.0)));
        assert!(score_at(&history, 5, CoherenceWindow::TwoSided).is_none());
    }

    #[test]
    fn individual_bonus_averages_ranks() {
        let prefs = vec![2, 0, 1, 3];
        assert!(approx(individual_bonus(&item(1, Subjects::one(2)), &prefs), 1.0));
        // ranks 1 and 3 => (0.75 + 0.25) / 2
        assert!(approx(
            individual_bonus(&item(1, Subjects::two(0, 3)), &prefs),
            0.5
        ));
        assert!(approx(individual_bonus(&item(1, Subjects::one(9)), &prefs), 0.0));
    }
}
