use std::collections::{HashMap, HashSet};

/// How much new vocabulary an article offers this user, as the mean
/// per-word contribution over the article's distinct words:
/// never seen -> 1.0, lightly seen -> 0.5 (0.2 if already under review),
/// well known (3+ exposures) -> 0.0. An article with no extracted words
/// scores 0.0; the aggregator treats that as "no signal", not an error.
pub fn score_novelty(
    word_ids: &[i64],
    exposure_counts: &HashMap<i64, i64>,
    active_review: &HashSet<i64>,
) -> f64 {
    if word_ids.is_empty() {
        return 0.0;
    }

    let total: f64 = word_ids
        .iter()
        .map(|id| {
            let count = exposure_counts.get(id).copied().unwrap_or(0);
            word_novelty(count, active_review.contains(id))
        })
        .sum();

    total / word_ids.len() as f64
}

fn word_novelty(exposure_count: i64, under_review: bool) -> f64 {
    match exposure_count {
        0 => 1.0,
        1..=2 if under_review => 0.2,
        1..=2 => 0.5,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_words_is_zero_signal() {
        assert_eq!(score_novelty(&[], &HashMap::new(), &HashSet::new()), 0.0);
    }

    #[test]
    fn unseen_words_are_fully_novel() {
        let score = score_novelty(&[1, 2, 3], &HashMap::new(), &HashSet::new());
        assert_eq!(score, 1.0);
    }

    #[test]
    fn review_set_discounts_lightly_seen_words() {
        let exposure = HashMap::from([(1, 2), (2, 2)]);
        let review = HashSet::from([2]);
        // word 1: lightly seen, not reviewed -> 0.5; word 2: under review -> 0.2
        let score = score_novelty(&[1, 2], &exposure, &review);
        assert!((score - 0.35).abs() < 1e-9);
    }

    #[test]
    fn well_known_words_contribute_nothing() {
        let exposure = HashMap::from([(1, 3), (2, 10)]);
        let score = score_novelty(&[1, 2], &exposure, &HashSet::new());
        assert_eq!(score, 0.0);
    }

    #[test]
    fn mixed_exposure_averages() {
        let exposure = HashMap::from([(2, 1), (3, 5)]);
        // 1.0 + 0.5 + 0.0 over three words
        let score = score_novelty(&[1, 2, 3], &exposure, &HashSet::new());
        assert!((score - 0.5).abs() < 1e-9);
    }
}
