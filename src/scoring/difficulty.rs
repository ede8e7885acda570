use crate::models::WordRank;

/// Neutral score used whenever a signal cannot be computed.
pub const NEUTRAL_SCORE: f64 = 5.0;

const VOCABULARY_WEIGHT: f64 = 0.7;
const READABILITY_WEIGHT: f64 = 0.3;

/// Everything the difficulty pass derives from an article's text, persisted
/// alongside the score itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStats {
    pub difficulty_score: f64,
    pub unique_word_count: i64,
    pub avg_word_frequency: Option<f64>,
    pub avg_sentence_length: Option<f64>,
}

/// Map an average frequency rank to a 0-10 vocabulary difficulty.
/// Piecewise linear and monotonic non-decreasing over the whole range.
pub fn rank_to_difficulty(rank: f64) -> f64 {
    let score = if rank <= 1000.0 {
        rank / 500.0
    } else if rank <= 2000.0 {
        2.0 + (rank - 1000.0) / 500.0
    } else if rank <= 3500.0 {
        4.0 + (rank - 2000.0) / 500.0
    } else if rank <= 5000.0 {
        7.0 + (rank - 3500.0) / 500.0
    } else {
        10.0
    };
    score.clamp(0.0, 10.0)
}

/// Bucket average words-per-sentence into a 0-10 readability difficulty.
pub fn sentence_length_to_difficulty(avg_words_per_sentence: f64) -> f64 {
    if avg_words_per_sentence < 10.0 {
        0.0
    } else if avg_words_per_sentence < 15.0 {
        3.0
    } else if avg_words_per_sentence < 20.0 {
        5.0
    } else if avg_words_per_sentence < 25.0 {
        7.0
    } else {
        10.0
    }
}

fn combine(vocabulary: f64, readability: f64) -> f64 {
    VOCABULARY_WEIGHT * vocabulary + READABILITY_WEIGHT * readability
}

fn vocabulary_component(ranks: &[i64]) -> (f64, Option<f64>) {
    if ranks.is_empty() {
        return (NEUTRAL_SCORE, None);
    }
    let avg = ranks.iter().sum::<i64>() as f64 / ranks.len() as f64;
    (rank_to_difficulty(avg), Some(avg))
}

fn readability_component(sentence_lengths: &[i64]) -> (f64, Option<f64>) {
    if sentence_lengths.is_empty() {
        return (NEUTRAL_SCORE, None);
    }
    let avg = sentence_lengths.iter().sum::<i64>() as f64 / sentence_lengths.len() as f64;
    (sentence_length_to_difficulty(avg), Some(avg))
}

/// Score a catalogued article from its word set and sentence lengths.
/// Missing frequency data degrades to the neutral component, never an error.
pub fn analyze_article(word_ranks: &[WordRank], sentence_lengths: &[i64]) -> TextStats {
    let ranked: Vec<i64> = word_ranks.iter().filter_map(|w| w.frequency_rank).collect();
    let (vocabulary, avg_word_frequency) = vocabulary_component(&ranked);
    let (readability, avg_sentence_length) = readability_component(sentence_lengths);

    TextStats {
        difficulty_score: combine(vocabulary, readability),
        unique_word_count: word_ranks.len() as i64,
        avg_word_frequency,
        avg_sentence_length,
    }
}

/// Score short title+summary text from pre-resolved frequency ranks and the
/// raw text itself (for sentence shape).
pub fn estimate_from_text(text: &str, resolved_ranks: &[i64]) -> f64 {
    let (vocabulary, _) = vocabulary_component(resolved_ranks);
    let lengths = sentence_lengths(text);
    let (readability, _) = readability_component(&lengths);
    combine(vocabulary, readability)
}

/// Lowercased word tokens with non-alphabetic edges trimmed, duplicates
/// removed, original order kept.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    text.split_whitespace()
        .map(|raw| {
            raw.trim_matches(|c: char| !c.is_alphabetic())
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Word count of each sentence, splitting on terminal punctuation.
pub fn sentence_lengths(text: &str) -> Vec<i64> {
    text.split(['.', '!', '?'])
        .map(|s| s.split_whitespace().count() as i64)
        .filter(|&n| n > 0)
        .collect()
}

/// Flatten summary HTML (feeds often ship markup) into scoreable text.
pub fn plain_text(input: &str) -> String {
    match html2text::from_read(input.as_bytes(), 80) {
        Ok(text) => text,
        Err(_) => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(id: i64, rank: Option<i64>) -> WordRank {
        WordRank {
            word_id: id,
            frequency_rank: rank,
        }
    }

    #[test]
    fn rank_mapping_is_monotonic_and_bounded() {
        let mut prev = 0.0;
        for rank in (0..12_000).step_by(50) {
            let score = rank_to_difficulty(rank as f64);
            assert!(score >= prev, "not monotonic at rank {}", rank);
            assert!((0.0..=10.0).contains(&score));
            prev = score;
        }
    }

    #[test]
    fn rank_mapping_boundaries() {
        assert_eq!(rank_to_difficulty(500.0), 1.0);
        assert_eq!(rank_to_difficulty(1000.0), 2.0);
        assert_eq!(rank_to_difficulty(2000.0), 4.0);
        assert_eq!(rank_to_difficulty(3500.0), 7.0);
        assert_eq!(rank_to_difficulty(5000.0), 10.0);
        assert_eq!(rank_to_difficulty(99_999.0), 10.0);
    }

    #[test]
    fn zero_words_scores_exactly_neutral() {
        let stats = analyze_article(&[], &[]);
        assert_eq!(stats.difficulty_score, 5.0);
        assert_eq!(stats.unique_word_count, 0);
        assert_eq!(stats.avg_word_frequency, None);
        assert_eq!(stats.avg_sentence_length, None);
    }

    #[test]
    fn unranked_words_degrade_to_neutral_vocabulary() {
        // All words resolve but none carry a rank: vocabulary 5.0, short
        // sentences pull readability to 0.
        let words = vec![word(1, None), word(2, None)];
        let stats = analyze_article(&words, &[4, 5]);
        assert_eq!(stats.difficulty_score, 0.7 * 5.0);
        assert_eq!(stats.unique_word_count, 2);
        assert_eq!(stats.avg_word_frequency, None);
    }

    #[test]
    fn combines_vocabulary_and_readability() {
        // avg rank 1500 -> 3.0 vocabulary; avg 22 words/sentence -> 7.0
        let words = vec![word(1, Some(1000)), word(2, Some(2000))];
        let stats = analyze_article(&words, &[22]);
        let expected = 0.7 * 3.0 + 0.3 * 7.0;
        assert!((stats.difficulty_score - expected).abs() < 1e-9);
        assert_eq!(stats.avg_word_frequency, Some(1500.0));
        assert_eq!(stats.avg_sentence_length, Some(22.0));
    }

    #[test]
    fn readability_buckets() {
        assert_eq!(sentence_length_to_difficulty(9.9), 0.0);
        assert_eq!(sentence_length_to_difficulty(10.0), 3.0);
        assert_eq!(sentence_length_to_difficulty(14.9), 3.0);
        assert_eq!(sentence_length_to_difficulty(19.0), 5.0);
        assert_eq!(sentence_length_to_difficulty(24.0), 7.0);
        assert_eq!(sentence_length_to_difficulty(25.0), 10.0);
    }

    #[test]
    fn tokenize_strips_punctuation_and_dedupes() {
        let tokens = tokenize("La ciencia, la ciencia avanza. ¡Rápido!");
        assert_eq!(tokens, vec!["la", "ciencia", "avanza", "rápido"]);
    }

    #[test]
    fn sentence_lengths_ignore_empty_segments() {
        assert_eq!(sentence_lengths("Uno dos tres. Cuatro cinco?  "), vec![3, 2]);
        assert!(sentence_lengths("").is_empty());
    }

    #[test]
    fn estimate_from_text_with_no_resolved_ranks() {
        // Neutral vocabulary, one 4-word sentence -> readability 0.
        let score = estimate_from_text("Cuatro palabras muy cortas.", &[]);
        assert!((score - 0.7 * 5.0).abs() < 1e-9);
    }
}
