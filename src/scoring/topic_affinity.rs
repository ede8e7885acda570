use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::ArticleTopic;

const FRESHNESS_WINDOW_DAYS: f64 = 30.0;
const FRESHNESS_MAX_BONUS: f64 = 0.1;

/// Sum of topic confidences weighted by the user's per-topic preference
/// (1.0 when no preference is set), plus a small recency bonus. Unbounded
/// but typically lands in 0-2.
pub fn score_topics(
    topics: &[ArticleTopic],
    weights: &HashMap<String, f64>,
    published_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> f64 {
    let base: f64 = topics
        .iter()
        .map(|t| t.confidence * weights.get(&t.topic).copied().unwrap_or(1.0))
        .sum();

    base + freshness_bonus(published_at, now)
}

/// Linear decay over 30 days, capped at 0.1 for brand-new content.
/// A topicless article can still earn up to this bonus.
fn freshness_bonus(published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(published_at) = published_at else {
        return 0.0;
    };
    let days = (now - published_at).num_seconds() as f64 / 86_400.0;
    (1.0 - days / FRESHNESS_WINDOW_DAYS).clamp(0.0, 1.0) * FRESHNESS_MAX_BONUS
}
