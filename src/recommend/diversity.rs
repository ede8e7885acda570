use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use url::Url;

use super::ScoredCandidate;
use crate::models::CandidateView;

/// Hard ceiling on how many items one source may place per round.
const SOURCE_CAP: usize = 3;

/// Identity a candidate is grouped under: explicit source, else URL host,
/// else a shared "unknown" bucket.
pub fn source_key(view: &CandidateView) -> String {
    if let Some(source) = &view.source {
        if !source.is_empty() {
            return source.clone();
        }
    }
    if let Some(host) = Url::parse(&view.url).ok().and_then(|u| u.host_str().map(str::to_string)) {
        return host;
    }
    "unknown".to_string()
}

/// Re-rank a score-sorted pool so no single source monopolizes the page.
pub fn select(ranked: Vec<ScoredCandidate>, limit: usize) -> Vec<ScoredCandidate> {
    select_with(ranked, limit, &mut rand::rng())
}

/// Round-robin across sources in randomized order, taking up to the
/// per-source cap of highest-scoring items per source each round, until the
/// limit is filled or no source has items left. Within a source items are
/// always taken in descending score order; only the cross-source
/// interleaving is randomized.
pub fn select_with<R: Rng + ?Sized>(
    mut ranked: Vec<ScoredCandidate>,
    limit: usize,
    rng: &mut R,
) -> Vec<ScoredCandidate> {
    if ranked.len() <= limit {
        return ranked;
    }

    // Per-source index queues; indexes stay in descending-score order
    // because the input is already sorted.
    let mut queues: HashMap<String, Vec<usize>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for (idx, candidate) in ranked.iter().enumerate() {
        let key = source_key(&candidate.view);
        let queue = queues.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        queue.push(idx);
    }

    if order.len() <= 1 {
        ranked.truncate(limit);
        return ranked;
    }

    let max_per_source = limit.div_ceil(order.len()).clamp(1, SOURCE_CAP);
    order.shuffle(rng);

    let mut cursors: HashMap<&str, usize> = HashMap::new();
    let mut picked: Vec<usize> = Vec::with_capacity(limit);

    'rounds: loop {
        let mut progressed = false;
        for key in &order {
            let queue = &queues[key.as_str()];
            let cursor = cursors.entry(key).or_insert(0);
            let mut taken = 0;
            while taken < max_per_source && *cursor < queue.len() {
                picked.push(queue[*cursor]);
                *cursor += 1;
                taken += 1;
                progressed = true;
                if picked.len() == limit {
                    break 'rounds;
                }
            }
        }
        if !progressed {
            break;
        }
    }

    let mut slots: Vec<Option<ScoredCandidate>> = ranked.into_iter().map(Some).collect();
    picked.into_iter().filter_map(|idx| slots[idx].take()).collect()
}
