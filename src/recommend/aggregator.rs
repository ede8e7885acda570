use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

use super::{diversity, ScoredCandidate};
use crate::cache::TtlCache;
use crate::config::Config;
use crate::db::Repository;
use crate::error::Result;
use crate::models::{
    ArticleTopic, Candidate, CatalogArticle, DiscoveredArticle, Recommendation,
};
use crate::scoring::difficulty::NEUTRAL_SCORE;
use crate::scoring::novelty::score_novelty;
use crate::scoring::topic_affinity::score_topics;
use crate::scoring::user_level::estimate_user_level;
use crate::services::TitleFetcher;

/// Candidates at or below this score are "nothing useful to recommend".
const MIN_SCORE: f64 = 0.1;

const TOPIC_WEIGHT: f64 = 0.7;
const VOCABULARY_WEIGHT: f64 = 0.3;

/// Per-user signals fetched once per request and shared across candidates.
struct UserSignals {
    level: f64,
    topic_weights: HashMap<String, f64>,
    exposure_counts: HashMap<i64, i64>,
    active_review: HashSet<i64>,
}

/// Builds the candidate pool, scores every candidate with graceful signal
/// fallback, and hands the ranked list to the diversity selector.
pub struct Recommender {
    pub repository: Repository,
    title_fetcher: TitleFetcher,
    cache: TtlCache<(i64, usize), Vec<Recommendation>>,
    language: String,
    pool_multiplier: usize,
    max_concurrent_fetches: usize,
    cache_ttl: Duration,
}

impl Recommender {
    pub fn new(repository: Repository, config: &Config) -> Self {
        Self {
            repository,
            title_fetcher: TitleFetcher::new(config.fetch_timeout_secs),
            cache: TtlCache::new(),
            language: config.language.clone(),
            pool_multiplier: config.pool_multiplier,
            max_concurrent_fetches: config.max_concurrent_fetches,
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
        }
    }

    /// Top `limit` recommendations for a user, ranked and source-diversified.
    /// An empty list is a valid answer, not an error.
    pub async fn recommend(&self, user_id: i64, limit: usize) -> Result<Vec<Recommendation>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        if let Some(cached) = self.cache.get(&(user_id, limit)).await {
            return Ok(cached);
        }

        let signals = self.load_user_signals(user_id).await?;
        let pool = self.build_pool(user_id, limit).await?;

        let catalog_ids: Vec<i64> = pool
            .iter()
            .filter_map(|c| match c {
                Candidate::Catalogued(a) => Some(a.id),
                Candidate::Discovered(_) => None,
            })
            .collect();
        let topics = self.repository.topics_for_articles(catalog_ids).await?;

        let now = Utc::now();
        let mut scored = Vec::with_capacity(pool.len());
        for candidate in pool {
            let view = candidate.view(&self.language);
            let score = match self.score_candidate(&candidate, &topics, &signals, now).await {
                Ok(score) => score,
                Err(e) => {
                    // One broken candidate degrades itself, never the batch.
                    tracing::warn!("Failed to score candidate {}: {}", view.url, e);
                    0.0
                }
            };
            scored.push(ScoredCandidate { view, score });
        }

        scored.retain(|c| c.score > MIN_SCORE);
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        self.backfill_titles(&mut scored).await;

        let selected = diversity::select(scored, limit);
        let recommendations: Vec<Recommendation> =
            selected.into_iter().map(to_recommendation).collect();

        self.cache
            .put((user_id, limit), recommendations.clone(), self.cache_ttl)
            .await;

        Ok(recommendations)
    }

    pub async fn invalidate_cached(&self, user_id: i64, limit: usize) {
        self.cache.invalidate(&(user_id, limit)).await;
    }

    async fn load_user_signals(&self, user_id: i64) -> Result<UserSignals> {
        let review_ranks = self.repository.user_review_ranks(user_id).await?;
        let level = estimate_user_level(&review_ranks);

        Ok(UserSignals {
            level: level.numeric,
            topic_weights: self.repository.topic_weights_for_user(user_id).await?,
            exposure_counts: self.repository.user_word_exposure(user_id).await?,
            active_review: self.repository.active_review_word_ids(user_id).await?,
        })
    }

    /// Eligible candidates from both arms, deduplicated by identity
    /// (catalog id, else url). A discovered row backed by a catalog article
    /// is promoted to the catalog shape so it is scored on full signals.
    async fn build_pool(&self, user_id: i64, limit: usize) -> Result<Vec<Candidate>> {
        let per_arm = limit.saturating_mul(self.pool_multiplier);

        let catalog = self
            .repository
            .catalog_articles_unseen_by(user_id, per_arm)
            .await?;
        let discovered = self
            .repository
            .discovered_eligible_for(user_id, per_arm)
            .await?;

        let mut seen_ids: HashSet<i64> = catalog.iter().map(|a| a.id).collect();
        let mut seen_urls: HashSet<String> = catalog.iter().map(|a| a.url.clone()).collect();
        let mut pool: Vec<Candidate> = catalog.into_iter().map(Candidate::Catalogued).collect();

        for article in discovered {
            if let Some(catalog_id) = article.catalog_article_id {
                if seen_ids.contains(&catalog_id) {
                    continue;
                }
                if let Some(backing) = self.repository.catalog_article(catalog_id).await? {
                    if seen_urls.contains(&backing.url) {
                        continue;
                    }
                    seen_ids.insert(backing.id);
                    seen_urls.insert(backing.url.clone());
                    pool.push(Candidate::Catalogued(backing));
                    continue;
                }
            }
            if seen_urls.insert(article.url.clone()) {
                pool.push(Candidate::Discovered(article));
            }
        }

        Ok(pool)
    }

    async fn score_candidate(
        &self,
        candidate: &Candidate,
        topics: &HashMap<i64, Vec<ArticleTopic>>,
        signals: &UserSignals,
        now: DateTime<Utc>,
    ) -> Result<f64> {
        match candidate {
            Candidate::Catalogued(article) => {
                self.score_article_for_user(article, topics, signals, now).await
            }
            Candidate::Discovered(article) => {
                Ok(score_discovered_article_match(article, signals.level))
            }
        }
    }

    /// Catalogued candidates blend topic affinity with vocabulary novelty.
    /// When no words were extracted the novelty signal cannot exist and
    /// topic affinity carries the whole score.
    async fn score_article_for_user(
        &self,
        article: &CatalogArticle,
        topics: &HashMap<i64, Vec<ArticleTopic>>,
        signals: &UserSignals,
        now: DateTime<Utc>,
    ) -> Result<f64> {
        static NO_TOPICS: Vec<ArticleTopic> = Vec::new();
        let article_topics = topics.get(&article.id).unwrap_or(&NO_TOPICS);

        let topic_score = score_topics(
            article_topics,
            &signals.topic_weights,
            Some(article.inserted_at),
            now,
        );

        let word_ranks = self.repository.article_word_ranks(article.id).await?;
        if word_ranks.is_empty() {
            return Ok(topic_score);
        }

        let word_ids: Vec<i64> = word_ranks.iter().map(|w| w.word_id).collect();
        let novelty = score_novelty(&word_ids, &signals.exposure_counts, &signals.active_review);

        Ok(TOPIC_WEIGHT * topic_score + VOCABULARY_WEIGHT * novelty)
    }

    /// Resolve missing titles for discovered candidates, at most
    /// `max_concurrent_fetches` in flight, each bounded by its own timeout.
    /// Any failure degrades to the raw URL; aggregation always completes.
    async fn backfill_titles(&self, scored: &mut [ScoredCandidate]) {
        let missing: Vec<(usize, String)> = scored
            .iter()
            .enumerate()
            .filter(|(_, c)| c.view.is_discovered && c.view.title.trim().is_empty())
            .map(|(idx, c)| (idx, c.view.url.clone()))
            .collect();

        if missing.is_empty() {
            return;
        }

        let fetcher = &self.title_fetcher;
        let resolved: Vec<(usize, String)> = stream::iter(missing)
            .map(|(idx, url)| async move {
                match fetcher.fetch_title(&url).await {
                    Ok(title) => (idx, title),
                    Err(e) => {
                        tracing::warn!("Title fetch failed for {}: {}", url, e);
                        (idx, url)
                    }
                }
            })
            .buffer_unordered(self.max_concurrent_fetches)
            .collect()
            .await;

        for (idx, title) in resolved {
            scored[idx].view.title = title;
        }
    }
}

/// Score a discovered-only candidate from the match between its estimated
/// difficulty and the user's numeric level. Four weighted terms; an article
/// whose difficulty was never estimated gets neutral treatment rather than
/// a penalty.
pub fn score_discovered_article_match(article: &DiscoveredArticle, user_level: f64) -> f64 {
    let estimated = article.difficulty_score.is_some();
    let difficulty = article.difficulty_score.unwrap_or(NEUTRAL_SCORE);

    let gap = (difficulty - user_level).abs();
    let level_match = if gap <= 0.5 {
        1.0
    } else if gap <= 1.0 {
        0.8
    } else if gap <= 2.0 {
        0.5
    } else if gap <= 3.0 {
        0.2
    } else {
        0.0
    };

    let diff = difficulty - user_level;
    let novelty_proxy = if !estimated {
        0.5
    } else if diff > 2.5 {
        0.3
    } else if diff > 1.5 {
        0.7
    } else if diff > 0.0 {
        1.0
    } else if diff < 0.0 {
        0.5
    } else {
        0.8
    };

    // TODO: replace the placeholder once discovered articles get topic
    // tags before import.
    let topic_term = 0.5;

    let challenge_bonus = if diff > 2.0 {
        0.3
    } else if diff > 1.0 {
        0.7
    } else if diff > 0.0 {
        1.0
    } else {
        0.5
    };

    0.4 * level_match + 0.3 * novelty_proxy + 0.2 * topic_term + 0.1 * challenge_bonus
}

fn to_recommendation(candidate: ScoredCandidate) -> Recommendation {
    let source = diversity::source_key(&candidate.view);
    let view = candidate.view;
    let title = if view.title.trim().is_empty() {
        view.url.clone()
    } else {
        view.title
    };

    Recommendation {
        id: view.id,
        title,
        url: view.url,
        source,
        language: view.language,
        difficulty_score: view.difficulty_score,
        avg_sentence_length: view.avg_sentence_length,
        is_discovered: view.is_discovered,
        discovered_article_id: view.discovered_article_id,
        score: candidate.score,
    }
}
