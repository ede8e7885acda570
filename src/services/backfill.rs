use crate::db::Repository;
use crate::error::Result;
use crate::models::DiscoveredArticle;
use crate::scoring::difficulty;

/// Outcome of one sweep. A failed item is logged and counted, never fatal.
#[derive(Debug, Default, Clone, Copy)]
pub struct BackfillReport {
    pub processed: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Recompute and persist difficulty for every catalog article missing one.
/// Each article is handled independently; recomputation is idempotent, so
/// an interrupted sweep leaves nothing inconsistent.
pub async fn backfill_catalog_difficulty(repository: &Repository) -> Result<BackfillReport> {
    let ids = repository.catalog_articles_missing_difficulty().await?;
    let mut report = BackfillReport::default();

    for article_id in ids {
        report.processed += 1;
        match score_catalog_article(repository, article_id).await {
            Ok(()) => report.updated += 1,
            Err(e) => {
                report.failed += 1;
                tracing::warn!("Failed to score catalog article {}: {}", article_id, e);
            }
        }
    }

    Ok(report)
}

async fn score_catalog_article(repository: &Repository, article_id: i64) -> Result<()> {
    let word_ranks = repository.article_word_ranks(article_id).await?;
    let sentence_lengths = repository.article_sentence_lengths(article_id).await?;

    let stats = difficulty::analyze_article(&word_ranks, &sentence_lengths);
    repository
        .save_catalog_difficulty(
            article_id,
            stats.difficulty_score,
            stats.unique_word_count,
            stats.avg_word_frequency,
            stats.avg_sentence_length,
        )
        .await
}

/// Estimate and persist difficulty for discovered articles that have none,
/// from the only text available pre-import: title + summary.
pub async fn backfill_discovered_difficulty(
    repository: &Repository,
    language: &str,
) -> Result<BackfillReport> {
    let articles = repository.discovered_missing_difficulty().await?;
    let mut report = BackfillReport::default();

    for article in articles {
        report.processed += 1;
        match estimate_discovered_article(repository, &article, language).await {
            Ok(score) => {
                report.updated += 1;
                tracing::debug!("Estimated difficulty {:.1} for {}", score, article.url);
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!("Failed to estimate {}: {}", article.url, e);
            }
        }
    }

    Ok(report)
}

async fn estimate_discovered_article(
    repository: &Repository,
    article: &DiscoveredArticle,
    language: &str,
) -> Result<f64> {
    let mut text = article.title.clone();
    if let Some(summary) = &article.summary {
        text.push(' ');
        text.push_str(&difficulty::plain_text(summary));
    }

    let tokens = difficulty::tokenize(&text);
    let words = repository.words_by_forms(tokens, language.to_string()).await?;
    let ranks: Vec<i64> = words.iter().filter_map(|w| w.frequency_rank).collect();

    let score = difficulty::estimate_from_text(&text, &ranks);
    repository.save_discovered_difficulty(article.id, score).await?;
    Ok(score)
}
