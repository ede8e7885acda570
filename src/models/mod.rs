use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A vocabulary entry from the language-wide frequency table.
/// Immutable as far as the engine is concerned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub id: i64,
    pub normalized_form: String,
    pub language: String,
    /// Position in the frequency table; smaller = more common. Absent for
    /// words never seen in the frequency corpus.
    pub frequency_rank: Option<i64>,
    pub part_of_speech: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleTopic {
    pub article_id: i64,
    pub topic: String,
    pub confidence: f64,
    pub language: String,
}

/// An article the user (or importer) has brought into the catalog, with
/// full body text split into sentences and word occurrences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogArticle {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub source: Option<String>,
    pub language: String,
    pub difficulty_score: Option<f64>,
    pub unique_word_count: Option<i64>,
    pub avg_word_frequency: Option<f64>,
    pub avg_sentence_length: Option<f64>,
    pub inserted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoveredStatus {
    #[default]
    New,
    Imported,
    Skipped,
}

impl DiscoveredStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveredStatus::New => "new",
            DiscoveredStatus::Imported => "imported",
            DiscoveredStatus::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "imported" => DiscoveredStatus::Imported,
            "skipped" => DiscoveredStatus::Skipped,
            _ => DiscoveredStatus::New,
        }
    }
}

/// A crawled candidate article not yet imported into the catalog.
/// May lack a title and full body text; difficulty_score is a cheap
/// pre-import estimate from title + summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredArticle {
    pub id: i64,
    pub source_site_id: i64,
    /// Name of the source site, preloaded from the join.
    pub source_name: Option<String>,
    pub url: String,
    pub title: String,
    pub summary: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub discovered_at: DateTime<Utc>,
    #[serde(skip)]
    pub status: DiscoveredStatus,
    pub difficulty_score: Option<f64>,
    /// Set once the article is imported; the linked catalog row then
    /// supersedes this one for all scoring.
    pub catalog_article_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationStatus {
    Imported,
    Archived,
    Finished,
}

impl AssociationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssociationStatus::Imported => "imported",
            AssociationStatus::Archived => "archived",
            AssociationStatus::Finished => "finished",
        }
    }
}

/// A word's frequency rank as seen by the difficulty and novelty signals.
#[derive(Debug, Clone, Copy)]
pub struct WordRank {
    pub word_id: i64,
    pub frequency_rank: Option<i64>,
}

/// One entry of the final ranked result list handed to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Option<i64>,
    pub title: String,
    pub url: String,
    pub source: String,
    pub language: String,
    pub difficulty_score: Option<f64>,
    pub avg_sentence_length: Option<f64>,
    pub is_discovered: bool,
    pub discovered_article_id: Option<i64>,
    pub score: f64,
}

/// The candidate pool mixes two shapes; resolve the shape once here so the
/// scorers downstream never branch on it.
#[derive(Debug, Clone)]
pub enum Candidate {
    Catalogued(CatalogArticle),
    Discovered(DiscoveredArticle),
}

/// Flat projection of a candidate, built once at aggregation entry.
#[derive(Debug, Clone)]
pub struct CandidateView {
    pub id: Option<i64>,
    pub discovered_article_id: Option<i64>,
    pub title: String,
    pub url: String,
    pub source: Option<String>,
    pub language: String,
    pub difficulty_score: Option<f64>,
    pub avg_sentence_length: Option<f64>,
    pub published_at: Option<DateTime<Utc>>,
    pub is_discovered: bool,
}

impl Candidate {
    pub fn view(&self, default_language: &str) -> CandidateView {
        match self {
            Candidate::Catalogued(a) => CandidateView {
                id: Some(a.id),
                discovered_article_id: None,
                title: a.title.clone(),
                url: a.url.clone(),
                source: a.source.clone(),
                language: a.language.clone(),
                difficulty_score: a.difficulty_score,
                avg_sentence_length: a.avg_sentence_length,
                published_at: Some(a.inserted_at),
                is_discovered: false,
            },
            Candidate::Discovered(d) => CandidateView {
                id: None,
                discovered_article_id: Some(d.id),
                title: d.title.clone(),
                url: d.url.clone(),
                source: d.source_name.clone(),
                language: default_language.to_string(),
                difficulty_score: d.difficulty_score,
                avg_sentence_length: None,
                published_at: d.published_at.or(Some(d.discovered_at)),
                is_discovered: true,
            },
        }
    }
}
