use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{
    ArticleTopic, AssociationStatus, CatalogArticle, DiscoveredArticle, DiscoveredStatus, Word,
    WordRank,
};

use super::schema::SCHEMA;

const CATALOG_COLUMNS: &str = "id, title, url, source, language, difficulty_score, \
     unique_word_count, avg_word_frequency, avg_sentence_length, inserted_at";

const DISCOVERED_COLUMNS: &str = "d.id, d.source_site_id, s.name, d.url, d.title, d.summary, \
     d.published_at, d.discovered_at, d.status, d.difficulty_score, d.catalog_article_id";

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    /// Backing store for embedded callers and tests; no file on disk.
    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Catalog store

    /// Catalogued articles the user has no association with (any status),
    /// newest first, bounded for cost control.
    pub async fn catalog_articles_unseen_by(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<CatalogArticle>> {
        let articles = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {CATALOG_COLUMNS} FROM catalog_articles
                     WHERE id NOT IN (SELECT article_id FROM article_users WHERE user_id = ?1)
                     ORDER BY inserted_at DESC
                     LIMIT ?2"
                ))?;
                let articles = stmt
                    .query_map(params![user_id, limit as i64], |row| {
                        Ok(catalog_article_from_row(row))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    pub async fn catalog_article(&self, id: i64) -> Result<Option<CatalogArticle>> {
        let article = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {CATALOG_COLUMNS} FROM catalog_articles WHERE id = ?1"
                ))?;
                let article = stmt
                    .query_row(params![id], |row| Ok(catalog_article_from_row(row)))
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    pub async fn insert_catalog_article(
        &self,
        title: String,
        url: String,
        source: Option<String>,
        language: String,
    ) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO catalog_articles (title, url, source, language) VALUES (?1, ?2, ?3, ?4)",
                    params![title, url, source, language],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn tag_article(
        &self,
        article_id: i64,
        topic: String,
        confidence: f64,
        language: String,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO article_topics (article_id, topic, confidence, language)
                       VALUES (?1, ?2, ?3, ?4)
                       ON CONFLICT(article_id, topic) DO UPDATE SET
                           confidence = excluded.confidence,
                           language = excluded.language"#,
                    params![article_id, topic, confidence, language],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn article_topics(&self, article_id: i64) -> Result<Vec<ArticleTopic>> {
        let topics = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT article_id, topic, confidence, language FROM article_topics
                     WHERE article_id = ?1 ORDER BY confidence DESC",
                )?;
                let topics = stmt
                    .query_map(params![article_id], |row| Ok(topic_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(topics)
            })
            .await?;
        Ok(topics)
    }

    /// Topics for a batch of articles, grouped by article id; each group is
    /// ordered by confidence descending.
    pub async fn topics_for_articles(
        &self,
        article_ids: Vec<i64>,
    ) -> Result<HashMap<i64, Vec<ArticleTopic>>> {
        if article_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let grouped = self
            .conn
            .call(move |conn| {
                let placeholders = vec!["?"; article_ids.len()].join(", ");
                let mut stmt = conn.prepare(&format!(
                    "SELECT article_id, topic, confidence, language FROM article_topics
                     WHERE article_id IN ({placeholders})
                     ORDER BY article_id, confidence DESC"
                ))?;
                let mut grouped: HashMap<i64, Vec<ArticleTopic>> = HashMap::new();
                let rows = stmt
                    .query_map(params_from_iter(article_ids), |row| Ok(topic_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                for topic in rows {
                    grouped.entry(topic.article_id).or_default().push(topic);
                }
                Ok(grouped)
            })
            .await?;
        Ok(grouped)
    }

    /// Distinct words of an article with their frequency ranks.
    pub async fn article_word_ranks(&self, article_id: i64) -> Result<Vec<WordRank>> {
        let ranks = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT DISTINCT w.id, w.frequency_rank
                     FROM word_occurrences wo
                     JOIN sentences s ON wo.sentence_id = s.id
                     JOIN words w ON w.id = wo.word_id
                     WHERE s.article_id = ?1",
                )?;
                let ranks = stmt
                    .query_map(params![article_id], |row| {
                        Ok(WordRank {
                            word_id: row.get(0)?,
                            frequency_rank: row.get(1)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(ranks)
            })
            .await?;
        Ok(ranks)
    }

    /// Word count of each sentence of an article, for the readability signal.
    pub async fn article_sentence_lengths(&self, article_id: i64) -> Result<Vec<i64>> {
        let lengths = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT COUNT(*) FROM word_occurrences wo
                     JOIN sentences s ON wo.sentence_id = s.id
                     WHERE s.article_id = ?1
                     GROUP BY wo.sentence_id",
                )?;
                let lengths = stmt
                    .query_map(params![article_id], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(lengths)
            })
            .await?;
        Ok(lengths)
    }

    pub async fn save_catalog_difficulty(
        &self,
        article_id: i64,
        difficulty_score: f64,
        unique_word_count: i64,
        avg_word_frequency: Option<f64>,
        avg_sentence_length: Option<f64>,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE catalog_articles SET difficulty_score = ?1, unique_word_count = ?2,
                     avg_word_frequency = ?3, avg_sentence_length = ?4 WHERE id = ?5",
                    params![
                        difficulty_score,
                        unique_word_count,
                        avg_word_frequency,
                        avg_sentence_length,
                        article_id
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn catalog_articles_missing_difficulty(&self) -> Result<Vec<i64>> {
        let ids = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id FROM catalog_articles WHERE difficulty_score IS NULL",
                )?;
                let ids = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(ids)
            })
            .await?;
        Ok(ids)
    }

    // Discovery store

    /// Discovered articles still open for this user: status 'new' and not
    /// linked to a catalog article the user already owns. Newest first.
    pub async fn discovered_eligible_for(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<DiscoveredArticle>> {
        let articles = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {DISCOVERED_COLUMNS}
                     FROM discovered_articles d
                     LEFT JOIN source_sites s ON d.source_site_id = s.id
                     WHERE d.status = 'new'
                       AND (d.catalog_article_id IS NULL OR d.catalog_article_id NOT IN
                            (SELECT article_id FROM article_users WHERE user_id = ?1))
                     ORDER BY d.discovered_at DESC
                     LIMIT ?2"
                ))?;
                let articles = stmt
                    .query_map(params![user_id, limit as i64], |row| {
                        Ok(discovered_from_row(row))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    pub async fn discovered_missing_difficulty(&self) -> Result<Vec<DiscoveredArticle>> {
        let articles = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {DISCOVERED_COLUMNS}
                     FROM discovered_articles d
                     LEFT JOIN source_sites s ON d.source_site_id = s.id
                     WHERE d.difficulty_score IS NULL AND d.status = 'new'"
                ))?;
                let articles = stmt
                    .query_map([], |row| Ok(discovered_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    pub async fn save_discovered_difficulty(&self, id: i64, difficulty_score: f64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE discovered_articles SET difficulty_score = ?1 WHERE id = ?2",
                    params![difficulty_score, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn insert_source_site(&self, name: String, base_url: String) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO source_sites (name, base_url) VALUES (?1, ?2)",
                    params![name, base_url],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn insert_discovered_article(
        &self,
        source_site_id: i64,
        url: String,
        title: String,
        summary: Option<String>,
        published_at: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO discovered_articles (source_site_id, url, title, summary, published_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        source_site_id,
                        url,
                        title,
                        summary,
                        published_at.map(|dt| dt.to_rfc3339())
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    /// Point a still-undecided discovered article at a catalog row that
    /// already exists (someone else imported the same URL). The catalog
    /// signals supersede the estimate from then on.
    pub async fn link_discovered_article(
        &self,
        discovered_id: i64,
        catalog_article_id: i64,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE discovered_articles SET catalog_article_id = ?1 WHERE id = ?2",
                    params![catalog_article_id, discovered_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Link a discovered article to the catalog row it was imported as.
    /// From then on the catalog difficulty supersedes the estimate.
    pub async fn mark_discovered_imported(
        &self,
        discovered_id: i64,
        catalog_article_id: i64,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE discovered_articles SET status = 'imported', catalog_article_id = ?1
                     WHERE id = ?2",
                    params![catalog_article_id, discovered_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Vocabulary store

    pub async fn insert_word(
        &self,
        normalized_form: String,
        language: String,
        frequency_rank: Option<i64>,
        part_of_speech: Option<String>,
    ) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO words (normalized_form, language, frequency_rank, part_of_speech)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![normalized_form, language, frequency_rank, part_of_speech],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    /// Batch-resolve word rows by normalized form for one language.
    pub async fn words_by_forms(&self, forms: Vec<String>, language: String) -> Result<Vec<Word>> {
        if forms.is_empty() {
            return Ok(Vec::new());
        }
        let words = self
            .conn
            .call(move |conn| {
                let placeholders = vec!["?"; forms.len()].join(", ");
                let mut stmt = conn.prepare(&format!(
                    "SELECT id, normalized_form, language, frequency_rank, part_of_speech
                     FROM words WHERE language = ? AND normalized_form IN ({placeholders})"
                ))?;
                let words = stmt
                    .query_map(
                        params_from_iter(std::iter::once(language).chain(forms)),
                        |row| Ok(word_from_row(row)),
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(words)
            })
            .await?;
        Ok(words)
    }

    /// Per-word occurrence counts across the user's non-archived articles.
    pub async fn user_word_exposure(&self, user_id: i64) -> Result<HashMap<i64, i64>> {
        let counts = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT wo.word_id, COUNT(*)
                     FROM word_occurrences wo
                     JOIN sentences s ON wo.sentence_id = s.id
                     JOIN article_users au ON au.article_id = s.article_id
                     WHERE au.user_id = ?1 AND au.status != 'archived'
                     GROUP BY wo.word_id",
                )?;
                let counts = stmt
                    .query_map(params![user_id], |row| {
                        Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
                    })?
                    .collect::<std::result::Result<HashMap<_, _>, _>>()?;
                Ok(counts)
            })
            .await?;
        Ok(counts)
    }

    pub async fn insert_sentence(&self, article_id: i64, idx: i64) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO sentences (article_id, idx) VALUES (?1, ?2)",
                    params![article_id, idx],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn insert_word_occurrence(
        &self,
        sentence_id: i64,
        word_id: i64,
        position: i64,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO word_occurrences (sentence_id, word_id, position) VALUES (?1, ?2, ?3)",
                    params![sentence_id, word_id, position],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Review history store

    pub async fn upsert_review_item(
        &self,
        user_id: i64,
        word_id: i64,
        repetitions: i64,
        quality_history: Option<String>,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO review_items (user_id, word_id, repetitions, quality_history, due_date)
                       VALUES (?1, ?2, ?3, ?4, ?5)
                       ON CONFLICT(user_id, word_id) DO UPDATE SET
                           repetitions = excluded.repetitions,
                           quality_history = excluded.quality_history,
                           due_date = excluded.due_date"#,
                    params![
                        user_id,
                        word_id,
                        repetitions,
                        quality_history,
                        due_date.map(|dt| dt.to_rfc3339())
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Word ids the user currently has under review.
    pub async fn active_review_word_ids(&self, user_id: i64) -> Result<HashSet<i64>> {
        let ids = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT word_id FROM review_items WHERE user_id = ?1")?;
                let ids = stmt
                    .query_map(params![user_id], |row| row.get(0))?
                    .collect::<std::result::Result<HashSet<_>, _>>()?;
                Ok(ids)
            })
            .await?;
        Ok(ids)
    }

    /// Frequency ranks of the user's reviewed words, for level estimation.
    /// Only words that resolve and carry a rank qualify.
    pub async fn user_review_ranks(&self, user_id: i64) -> Result<Vec<i64>> {
        let ranks = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT w.frequency_rank FROM review_items r
                     JOIN words w ON w.id = r.word_id
                     WHERE r.user_id = ?1 AND w.frequency_rank IS NOT NULL",
                )?;
                let ranks = stmt
                    .query_map(params![user_id], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(ranks)
            })
            .await?;
        Ok(ranks)
    }

    // Preference store

    pub async fn set_topic_weight(&self, user_id: i64, topic: String, weight: f64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO topic_preferences (user_id, topic, weight)
                       VALUES (?1, ?2, ?3)
                       ON CONFLICT(user_id, topic) DO UPDATE SET weight = excluded.weight"#,
                    params![user_id, topic, weight],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn topic_weights_for_user(&self, user_id: i64) -> Result<HashMap<String, f64>> {
        let weights = self
            .conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare("SELECT topic, weight FROM topic_preferences WHERE user_id = ?1")?;
                let weights = stmt
                    .query_map(params![user_id], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
                    })?
                    .collect::<std::result::Result<HashMap<_, _>, _>>()?;
                Ok(weights)
            })
            .await?;
        Ok(weights)
    }

    // Association store

    pub async fn set_association(
        &self,
        article_id: i64,
        user_id: i64,
        status: AssociationStatus,
    ) -> Result<()> {
        let status = status.as_str();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO article_users (article_id, user_id, status)
                       VALUES (?1, ?2, ?3)
                       ON CONFLICT(article_id, user_id) DO UPDATE SET status = excluded.status"#,
                    params![article_id, user_id, status],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn catalog_article_from_row(row: &Row) -> CatalogArticle {
    CatalogArticle {
        id: row.get(0).unwrap(),
        title: row.get(1).unwrap(),
        url: row.get(2).unwrap(),
        source: row.get(3).unwrap(),
        language: row.get(4).unwrap(),
        difficulty_score: row.get(5).unwrap(),
        unique_word_count: row.get(6).unwrap(),
        avg_word_frequency: row.get(7).unwrap(),
        avg_sentence_length: row.get(8).unwrap(),
        inserted_at: row
            .get::<_, String>(9)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    }
}

fn discovered_from_row(row: &Row) -> DiscoveredArticle {
    DiscoveredArticle {
        id: row.get(0).unwrap(),
        source_site_id: row.get(1).unwrap(),
        source_name: row.get(2).unwrap(),
        url: row.get(3).unwrap(),
        title: row.get(4).unwrap(),
        summary: row.get(5).unwrap(),
        published_at: row
            .get::<_, Option<String>>(6)
            .unwrap()
            .and_then(|s| parse_datetime(&s)),
        discovered_at: row
            .get::<_, String>(7)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        status: DiscoveredStatus::parse(&row.get::<_, String>(8).unwrap()),
        difficulty_score: row.get(9).unwrap(),
        catalog_article_id: row.get(10).unwrap(),
    }
}

fn word_from_row(row: &Row) -> Word {
    Word {
        id: row.get(0).unwrap(),
        normalized_form: row.get(1).unwrap(),
        language: row.get(2).unwrap(),
        frequency_rank: row.get(3).unwrap(),
        part_of_speech: row.get(4).unwrap(),
    }
}

fn topic_from_row(row: &Row) -> ArticleTopic {
    ArticleTopic {
        article_id: row.get(0).unwrap(),
        topic: row.get(1).unwrap(),
        confidence: row.get(2).unwrap(),
        language: row.get(3).unwrap(),
    }
}
