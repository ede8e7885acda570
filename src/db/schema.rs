pub const SCHEMA: &str = r#"
-- words table (language-wide frequency vocabulary)
CREATE TABLE IF NOT EXISTS words (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    normalized_form TEXT NOT NULL,
    language TEXT NOT NULL,
    frequency_rank INTEGER,
    part_of_speech TEXT,
    UNIQUE(normalized_form, language)
);

CREATE INDEX IF NOT EXISTS idx_words_form ON words(normalized_form, language);

-- catalog_articles table (imported articles with full body text)
CREATE TABLE IF NOT EXISTS catalog_articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    source TEXT,
    language TEXT NOT NULL,
    difficulty_score REAL,
    unique_word_count INTEGER,
    avg_word_frequency REAL,
    avg_sentence_length REAL,
    inserted_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_catalog_articles_inserted_at ON catalog_articles(inserted_at DESC);

-- article_topics table
CREATE TABLE IF NOT EXISTS article_topics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER NOT NULL REFERENCES catalog_articles(id) ON DELETE CASCADE,
    topic TEXT NOT NULL,
    confidence REAL NOT NULL,
    language TEXT NOT NULL,
    UNIQUE(article_id, topic)
);

CREATE INDEX IF NOT EXISTS idx_article_topics_article_id ON article_topics(article_id);

-- sentences table (article body split into sentences)
CREATE TABLE IF NOT EXISTS sentences (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER NOT NULL REFERENCES catalog_articles(id) ON DELETE CASCADE,
    idx INTEGER NOT NULL,
    UNIQUE(article_id, idx)
);

CREATE INDEX IF NOT EXISTS idx_sentences_article_id ON sentences(article_id);

-- word_occurrences table (sentence -> vocabulary links)
CREATE TABLE IF NOT EXISTS word_occurrences (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sentence_id INTEGER NOT NULL REFERENCES sentences(id) ON DELETE CASCADE,
    word_id INTEGER NOT NULL REFERENCES words(id) ON DELETE CASCADE,
    position INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_word_occurrences_sentence_id ON word_occurrences(sentence_id);
CREATE INDEX IF NOT EXISTS idx_word_occurrences_word_id ON word_occurrences(word_id);

-- source_sites table (crawled origins of discovered articles)
CREATE TABLE IF NOT EXISTS source_sites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    base_url TEXT NOT NULL UNIQUE
);

-- discovered_articles table (crawled, not yet imported)
CREATE TABLE IF NOT EXISTS discovered_articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_site_id INTEGER NOT NULL REFERENCES source_sites(id) ON DELETE CASCADE,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL DEFAULT '',
    summary TEXT,
    published_at TEXT,
    discovered_at TEXT NOT NULL DEFAULT (datetime('now')),
    status TEXT NOT NULL DEFAULT 'new',
    difficulty_score REAL,
    catalog_article_id INTEGER REFERENCES catalog_articles(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_discovered_articles_status ON discovered_articles(status);
CREATE INDEX IF NOT EXISTS idx_discovered_articles_discovered_at ON discovered_articles(discovered_at DESC);

-- article_users table (per-user article associations)
CREATE TABLE IF NOT EXISTS article_users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER NOT NULL REFERENCES catalog_articles(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'imported',
    UNIQUE(article_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_article_users_user_id ON article_users(user_id);

-- review_items table (spaced-repetition state per user and word)
CREATE TABLE IF NOT EXISTS review_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    word_id INTEGER NOT NULL REFERENCES words(id) ON DELETE CASCADE,
    repetitions INTEGER NOT NULL DEFAULT 0,
    quality_history TEXT,
    due_date TEXT,
    UNIQUE(user_id, word_id)
);

CREATE INDEX IF NOT EXISTS idx_review_items_user_id ON review_items(user_id);

-- topic_preferences table (per-user topic weights; absent topic = 1.0)
CREATE TABLE IF NOT EXISTS topic_preferences (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    topic TEXT NOT NULL,
    weight REAL NOT NULL DEFAULT 1.0,
    UNIQUE(user_id, topic)
);

CREATE INDEX IF NOT EXISTS idx_topic_preferences_user_id ON topic_preferences(user_id);
"#;
