use std::collections::HashMap;

use lector::config::Config;
use lector::db::Repository;
use lector::models::AssociationStatus;
use lector::recommend::Recommender;
use lector::scoring::user_level::{estimate_user_level, CefrLevel};

fn test_config() -> Config {
    Config {
        db_path: ":memory:".to_string(),
        language: "es".to_string(),
        fetch_timeout_secs: 1,
        max_concurrent_fetches: 2,
        pool_multiplier: 20,
        cache_ttl_secs: 60,
    }
}

async fn add_words(repo: &Repository, words: &[(&str, Option<i64>)]) -> Vec<i64> {
    let mut ids = Vec::new();
    for (form, rank) in words {
        let id = repo
            .insert_word(form.to_string(), "es".to_string(), *rank, None)
            .await
            .unwrap();
        ids.push(id);
    }
    ids
}

async fn add_catalog_article(repo: &Repository, title: &str, url: &str, source: &str) -> i64 {
    repo.insert_catalog_article(
        title.to_string(),
        url.to_string(),
        Some(source.to_string()),
        "es".to_string(),
    )
    .await
    .unwrap()
}

async fn add_sentence(repo: &Repository, article_id: i64, idx: i64, word_ids: &[i64]) {
    let sentence_id = repo.insert_sentence(article_id, idx).await.unwrap();
    for (position, word_id) in word_ids.iter().enumerate() {
        repo.insert_word_occurrence(sentence_id, *word_id, position as i64)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn topic_round_trip_orders_by_confidence() {
    let repo = Repository::in_memory().await.unwrap();
    let article = add_catalog_article(&repo, "Marte", "https://n.example/marte", "El Diario").await;

    repo.tag_article(article, "deportes".to_string(), 0.4, "es".to_string())
        .await
        .unwrap();
    repo.tag_article(article, "ciencia".to_string(), 0.9, "es".to_string())
        .await
        .unwrap();

    let topics = repo.article_topics(article).await.unwrap();
    let names: Vec<&str> = topics.iter().map(|t| t.topic.as_str()).collect();
    assert_eq!(names, vec!["ciencia", "deportes"]);
    assert_eq!(topics[0].confidence, 0.9);
}

#[tokio::test]
async fn discovered_article_scoring_end_to_end() {
    let repo = Repository::in_memory().await.unwrap();
    let user_id = 7;

    // avg reviewed rank 2000 -> A2, numeric level 3.0
    let word_ids = add_words(&repo, &[("casa", Some(1500)), ("lograr", Some(2500))]).await;
    for word_id in &word_ids {
        repo.upsert_review_item(user_id, *word_id, 2, None, None)
            .await
            .unwrap();
    }
    let level = estimate_user_level(&repo.user_review_ranks(user_id).await.unwrap());
    assert_eq!(level.cefr, CefrLevel::A2);
    assert!((level.numeric - 3.0).abs() < 1e-9);

    let site = repo
        .insert_source_site("El Diario".to_string(), "https://eldiario.example".to_string())
        .await
        .unwrap();
    let discovered = repo
        .insert_discovered_article(
            site,
            "https://eldiario.example/articulo".to_string(),
            "Un artículo interesante".to_string(),
            None,
            None,
        )
        .await
        .unwrap();
    repo.save_discovered_difficulty(discovered, 3.3).await.unwrap();

    let recommender = Recommender::new(repo, &test_config());
    let recommendations = recommender.recommend(user_id, 5).await.unwrap();

    assert_eq!(recommendations.len(), 1);
    let rec = &recommendations[0];
    assert!(rec.is_discovered);
    assert_eq!(rec.discovered_article_id, Some(discovered));
    assert_eq!(rec.id, None);
    assert_eq!(rec.source, "El Diario");
    // 0.4*1.0 + 0.3*1.0 + 0.2*0.5 + 0.1*1.0
    assert!((rec.score - 0.81).abs() < 1e-9);
}

#[tokio::test]
async fn zero_word_catalog_article_scores_pure_topic() {
    let repo = Repository::in_memory().await.unwrap();
    let user_id = 3;

    // No sentences, so no vocabulary signal: topic affinity carries all.
    let article =
        add_catalog_article(&repo, "Opinión", "https://n.example/opinion", "El Diario").await;
    repo.tag_article(article, "ciencia".to_string(), 0.55, "es".to_string())
        .await
        .unwrap();
    repo.set_topic_weight(user_id, "ciencia".to_string(), 2.0)
        .await
        .unwrap();

    let recommender = Recommender::new(repo, &test_config());
    let recommendations = recommender.recommend(user_id, 5).await.unwrap();

    assert_eq!(recommendations.len(), 1);
    // base 0.55*2.0 = 1.1 plus the full freshness bonus for a row inserted now
    assert!((recommendations[0].score - 1.2).abs() < 1e-3);
    assert!(!recommendations[0].is_discovered);
}

#[tokio::test]
async fn seen_articles_are_excluded() {
    let repo = Repository::in_memory().await.unwrap();
    let user_id = 1;

    let read = add_catalog_article(&repo, "Leído", "https://n.example/leido", "El Diario").await;
    let archived =
        add_catalog_article(&repo, "Archivado", "https://n.example/arch", "El Diario").await;
    let fresh = add_catalog_article(&repo, "Nuevo", "https://n.example/nuevo", "El Diario").await;
    for article in [read, archived, fresh] {
        repo.tag_article(article, "cultura".to_string(), 0.9, "es".to_string())
            .await
            .unwrap();
    }

    repo.set_association(read, user_id, AssociationStatus::Finished)
        .await
        .unwrap();
    repo.set_association(archived, user_id, AssociationStatus::Archived)
        .await
        .unwrap();

    let recommender = Recommender::new(repo, &test_config());
    let recommendations = recommender.recommend(user_id, 10).await.unwrap();

    assert_eq!(recommendations.len(), 1);
    assert_eq!(recommendations[0].id, Some(fresh));
}

#[tokio::test]
async fn linked_discovered_candidate_is_scored_as_catalog() {
    let repo = Repository::in_memory().await.unwrap();
    let user_id = 2;

    let article =
        add_catalog_article(&repo, "Importado", "https://n.example/imp", "El Diario").await;
    repo.tag_article(article, "ciencia".to_string(), 0.9, "es".to_string())
        .await
        .unwrap();

    let site = repo
        .insert_source_site("El Diario".to_string(), "https://eldiario.example".to_string())
        .await
        .unwrap();
    let discovered = repo
        .insert_discovered_article(
            site,
            "https://eldiario.example/imp".to_string(),
            "Importado".to_string(),
            None,
            None,
        )
        .await
        .unwrap();
    // This row was decided, so it leaves the pool entirely.
    repo.mark_discovered_imported(discovered, article).await.unwrap();

    // A second crawl of the same story stays undecided but is linked to the
    // existing catalog row; it must collapse into the catalog identity.
    let still_new = repo
        .insert_discovered_article(
            site,
            "https://eldiario.example/imp2".to_string(),
            "Importado otra vez".to_string(),
            None,
            None,
        )
        .await
        .unwrap();
    repo.save_discovered_difficulty(still_new, 5.0).await.unwrap();
    repo.link_discovered_article(still_new, article).await.unwrap();

    let recommender = Recommender::new(repo, &test_config());
    let recommendations = recommender.recommend(user_id, 10).await.unwrap();

    // One identity, catalog signals win.
    assert_eq!(recommendations.len(), 1);
    assert_eq!(recommendations[0].id, Some(article));
    assert!(!recommendations[0].is_discovered);
}

#[tokio::test]
async fn low_scoring_candidates_are_dropped() {
    let repo = Repository::in_memory().await.unwrap();

    // Topicless and wordless: nothing but the freshness bonus, which never
    // clears the 0.1 floor.
    add_catalog_article(&repo, "Vacío", "https://n.example/vacio", "El Diario").await;

    let recommender = Recommender::new(repo, &test_config());
    let recommendations = recommender.recommend(1, 10).await.unwrap();
    assert!(recommendations.is_empty());
}

#[tokio::test]
async fn novelty_ranks_unseen_vocabulary_first() {
    let repo = Repository::in_memory().await.unwrap();
    let user_id = 4;

    let known = add_words(&repo, &[("que", Some(10)), ("ser", Some(20))]).await;
    let unseen = add_words(&repo, &[("asombro", Some(4000)), ("penumbra", Some(4500))]).await;

    // The user has read an article containing the known words three times over.
    let owned = add_catalog_article(&repo, "Ya leído", "https://n.example/owned", "El Diario").await;
    for idx in 0..3 {
        add_sentence(&repo, owned, idx, &known).await;
    }
    repo.set_association(owned, user_id, AssociationStatus::Imported)
        .await
        .unwrap();

    let familiar =
        add_catalog_article(&repo, "Familiar", "https://n.example/fam", "El Diario").await;
    add_sentence(&repo, familiar, 0, &known).await;

    let novel = add_catalog_article(&repo, "Nuevo mundo", "https://n.example/nov", "El Diario").await;
    add_sentence(&repo, novel, 0, &unseen).await;

    for article in [familiar, novel] {
        repo.tag_article(article, "cultura".to_string(), 0.5, "es".to_string())
            .await
            .unwrap();
    }

    let recommender = Recommender::new(repo, &test_config());
    let recommendations = recommender.recommend(user_id, 10).await.unwrap();

    assert_eq!(recommendations.len(), 2);
    assert_eq!(recommendations[0].id, Some(novel));
    // 0.7*(0.5 + ~0.1) + 0.3*1.0 vs 0.3*0.0 for the familiar one
    assert!(recommendations[0].score > recommendations[1].score + 0.25);
}

#[tokio::test]
async fn diversity_caps_one_source_per_page() {
    let repo = Repository::in_memory().await.unwrap();
    let user_id = 1;

    let mut sites = Vec::new();
    for name in ["Fuente A", "Fuente B"] {
        let site = repo
            .insert_source_site(name.to_string(), format!("https://{name}.example"))
            .await
            .unwrap();
        sites.push((site, name));
    }
    for (site, name) in &sites {
        for i in 0..6 {
            let id = repo
                .insert_discovered_article(
                    *site,
                    format!("https://{name}.example/{i}"),
                    format!("{name} artículo {i}"),
                    None,
                    None,
                )
                .await
                .unwrap();
            repo.save_discovered_difficulty(id, 3.0).await.unwrap();
        }
    }

    let recommender = Recommender::new(repo, &test_config());
    let recommendations = recommender.recommend(user_id, 4).await.unwrap();

    assert_eq!(recommendations.len(), 4);
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for rec in &recommendations {
        *counts.entry(rec.source.as_str()).or_default() += 1;
    }
    // limit 4 over 2 sources -> at most 2 per source
    for (source, count) in counts {
        assert!(count <= 2, "source {source} placed {count} items");
    }
}

#[tokio::test]
async fn empty_catalog_recommends_nothing() {
    let repo = Repository::in_memory().await.unwrap();
    let recommender = Recommender::new(repo, &test_config());
    let recommendations = recommender.recommend(42, 10).await.unwrap();
    assert!(recommendations.is_empty());
}

#[tokio::test]
async fn unranked_reviewed_words_do_not_qualify_for_level() {
    let repo = Repository::in_memory().await.unwrap();
    let user_id = 9;

    let ids = add_words(&repo, &[("regionalismo", None)]).await;
    repo.upsert_review_item(user_id, ids[0], 5, None, None)
        .await
        .unwrap();

    let ranks = repo.user_review_ranks(user_id).await.unwrap();
    assert!(ranks.is_empty());

    let level = estimate_user_level(&ranks);
    assert_eq!(level.cefr, CefrLevel::A1);
    assert_eq!(level.numeric, 1.0);
}
