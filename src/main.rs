use lector::config::Config;
use lector::db::Repository;
use lector::error::Result;
use lector::recommend::Recommender;
use lector::scoring::user_level::estimate_user_level;
use lector::services::{backfill_catalog_difficulty, backfill_discovered_difficulty};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let config = Config::load()?;
    let repository = Repository::new(&config.db_path).await?;

    match args.get(1).map(String::as_str) {
        Some("--recommend") => {
            let Some(user_id) = args.get(2).and_then(|s| s.parse::<i64>().ok()) else {
                eprintln!("Usage: lector --recommend <user_id> [limit]");
                std::process::exit(2);
            };
            let limit = args
                .get(3)
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(10);

            let recommender = Recommender::new(repository, &config);
            let recommendations = recommender.recommend(user_id, limit).await?;

            if args.iter().any(|a| a == "--json") {
                println!("{}", serde_json::to_string_pretty(&recommendations)?);
                return Ok(());
            }

            if recommendations.is_empty() {
                println!("Nothing to recommend right now.");
                return Ok(());
            }
            for (i, rec) in recommendations.iter().enumerate() {
                let difficulty = rec
                    .difficulty_score
                    .map(|d| format!("{:.1}", d))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:2}. [{:.2}] {} ({}, difficulty {})",
                    i + 1,
                    rec.score,
                    rec.title,
                    rec.source,
                    difficulty
                );
                println!("      {}", rec.url);
            }
        }

        Some("--level") => {
            let Some(user_id) = args.get(2).and_then(|s| s.parse::<i64>().ok()) else {
                eprintln!("Usage: lector --level <user_id>");
                std::process::exit(2);
            };
            let ranks = repository.user_review_ranks(user_id).await?;
            let level = estimate_user_level(&ranks);
            println!(
                "User {}: {} (level {:.1}, {} reviewed words with frequency data)",
                user_id,
                level.cefr,
                level.numeric,
                ranks.len()
            );
        }

        Some("--backfill") => {
            let report = backfill_catalog_difficulty(&repository).await?;
            println!(
                "Catalog difficulty backfill: {} processed, {} updated, {} failed",
                report.processed, report.updated, report.failed
            );
        }

        Some("--backfill-discovered") => {
            let report = backfill_discovered_difficulty(&repository, &config.language).await?;
            println!(
                "Discovered difficulty backfill: {} processed, {} updated, {} failed",
                report.processed, report.updated, report.failed
            );
        }

        _ => {
            println!("lector - reading recommendations for language learners");
            println!();
            println!("Usage:");
            println!("  lector --recommend <user_id> [limit] [--json]");
            println!("                                         rank reading candidates");
            println!("  lector --level <user_id>               show the estimated CEFR level");
            println!("  lector --backfill                      score catalog articles missing difficulty");
            println!("  lector --backfill-discovered           estimate difficulty of discovered articles");
        }
    }

    Ok(())
}
