mod backfill;
mod title_fetcher;

pub use backfill::{backfill_catalog_difficulty, backfill_discovered_difficulty, BackfillReport};
pub use title_fetcher::{FetchError, TitleFetcher};
