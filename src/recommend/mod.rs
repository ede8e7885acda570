pub mod aggregator;
pub mod diversity;

pub use aggregator::Recommender;

use crate::models::CandidateView;

/// A candidate with its final combined score, ready for diversity selection.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub view: CandidateView,
    pub score: f64,
}
