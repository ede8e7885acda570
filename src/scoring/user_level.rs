use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse CEFR proficiency bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLevel {
    pub cefr: CefrLevel,
    /// Continuous level on a 1-10 scale, comparable to difficulty scores.
    pub numeric: f64,
}

impl Default for UserLevel {
    fn default() -> Self {
        Self {
            cefr: CefrLevel::A1,
            numeric: 1.0,
        }
    }
}

/// Derive the learner's level from the frequency ranks of the words they
/// have under review. New learners with no qualifying history start at A1.
pub fn estimate_user_level(review_ranks: &[i64]) -> UserLevel {
    if review_ranks.is_empty() {
        return UserLevel::default();
    }

    let avg = review_ranks.iter().sum::<i64>() as f64 / review_ranks.len() as f64;

    let (cefr, numeric) = if avg <= 1000.0 {
        (CefrLevel::A1, 1.0 + avg / 1000.0)
    } else if avg <= 2000.0 {
        (CefrLevel::A2, 2.0 + (avg - 1000.0) / 1000.0)
    } else if avg <= 3500.0 {
        (CefrLevel::B1, 3.5 + (avg - 2000.0) / 1500.0)
    } else if avg <= 5000.0 {
        (CefrLevel::B2, 5.0 + (avg - 3500.0) / 1500.0)
    } else if avg <= 10_000.0 {
        (CefrLevel::C1, 7.0 + (avg - 5000.0) / 5000.0)
    } else {
        (CefrLevel::C2, 9.0)
    };

    UserLevel {
        cefr,
        numeric: numeric.min(10.0),
    }
}
