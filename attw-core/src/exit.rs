//! Strict-mode exit decision.

use crate::classify::Classification;

/// Final verdict of a successful run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to fail on.
    Clean,
    /// Strict mode found at least one unignored problem.
    ProblemsFound,
}

impl Outcome {
    /// Process exit status for this outcome.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::ProblemsFound => 1,
        }
    }
}

/// Decide the outcome from the strict flag and the classification.
///
/// `classification` is `None` for untyped packages, which never fail.
pub fn decide(strict: bool, classification: Option<&Classification>) -> Outcome {
    match classification {
        Some(classification) if strict && classification.has_reportable() => {
            Outcome::ProblemsFound
        }
        _ => Outcome::Clean,
    }
}
