//! Problem classification: grouping and ignore-list filtering.

use std::collections::BTreeSet;

use crate::analysis::{GroupedProblems, TypedAnalysis, get_problems, group_by_kind};
use crate::problem::{Problem, ProblemKind};

/// Set of problem kinds excluded from strict-mode reporting.
pub type IgnoreSet = BTreeSet<ProblemKind>;

/// Classified view of a typed analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Every problem grouped by kind, ignored kinds included.
    pub grouped: GroupedProblems,
    /// Problems whose kind is not ignored, in emission order.
    pub reportable: Vec<Problem>,
}

impl Classification {
    /// Whether any unignored problem remains.
    pub fn has_reportable(&self) -> bool {
        !self.reportable.is_empty()
    }
}

/// Group the analysis problems and compute the reportable subset.
pub fn classify(analysis: &TypedAnalysis, ignore: &IgnoreSet) -> Classification {
    let problems = get_problems(analysis);
    let grouped = group_by_kind(problems);
    let reportable: Vec<Problem> = problems
        .iter()
        .filter(|problem| !ignore.contains(&problem.kind))
        .cloned()
        .collect();
    log::debug!(
        "classified {} problems ({} reportable, {} kinds)",
        problems.len(),
        reportable.len(),
        grouped.len()
    );
    Classification {
        grouped,
        reportable,
    }
}
