//! Acceptance rule of a candidate assignment.
//!
//! A query with candidate group g and score s is accepted if
//! 1. s reaches the threshold of g,
//! 2. and in the dendrogram one of the following clades is pure in g :
//!     - the sister clade of the query leaf,
//!     - the immediate outgroup, i.e. the sibling of the query's parent (absent if the parent is the root),
//!     - one of the two basal subtrees of the sister clade if it is internal.
//!
//! A clade is pure in g if it contains at least one reference leaf and all its reference leaves are labelled g.
//! Query leaves are neutral.

use serde::{Deserialize, Serialize};

use crate::dendrogram::Dendrogram;
use crate::errors::Warning;
use crate::threshold::{GroupThreshold, ThresholdTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdTest {
    Passed,
    Failed,
    /// candidate group had no fitted threshold
    Untestable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopologyTest {
    Passed,
    Failed,
    NotPerformed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Accepted,
    Rejected,
}

/// outcome of the evaluation of one query against one candidate group
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub threshold_test: ThresholdTest,
    pub topology_test: TopologyTest,
    pub verdict: Verdict,
    pub warnings: Vec<Warning>,
}

/// true if the clade under node holds at least one reference and all references are labelled candidate.
/// labels\[leaf\] is None for query leaves.
pub fn is_pure(tree: &Dendrogram, node: usize, labels: &[Option<&str>], candidate: &str) -> bool {
    let mut nb_ref = 0;
    for leaf in tree.leaves_under(node) {
        match labels.get(leaf).copied().flatten() {
            Some(g) if g == candidate => nb_ref += 1,
            Some(_) => return false,
            None => {}
        }
    }
    nb_ref > 0
} // end of is_pure

/// the topological condition alone
pub fn topology_check(tree: &Dendrogram, query_leaf: usize, labels: &[Option<&str>], candidate: &str) -> bool {
    let Some(sister) = tree.sibling(query_leaf) else {
        return false;
    };
    if is_pure(tree, sister, labels, candidate) {
        log::trace!("leaf {} : sister clade {} pure in {}", query_leaf, sister, candidate);
        return true;
    }
    if let Some(parent) = tree.get_node(query_leaf).get_parent() {
        if !tree.is_root(parent) {
            if let Some(outgroup) = tree.sibling(parent) {
                if is_pure(tree, outgroup, labels, candidate) {
                    log::trace!("leaf {} : outgroup {} pure in {}", query_leaf, outgroup, candidate);
                    return true;
                }
            }
        }
    }
    if let Some((l, r)) = tree.get_node(sister).get_children() {
        if is_pure(tree, l, labels, candidate) || is_pure(tree, r, labels, candidate) {
            log::trace!("leaf {} : a basal subtree of sister {} is pure in {}", query_leaf, sister, candidate);
            return true;
        }
    }
    false
} // end of topology_check

/// score gate, passes if score >= threshold
pub fn score_gate(score: f64, threshold: Option<&GroupThreshold>) -> ThresholdTest {
    match threshold.and_then(|t| t.get_threshold()) {
        Some(t) if score >= t => ThresholdTest::Passed,
        Some(_) => ThresholdTest::Failed,
        None => ThresholdTest::Untestable,
    }
}

/// Full evaluation of a query leaf. Without a dendrogram the verdict relies on the score gate only.
pub fn evaluate(
    score: f64,
    candidate: &str,
    thresholds: &ThresholdTable,
    tree: Option<&Dendrogram>,
    query_leaf: usize,
    labels: &[Option<&str>],
) -> Evaluation {
    let group_threshold = thresholds.get(candidate);
    let threshold_test = score_gate(score, group_threshold);
    let mut warnings = Vec::<Warning>::new();
    match threshold_test {
        ThresholdTest::Failed => {
            return Evaluation {
                threshold_test,
                topology_test: TopologyTest::NotPerformed,
                verdict: Verdict::Rejected,
                warnings,
            };
        }
        ThresholdTest::Untestable => {
            let reason = match group_threshold {
                Some(GroupThreshold::Untestable { reason }) => reason.clone(),
                _ => String::from("group has no threshold"),
            };
            warnings.push(Warning::UntestableGroup {
                group: candidate.to_string(),
                reason,
            });
            return Evaluation {
                threshold_test,
                topology_test: TopologyTest::NotPerformed,
                verdict: Verdict::Rejected,
                warnings,
            };
        }
        ThresholdTest::Passed => {}
    }
    let Some(tree) = tree else {
        warnings.push(Warning::TopologySkipped(String::from("no dendrogram")));
        return Evaluation {
            threshold_test,
            topology_test: TopologyTest::NotPerformed,
            verdict: Verdict::Accepted,
            warnings,
        };
    };
    let (topology_test, verdict) = if topology_check(tree, query_leaf, labels, candidate) {
        (TopologyTest::Passed, Verdict::Accepted)
    } else {
        (TopologyTest::Failed, Verdict::Rejected)
    };
    Evaluation {
        threshold_test,
        topology_test,
        verdict,
        warnings,
    }
} // end of evaluate

//=====================================================================================

// end of mod tests
