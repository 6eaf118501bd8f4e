//! Estimation of the dendrogram height that best reproduces the reference groups.
//!
//! The dendrogram is cut at every distinct merge height. For each cut, the flat clusters are compared to the
//! reference labels with Theil's uncertainty coefficients computed over reference leaves :
//! U(X|Y) = I(X;Y)/H(X), U(Y|X) = I(X;Y)/H(Y) and the symmetric 2I(X;Y)/(H(X)+H(Y)),
//! X being the reference label and Y the cluster. The height with maximal symmetric coefficient is kept,
//! the lowest one on ties.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dendrogram::Dendrogram;

/// statistics of one cut of the dendrogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingCutoff {
    pub height: f64,
    pub nb_clusters: usize,
    /// U(reference | cluster)
    pub u_ref_given_cluster: f64,
    /// U(cluster | reference)
    pub u_cluster_given_ref: f64,
    pub u_symmetric: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingReport {
    best: GroupingCutoff,
    scan: Vec<GroupingCutoff>,
    /// cluster of each leaf at the best cutoff
    assignment: Vec<usize>,
}

impl GroupingReport {
    pub fn get_best(&self) -> &GroupingCutoff {
        &self.best
    }

    pub fn get_scan(&self) -> &[GroupingCutoff] {
        &self.scan
    }

    pub fn get_assignment(&self) -> &[usize] {
        &self.assignment
    }
}

/// Flat clusters : maximal subtrees whose height is <= height. Returns the cluster rank of each leaf,
/// clusters being numbered from left to right.
pub fn cut(tree: &Dendrogram, height: f64) -> Vec<usize> {
    let mut assignment = vec![0usize; tree.get_nb_leaves()];
    let mut nb_clusters = 0;
    let mut stack = vec![tree.get_root()];
    while let Some(node) = stack.pop() {
        let n = tree.get_node(node);
        match n.get_children() {
            Some((l, r)) if n.get_height() > height => {
                stack.push(r);
                stack.push(l);
            }
            _ => {
                for leaf in tree.leaves_under(node) {
                    assignment[leaf] = nb_clusters;
                }
                nb_clusters += 1;
            }
        }
    }
    assignment
} // end of cut

fn entropy<K: Ord>(counts: &BTreeMap<K, usize>, total: f64) -> f64 {
    counts
        .values()
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.ln()
        })
        .sum()
}

/// Theil's uncertainty coefficients (U(x|y), U(y|x), symmetric) of two paired categorical samples.
/// A coefficient is 1 when the entropy it is normalised by vanishes.
pub fn theil_u<X: Ord + Clone, Y: Ord + Clone>(x: &[X], y: &[Y]) -> (f64, f64, f64) {
    let total = x.len() as f64;
    let mut cx = BTreeMap::<X, usize>::new();
    let mut cy = BTreeMap::<Y, usize>::new();
    let mut cxy = BTreeMap::<(X, Y), usize>::new();
    for (a, b) in x.iter().zip(y.iter()) {
        *cx.entry(a.clone()).or_insert(0) += 1;
        *cy.entry(b.clone()).or_insert(0) += 1;
        *cxy.entry((a.clone(), b.clone())).or_insert(0) += 1;
    }
    let hx = entropy(&cx, total);
    let hy = entropy(&cy, total);
    let hxy = entropy(&cxy, total);
    let mutual = (hx + hy - hxy).max(0.);
    let u_x_given_y = if hx > 0. { (mutual / hx).min(1.) } else { 1. };
    let u_y_given_x = if hy > 0. { (mutual / hy).min(1.) } else { 1. };
    let sym = if hx + hy > 0. {
        (2. * mutual / (hx + hy)).min(1.)
    } else {
        1.
    };
    (u_x_given_y, u_y_given_x, sym)
} // end of theil_u

/// scan all merge heights. None if there is no reference leaf.
pub fn estimate_grouping(tree: &Dendrogram, labels: &[Option<&str>]) -> Option<GroupingReport> {
    let ref_leaves: Vec<(usize, &str)> = labels
        .iter()
        .enumerate()
        .filter_map(|(i, l)| l.map(|g| (i, g)))
        .collect();
    if ref_leaves.is_empty() {
        return None;
    }
    let mut heights: Vec<f64> = tree
        .get_nodes()
        .iter()
        .filter(|n| !n.is_leaf())
        .map(|n| n.get_height())
        .collect();
    heights.sort_by(|a, b| a.total_cmp(b));
    heights.dedup();
    //
    let reference: Vec<&str> = ref_leaves.iter().map(|(_, g)| *g).collect();
    let mut scan = Vec::<GroupingCutoff>::with_capacity(heights.len());
    let mut best: Option<(usize, Vec<usize>)> = None;
    for height in heights {
        let assignment = cut(tree, height);
        let predicted: Vec<usize> = ref_leaves.iter().map(|(i, _)| assignment[*i]).collect();
        let (u_ref_given_cluster, u_cluster_given_ref, u_symmetric) = theil_u(&reference, &predicted);
        let nb_clusters = assignment.iter().max().map(|m| m + 1).unwrap_or(0);
        log::trace!("cut at {:.4e} : {} clusters, U sym {:.4}", height, nb_clusters, u_symmetric);
        let better = match &best {
            Some((b, _)) => u_symmetric > scan[*b].u_symmetric,
            None => true,
        };
        scan.push(GroupingCutoff {
            height,
            nb_clusters,
            u_ref_given_cluster,
            u_cluster_given_ref,
            u_symmetric,
        });
        if better {
            best = Some((scan.len() - 1, assignment));
        }
    }
    let (rank, assignment) = best?;
    let best = scan[rank].clone();
    log::info!(
        "grouping : best cutoff {:.4e}, {} clusters, U(ref|cluster) {:.4}, U(cluster|ref) {:.4}, U sym {:.4}",
        best.height,
        best.nb_clusters,
        best.u_ref_given_cluster,
        best.u_cluster_given_ref,
        best.u_symmetric
    );
    Some(GroupingReport {
        best,
        scan,
        assignment,
    })
} // end of estimate_grouping

//=====================================================================================

// end of mod tests
