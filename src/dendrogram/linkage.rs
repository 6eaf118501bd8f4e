//! Agglomerative clustering with Lance-Williams updates.
//!
//! Linkage names are those of scipy. Centroid, median and ward work on squared distances,
//! reported heights are the non squared values.
//!
//! Each step merges the closest pair of active clusters. A cluster is keyed by its smallest leaf index,
//! among pairs at equal distance the smallest (lower key, higher key) wins, and the lower key is the left child.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::tree::Dendrogram;
use crate::errors::{ClassifyError, ConfigError};
use crate::similarity::DistanceMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Linkage {
    /// nearest point
    Single,
    /// farthest point
    Complete,
    /// UPGMA
    Average,
    /// WPGMA
    Weighted,
    /// UPGMC
    Centroid,
    /// WPGMC
    Median,
    /// minimum variance
    Ward,
}

impl Linkage {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        Linkage::from_str(s).map_err(|_| ConfigError::UnknownLinkage(s.to_string()))
    }

    fn is_squared(&self) -> bool {
        matches!(self, Linkage::Centroid | Linkage::Median | Linkage::Ward)
    }

    /// distance between the merge of x and y and cluster i
    #[allow(clippy::too_many_arguments)]
    fn update(&self, d_xi: f64, d_yi: f64, d_xy: f64, s_x: f64, s_y: f64, s_i: f64) -> f64 {
        let d = match self {
            Linkage::Single => d_xi.min(d_yi),
            Linkage::Complete => d_xi.max(d_yi),
            Linkage::Average => (s_x * d_xi + s_y * d_yi) / (s_x + s_y),
            Linkage::Weighted => 0.5 * (d_xi + d_yi),
            Linkage::Centroid => {
                let s_xy = s_x + s_y;
                (s_x * d_xi + s_y * d_yi) / s_xy - s_x * s_y * d_xy / (s_xy * s_xy)
            }
            Linkage::Median => 0.5 * d_xi + 0.5 * d_yi - 0.25 * d_xy,
            Linkage::Ward => ((s_i + s_x) * d_xi + (s_i + s_y) * d_yi - s_i * d_xy) / (s_x + s_y + s_i),
        };
        d.max(0.)
    }
} // end of impl Linkage

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteringParams {
    linkage: Linkage,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        ClusteringParams {
            linkage: Linkage::Average,
        }
    }
}

impl ClusteringParams {
    pub fn new(linkage: Linkage) -> Self {
        ClusteringParams { linkage }
    }

    pub fn get_linkage(&self) -> Linkage {
        self.linkage
    }
}

//=====================================================================================

/// Builds the dendrogram of the entities of a distance matrix.
/// Needs at least 2 entities, otherwise a [ClassifyError::DegenerateInput] is returned.
pub fn build_dendrogram(dist: &DistanceMatrix, linkage: Linkage) -> Result<Dendrogram, ClassifyError> {
    let n = dist.get_dim();
    if n < 2 {
        return Err(ClassifyError::DegenerateInput(format!(
            "cannot build a dendrogram on {} entities",
            n
        )));
    }
    let squared = linkage.is_squared();
    let mut d: Vec<f64> = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            let v = dist.get(i, j);
            d.push(if squared { v * v } else { v });
        }
    }
    // slot k holds the cluster whose smallest leaf is k : (node id, size)
    let mut active: Vec<Option<(usize, f64)>> = (0..n).map(|i| Some((i, 1.))).collect();
    let mut merges = Vec::<(usize, usize, f64)>::with_capacity(n - 1);
    for step in 0..n - 1 {
        let mut best: Option<(f64, usize, usize)> = None;
        for i in 0..n {
            if active[i].is_none() {
                continue;
            }
            for j in i + 1..n {
                if active[j].is_none() {
                    continue;
                }
                let dij = d[i * n + j];
                match best {
                    Some((bd, _, _)) if dij >= bd => {}
                    _ => best = Some((dij, i, j)),
                }
            }
        }
        let Some((d_xy, x, y)) = best else {
            break;
        };
        let (node_x, s_x) = active[x].unwrap_or((x, 1.));
        let (node_y, s_y) = active[y].unwrap_or((y, 1.));
        let height = if squared { d_xy.sqrt() } else { d_xy };
        log::trace!("step {} merging nodes {} {} at {:.4e}", step, node_x, node_y, height);
        merges.push((node_x, node_y, height));
        for i in 0..n {
            if i == x || i == y {
                continue;
            }
            if let Some((_, s_i)) = active[i] {
                let v = linkage.update(d[x * n + i], d[y * n + i], d_xy, s_x, s_y, s_i);
                d[x * n + i] = v;
                d[i * n + x] = v;
            }
        }
        active[y] = None;
        active[x] = Some((n + step, s_x + s_y));
    }
    log::debug!("dendrogram built on {} leaves with linkage {}", n, linkage);
    Ok(Dendrogram::from_merges(n, &merges))
} // end of build_dendrogram

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_upgma_four_leaves() {
        log_init_test();
        let dist = DistanceMatrix::from_rows(&[
            vec![0., 0.1, 0.9, 0.9],
            vec![0.1, 0., 0.9, 0.9],
            vec![0.9, 0.9, 0., 0.2],
            vec![0.9, 0.9, 0.2, 0.],
        ])
        .unwrap();
        let tree = build_dendrogram(&dist, Linkage::Average).unwrap();
        assert_eq!(tree.get_nb_nodes(), 7);
        assert_eq!(tree.get_node(4).get_children(), Some((0, 1)));
        assert_eq!(tree.get_node(4).get_height(), 0.1);
        assert_eq!(tree.get_node(5).get_children(), Some((2, 3)));
        assert_eq!(tree.get_node(5).get_height(), 0.2);
        assert_eq!(tree.get_node(6).get_children(), Some((4, 5)));
        assert!((tree.get_node(6).get_height() - 0.9).abs() < 1.0e-12);
    }

    #[test]
    fn test_ties_are_deterministic() {
        let rows = vec![vec![0.5; 4]; 4];
        let rows: Vec<Vec<f64>> = rows
            .into_iter()
            .enumerate()
            .map(|(i, mut r)| {
                r[i] = 0.;
                r
            })
            .collect();
        let dist = DistanceMatrix::from_rows(&rows).unwrap();
        for linkage in [Linkage::Single, Linkage::Complete, Linkage::Average, Linkage::Weighted] {
            let t1 = build_dendrogram(&dist, linkage).unwrap();
            let t2 = build_dendrogram(&dist, linkage).unwrap();
            assert_eq!(t1, t2);
            assert_eq!(t1.get_node(4).get_children(), Some((0, 1)));
            assert_eq!(t1.get_node(5).get_children(), Some((4, 2)));
            assert_eq!(t1.get_node(6).get_children(), Some((5, 3)));
        }
    }

    #[test]
    fn test_single_and_complete() {
        // points on a line at 0, 0.1, 0.3
        let dist = DistanceMatrix::from_rows(&[
            vec![0., 0.1, 0.3],
            vec![0.1, 0., 0.2],
            vec![0.3, 0.2, 0.],
        ])
        .unwrap();
        let single = build_dendrogram(&dist, Linkage::Single).unwrap();
        assert_eq!(single.get_node(4).get_height(), 0.2);
        let complete = build_dendrogram(&dist, Linkage::Complete).unwrap();
        assert_eq!(complete.get_node(4).get_height(), 0.3);
        let weighted = build_dendrogram(&dist, Linkage::Weighted).unwrap();
        assert!((weighted.get_node(4).get_height() - 0.25).abs() < 1.0e-12);
    }

    #[test]
    fn test_ward_heights() {
        // points on a line at 0, 0.1, 0.3 : ward merge height is sqrt(25/3) * 0.1
        let dist = DistanceMatrix::from_rows(&[
            vec![0., 0.1, 0.3],
            vec![0.1, 0., 0.2],
            vec![0.3, 0.2, 0.],
        ])
        .unwrap();
        let ward = build_dendrogram(&dist, Linkage::Ward).unwrap();
        assert!((ward.get_node(3).get_height() - 0.1).abs() < 1.0e-12);
        let expected = 0.1 * (25f64 / 3.).sqrt();
        assert!((ward.get_node(4).get_height() - expected).abs() < 1.0e-12);
        // centroid : distance from 0.3 to centroid 0.05
        let centroid = build_dendrogram(&dist, Linkage::Centroid).unwrap();
        assert!((centroid.get_node(4).get_height() - 0.25).abs() < 1.0e-12);
    }

    #[test]
    fn test_median_heights() {
        let dist = DistanceMatrix::from_rows(&[
            vec![0., 0.1, 0.3],
            vec![0.1, 0., 0.2],
            vec![0.3, 0.2, 0.],
        ])
        .unwrap();
        let median = build_dendrogram(&dist, Linkage::Median).unwrap();
        assert_eq!(median.get_node(3).get_children(), Some((0, 1)));
        assert!((median.get_node(3).get_height() - 0.1).abs() < 1.0e-12);
        // squared update 0.5 * 0.09 + 0.5 * 0.04 - 0.25 * 0.01
        let expected = (0.5 * 0.09 + 0.5 * 0.04 - 0.25 * 0.01f64).sqrt();
        assert!((expected - 0.25).abs() < 1.0e-12);
        assert!((median.get_node(4).get_height() - expected).abs() < 1.0e-12);
        assert_eq!(median.get_node(4).get_children(), Some((3, 2)));
    }

    #[test]
    fn test_degenerate() {
        let dist = DistanceMatrix::from_rows(&[vec![0.]]).unwrap();
        assert!(matches!(
            build_dendrogram(&dist, Linkage::Average),
            Err(ClassifyError::DegenerateInput(_))
        ));
    }

    #[test]
    fn test_linkage_parse() {
        assert_eq!(Linkage::parse("ward").unwrap(), Linkage::Ward);
        assert_eq!(Linkage::Average.to_string(), "average");
        assert!(matches!(Linkage::parse("upgma"), Err(ConfigError::UnknownLinkage(_))));
    }
} // end of mod tests
