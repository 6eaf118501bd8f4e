//! Bootstrap support of dendrogram branches.
//!
//! A pseudo replicate resamples with replacement the profile columns (P and L together) and the
//! group model columns (G), then rebuilds similarities, distances and dendrogram.
//! Each branch of the reference dendrogram gets a support from the replicate trees :
//!
//! - sumtrees : fraction of replicates containing the same bipartition (Felsenstein).
//! - booster : transfer bootstrap expectation, 1 - mean(δ / (p-1)) where δ is the minimal
//!   transfer distance of the branch to a replicate branch and p the size of its lighter side.
//!
//! Trivial branches and the root have support 1.
//! Tallies are integers summed under a mutex, so the result does not depend on the order
//! in which replicates complete.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::SystemTime;

use cpu_time::ProcessTime;
use fxhash::FxHashSet;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::dendrogram::{build_dendrogram, Bipartition, Dendrogram, Linkage};
use crate::errors::{ClassifyError, ConfigError};
use crate::signature::Signature;
use crate::similarity::{similarity_matrix, ColumnSelection, DistanceMatrix, SimilarityParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BootstrapMethod {
    /// transfer bootstrap expectation
    Booster,
    /// classic presence frequency
    Sumtrees,
}

impl BootstrapMethod {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        BootstrapMethod::from_str(s).map_err(|_| ConfigError::UnknownBootstrapMethod(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapParams {
    enabled: bool,
    n_replicates: usize,
    method: BootstrapMethod,
    seed: u64,
}

impl Default for BootstrapParams {
    fn default() -> Self {
        BootstrapParams {
            enabled: true,
            n_replicates: 10,
            method: BootstrapMethod::Booster,
            seed: 0,
        }
    }
}

impl BootstrapParams {
    pub fn new(enabled: bool, n_replicates: usize, method: BootstrapMethod, seed: u64) -> Self {
        BootstrapParams {
            enabled,
            n_replicates,
            method,
            seed,
        }
    }

    /// parameters disabling bootstrap
    pub fn disabled() -> Self {
        BootstrapParams {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get_n_replicates(&self) -> usize {
        self.n_replicates
    }

    pub fn get_method(&self) -> BootstrapMethod {
        self.method
    }

    pub fn get_seed(&self) -> u64 {
        self.seed
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.n_replicates == 0 {
            return Err(ConfigError::NonPositive("n_replicates"));
        }
        Ok(())
    }
} // end of impl BootstrapParams

//=====================================================================================

/// integer tallies of replicate trees against the branches of a reference tree
struct SupportTally {
    method: BootstrapMethod,
    // None for the root and trivial branches
    branches: Vec<Option<Bipartition>>,
    // (tallies per node, number of replicates)
    acc: Mutex<(Vec<u64>, u64)>,
}

impl SupportTally {
    fn new(reference: &Dendrogram, method: BootstrapMethod) -> Self {
        let branches: Vec<Option<Bipartition>> = reference
            .bipartitions()
            .into_iter()
            .map(|b| b.filter(|b| !b.is_trivial()))
            .collect();
        let nb_nodes = branches.len();
        SupportTally {
            method,
            branches,
            acc: Mutex::new((vec![0u64; nb_nodes], 0)),
        }
    }

    fn replicate_tally(&self, replicate: &Dendrogram) -> Vec<u64> {
        let rep_branches: Vec<Bipartition> = replicate.bipartitions().into_iter().flatten().collect();
        match self.method {
            BootstrapMethod::Sumtrees => {
                let present: FxHashSet<&Bipartition> = rep_branches.iter().collect();
                self.branches
                    .iter()
                    .map(|b| match b {
                        Some(b) if present.contains(b) => 1,
                        _ => 0,
                    })
                    .collect()
            }
            BootstrapMethod::Booster => self
                .branches
                .iter()
                .map(|b| match b {
                    Some(b) => rep_branches
                        .iter()
                        .map(|r| b.transfer_distance(r))
                        .min()
                        .unwrap_or(0) as u64,
                    None => 0,
                })
                .collect(),
        }
    } // end of replicate_tally

    fn add(&self, replicate: &Dendrogram) {
        let tally = self.replicate_tally(replicate);
        let mut acc = self.acc.lock();
        for (a, t) in acc.0.iter_mut().zip(tally) {
            *a += t;
        }
        acc.1 += 1;
    }

    fn supports(&self) -> Vec<f64> {
        let acc = self.acc.lock();
        let nb_rep = acc.1;
        self.branches
            .iter()
            .zip(acc.0.iter())
            .map(|(b, &t)| match b {
                None => 1.,
                Some(_) if nb_rep == 0 => 1.,
                Some(b) => match self.method {
                    BootstrapMethod::Sumtrees => t as f64 / nb_rep as f64,
                    BootstrapMethod::Booster => {
                        let p = b.lighter_side_size() as f64;
                        (1. - t as f64 / (nb_rep as f64 * (p - 1.))).clamp(0., 1.)
                    }
                },
            })
            .collect()
    } // end of supports
} // end of impl SupportTally

/// supports of the nodes of a reference tree given replicate trees on the same leaves
pub fn aggregate_supports(reference: &Dendrogram, replicates: &[Dendrogram], method: BootstrapMethod) -> Vec<f64> {
    let tally = SupportTally::new(reference, method);
    replicates.par_iter().for_each(|r| tally.add(r));
    tally.supports()
}

/// Runs the pseudo replicates in the current rayon pool and returns one support per node of reference.
/// The cancel flag is checked before each replicate, a cancelled run returns [ClassifyError::Cancelled].
pub fn bootstrap_supports(
    signatures: &[&Signature],
    sim_params: &SimilarityParams,
    linkage: Linkage,
    reference: &Dendrogram,
    params: &BootstrapParams,
    cancel: &AtomicBool,
) -> Result<Vec<f64>, ClassifyError> {
    let Some(first) = signatures.first() else {
        return Err(ClassifyError::DegenerateInput(String::from("bootstrap on no entity")));
    };
    let layout = first.get_layout();
    log::info!(
        "bootstrap : {} replicates, method {}, {} entities",
        params.n_replicates,
        params.method,
        signatures.len()
    );
    let cpu_start = ProcessTime::now();
    let sys_now = SystemTime::now();
    //
    let tally = SupportTally::new(reference, params.method);
    let nb_done = AtomicUsize::new(0);
    (0..params.n_replicates)
        .into_par_iter()
        .try_for_each(|rep| -> Result<(), ClassifyError> {
            if cancel.load(Ordering::Relaxed) {
                return Err(ClassifyError::Cancelled(nb_done.load(Ordering::Relaxed)));
            }
            let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
            rng.set_stream(rep as u64);
            let cols = ColumnSelection::resample(layout, &mut rng);
            let sim = similarity_matrix(signatures, sim_params, Some(&cols))?;
            let dist = DistanceMatrix::from_similarity(&sim, sim_params.get_p());
            let tree = build_dendrogram(&dist, linkage)?;
            tally.add(&tree);
            nb_done.fetch_add(1, Ordering::Relaxed);
            log::debug!("bootstrap replicate {} done", rep);
            Ok(())
        })?;
    //
    log::info!(
        "bootstrap done, sys time(ms) {:?} cpu time(ms) {:?}",
        sys_now.elapsed().map(|d| d.as_millis()).unwrap_or(0),
        cpu_start.elapsed().as_millis()
    );
    Ok(tally.supports())
} // end of bootstrap_supports

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use std::sync::Arc;

    use rand::Rng;

    use crate::signature::SignatureLayout;
    use crate::similarity::SimilarityScheme;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn tree(merges: &[(usize, usize, f64)], n: usize) -> Dendrogram {
        Dendrogram::from_merges(n, merges)
    }

    // two clusters of 4 entities well separated on a majority of columns
    fn clustered_signatures() -> Vec<Signature> {
        let nb_col = 12;
        let layout = Arc::new(SignatureLayout::new(
            (0..nb_col).map(|i| format!("p{}", i)).collect(),
            vec!["g0".into(), "g1".into()],
        ));
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        (0..8)
            .map(|e| {
                let pscores: Vec<f64> = (0..nb_col)
                    .map(|c| {
                        let base = if (c < nb_col / 2) == (e < 4) { 10. } else { 0.5 };
                        base + rng.gen_range(0. ..0.5)
                    })
                    .collect();
                let gscores = if e < 4 { vec![5., 0.] } else { vec![0., 5.] };
                Signature::new(&layout, &format!("v{}", e), pscores, vec![vec![]; nb_col], gscores).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_extreme_supports() {
        // ((0,1),(2,3))
        let reference = tree(&[(0, 1, 0.1), (2, 3, 0.1), (4, 5, 0.5)], 4);
        // ((0,2),(1,3))
        let conflicting = tree(&[(0, 2, 0.1), (1, 3, 0.1), (4, 5, 0.5)], 4);
        for method in [BootstrapMethod::Sumtrees, BootstrapMethod::Booster] {
            let same = aggregate_supports(&reference, &vec![reference.clone(); 5], method);
            assert!(same.iter().all(|&s| s == 1.));
            let opposite = aggregate_supports(&reference, &vec![conflicting.clone(); 5], method);
            assert_eq!(opposite[4], 0.);
            assert_eq!(opposite[5], 0.);
            // leaves and root
            assert_eq!(opposite[0], 1.);
            assert_eq!(opposite[6], 1.);
        }
    }

    #[test]
    fn test_aggregation_order_independent() {
        let reference = tree(&[(0, 1, 0.1), (2, 3, 0.2), (5, 4, 0.3), (6, 7, 0.5), (8, 9, 0.9)], 6);
        let replicates = vec![
            tree(&[(0, 1, 0.1), (2, 3, 0.2), (5, 4, 0.3), (6, 7, 0.5), (8, 9, 0.9)], 6),
            tree(&[(0, 2, 0.1), (1, 3, 0.2), (4, 5, 0.3), (6, 7, 0.5), (8, 9, 0.9)], 6),
            tree(&[(0, 5, 0.1), (1, 4, 0.2), (2, 3, 0.3), (6, 7, 0.5), (8, 9, 0.9)], 6),
            tree(&[(0, 1, 0.1), (2, 4, 0.2), (3, 5, 0.3), (6, 8, 0.5), (7, 9, 0.9)], 6),
        ];
        let mut reversed = replicates.clone();
        reversed.reverse();
        for method in [BootstrapMethod::Sumtrees, BootstrapMethod::Booster] {
            let s1 = aggregate_supports(&reference, &replicates, method);
            let s2 = aggregate_supports(&reference, &reversed, method);
            let b1: Vec<u64> = s1.iter().map(|s| s.to_bits()).collect();
            let b2: Vec<u64> = s2.iter().map(|s| s.to_bits()).collect();
            assert_eq!(b1, b2);
            assert!(s1.iter().all(|&s| (0. ..=1.).contains(&s)));
        }
        // {0,1} is in 2 replicates out of 4
        let classic = aggregate_supports(&reference, &replicates, BootstrapMethod::Sumtrees);
        assert_eq!(classic[6], 0.5);
    }

    #[test]
    fn test_bootstrap_run() {
        log_init_test();
        let sigs = clustered_signatures();
        let refs: Vec<&Signature> = sigs.iter().collect();
        let sim_params = SimilarityParams::new(SimilarityScheme::PG, 1., 0.5);
        let sim = similarity_matrix(&refs, &sim_params, None).unwrap();
        let dist = DistanceMatrix::from_similarity(&sim, 1.);
        let reference = build_dendrogram(&dist, Linkage::Average).unwrap();
        let params = BootstrapParams::new(true, 20, BootstrapMethod::Sumtrees, 5);
        let cancel = AtomicBool::new(false);
        let s1 = bootstrap_supports(&refs, &sim_params, Linkage::Average, &reference, &params, &cancel).unwrap();
        let s2 = bootstrap_supports(&refs, &sim_params, Linkage::Average, &reference, &params, &cancel).unwrap();
        assert_eq!(s1, s2);
        assert_eq!(s1.len(), reference.get_nb_nodes());
        assert!(s1.iter().all(|&s| (0. ..=1.).contains(&s)));
        // the two clusters are separated on every column of G and on all P columns
        let root = reference.get_root();
        let (l, _) = reference.get_node(root).get_children().unwrap();
        assert_eq!(reference.get_node(l).get_nb_leaves(), 4);
        assert_eq!(s1[l], 1.);
    }

    #[test]
    fn test_cancelled() {
        let sigs = clustered_signatures();
        let refs: Vec<&Signature> = sigs.iter().collect();
        let sim_params = SimilarityParams::default();
        let sim = similarity_matrix(&refs, &sim_params, None).unwrap();
        let reference = build_dendrogram(&DistanceMatrix::from_similarity(&sim, 1.), Linkage::Average).unwrap();
        let cancel = AtomicBool::new(true);
        let res = bootstrap_supports(
            &refs,
            &sim_params,
            Linkage::Average,
            &reference,
            &BootstrapParams::default(),
            &cancel,
        );
        assert!(matches!(res, Err(ClassifyError::Cancelled(0))));
    }

    #[test]
    fn test_params() {
        assert!(BootstrapParams::default().validate().is_ok());
        assert!(BootstrapParams::new(true, 0, BootstrapMethod::Booster, 0).validate().is_err());
        assert!(BootstrapParams::new(false, 0, BootstrapMethod::Booster, 0).validate().is_ok());
        assert_eq!(BootstrapMethod::parse("sumtrees").unwrap(), BootstrapMethod::Sumtrees);
        assert!(BootstrapMethod::parse("felsenstein").is_err());
    }
} // end of mod tests
