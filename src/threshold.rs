//! per group acceptance thresholds.
//!
//! For each reference group we gather an intra population (scores between two distinct members)
//! and an inter population (scores between a member and a reference outside the group).
//! A one dimensional soft margin linear svm, with class balanced weights, separates them.
//! The threshold is the point where the decision function w.x + b vanishes.
//!
//! The offset b is exact for a given slope : the objective is convex piecewise linear in b and
//! every hinge breakpoint raises its slope by the weight of the point, so the minimum sits at the
//! weighted median of breakpoints. The slope w is found by golden section search on ln(w).

use std::collections::BTreeMap;
use std::str::FromStr;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::errors::{ClassifyError, ConfigError, Warning};
use crate::similarity::SimilarityMatrix;

/// how pairs of references are chosen to build score populations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
pub enum PairSampling {
    /// uniform draws with replacement, at most n_pairs per population
    #[strum(serialize = "random")]
    Random,
    /// every available pair
    #[strum(serialize = "exhaustive")]
    Exhaustive,
}

impl PairSampling {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        PairSampling::from_str(s).map_err(|_| ConfigError::UnknownSampling(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdParams {
    /// number of pairs drawn per population in random sampling
    n_pairs: usize,
    sampling: PairSampling,
    /// svm regularisation
    svm_c: f64,
    seed: u64,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        ThresholdParams {
            n_pairs: 10000,
            sampling: PairSampling::Random,
            svm_c: 1.,
            seed: 0,
        }
    }
}

impl ThresholdParams {
    pub fn new(n_pairs: usize, sampling: PairSampling, svm_c: f64, seed: u64) -> Self {
        ThresholdParams {
            n_pairs,
            sampling,
            svm_c,
            seed,
        }
    }

    pub fn get_n_pairs(&self) -> usize {
        self.n_pairs
    }

    pub fn get_sampling(&self) -> PairSampling {
        self.sampling
    }

    pub fn get_svm_c(&self) -> f64 {
        self.svm_c
    }

    pub fn get_seed(&self) -> u64 {
        self.seed
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_pairs == 0 {
            return Err(ConfigError::NonPositive("n_pairs"));
        }
        if !(self.svm_c > 0.) || !self.svm_c.is_finite() {
            return Err(ConfigError::NonPositive("svm_c"));
        }
        Ok(())
    }
} // end of impl ThresholdParams

//=====================================================================================

/// outcome of threshold estimation for one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GroupThreshold {
    Fitted {
        threshold: f64,
        n_intra: usize,
        n_inter: usize,
        mean_intra: f64,
        mean_inter: f64,
        /// true if the svm slope collapsed and the threshold is the midpoint of means
        fallback: bool,
    },
    Untestable {
        reason: String,
    },
}

impl GroupThreshold {
    /// the threshold if the group could be fitted
    pub fn get_threshold(&self) -> Option<f64> {
        match self {
            GroupThreshold::Fitted { threshold, .. } => Some(*threshold),
            GroupThreshold::Untestable { .. } => None,
        }
    }
} // end of impl GroupThreshold

/// thresholds of all groups of a reference population, ordered by group name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    thresholds: BTreeMap<String, GroupThreshold>,
}

impl ThresholdTable {
    pub fn get(&self, group: &str) -> Option<&GroupThreshold> {
        self.thresholds.get(group)
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &GroupThreshold)> {
        self.thresholds.iter()
    }

    /// degraded outcomes of the estimation
    pub fn warnings(&self) -> Vec<Warning> {
        self.thresholds
            .iter()
            .filter_map(|(group, t)| match t {
                GroupThreshold::Untestable { reason } => Some(Warning::UntestableGroup {
                    group: group.clone(),
                    reason: reason.clone(),
                }),
                GroupThreshold::Fitted { fallback: true, .. } => {
                    Some(Warning::ThresholdFallback { group: group.clone() })
                }
                _ => None,
            })
            .collect()
    }
} // end of impl ThresholdTable

//=====================================================================================

const LN_W_MIN: f64 = -13.815510557964274; // ln(1.e-6)
const LN_W_MAX: f64 = 13.815510557964274;
const GOLDEN_ITER: usize = 100;
// below this slope the boundary is considered collapsed
const W_COLLAPSE: f64 = 1.0e-5;

struct Svm1d {
    // (score, label +1 / -1, weight)
    points: Vec<(f64, f64, f64)>,
}

impl Svm1d {
    fn new(intra: &[f64], inter: &[f64], svm_c: f64) -> Self {
        let n = (intra.len() + inter.len()) as f64;
        let c_intra = svm_c * n / (2. * intra.len() as f64);
        let c_inter = svm_c * n / (2. * inter.len() as f64);
        let points = intra
            .iter()
            .map(|&x| (x, 1., c_intra))
            .chain(inter.iter().map(|&x| (x, -1., c_inter)))
            .collect();
        Svm1d { points }
    }

    fn objective(&self, w: f64, b: f64) -> f64 {
        let hinge: f64 = self
            .points
            .iter()
            .map(|&(x, y, c)| c * (1. - y * (w * x + b)).max(0.))
            .sum();
        0.5 * w * w + hinge
    }

    /// exact minimiser in b for a fixed slope
    fn optimal_offset(&self, w: f64) -> f64 {
        // positive point active for b < 1 - w.x, negative point active for b > -1 - w.x
        let mut breakpoints: Vec<(f64, f64)> = self
            .points
            .iter()
            .map(|&(x, y, c)| (y - w * x, c))
            .collect();
        breakpoints.sort_by(|a, b| a.0.total_cmp(&b.0));
        let total_pos: f64 = self.points.iter().filter(|p| p.1 > 0.).map(|p| p.2).sum();
        let total: f64 = self.points.iter().map(|p| p.2).sum();
        let eps = 1.0e-12 * total;
        let mut slope = -total_pos;
        for (k, &(beta, c)) in breakpoints.iter().enumerate() {
            slope += c;
            if slope.abs() <= eps {
                // flat from this breakpoint to the next
                return match breakpoints.get(k + 1) {
                    Some(&(next, _)) => 0.5 * (beta + next),
                    None => beta,
                };
            }
            if slope > 0. {
                return beta;
            }
        }
        breakpoints.last().map(|b| b.0).unwrap_or(0.)
    } // end of optimal_offset

    fn profile(&self, ln_w: f64) -> f64 {
        let w = ln_w.exp();
        self.objective(w, self.optimal_offset(w))
    }

    fn fit(&self) -> (f64, f64) {
        let ratio = 0.5 * (5f64.sqrt() - 1.);
        let (mut a, mut b) = (LN_W_MIN, LN_W_MAX);
        let mut x1 = b - ratio * (b - a);
        let mut x2 = a + ratio * (b - a);
        let mut f1 = self.profile(x1);
        let mut f2 = self.profile(x2);
        for _ in 0..GOLDEN_ITER {
            if f1 <= f2 {
                b = x2;
                x2 = x1;
                f2 = f1;
                x1 = b - ratio * (b - a);
                f1 = self.profile(x1);
            } else {
                a = x1;
                x1 = x2;
                f1 = f2;
                x2 = a + ratio * (b - a);
                f2 = self.profile(x2);
            }
        }
        let w = (0.5 * (a + b)).exp();
        (w, self.optimal_offset(w))
    } // end of fit
} // end of impl Svm1d

/// fits a 1-d class balanced soft margin svm, intra scores labelled +1. Returns (w, b).
/// Both populations must be non empty.
pub fn fit_linear_svm(intra: &[f64], inter: &[f64], svm_c: f64) -> (f64, f64) {
    Svm1d::new(intra, inter, svm_c).fit()
}

fn mean(v: &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

//=====================================================================================

fn intra_population(
    members: &[usize],
    sim: &SimilarityMatrix,
    params: &ThresholdParams,
    rng: &mut ChaCha8Rng,
) -> Vec<f64> {
    let m = members.len();
    let nb_pairs = m * (m - 1) / 2;
    if params.sampling == PairSampling::Exhaustive || params.n_pairs >= nb_pairs {
        let mut scores = Vec::<f64>::with_capacity(nb_pairs);
        for (k, &i) in members.iter().enumerate() {
            for &j in &members[k + 1..] {
                scores.push(sim.get(i, j));
            }
        }
        return scores;
    }
    (0..params.n_pairs)
        .map(|_| {
            let a = rng.gen_range(0..m);
            let mut b = rng.gen_range(0..m - 1);
            if b >= a {
                b += 1;
            }
            sim.get(members[a], members[b])
        })
        .collect()
} // end of intra_population

fn inter_population(
    members: &[usize],
    outsiders: &[usize],
    sim: &SimilarityMatrix,
    params: &ThresholdParams,
    rng: &mut ChaCha8Rng,
) -> Vec<f64> {
    let nb_pairs = members.len() * outsiders.len();
    if params.sampling == PairSampling::Exhaustive || params.n_pairs >= nb_pairs {
        return members
            .iter()
            .flat_map(|&i| outsiders.iter().map(move |&j| sim.get(i, j)))
            .collect();
    }
    (0..params.n_pairs)
        .map(|_| {
            let i = members[rng.gen_range(0..members.len())];
            let j = outsiders[rng.gen_range(0..outsiders.len())];
            sim.get(i, j)
        })
        .collect()
} // end of inter_population

fn check_populations(group: &str, members: &[usize], outsiders: &[usize]) -> Result<(), ClassifyError> {
    let reason = if members.len() < 2 {
        "fewer than 2 members"
    } else if outsiders.is_empty() {
        "no reference outside group"
    } else {
        return Ok(());
    };
    Err(ClassifyError::InsufficientData {
        group: group.to_string(),
        reason: reason.to_string(),
    })
}

fn estimate_group(
    rank: usize,
    group: &str,
    labels: &[&str],
    sim: &SimilarityMatrix,
    params: &ThresholdParams,
) -> GroupThreshold {
    let members: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == group).collect();
    let outsiders: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] != group).collect();
    if let Err(e) = check_populations(group, &members, &outsiders) {
        log::debug!("{}", e);
        let reason = match e {
            ClassifyError::InsufficientData { reason, .. } => reason,
            other => other.to_string(),
        };
        return GroupThreshold::Untestable { reason };
    }
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    rng.set_stream(rank as u64);
    let intra = intra_population(&members, sim, params, &mut rng);
    let inter = inter_population(&members, &outsiders, sim, params, &mut rng);
    let mean_intra = mean(&intra);
    let mean_inter = mean(&inter);
    let (w, b) = fit_linear_svm(&intra, &inter, params.svm_c);
    let mut threshold = -b / w;
    let fallback = w <= W_COLLAPSE || !threshold.is_finite() || !(0. ..=1.).contains(&threshold);
    if fallback {
        log::warn!(
            "group {} : svm boundary collapsed (w = {:.3e}), using midpoint of means",
            group,
            w
        );
        threshold = 0.5 * (mean_intra + mean_inter);
    }
    log::debug!(
        "group {} threshold {:.4e}, nb intra {} mean {:.4e}, nb inter {} mean {:.4e}",
        group,
        threshold,
        intra.len(),
        mean_intra,
        inter.len(),
        mean_inter
    );
    GroupThreshold::Fitted {
        threshold,
        n_intra: intra.len(),
        n_inter: inter.len(),
        mean_intra,
        mean_inter,
        fallback,
    }
} // end of estimate_group

/// Estimates thresholds for every group of references.
/// labels\[i\] is the group of the reference at row i of sim, references come first in sim.
/// Groups are processed in parallel in the current rayon pool, each with its own random stream.
pub fn estimate_thresholds(labels: &[&str], sim: &SimilarityMatrix, params: &ThresholdParams) -> ThresholdTable {
    let mut groups: Vec<&str> = labels.to_vec();
    groups.sort_unstable();
    groups.dedup();
    log::info!("estimating thresholds for {} groups", groups.len());
    let thresholds: BTreeMap<String, GroupThreshold> = groups
        .par_iter()
        .enumerate()
        .map(|(rank, &group)| (group.to_string(), estimate_group(rank, group, labels, sim, params)))
        .collect();
    let table = ThresholdTable { thresholds };
    for w in table.warnings() {
        log::warn!("{}", w);
    }
    table
} // end of estimate_thresholds

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    // groups A (0..5) and B (5..10), similarity high inside groups, low across, C a singleton
    fn two_groups_and_singleton() -> (Vec<&'static str>, SimilarityMatrix) {
        let mut labels = vec!["A"; 5];
        labels.extend(vec!["B"; 5]);
        labels.push("C");
        let n = labels.len();
        let mut rows = vec![vec![0.; n]; n];
        for i in 0..n {
            for j in 0..n {
                rows[i][j] = if i == j {
                    1.
                } else if labels[i] == labels[j] {
                    0.85 + 0.05 * ((i + j) % 3) as f64
                } else {
                    0.05 + 0.05 * ((i + j) % 3) as f64
                };
            }
        }
        (labels, SimilarityMatrix::from_rows(&rows).unwrap())
    }

    #[test]
    fn test_svm_symmetric_populations() {
        log_init_test();
        let intra = vec![0.9; 10];
        let inter = vec![0.1; 10];
        let (w, b) = fit_linear_svm(&intra, &inter, 1.);
        assert!(w > 0.);
        let threshold = -b / w;
        assert!((threshold - 0.5).abs() < 1.0e-9, "threshold {}", threshold);
    }

    #[test]
    fn test_threshold_between_means() {
        log_init_test();
        let (labels, sim) = two_groups_and_singleton();
        for sampling in [PairSampling::Exhaustive, PairSampling::Random] {
            let params = ThresholdParams::new(50, sampling, 1., 17);
            let table = estimate_thresholds(&labels, &sim, &params);
            assert_eq!(table.len(), 3);
            for group in ["A", "B"] {
                match table.get(group).unwrap() {
                    GroupThreshold::Fitted {
                        threshold,
                        mean_intra,
                        mean_inter,
                        fallback,
                        ..
                    } => {
                        assert!(!fallback);
                        assert!(*mean_inter < *threshold && *threshold < *mean_intra);
                        assert!(*threshold > 0.15 && *threshold < 0.85, "threshold {}", threshold);
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
            assert!(matches!(table.get("C"), Some(GroupThreshold::Untestable { .. })));
            assert_eq!(table.warnings().len(), 1);
        }
    }

    #[test]
    fn test_single_group_untestable() {
        let labels = vec!["A", "A"];
        let sim = SimilarityMatrix::from_rows(&[vec![1., 0.8], vec![0.8, 1.]]).unwrap();
        let table = estimate_thresholds(&labels, &sim, &ThresholdParams::default());
        assert!(table.get("A").unwrap().get_threshold().is_none());
    }

    #[test]
    fn test_random_sampling_reproducible() {
        let (labels, sim) = two_groups_and_singleton();
        let params = ThresholdParams::new(7, PairSampling::Random, 1., 3);
        let t1 = estimate_thresholds(&labels, &sim, &params);
        let t2 = estimate_thresholds(&labels, &sim, &params);
        assert_eq!(t1, t2);
        match t1.get("A").unwrap() {
            GroupThreshold::Fitted { n_intra, n_inter, .. } => {
                assert_eq!(*n_intra, 7);
                assert_eq!(*n_inter, 7);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_overlapping_populations_fallback() {
        // identical populations, no slope can separate them
        let labels = vec!["A", "A", "A", "B", "B", "B"];
        let sim = SimilarityMatrix::from_rows(&vec![vec![0.5; 6]; 6]).unwrap();
        let table = estimate_thresholds(&labels, &sim, &ThresholdParams::new(10, PairSampling::Exhaustive, 1., 0));
        match table.get("A").unwrap() {
            GroupThreshold::Fitted { threshold, fallback, .. } => {
                assert!(*fallback);
                assert!((threshold - 0.5).abs() < 1.0e-12);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(table
            .warnings()
            .contains(&Warning::ThresholdFallback { group: "A".into() }));
    }

    #[test]
    fn test_params() {
        assert!(ThresholdParams::default().validate().is_ok());
        assert!(ThresholdParams::new(0, PairSampling::Random, 1., 0).validate().is_err());
        assert!(ThresholdParams::new(10, PairSampling::Random, 0., 0).validate().is_err());
        assert_eq!(PairSampling::parse("exhaustive").unwrap(), PairSampling::Exhaustive);
        assert!(PairSampling::parse("balance").is_err());
    }
} // end of mod tests
