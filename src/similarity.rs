//! generalised Jaccard similarities between virus signatures.
//!
//! For two non negative vectors u and v : GJ(u,v) = Σ min(u_i,v_i) / Σ max(u_i,v_i), 0 if both vectors are null.
//!
//! - GJ_P and GJ_G are the generalised Jaccard of the P and G vectors.
//! - GJ_L works on hit locations. For a profile i, let |A_i| and |B_i| be the lengths of the union of the hit
//!   intervals of each virus. The profile is credited min(|A_i|,|B_i|) if the intersection of the two unions
//!   covers at least a fraction *location_overlap* of the shorter union, otherwise nothing.
//!   GJ_L = Σ credit_i / Σ max(|A_i|,|B_i|).
//!
//! The composite score of a scheme is a single term or the geometric mean of two terms (PG, PL).
//! Distances are D = 1 - S^p.

use std::str::FromStr;

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::errors::ConfigError;
use crate::signature::{intersection_length, union_length, HitInterval, Signature, SignatureLayout};

/// Which generalised Jaccard terms enter the composite similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
pub enum SimilarityScheme {
    #[strum(serialize = "P")]
    P,
    #[strum(serialize = "G")]
    G,
    #[strum(serialize = "L")]
    L,
    #[strum(serialize = "PG")]
    PG,
    #[strum(serialize = "PL")]
    PL,
}

impl SimilarityScheme {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        SimilarityScheme::from_str(s).map_err(|_| ConfigError::UnknownScheme(s.to_string()))
    }
}

//=====================================================================================

/// parameters of similarity and distance computations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityParams {
    scheme: SimilarityScheme,
    /// distance transformation exponent, D = 1 - S^p
    p: f64,
    /// fraction of the shorter hit location union that must be overlapped to credit a profile in GJ_L
    location_overlap: f64,
}

impl Default for SimilarityParams {
    fn default() -> Self {
        SimilarityParams {
            scheme: SimilarityScheme::PG,
            p: 1.,
            location_overlap: 0.5,
        }
    }
}

impl SimilarityParams {
    pub fn new(scheme: SimilarityScheme, p: f64, location_overlap: f64) -> Self {
        SimilarityParams {
            scheme,
            p,
            location_overlap,
        }
    }

    pub fn get_scheme(&self) -> SimilarityScheme {
        self.scheme
    }

    pub fn get_p(&self) -> f64 {
        self.p
    }

    pub fn get_location_overlap(&self) -> f64 {
        self.location_overlap
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.p.is_nan() || self.p < 0. {
            return Err(ConfigError::Negative {
                name: "p",
                value: self.p,
            });
        }
        if !(0. ..=1.).contains(&self.location_overlap) {
            return Err(ConfigError::NotAFraction {
                name: "location_overlap",
                value: self.location_overlap,
            });
        }
        Ok(())
    }
} // end of impl SimilarityParams

//=====================================================================================

/// Columns of the P/L axis and of the G axis entering a computation.
/// A column may appear several times, this is how bootstrap pseudo replicates are expressed
/// without copying signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    profiles: Vec<usize>,
    group_models: Vec<usize>,
}

impl ColumnSelection {
    pub fn new(profiles: Vec<usize>, group_models: Vec<usize>) -> Self {
        ColumnSelection {
            profiles,
            group_models,
        }
    }

    /// draw with replacement as many columns as in the layout, on each axis
    pub fn resample<R: Rng>(layout: &SignatureLayout, rng: &mut R) -> Self {
        let nb_profiles = layout.get_nb_profiles();
        let nb_gom = layout.get_nb_group_models();
        let profiles = (0..nb_profiles).map(|_| rng.gen_range(0..nb_profiles)).collect();
        let group_models = (0..nb_gom).map(|_| rng.gen_range(0..nb_gom)).collect();
        ColumnSelection {
            profiles,
            group_models,
        }
    }

    pub fn get_profiles(&self) -> &[usize] {
        &self.profiles
    }

    pub fn get_group_models(&self) -> &[usize] {
        &self.group_models
    }
} // end of impl ColumnSelection

//=====================================================================================

#[inline]
fn gj_over<I: Iterator<Item = usize>>(u: &[f64], v: &[f64], cols: I) -> f64 {
    let mut num = 0.;
    let mut den = 0.;
    for i in cols {
        num += u[i].min(v[i]);
        den += u[i].max(v[i]);
    }
    if den > 0. {
        num / den
    } else {
        0.
    }
} // end of gj_over

fn location_gj_over<I: Iterator<Item = usize>>(
    a: &[Vec<HitInterval>],
    b: &[Vec<HitInterval>],
    overlap: f64,
    cols: I,
) -> f64 {
    let mut num = 0.;
    let mut den = 0.;
    for i in cols {
        let la = union_length(&a[i]);
        let lb = union_length(&b[i]);
        let (lmin, lmax) = if la <= lb { (la, lb) } else { (lb, la) };
        den += lmax;
        if lmin > 0. && intersection_length(&a[i], &b[i]) / lmin >= overlap {
            num += lmin;
        }
    }
    if den > 0. {
        num / den
    } else {
        0.
    }
} // end of location_gj_over

/// generalised Jaccard similarity of two non negative vectors of equal length
pub fn generalized_jaccard(u: &[f64], v: &[f64]) -> Result<f64, ConfigError> {
    if u.len() != v.len() {
        return Err(ConfigError::LengthMismatch {
            entity: String::from("vector"),
            axis: "GJ",
            expected: u.len(),
            got: v.len(),
        });
    }
    Ok(gj_over(u, v, 0..u.len()))
}

/// GJ_L between the location vectors of two signatures sharing a layout
pub fn location_jaccard(a: &Signature, b: &Signature, location_overlap: f64) -> Result<f64, ConfigError> {
    check_layout(a, b)?;
    let n = a.get_locations().len();
    Ok(location_gj_over(
        a.get_locations(),
        b.get_locations(),
        location_overlap,
        0..n,
    ))
}

fn check_layout(a: &Signature, b: &Signature) -> Result<(), ConfigError> {
    if !a.shares_layout(b) {
        return Err(ConfigError::LayoutMismatch(
            format!("{:?}", a.get_layout().get_profiles().first()),
            format!("{:?}", b.get_layout().get_profiles().first()),
        ));
    }
    Ok(())
}

fn term_p(a: &Signature, b: &Signature, cols: Option<&ColumnSelection>) -> f64 {
    let (u, v) = (a.get_pscores(), b.get_pscores());
    match cols {
        None => gj_over(u, v, 0..u.len()),
        Some(c) => gj_over(u, v, c.profiles.iter().copied()),
    }
}

fn term_g(a: &Signature, b: &Signature, cols: Option<&ColumnSelection>) -> f64 {
    let (u, v) = (a.get_gscores(), b.get_gscores());
    match cols {
        None => gj_over(u, v, 0..u.len()),
        Some(c) => gj_over(u, v, c.group_models.iter().copied()),
    }
}

fn term_l(a: &Signature, b: &Signature, overlap: f64, cols: Option<&ColumnSelection>) -> f64 {
    let (u, v) = (a.get_locations(), b.get_locations());
    match cols {
        None => location_gj_over(u, v, overlap, 0..u.len()),
        Some(c) => location_gj_over(u, v, overlap, c.profiles.iter().copied()),
    }
}

/// composite score, signatures are assumed to share their layout
pub(crate) fn composite_over(
    a: &Signature,
    b: &Signature,
    params: &SimilarityParams,
    cols: Option<&ColumnSelection>,
) -> f64 {
    let s = match params.scheme {
        SimilarityScheme::P => term_p(a, b, cols),
        SimilarityScheme::G => term_g(a, b, cols),
        SimilarityScheme::L => term_l(a, b, params.location_overlap, cols),
        SimilarityScheme::PG => (term_p(a, b, cols) * term_g(a, b, cols)).sqrt(),
        SimilarityScheme::PL => {
            (term_p(a, b, cols) * term_l(a, b, params.location_overlap, cols)).sqrt()
        }
    };
    s.clamp(0., 1.)
} // end of composite_over

/// composite similarity in [0,1] of two signatures under the scheme of params
pub fn composite(a: &Signature, b: &Signature, params: &SimilarityParams) -> Result<f64, ConfigError> {
    check_layout(a, b)?;
    Ok(composite_over(a, b, params, None))
}

/// D = 1 - s^p.
/// The limits p = 0 and p = ∞ both collapse to a star : 1 for all s < 1 and 0 for exact matches (s = 1).
pub fn transform_distance(s: f64, p: f64) -> f64 {
    let s = s.clamp(0., 1.);
    if p == 1. {
        1. - s
    } else if p == 0. || p.is_infinite() {
        if s >= 1. {
            0.
        } else {
            1.
        }
    } else {
        (1. - s.powf(p)).clamp(0., 1.)
    }
} // end of transform_distance

//=====================================================================================

/// A symmetric matrix stored row major
// all rows must have length rows.len() before entries are cross checked
fn check_square(rows: &[Vec<f64>], name: &str, axis: &'static str) -> Result<(), ConfigError> {
    let dim = rows.len();
    match rows.iter().position(|row| row.len() != dim) {
        Some(i) => Err(ConfigError::LengthMismatch {
            entity: format!("{} row {}", name, i),
            axis,
            expected: dim,
            got: rows[i].len(),
        }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    dim: usize,
    data: Vec<f64>,
}

impl SimilarityMatrix {
    /// build from explicit rows, checking shape, symmetry and range
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ConfigError> {
        check_square(rows, "similarity", "S")?;
        let dim = rows.len();
        let mut data = Vec::<f64>::with_capacity(dim * dim);
        for (i, row) in rows.iter().enumerate() {
            for (j, &s) in row.iter().enumerate() {
                if !(0. ..=1.).contains(&s) || s != rows[j][i] {
                    return Err(ConfigError::NotAFraction {
                        name: "similarity",
                        value: s,
                    });
                }
            }
            data.extend_from_slice(row);
        }
        Ok(SimilarityMatrix { dim, data })
    } // end of from_rows

    pub fn get_dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.dim + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }
} // end of impl SimilarityMatrix

/// composite similarities between all pairs of signatures. The diagonal is set to 1.
/// Rows are computed in parallel in the current rayon pool, the result does not depend on scheduling.
pub fn similarity_matrix(
    signatures: &[&Signature],
    params: &SimilarityParams,
    cols: Option<&ColumnSelection>,
) -> Result<SimilarityMatrix, ConfigError> {
    let dim = signatures.len();
    if let Some(first) = signatures.first() {
        for s in signatures.iter().skip(1) {
            check_layout(first, s)?;
        }
    }
    let upper: Vec<Vec<f64>> = (0..dim)
        .into_par_iter()
        .map(|i| {
            (i + 1..dim)
                .map(|j| composite_over(signatures[i], signatures[j], params, cols))
                .collect()
        })
        .collect();
    let mut data = vec![0.; dim * dim];
    for (i, row) in upper.iter().enumerate() {
        data[i * dim + i] = 1.;
        for (k, &s) in row.iter().enumerate() {
            let j = i + 1 + k;
            data[i * dim + j] = s;
            data[j * dim + i] = s;
        }
    }
    log::trace!("similarity_matrix computed, dim : {}", dim);
    Ok(SimilarityMatrix { dim, data })
} // end of similarity_matrix

//=====================================================================================

/// square symmetric matrix with zero diagonal, entries in [0,1]
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    dim: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// D = 1 - S^p, diagonal forced to 0
    pub fn from_similarity(sim: &SimilarityMatrix, p: f64) -> Self {
        let dim = sim.dim;
        let mut data: Vec<f64> = sim.data.iter().map(|&s| transform_distance(s, p)).collect();
        for i in 0..dim {
            data[i * dim + i] = 0.;
        }
        DistanceMatrix { dim, data }
    }

    /// build from explicit rows, checking shape, symmetry, zero diagonal and range
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ConfigError> {
        check_square(rows, "distance", "D")?;
        let dim = rows.len();
        let mut data = Vec::<f64>::with_capacity(dim * dim);
        for (i, row) in rows.iter().enumerate() {
            for (j, &d) in row.iter().enumerate() {
                if !(0. ..=1.).contains(&d) || d != rows[j][i] || (i == j && d != 0.) {
                    return Err(ConfigError::NotAFraction {
                        name: "distance",
                        value: d,
                    });
                }
            }
            data.extend_from_slice(row);
        }
        Ok(DistanceMatrix { dim, data })
    } // end of from_rows

    pub fn get_dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.dim + j]
    }
} // end of impl DistanceMatrix

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn layout(nbp: usize, nbg: usize) -> Arc<SignatureLayout> {
        Arc::new(SignatureLayout::new(
            (0..nbp).map(|i| format!("pphmm_{}", i)).collect(),
            (0..nbg).map(|i| format!("gom_{}", i)).collect(),
        ))
    }

    fn itv(s: f64, e: f64) -> HitInterval {
        HitInterval::new(s, e).unwrap()
    }

    #[test]
    fn test_gj_properties() {
        let u = [3., 0., 1.5, 2.];
        let v = [1., 4., 0., 2.];
        assert_eq!(generalized_jaccard(&u, &u).unwrap(), 1.);
        assert_eq!(
            generalized_jaccard(&u, &v).unwrap(),
            generalized_jaccard(&v, &u).unwrap()
        );
        // (1 + 0 + 0 + 2) / (3 + 4 + 1.5 + 2)
        let expected = 3. / 10.5;
        assert!((generalized_jaccard(&u, &v).unwrap() - expected).abs() < 1.0e-15);
        // disjoint supports
        let w = [0., 5., 0., 0.];
        let z = [2., 0., 0., 1.];
        assert_eq!(generalized_jaccard(&w, &z).unwrap(), 0.);
        // no signal
        assert_eq!(generalized_jaccard(&[0., 0.], &[0., 0.]).unwrap(), 0.);
        assert!(generalized_jaccard(&[1.], &[1., 2.]).is_err());
    }

    #[test]
    fn test_location_overlap_rule() {
        let lay = layout(2, 0);
        // profile 0 : [0,10] vs [4,12] overlap 6 over shorter 8 -> credited 8
        // profile 1 : [0,10] vs [8,18] overlap 2 over 10 -> not credited
        let a = Signature::new(&lay, "a", vec![1., 1.], vec![vec![itv(0., 10.)], vec![itv(0., 10.)]], vec![]).unwrap();
        let b = Signature::new(&lay, "b", vec![1., 1.], vec![vec![itv(4., 12.)], vec![itv(8., 18.)]], vec![]).unwrap();
        let gjl = location_jaccard(&a, &b, 0.5).unwrap();
        assert!((gjl - 8. / 20.).abs() < 1.0e-15);
        assert_eq!(location_jaccard(&a, &a, 0.5).unwrap(), 1.);
        // with a null overlap requirement, any intersection credits
        let gjl0 = location_jaccard(&a, &b, 0.).unwrap();
        assert!((gjl0 - 18. / 20.).abs() < 1.0e-15);
    }

    #[test]
    fn test_composite_schemes() {
        let lay = layout(3, 2);
        let a = Signature::new(&lay, "a", vec![2., 1., 0.], vec![vec![], vec![], vec![]], vec![1., 1.]).unwrap();
        let b = Signature::new(&lay, "b", vec![1., 1., 1.], vec![vec![], vec![], vec![]], vec![1., 3.]).unwrap();
        let gjp = generalized_jaccard(a.get_pscores(), b.get_pscores()).unwrap();
        let gjg = generalized_jaccard(a.get_gscores(), b.get_gscores()).unwrap();
        let p_params = SimilarityParams::new(SimilarityScheme::P, 1., 0.5);
        assert_eq!(composite(&a, &b, &p_params).unwrap(), gjp);
        let pg_params = SimilarityParams::new(SimilarityScheme::PG, 1., 0.5);
        let pg = composite(&a, &b, &pg_params).unwrap();
        assert_eq!(pg, (gjp * gjg).sqrt());
        assert!((0. ..=1.).contains(&pg));
        // no location at all : GJ_L is 0 so PL is 0
        let pl_params = SimilarityParams::new(SimilarityScheme::PL, 1., 0.5);
        assert_eq!(composite(&a, &b, &pl_params).unwrap(), 0.);
    }

    #[test]
    fn test_location_schemes() {
        let lay = layout(2, 1);
        // same intervals as in test_location_overlap_rule, GJ_L = 8 / 20
        let a = Signature::new(&lay, "a", vec![2., 1.], vec![vec![itv(0., 10.)], vec![itv(0., 10.)]], vec![1.]).unwrap();
        let b = Signature::new(&lay, "b", vec![1., 1.], vec![vec![itv(4., 12.)], vec![itv(8., 18.)]], vec![1.]).unwrap();
        let gjl = location_jaccard(&a, &b, 0.5).unwrap();
        assert!(gjl > 0.);
        let l_params = SimilarityParams::new(SimilarityScheme::L, 1., 0.5);
        assert_eq!(composite(&a, &b, &l_params).unwrap(), gjl);
        // GJ_P = 2 / 3
        let gjp = generalized_jaccard(a.get_pscores(), b.get_pscores()).unwrap();
        assert!((gjp - 2. / 3.).abs() < 1.0e-15);
        let pl_params = SimilarityParams::new(SimilarityScheme::PL, 1., 0.5);
        let pl = composite(&a, &b, &pl_params).unwrap();
        assert_eq!(pl, (gjp * gjl).sqrt());
        assert!((pl - (2. / 3. * 0.4f64).sqrt()).abs() < 1.0e-12);
    }

    #[test]
    fn test_layout_mismatch() {
        let a = Signature::new(&layout(1, 0), "a", vec![1.], vec![vec![]], vec![]).unwrap();
        let other = Arc::new(SignatureLayout::new(vec!["x".into()], vec![]));
        let b = Signature::new(&other, "b", vec![1.], vec![vec![]], vec![]).unwrap();
        assert!(matches!(
            composite(&a, &b, &SimilarityParams::default()),
            Err(ConfigError::LayoutMismatch(_, _))
        ));
    }

    #[test]
    fn test_scheme_parse() {
        assert_eq!(SimilarityScheme::parse("PL").unwrap(), SimilarityScheme::PL);
        assert!(matches!(
            SimilarityScheme::parse("PGL"),
            Err(ConfigError::UnknownScheme(_))
        ));
        assert_eq!(SimilarityScheme::PG.to_string(), "PG");
    }

    #[test]
    fn test_distance_transform() {
        for s in [0., 0.1, 0.37, 0.5, 0.99, 1.] {
            assert_eq!(transform_distance(s, 1.), 1. - s);
        }
        // monotone in p for s < 1 and p > 0
        let s = 0.6;
        let mut previous = transform_distance(s, 0.25);
        for p in [0.5, 1., 2., 5., 50., 1.0e10, f64::INFINITY] {
            let d = transform_distance(s, p);
            assert!(d >= previous, "p = {} d = {} previous = {}", p, d, previous);
            previous = d;
        }
        assert_eq!(transform_distance(0.3, 0.), 1.);
        assert_eq!(transform_distance(0., 0.), 1.);
        assert_eq!(transform_distance(1., 0.), 0.);
        assert_eq!(transform_distance(0.3, f64::INFINITY), 1.);
        assert_eq!(transform_distance(1., f64::INFINITY), 0.);
        assert_eq!(transform_distance(1., 1.0e300), 0.);
    }

    #[test]
    fn test_params_validation() {
        assert!(SimilarityParams::default().validate().is_ok());
        assert!(SimilarityParams::new(SimilarityScheme::P, -1., 0.5).validate().is_err());
        assert!(SimilarityParams::new(SimilarityScheme::P, f64::NAN, 0.5).validate().is_err());
        assert!(SimilarityParams::new(SimilarityScheme::P, 1., 1.5).validate().is_err());
    }

    #[test]
    fn test_matrices() {
        let lay = layout(3, 1);
        let sigs: Vec<Signature> = vec![
            Signature::new(&lay, "a", vec![1., 0., 2.], vec![vec![], vec![], vec![]], vec![1.]).unwrap(),
            Signature::new(&lay, "b", vec![1., 1., 2.], vec![vec![], vec![], vec![]], vec![2.]).unwrap(),
            Signature::new(&lay, "c", vec![0., 3., 0.], vec![vec![], vec![], vec![]], vec![0.]).unwrap(),
        ];
        let refs: Vec<&Signature> = sigs.iter().collect();
        let params = SimilarityParams::new(SimilarityScheme::P, 2., 0.5);
        let sim = similarity_matrix(&refs, &params, None).unwrap();
        assert_eq!(sim.get_dim(), 3);
        for i in 0..3 {
            assert_eq!(sim.get(i, i), 1.);
            for j in 0..3 {
                assert_eq!(sim.get(i, j), sim.get(j, i));
            }
        }
        assert_eq!(sim.get(0, 1), 0.75);
        let dist = DistanceMatrix::from_similarity(&sim, params.get_p());
        assert_eq!(dist.get(0, 1), 1. - 0.75 * 0.75);
        assert_eq!(dist.get(2, 2), 0.);
        assert_eq!(dist.get(0, 2), 1.);
    }

    #[test]
    fn test_resampled_columns() {
        let lay = layout(4, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let cols = ColumnSelection::resample(&lay, &mut rng);
        assert_eq!(cols.get_profiles().len(), 4);
        assert_eq!(cols.get_group_models().len(), 2);
        assert!(cols.get_profiles().iter().all(|&c| c < 4));
        // selecting all columns once is the plain computation
        let a = Signature::new(&lay, "a", vec![1., 2., 0., 1.], vec![vec![]; 4], vec![1., 0.]).unwrap();
        let b = Signature::new(&lay, "b", vec![2., 2., 1., 0.], vec![vec![]; 4], vec![1., 1.]).unwrap();
        let all = ColumnSelection::new(vec![0, 1, 2, 3], vec![0, 1]);
        let params = SimilarityParams::default();
        assert_eq!(
            composite_over(&a, &b, &params, Some(&all)),
            composite(&a, &b, &params).unwrap()
        );
        // duplicated column counts twice
        let dup = ColumnSelection::new(vec![0, 0, 0, 0], vec![0, 0]);
        let p_params = SimilarityParams::new(SimilarityScheme::P, 1., 0.5);
        assert_eq!(composite_over(&a, &b, &p_params, Some(&dup)), 0.5);
    }

    #[test]
    fn test_distance_from_rows() {
        let ok = DistanceMatrix::from_rows(&[vec![0., 0.4], vec![0.4, 0.]]);
        assert!(ok.is_ok());
        let asym = DistanceMatrix::from_rows(&[vec![0., 0.4], vec![0.3, 0.]]);
        assert!(asym.is_err());
        let not_square = DistanceMatrix::from_rows(&[vec![0., 0.4]]);
        assert!(not_square.is_err());
        // a short row after a complete one is reported, not read past its end
        let ragged = vec![vec![0., 0.4, 0.5], vec![0.4, 0., 0.3], vec![]];
        match DistanceMatrix::from_rows(&ragged) {
            Err(ConfigError::LengthMismatch { expected, got, .. }) => {
                assert_eq!(expected, 3);
                assert_eq!(got, 0);
            }
            other => panic!("unexpected {:?}", other),
        }
        let ragged_sim = vec![vec![1., 0.4, 0.5], vec![0.4, 1.], vec![0.5, 0.3, 1.]];
        assert!(matches!(
            SimilarityMatrix::from_rows(&ragged_sim),
            Err(ConfigError::LengthMismatch { got: 2, .. })
        ));
    }
} // end of mod tests
