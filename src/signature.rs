//! signatures of viruses as produced by the annotation stage.
//!
//! A virus is represented by 3 vectors :
//! - P : scores of hits against an ordered set of profile models (PPHMM),
//! - L : for each profile of the same ordered set, the locations (intervals) of hits,
//! - G : scores against group overall models (GOM).
//!
//! The ordering of profiles and group models is the join key between vectors of different viruses.
//! It is made explicit by [SignatureLayout] : a signature can only be built through a layout
//! that checks lengths, and two signatures can only be compared if they share the same layout.

use std::sync::Arc;

use crate::errors::ConfigError;

/// A closed interval of a hit location, in genome coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitInterval {
    start: f64,
    end: f64,
}

impl HitInterval {
    pub fn new(start: f64, end: f64) -> Result<Self, ConfigError> {
        if !start.is_finite() || !end.is_finite() || start > end {
            return Err(ConfigError::BadInterval(start, end));
        }
        Ok(HitInterval { start, end })
    }

    pub fn get_start(&self) -> f64 {
        self.start
    }

    pub fn get_end(&self) -> f64 {
        self.end
    }

    pub fn len(&self) -> f64 {
        self.end - self.start
    }
} // end of impl HitInterval

/// sort intervals and merge overlapping ones so that length of union is a plain sum.
fn normalize_intervals(mut intervals: Vec<HitInterval>) -> Vec<HitInterval> {
    if intervals.len() <= 1 {
        return intervals;
    }
    intervals.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));
    let mut merged = Vec::<HitInterval>::with_capacity(intervals.len());
    for itv in intervals {
        match merged.last_mut() {
            Some(last) if itv.start <= last.end => {
                last.end = last.end.max(itv.end);
            }
            _ => merged.push(itv),
        }
    }
    merged
} // end of normalize_intervals

/// length of the union of a normalized interval set
pub(crate) fn union_length(intervals: &[HitInterval]) -> f64 {
    intervals.iter().map(|i| i.len()).sum()
}

/// length of the intersection of two normalized interval sets (two pointers sweep)
pub(crate) fn intersection_length(a: &[HitInterval], b: &[HitInterval]) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut inter = 0.;
    while i < a.len() && j < b.len() {
        let lo = a[i].start.max(b[j].start);
        let hi = a[i].end.min(b[j].end);
        if hi > lo {
            inter += hi - lo;
        }
        if a[i].end < b[j].end {
            i += 1;
        } else {
            j += 1;
        }
    }
    inter
} // end of intersection_length

//=====================================================================================

/// ordered identifiers of the profiles (P and L axis) and group models (G axis) of a reference database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureLayout {
    profiles: Vec<String>,
    group_models: Vec<String>,
}

impl SignatureLayout {
    pub fn new(profiles: Vec<String>, group_models: Vec<String>) -> Self {
        SignatureLayout {
            profiles,
            group_models,
        }
    }

    pub fn get_nb_profiles(&self) -> usize {
        self.profiles.len()
    }

    pub fn get_nb_group_models(&self) -> usize {
        self.group_models.len()
    }

    pub fn get_profiles(&self) -> &[String] {
        &self.profiles
    }

    pub fn get_group_models(&self) -> &[String] {
        &self.group_models
    }
} // end of impl SignatureLayout

//=====================================================================================

/// The (P, L, G) triple of a virus. Immutable once built.
#[derive(Debug, Clone)]
pub struct Signature {
    layout: Arc<SignatureLayout>,
    pscores: Vec<f64>,
    locations: Vec<Vec<HitInterval>>,
    gscores: Vec<f64>,
}

impl Signature {
    /// checks that vectors match the layout and that scores are finite and non negative.
    /// A missing hit must be given as a 0 score and an empty location set.
    pub fn new(
        layout: &Arc<SignatureLayout>,
        entity: &str,
        pscores: Vec<f64>,
        locations: Vec<Vec<HitInterval>>,
        gscores: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        let nb_profiles = layout.get_nb_profiles();
        let nb_gom = layout.get_nb_group_models();
        let check_len = |axis: &'static str, got: usize, expected: usize| {
            if got != expected {
                return Err(ConfigError::LengthMismatch {
                    entity: entity.to_string(),
                    axis,
                    expected,
                    got,
                });
            }
            Ok(())
        };
        check_len("P", pscores.len(), nb_profiles)?;
        check_len("L", locations.len(), nb_profiles)?;
        check_len("G", gscores.len(), nb_gom)?;
        for (axis, scores) in [("P", &pscores), ("G", &gscores)] {
            if let Some((rank, &value)) = scores
                .iter()
                .enumerate()
                .find(|(_, s)| !s.is_finite() || **s < 0.)
            {
                return Err(ConfigError::BadScore {
                    entity: entity.to_string(),
                    axis,
                    rank,
                    value,
                });
            }
        }
        let locations = locations.into_iter().map(normalize_intervals).collect();
        Ok(Signature {
            layout: Arc::clone(layout),
            pscores,
            locations,
            gscores,
        })
    } // end of new

    pub fn get_layout(&self) -> &Arc<SignatureLayout> {
        &self.layout
    }

    pub fn get_pscores(&self) -> &[f64] {
        &self.pscores
    }

    /// normalized (sorted, disjoint) hit intervals for each profile
    pub fn get_locations(&self) -> &[Vec<HitInterval>] {
        &self.locations
    }

    pub fn get_gscores(&self) -> &[f64] {
        &self.gscores
    }

    /// true if both signatures are indexed by the same profiles and group models
    pub fn shares_layout(&self, other: &Signature) -> bool {
        Arc::ptr_eq(&self.layout, &other.layout) || *self.layout == *other.layout
    }
} // end of impl Signature

//=====================================================================================

/// A virus record : identity, signature, reference group label if any, and genome completeness.
#[derive(Debug, Clone)]
pub struct Entity {
    id: String,
    signature: Signature,
    group: Option<String>,
    complete: bool,
}

impl Entity {
    pub fn new(id: String, signature: Signature, group: Option<String>, complete: bool) -> Self {
        Entity {
            id,
            signature,
            group,
            complete,
        }
    }

    /// a reference virus with known group label
    pub fn reference(id: &str, signature: Signature, group: &str) -> Self {
        Entity::new(id.to_string(), signature, Some(group.to_string()), true)
    }

    /// an unclassified virus
    pub fn query(id: &str, signature: Signature) -> Self {
        Entity::new(id.to_string(), signature, None, true)
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_signature(&self) -> &Signature {
        &self.signature
    }

    pub fn get_group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn is_reference(&self) -> bool {
        self.group.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
} // end of impl Entity

//=====================================================================================

// end of mod tests
