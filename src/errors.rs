//! errors and warnings of the classification engine.
//!
//! Configuration errors are fatal and abort a run.
//! Insufficient data and degenerate input are recoverable, they are converted into [Warning]s
//! attached to the results they degrade.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// invalid parameters or inconsistent signatures. Never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown similarity scheme : {0}")]
    UnknownScheme(String),
    #[error("unknown linkage method : {0}")]
    UnknownLinkage(String),
    #[error("unknown bootstrap method : {0}")]
    UnknownBootstrapMethod(String),
    #[error("unknown pair sampling : {0}")]
    UnknownSampling(String),
    #[error("entity {entity} : {axis} vector has length {got}, layout expects {expected}")]
    LengthMismatch {
        entity: String,
        axis: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("signatures of {0} and {1} do not share the same profile layout")]
    LayoutMismatch(String, String),
    #[error("entity {entity} : {axis} score at rank {rank} is negative or not finite : {value}")]
    BadScore {
        entity: String,
        axis: &'static str,
        rank: usize,
        value: f64,
    },
    #[error("bad hit interval [{0}, {1}]")]
    BadInterval(f64, f64),
    #[error("parameter {0} must be strictly positive")]
    NonPositive(&'static str),
    #[error("parameter {name} must be >= 0 and not NaN, got {value}")]
    Negative { name: &'static str, value: f64 },
    #[error("parameter {name} must lie in [0,1], got {value}")]
    NotAFraction { name: &'static str, value: f64 },
    #[error("duplicated entity identity {0}")]
    DuplicatedEntity(String),
    #[error("reference {0} has no group label")]
    UnlabelledReference(String),
} // end of ConfigError

/// errors returned by a classification run
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("configuration error : {0}")]
    Config(#[from] ConfigError),
    #[error("group {group} cannot get a threshold : {reason}")]
    InsufficientData { group: String, reason: String },
    #[error("degenerate input : {0}")]
    DegenerateInput(String),
    #[error("run cancelled after {0} bootstrap replicates")]
    Cancelled(usize),
    #[error("could not build thread pool : {0}")]
    ThreadPool(String),
} // end of ClassifyError

/// A degraded but documented outcome, attached to a result instead of being dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Warning {
    /// the candidate group has no fitted threshold, the assignment is unverifiable
    UntestableGroup { group: String, reason: String },
    /// no dendrogram could be built, the verdict relies on the score gate only
    TopologySkipped(String),
    /// svm slope collapsed, threshold is the midpoint of population means
    ThresholdFallback { group: String },
    /// no reference in the database
    NoReference,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UntestableGroup { group, reason } => {
                write!(f, "group {} untestable ({}), assignment unverifiable", group, reason)
            }
            Warning::TopologySkipped(msg) => write!(f, "topology test skipped : {}", msg),
            Warning::ThresholdFallback { group } => {
                write!(f, "threshold of {} is a midpoint fallback", group)
            }
            Warning::NoReference => write!(f, "no reference entity in database"),
        }
    }
} // end of impl Display for Warning
