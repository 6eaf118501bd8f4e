//! Classification of viruses from profile hit signatures.
//!
//! Signatures (hit scores against protein profiles, hit locations and scores against group models) of reference
//! and query viruses are compared with generalised Jaccard similarities. A query is assigned the group of its
//! best scoring reference if its score reaches a threshold fitted for that group and if its neighbourhood in a
//! dendrogram of references and queries is consistent with the group. Branch supports come from bootstrap
//! resampling of profile columns. Results of several databases are then resolved into one label per query.
//!
//! The main entry point is [classify::classify_databases].

pub mod answer;
pub mod bootstrap;
pub mod classify;
pub mod dendrogram;
pub mod errors;
pub mod grouping;
pub mod neighborhood;
pub mod signature;
pub mod similarity;
pub mod threshold;
pub mod utils;
