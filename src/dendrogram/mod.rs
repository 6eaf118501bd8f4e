//! hierarchical clustering of references and queries.
//!
//! - linkage : agglomerative construction from a distance matrix
//! - tree : the dendrogram arena, splits and newick export

pub mod linkage;
pub mod tree;

pub use linkage::{build_dendrogram, ClusteringParams, Linkage};
pub use tree::{Bipartition, DendroNode, Dendrogram};
