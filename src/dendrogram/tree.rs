//! Arena representation of a binary rooted dendrogram.
//!
//! Leaves are nodes 0..n (in the order of the distance matrix), internal nodes are n..2n-1 in merge order,
//! so children always precede parents and the root is the last node.

use std::fmt::Write;

/// A node of the dendrogram
#[derive(Debug, Clone, PartialEq)]
pub struct DendroNode {
    parent: Option<usize>,
    children: Option<(usize, usize)>,
    height: f64,
    support: Option<f64>,
    nb_leaves: usize,
}

impl DendroNode {
    pub fn get_parent(&self) -> Option<usize> {
        self.parent
    }

    /// (left, right) for an internal node
    pub fn get_children(&self) -> Option<(usize, usize)> {
        self.children
    }

    /// merge height, 0 for a leaf
    pub fn get_height(&self) -> f64 {
        self.height
    }

    /// bootstrap support if computed
    pub fn get_support(&self) -> Option<f64> {
        self.support
    }

    pub fn get_nb_leaves(&self) -> usize {
        self.nb_leaves
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
} // end of impl DendroNode

//=====================================================================================

/// A split of the leaf set induced by an edge of the tree.
/// Stored as the bitset of the side that does not contain leaf 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bipartition {
    bits: Vec<u64>,
    nb_leaves: usize,
}

impl Bipartition {
    fn from_clade(clade: &[u64], nb_leaves: usize) -> Self {
        let mut bits = clade.to_vec();
        if bits[0] & 1 == 1 {
            for w in bits.iter_mut() {
                *w = !*w;
            }
            let tail = nb_leaves % 64;
            if tail != 0 {
                if let Some(last) = bits.last_mut() {
                    *last &= (1u64 << tail) - 1;
                }
            }
        }
        Bipartition { bits, nb_leaves }
    }

    /// build from the leaves of one side
    pub fn from_leaves(leaves: &[usize], nb_leaves: usize) -> Self {
        let mut clade = vec![0u64; nb_leaves.div_ceil(64).max(1)];
        for &l in leaves {
            clade[l / 64] |= 1u64 << (l % 64);
        }
        Bipartition::from_clade(&clade, nb_leaves)
    }

    pub fn get_nb_leaves(&self) -> usize {
        self.nb_leaves
    }

    /// number of leaves on the side not containing leaf 0
    pub fn side_size(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// size of the smaller side
    pub fn lighter_side_size(&self) -> usize {
        let s = self.side_size();
        s.min(self.nb_leaves - s)
    }

    /// a split is trivial if one side has less than 2 leaves
    pub fn is_trivial(&self) -> bool {
        self.lighter_side_size() < 2
    }

    /// number of leaves to move to transform one split into the other
    pub fn transfer_distance(&self, other: &Bipartition) -> usize {
        let hamming: usize = self
            .bits
            .iter()
            .zip(other.bits.iter())
            .map(|(a, b)| (a ^ b).count_ones() as usize)
            .sum();
        hamming.min(self.nb_leaves - hamming)
    }
} // end of impl Bipartition

//=====================================================================================

/// A rooted binary dendrogram over n leaves.
#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    nb_leaves: usize,
    nodes: Vec<DendroNode>,
}

impl Dendrogram {
    /// merges\[k\] = (left, right, height) creates node nb_leaves + k
    pub(crate) fn from_merges(nb_leaves: usize, merges: &[(usize, usize, f64)]) -> Self {
        let mut nodes: Vec<DendroNode> = (0..nb_leaves)
            .map(|_| DendroNode {
                parent: None,
                children: None,
                height: 0.,
                support: None,
                nb_leaves: 1,
            })
            .collect();
        for &(left, right, height) in merges {
            let id = nodes.len();
            nodes[left].parent = Some(id);
            nodes[right].parent = Some(id);
            let nb = nodes[left].nb_leaves + nodes[right].nb_leaves;
            nodes.push(DendroNode {
                parent: None,
                children: Some((left, right)),
                height,
                support: None,
                nb_leaves: nb,
            });
        }
        Dendrogram { nb_leaves, nodes }
    }

    pub fn get_nb_leaves(&self) -> usize {
        self.nb_leaves
    }

    pub fn get_nb_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn get_root(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn get_node(&self, id: usize) -> &DendroNode {
        &self.nodes[id]
    }

    pub fn get_nodes(&self) -> &[DendroNode] {
        &self.nodes
    }

    pub fn is_root(&self, id: usize) -> bool {
        id == self.get_root()
    }

    /// the other child of the parent of a node
    pub fn sibling(&self, id: usize) -> Option<usize> {
        let parent = self.nodes[id].parent?;
        let (l, r) = self.nodes[parent].children?;
        if l == id {
            Some(r)
        } else {
            Some(l)
        }
    }

    /// leaves under a node, from left to right
    pub fn leaves_under(&self, id: usize) -> Vec<usize> {
        let mut leaves = Vec::<usize>::with_capacity(self.nodes[id].nb_leaves);
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            match self.nodes[n].children {
                None => leaves.push(n),
                Some((l, r)) => {
                    stack.push(r);
                    stack.push(l);
                }
            }
        }
        leaves
    }

    /// height of parent minus height of node, 0 for the root. Inversions (centroid, median) are clamped to 0.
    pub fn branch_length(&self, id: usize) -> f64 {
        match self.nodes[id].parent {
            Some(p) => (self.nodes[p].height - self.nodes[id].height).max(0.),
            None => 0.,
        }
    }

    /// clade bitsets of all nodes, computed bottom up
    fn clades(&self) -> Vec<Vec<u64>> {
        let nb_words = self.nb_leaves.div_ceil(64).max(1);
        let mut clades: Vec<Vec<u64>> = Vec::with_capacity(self.nodes.len());
        for (id, node) in self.nodes.iter().enumerate() {
            let clade = match node.children {
                None => {
                    let mut c = vec![0u64; nb_words];
                    c[id / 64] |= 1u64 << (id % 64);
                    c
                }
                Some((l, r)) => clades[l].iter().zip(clades[r].iter()).map(|(a, b)| a | b).collect(),
            };
            clades.push(clade);
        }
        clades
    }

    /// the split induced by the edge above each node, None for the root
    pub fn bipartitions(&self) -> Vec<Option<Bipartition>> {
        let root = self.get_root();
        self.clades()
            .into_iter()
            .enumerate()
            .map(|(id, c)| {
                if id == root {
                    None
                } else {
                    Some(Bipartition::from_clade(&c, self.nb_leaves))
                }
            })
            .collect()
    }

    pub(crate) fn set_supports(&mut self, supports: &[f64]) {
        for (node, &s) in self.nodes.iter_mut().zip(supports.iter()) {
            node.support = Some(s);
        }
    }

    /// Newick export. Internal nodes carry their support as label when computed.
    /// Characters reserved by the format are replaced by '_' in names.
    pub fn to_newick(&self, names: &[String]) -> String {
        let mut s = String::new();
        self.write_newick(self.get_root(), names, &mut s);
        s.push(';');
        s
    }

    fn write_newick(&self, id: usize, names: &[String], s: &mut String) {
        let node = &self.nodes[id];
        match node.children {
            None => {
                let name = names.get(id).map(|n| n.as_str()).unwrap_or("");
                s.extend(name.chars().map(|c| {
                    if "(),:;[]' \t".contains(c) {
                        '_'
                    } else {
                        c
                    }
                }));
            }
            Some((l, r)) => {
                s.push('(');
                self.write_newick(l, names, s);
                s.push(',');
                self.write_newick(r, names, s);
                s.push(')');
                if let Some(support) = node.support {
                    let _ = write!(s, "{:.3}", support);
                }
            }
        }
        if node.parent.is_some() {
            let _ = write!(s, ":{:.6}", self.branch_length(id));
        }
    } // end of write_newick
} // end of impl Dendrogram

//=====================================================================================

// end of mod tests
