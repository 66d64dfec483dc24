//! KD-tree over fixed-dimension `f32` vectors.
//!
//! # Structure
//!
//! Every node splits space on one dimension; the split dimension cycles with
//! depth (`depth % dimensions`) and the split value is the inserted vector's
//! coordinate at that dimension. Insertion sends strictly-smaller coordinates
//! left and everything else right, and never rebalances: a degenerate
//! insertion order (pre-sorted coordinates) produces a chain and search cost
//! degrades toward a linear scan. That trade is accepted; what is not
//! accepted is stack depth scaling with tree depth, so insert, search, and
//! drop all use explicit stacks instead of call recursion.
//!
//! # Search
//!
//! Exact k-nearest-neighbor under Euclidean distance. Each visited node is
//! scored against the target if its scope mask intersects the search scope
//! and its distance is strictly under the ceiling. The child on the target's
//! side of the splitting plane is explored first; the far side is explored
//! only while the collector still has room or the splitting plane is closer
//! than the current worst kept hit.

use std::fmt;

use tracing::debug;

use crate::error::IndexResult;
use crate::key::IndexKey;
use crate::neighbors::NeighborSet;
use crate::record::{Neighbor, VectorRecord};
use crate::types::{Dimensions, ScopeMask};

/// Euclidean distance between two equal-length vectors.
#[must_use]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// Knobs for a nearest-neighbor search. The default is unbounded: every
/// record in scope is ranked.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    /// Maximum number of distinct keys to return.
    pub limit: usize,
    /// Strict upper bound a candidate's distance must be under.
    pub max_distance: f32,
    /// Scope mask the candidate's mask must intersect.
    pub scope: ScopeMask,
}

impl SearchOptions {
    /// Starts from the unbounded defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the distance ceiling.
    #[must_use]
    pub fn with_max_distance(mut self, max_distance: f32) -> Self {
        self.max_distance = max_distance;
        self
    }

    /// Restricts the search to records intersecting `scope`.
    #[must_use]
    pub fn with_scope(mut self, scope: ScopeMask) -> Self {
        self.scope = scope;
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: usize::MAX,
            max_distance: f32::INFINITY,
            scope: ScopeMask::ALL,
        }
    }
}

pub(crate) struct TreeNode<K> {
    pub(crate) split_dim: usize,
    pub(crate) split_value: f32,
    pub(crate) record: VectorRecord<K>,
    pub(crate) left: Option<Box<TreeNode<K>>>,
    pub(crate) right: Option<Box<TreeNode<K>>>,
}

impl<K> TreeNode<K> {
    pub(crate) fn new(split_dim: usize, split_value: f32, record: VectorRecord<K>) -> Self {
        Self {
            split_dim,
            split_value,
            record,
            left: None,
            right: None,
        }
    }
}

/// KD-tree holding every inserted record.
///
/// Owned by [`VectorIndex`](crate::VectorIndex) in normal use; exposed for
/// callers that want the tree without the persistence layer.
pub struct KdTree<K> {
    root: Option<Box<TreeNode<K>>>,
    dimensions: Dimensions,
    len: usize,
}

impl<K> KdTree<K> {
    /// Creates an empty tree for vectors of the given dimension count.
    #[must_use]
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            root: None,
            dimensions,
            len: 0,
        }
    }

    /// Dimension count every stored vector has.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Number of records ever inserted. Duplicate keys each count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no record has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts a record, walking to a free slot without rebalancing.
    ///
    /// Duplicate keys are not merged here; each insert creates a distinct
    /// node and search deduplicates by key.
    pub fn insert(&mut self, record: VectorRecord<K>) -> IndexResult<()> {
        self.dimensions.validate_vector(record.vector())?;
        let dims = self.dimensions.get();

        let mut depth = 0usize;
        let mut slot = &mut self.root;
        while let Some(node) = slot {
            let coordinate = record.vector()[depth % dims];
            slot = if coordinate < node.split_value {
                &mut node.left
            } else {
                &mut node.right
            };
            depth += 1;
        }

        let split_dim = depth % dims;
        let split_value = record.vector()[split_dim];
        *slot = Some(Box::new(TreeNode::new(split_dim, split_value, record)));
        self.len += 1;
        debug!("inserted record at depth {depth}, tree holds {}", self.len);
        Ok(())
    }

    pub(crate) fn root(&self) -> Option<&TreeNode<K>> {
        self.root.as_deref()
    }

    pub(crate) fn from_parts(
        dimensions: Dimensions,
        root: Option<Box<TreeNode<K>>>,
        len: usize,
    ) -> Self {
        Self {
            root,
            dimensions,
            len,
        }
    }
}

/// Traversal step: score a node, or decide whether its far child is worth
/// visiting once the near subtree has been exhausted.
enum Step<'t, K> {
    Visit(&'t TreeNode<K>),
    FarGate(&'t TreeNode<K>),
}

impl<K: IndexKey> KdTree<K> {
    /// Exact nearest-neighbor search, ranked ascending by distance with ties
    /// broken by key order. Each key appears at most once, at its closest
    /// distance.
    pub fn nearest(
        &self,
        target: &[f32],
        options: &SearchOptions,
    ) -> IndexResult<Vec<Neighbor<'_, K>>> {
        self.dimensions.validate_vector(target)?;

        let Some(root) = self.root.as_deref() else {
            return Ok(Vec::new());
        };

        let mut results = NeighborSet::new(options.limit, self.len);
        let mut visited = 0usize;
        // The far-side gate is pushed under the near child so it is decided
        // only after the whole near subtree has been scored.
        let mut stack = vec![Step::Visit(root)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Visit(node) => {
                    visited += 1;
                    if node.record.scopes().intersects(options.scope) {
                        let distance = euclidean_distance(node.record.vector(), target);
                        if distance < options.max_distance {
                            results.offer(distance, &node.record);
                        }
                    }
                    stack.push(Step::FarGate(node));
                    let near = if target[node.split_dim] < node.split_value {
                        node.left.as_deref()
                    } else {
                        node.right.as_deref()
                    };
                    if let Some(child) = near {
                        stack.push(Step::Visit(child));
                    }
                }
                Step::FarGate(node) => {
                    let far = if target[node.split_dim] < node.split_value {
                        node.right.as_deref()
                    } else {
                        node.left.as_deref()
                    };
                    let Some(child) = far else { continue };
                    let gap = (node.split_value - target[node.split_dim]).abs();
                    let worth_visiting = !results.is_full()
                        || results.worst_distance().is_some_and(|worst| gap < worst);
                    if worth_visiting {
                        stack.push(Step::Visit(child));
                    }
                }
            }
        }

        debug!("search visited {visited} of {} nodes, kept {}", self.len, results.len());
        Ok(results.into_ranked())
    }
}

impl<K> fmt::Debug for KdTree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KdTree")
            .field("dimensions", &self.dimensions.get())
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl<K> Drop for KdTree<K> {
    fn drop(&mut self) {
        // Detach iteratively: a box chain from insertion-ordered input would
        // overflow the stack in the default recursive drop.
        let mut stack = Vec::new();
        stack.extend(self.root.take());
        while let Some(mut node) = stack.pop() {
            stack.extend(node.left.take());
            stack.extend(node.right.take());
        }
    }
}
