//! Read-only views of externally owned trees.
//!
//! The aligner never touches node payloads directly. Any tree shape works as
//! long as an adapter can list the ordered children of a node. Arena trees
//! use an index handle as `Node`, recursive structs use `&'a T`.

use std::marker::PhantomData;

/// Minimal view: ordered children of a node.
pub trait TreeAdapter {
    type Node: Copy;

    fn children_of(&self, node: Self::Node) -> Vec<Self::Node>;

    fn degree_of(&self, node: Self::Node) -> usize {
        self.children_of(node).len()
    }
}

/// Adapters that can also walk upwards.
pub trait BackrefTreeAdapter: TreeAdapter {
    fn parent_of(&self, node: Self::Node) -> Option<Self::Node>;

    /// Position of `node` among the children of its parent. 0 for the root.
    fn index_of(&self, node: Self::Node) -> usize;
}

/// Adapter for trees stored as nested owned structs.
///
/// ```
/// use ftalign::libs::treealign::{NestedAdapter, TreeAdapter};
///
/// struct Node { children: Vec<Node> }
/// fn children(node: &Node) -> Vec<&Node> {
///     node.children.iter().collect()
/// }
///
/// let tree = Node { children: vec![Node { children: vec![] }, Node { children: vec![] }] };
/// let adapter = NestedAdapter::new(children);
/// assert_eq!(adapter.degree_of(&tree), 2);
/// ```
pub struct NestedAdapter<'a, T, F> {
    children: F,
    marker: PhantomData<&'a T>,
}

impl<'a, T, F> NestedAdapter<'a, T, F>
where
    F: Fn(&'a T) -> Vec<&'a T>,
{
    pub fn new(children: F) -> Self {
        Self {
            children,
            marker: PhantomData,
        }
    }
}

impl<'a, T, F> TreeAdapter for NestedAdapter<'a, T, F>
where
    F: Fn(&'a T) -> Vec<&'a T>,
{
    type Node = &'a T;

    fn children_of(&self, node: &'a T) -> Vec<&'a T> {
        (self.children)(node)
    }
}
