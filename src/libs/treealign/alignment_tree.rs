//! Alignment trees rebuilt from the backtrace stream.
//!
//! Every edit operation becomes one node: the root pair, a match, a deletion,
//! or a join. Events arrive in any order, so nodes are only linked up in
//! [`AlignmentTreeBacktrace::assign_all`], once the stream is complete.

use std::hash::Hash;

use fxhash::FxHashMap;
use indexmap::IndexMap;

use super::adapter::TreeAdapter;
use super::backtrace::Backtrace;
use super::error::AlignError;
use super::traversal::PostOrderTraversal;

pub type AlignNodeId = usize;

#[derive(Debug, Clone)]
pub struct AlignNode<N> {
    /// Left vertex; the anchor for joins
    pub left: Option<N>,
    /// Right vertex; the anchor for joins
    pub right: Option<N>,
    pub score: f64,
    /// Vertices absorbed on the left by a join
    pub left_join_path: usize,
    pub right_join_path: usize,
    /// All left vertices of this node, top-down
    pub left_path: Vec<N>,
    pub right_path: Vec<N>,
    pub in_join: bool,
    /// 1-based post-order position
    pub index: usize,
    pub parent: Option<AlignNodeId>,
    pub children: Vec<AlignNodeId>,
}

impl<N: Copy> AlignNode<N> {
    fn new(score: f64, left_path: Vec<N>, right_path: Vec<N>) -> Self {
        Self {
            left: left_path.last().copied(),
            right: right_path.last().copied(),
            score,
            left_join_path: 0,
            right_join_path: 0,
            left_path,
            right_path,
            in_join: false,
            index: 0,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_match(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    fn top(&self, left: bool) -> Option<N> {
        if left {
            self.left_path.first().copied()
        } else {
            self.right_path.first().copied()
        }
    }

    fn bottom(&self, left: bool) -> Option<N> {
        if left {
            self.left
        } else {
            self.right
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlignmentTree<N> {
    nodes: Vec<AlignNode<N>>,
    root: AlignNodeId,
    score: f64,
}

impl<N: Copy> AlignmentTree<N> {
    pub fn root(&self) -> AlignNodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: AlignNodeId) -> &AlignNode<N> {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[AlignNode<N>] {
        &self.nodes
    }

    pub fn left(&self, id: AlignNodeId) -> Option<N> {
        self.nodes[id].left
    }

    pub fn right(&self, id: AlignNodeId) -> Option<N> {
        self.nodes[id].right
    }

    pub fn children(&self, id: AlignNodeId) -> &[AlignNodeId] {
        &self.nodes[id].children
    }

    pub fn parent(&self, id: AlignNodeId) -> Option<AlignNodeId> {
        self.nodes[id].parent
    }

    pub fn is_join(&self, id: AlignNodeId) -> bool {
        self.nodes[id].in_join
    }

    /// Alignment score; the node scores add up to it.
    pub fn score(&self) -> f64 {
        self.score
    }

    pub(crate) fn set_score(&mut self, score: f64) {
        self.score = score;
    }

    /// Node ids in post-order.
    pub fn postorder(&self) -> Vec<AlignNodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                out.push(id);
            } else {
                stack.push((id, true));
                for &child in self.nodes[id].children.iter().rev() {
                    stack.push((child, false));
                }
            }
        }
        out
    }

    /// Indented text, one node per line.
    pub fn to_text<F>(&self, describe: F) -> String
    where
        F: Fn(N) -> String,
    {
        let mut out = String::new();
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let node = &self.nodes[id];
            out += &format!(
                "{}{}\t{}\t{}\t{}\n",
                "  ".repeat(depth),
                node.index,
                render_path(&node.left_path, &describe),
                render_path(&node.right_path, &describe),
                node.score
            );
            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }

    /// Graphviz digraph.
    pub fn to_dot<F>(&self, describe: F) -> String
    where
        F: Fn(N) -> String,
    {
        let mut out = String::from("digraph alignment {\n");
        out += "  node [shape=box];\n";
        for node in &self.nodes {
            let style = if node.in_join {
                ", style=dashed"
            } else if !node.is_match() {
                ", style=dotted"
            } else {
                ""
            };
            out += &format!(
                "  n{} [label=\"{}\\n{}\\n{}\"{}];\n",
                node.index,
                render_path(&node.left_path, &describe),
                render_path(&node.right_path, &describe),
                node.score,
                style
            );
        }
        for node in &self.nodes {
            if let Some(parent) = node.parent {
                out += &format!("  n{} -> n{};\n", self.nodes[parent].index, node.index);
            }
        }
        out += "}\n";
        out
    }
}

fn render_path<N: Copy, F: Fn(N) -> String>(path: &[N], describe: &F) -> String {
    if path.is_empty() {
        "-".to_string()
    } else {
        path.iter()
            .map(|&n| describe(n))
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Upward link of an input vertex.
#[derive(Debug, Clone, Copy)]
struct TNode<N> {
    parent: Option<N>,
    /// Post-order position within its tree
    order: usize,
}

fn decorate<A: TreeAdapter>(adapter: &A, root: A::Node) -> IndexMap<A::Node, TNode<A::Node>>
where
    A::Node: Eq + Hash,
{
    let mut map: IndexMap<A::Node, TNode<A::Node>> = IndexMap::new();
    let mut order = 0;
    PostOrderTraversal::new(adapter, root).run(|node, _| {
        for child in adapter.children_of(node) {
            if let Some(t) = map.get_mut(&child) {
                t.parent = Some(node);
            }
        }
        map.insert(
            node,
            TNode {
                parent: None,
                order,
            },
        );
        order += 1;
    });
    map
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Placement {
    Pending,
    Resolving,
    Placed,
}

/// Backtrace sink that assembles an [`AlignmentTree`].
///
/// Matched and joined nodes hang below the nearest aligned pair above them.
/// Deleted vertices between the two are spliced in as a chain, left side
/// first. Deletions with no aligned descendant follow their input parent.
pub struct AlignmentTreeBacktrace<N> {
    left: IndexMap<N, TNode<N>>,
    right: IndexMap<N, TNode<N>>,
    nodes: Vec<AlignNode<N>>,
    root: Option<AlignNodeId>,
    absorbed_left: Vec<N>,
    absorbed_right: Vec<N>,
    problems: Vec<String>,
    dirty: bool,
}

struct Owners<N> {
    left: FxHashMap<N, AlignNodeId>,
    right: FxHashMap<N, AlignNodeId>,
}

impl<N: Eq + Hash> Owners<N> {
    fn side(&self, left: bool) -> &FxHashMap<N, AlignNodeId> {
        if left {
            &self.left
        } else {
            &self.right
        }
    }
}

struct Links {
    state: Vec<Placement>,
    parents: Vec<Option<AlignNodeId>>,
}

impl Links {
    fn depth(&self, mut id: AlignNodeId) -> usize {
        let mut depth = 0;
        while let Some(p) = self.parents[id] {
            depth += 1;
            id = p;
        }
        depth
    }

    fn attach(&mut self, id: AlignNodeId, parent: AlignNodeId) {
        self.parents[id] = Some(parent);
        self.state[id] = Placement::Placed;
    }
}

impl<N> AlignmentTreeBacktrace<N>
where
    N: Copy + Eq + Hash,
{
    pub fn new<A>(adapter: &A, left_root: N, right_root: N) -> Self
    where
        A: TreeAdapter<Node = N>,
    {
        // each side gets its own map, so handles shared by both trees do not
        // collide
        Self {
            left: decorate(adapter, left_root),
            right: decorate(adapter, right_root),
            nodes: Vec::new(),
            root: None,
            absorbed_left: Vec::new(),
            absorbed_right: Vec::new(),
            problems: Vec::new(),
            dirty: false,
        }
    }

    fn push(&mut self, node: AlignNode<N>) -> AlignNodeId {
        self.dirty = true;
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn parent_label(&self, left: bool, label: N) -> Option<N> {
        let map = if left { &self.left } else { &self.right };
        map.get(&label).and_then(|t| t.parent)
    }

    fn order_of(&self, left: bool, id: AlignNodeId) -> usize {
        let map = if left { &self.left } else { &self.right };
        self.nodes[id]
            .top(left)
            .and_then(|top| map.get(&top))
            .map_or(usize::MAX, |t| t.order)
    }

    fn owner_of_parent(
        &self,
        left: bool,
        id: AlignNodeId,
        owners: &Owners<N>,
    ) -> Result<AlignNodeId, AlignError> {
        let parent = self.nodes[id]
            .top(left)
            .and_then(|top| self.parent_label(left, top))
            .ok_or_else(|| {
                AlignError::Reconstruction("a non-root node has no parent vertex".to_string())
            })?;
        owners.side(left).get(&parent).copied().ok_or_else(|| {
            AlignError::Reconstruction("a parent vertex has no edit operation".to_string())
        })
    }

    /// Deletions between `id` and the nearest aligned node above it on one
    /// side, top-down, followed by that aligned node.
    fn deletion_chain(
        &self,
        left: bool,
        id: AlignNodeId,
        owners: &Owners<N>,
    ) -> Result<(Vec<AlignNodeId>, AlignNodeId), AlignError> {
        let mut chain = Vec::new();
        let mut current = id;
        loop {
            let owner = self.owner_of_parent(left, current, owners)?;
            if self.nodes[owner].is_match() {
                chain.reverse();
                return Ok((chain, owner));
            }
            chain.push(owner);
            current = owner;
        }
    }

    /// Links every recorded node to its parent and numbers the nodes.
    pub fn assign_all(&mut self) -> Result<(), AlignError> {
        if let Some(problem) = self.problems.first() {
            return Err(AlignError::Reconstruction(problem.clone()));
        }
        let root = self
            .root
            .ok_or_else(|| AlignError::Reconstruction("no root pair recorded".to_string()))?;

        let mut owners = Owners {
            left: FxHashMap::default(),
            right: FxHashMap::default(),
        };
        for (id, node) in self.nodes.iter().enumerate() {
            for (map, path) in [
                (&mut owners.left, &node.left_path),
                (&mut owners.right, &node.right_path),
            ] {
                for &label in path {
                    if map.insert(label, id).is_some() {
                        return Err(AlignError::Reconstruction(
                            "a vertex is covered by two edit operations".to_string(),
                        ));
                    }
                }
            }
        }
        for (left, absorbed) in [(true, &self.absorbed_left), (false, &self.absorbed_right)] {
            for label in absorbed {
                let owned_by_join = owners
                    .side(left)
                    .get(label)
                    .map_or(false, |&id| self.nodes[id].in_join);
                if !owned_by_join {
                    return Err(AlignError::Reconstruction(
                        "an absorbed vertex is not part of any join".to_string(),
                    ));
                }
            }
        }

        let mut links = Links {
            state: vec![Placement::Pending; self.nodes.len()],
            parents: vec![None; self.nodes.len()],
        };
        links.state[root] = Placement::Placed;
        for id in 0..self.nodes.len() {
            if self.nodes[id].is_match() {
                self.place_aligned(id, &owners, &mut links)?;
            }
        }
        for id in 0..self.nodes.len() {
            self.place_deleted(id, &owners, &mut links)?;
        }

        for node in self.nodes.iter_mut() {
            node.parent = None;
            node.children.clear();
        }
        for (id, parent) in links.parents.iter().enumerate() {
            if let Some(p) = *parent {
                self.nodes[id].parent = Some(p);
                self.nodes[p].children.push(id);
            }
        }
        // children follow the input order, left tree first
        let keys: Vec<(usize, usize)> = (0..self.nodes.len())
            .map(|id| (self.order_of(true, id), self.order_of(false, id)))
            .collect();
        for node in self.nodes.iter_mut() {
            node.children.sort_by_key(|&c| keys[c]);
        }

        let mut counter = 0;
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                counter += 1;
                self.nodes[id].index = counter;
            } else {
                stack.push((id, true));
                for &child in self.nodes[id].children.iter().rev() {
                    stack.push((child, false));
                }
            }
        }
        if counter != self.nodes.len() {
            return Err(AlignError::Reconstruction(
                "some nodes are not connected to the root".to_string(),
            ));
        }

        self.dirty = false;
        Ok(())
    }

    fn place_aligned(
        &self,
        id: AlignNodeId,
        owners: &Owners<N>,
        links: &mut Links,
    ) -> Result<(), AlignError> {
        match links.state[id] {
            Placement::Placed => return Ok(()),
            Placement::Resolving => {
                return Err(AlignError::Reconstruction(
                    "cyclic parent relation".to_string(),
                ))
            }
            Placement::Pending => links.state[id] = Placement::Resolving,
        }

        let (left_chain, left_anchor) = self.deletion_chain(true, id, owners)?;
        let (right_chain, right_anchor) = self.deletion_chain(false, id, owners)?;
        self.place_aligned(left_anchor, owners, links)?;
        self.place_aligned(right_anchor, owners, links)?;

        // both sides agree for consistent streams; otherwise take the deeper
        let mut parent = if links.depth(left_anchor) >= links.depth(right_anchor) {
            left_anchor
        } else {
            right_anchor
        };
        for deleted in left_chain.into_iter().chain(right_chain) {
            if links.state[deleted] == Placement::Pending {
                links.attach(deleted, parent);
            }
            parent = deleted;
        }
        links.attach(id, parent);
        Ok(())
    }

    fn place_deleted(
        &self,
        id: AlignNodeId,
        owners: &Owners<N>,
        links: &mut Links,
    ) -> Result<(), AlignError> {
        match links.state[id] {
            Placement::Placed => return Ok(()),
            Placement::Resolving => {
                return Err(AlignError::Reconstruction(
                    "cyclic parent relation".to_string(),
                ))
            }
            Placement::Pending => links.state[id] = Placement::Resolving,
        }

        let left = !self.nodes[id].left_path.is_empty();
        let owner = self.owner_of_parent(left, id, owners)?;
        if links.state[owner] != Placement::Placed {
            if self.nodes[owner].is_match() {
                return Err(AlignError::Reconstruction(
                    "parent is not placed".to_string(),
                ));
            }
            self.place_deleted(owner, owners, links)?;
        }
        links.attach(id, owner);
        Ok(())
    }

    /// Links the nodes if needed and hands out the tree.
    pub fn into_tree(mut self) -> Result<AlignmentTree<N>, AlignError> {
        if self.dirty || self.root.is_none() {
            self.assign_all()?;
        }
        let root = self
            .root
            .ok_or_else(|| AlignError::Reconstruction("no root pair recorded".to_string()))?;
        let score = self.nodes.iter().map(|n| n.score).sum();
        Ok(AlignmentTree {
            nodes: self.nodes,
            root,
            score,
        })
    }
}

impl<N> Backtrace<N> for AlignmentTreeBacktrace<N>
where
    N: Copy + Eq + Hash,
{
    fn delete_left(&mut self, score: f64, node: N) {
        self.push(AlignNode::new(score, vec![node], vec![]));
    }

    fn delete_right(&mut self, score: f64, node: N) {
        self.push(AlignNode::new(score, vec![], vec![node]));
    }

    fn match_nodes(&mut self, score: f64, left: N, right: N) {
        self.push(AlignNode::new(score, vec![left], vec![right]));
    }

    fn match_vertices(&mut self, score: f64, left: N, right: N) {
        if self.root.is_some() {
            self.problems.push("two root pairs recorded".to_string());
            return;
        }
        let id = self.push(AlignNode::new(score, vec![left], vec![right]));
        self.root = Some(id);
    }

    fn join(
        &mut self,
        score: f64,
        left: &mut dyn Iterator<Item = N>,
        right: &mut dyn Iterator<Item = N>,
        left_count: usize,
        right_count: usize,
    ) {
        // the stream yields anchors first; store paths top-down
        let mut left_path: Vec<N> = left.collect();
        let mut right_path: Vec<N> = right.collect();
        left_path.reverse();
        right_path.reverse();
        if left_path.len() != left_count || right_path.len() != right_count {
            self.problems
                .push("join path length does not match its count".to_string());
        }
        let mut node = AlignNode::new(score, left_path, right_path);
        node.left_join_path = left_count.saturating_sub(1);
        node.right_join_path = right_count.saturating_sub(1);
        node.in_join = true;
        self.push(node);
    }

    fn inner_join_left(&mut self, node: N) {
        self.absorbed_left.push(node);
    }

    fn inner_join_right(&mut self, node: N) {
        self.absorbed_right.push(node);
    }
}
