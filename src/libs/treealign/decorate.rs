use super::adapter::TreeAdapter;
use super::error::AlignError;
use super::set::{check_degree, set_of, ChildSet};
use super::traversal::PostOrderTraversal;

/// Index into [`DecoratedTree::vertices`].
pub type VertexId = usize;

/// Per-call working copy of an input vertex.
#[derive(Debug, Clone)]
pub struct Vertex<N> {
    pub label: N,
    /// Post-order position among inner vertices; `None` for leaves
    pub index: Option<usize>,
    /// `1 << position among siblings`, 0 for the root
    pub key: u32,
    pub depth: usize,
    pub parent: Option<VertexId>,
    pub children: Vec<VertexId>,
}

impl<N> Vertex<N> {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn degree(&self) -> usize {
        self.children.len()
    }

    /// Mask covering every child.
    pub fn full_set(&self) -> u32 {
        set_of(self.children.len())
    }

    pub fn child_set(&self, bits: u32) -> ChildSet<'_, VertexId> {
        ChildSet::from_bits(&self.children, bits)
    }
}

/// Input tree flattened into an arena, vertices in post-order.
#[derive(Debug, Clone)]
pub struct DecoratedTree<N> {
    pub vertices: Vec<Vertex<N>>,
    /// Inner vertices in post-order; `inner[v.index]` is `v`
    pub inner: Vec<VertexId>,
    pub leaves: Vec<VertexId>,
    pub root: VertexId,
    pub max_degree: usize,
}

/// Accumulator threaded through the decoration fold.
struct Decorator<N> {
    vertices: Vec<Vertex<N>>,
    inner: Vec<VertexId>,
    leaves: Vec<VertexId>,
    max_degree: usize,
}

impl<N: Copy> Decorator<N> {
    fn visit(&mut self, label: N, children: Vec<VertexId>) -> VertexId {
        let id = self.vertices.len();
        for (position, &child) in children.iter().enumerate() {
            let vertex = &mut self.vertices[child];
            vertex.parent = Some(id);
            vertex.key = 1 << position.min(31);
        }
        let index = if children.is_empty() {
            self.leaves.push(id);
            None
        } else {
            self.inner.push(id);
            Some(self.inner.len() - 1)
        };
        self.max_degree = self.max_degree.max(children.len());
        self.vertices.push(Vertex {
            label,
            index,
            key: 0,
            depth: 0,
            parent: None,
            children,
        });
        id
    }
}

impl<N: Copy> DecoratedTree<N> {
    /// Decorates the tree below `root`. Fails when a vertex has more
    /// children than `degree_limit`.
    pub fn new<A>(adapter: &A, root: N, degree_limit: usize) -> Result<Self, AlignError>
    where
        A: TreeAdapter<Node = N>,
    {
        let mut decorator = Decorator {
            vertices: Vec::new(),
            inner: Vec::new(),
            leaves: Vec::new(),
            max_degree: 0,
        };
        let root_id = PostOrderTraversal::new(adapter, root)
            .call(|label, children, _| decorator.visit(label, children));
        check_degree(decorator.max_degree, degree_limit)?;

        // parents come after their children in post-order
        let mut vertices = decorator.vertices;
        for id in (0..vertices.len()).rev() {
            if let Some(parent) = vertices[id].parent {
                vertices[id].depth = vertices[parent].depth + 1;
            }
        }

        Ok(Self {
            vertices,
            inner: decorator.inner,
            leaves: decorator.leaves,
            root: root_id,
            max_degree: decorator.max_degree,
        })
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex<N> {
        &self.vertices[id]
    }

    pub fn label(&self, id: VertexId) -> N {
        self.vertices[id].label
    }

    /// Children of `id` selected by `bits`, ascending.
    pub fn children_in(&self, id: VertexId, bits: u32) -> Vec<VertexId> {
        self.vertices[id]
            .child_set(bits)
            .as_list()
            .into_iter()
            .copied()
            .collect()
    }
}
