use super::adapter::{BackrefTreeAdapter, TreeAdapter};
use super::error::AlignError;

/// Stateful navigation over a tree.
///
/// Moving to a vertex that does not exist is a caller bug and returns
/// [`AlignError::Navigation`]; the cursor stays where it was.
pub trait TreeCursor<N: Copy> {
    fn node(&self) -> N;
    fn depth(&self) -> usize;
    fn is_root(&self) -> bool;
    fn is_leaf(&self) -> bool;

    fn goto_parent(&mut self) -> Result<(), AlignError>;
    fn goto_first_child(&mut self) -> Result<(), AlignError>;
    fn goto_last_child(&mut self) -> Result<(), AlignError>;
    fn goto_next_sibling(&mut self) -> Result<(), AlignError>;
    fn goto_previous_sibling(&mut self) -> Result<(), AlignError>;

    fn goto_first_leaf(&mut self) {
        while self.goto_first_child().is_ok() {}
    }

    fn goto_last_leaf(&mut self) {
        while self.goto_last_child().is_ok() {}
    }

    /// Number of vertices in the subtree below the current vertex, itself included.
    fn number_of_vertices(&self) -> usize;

    /// Largest child count in the subtree below the current vertex.
    fn max_degree(&self) -> usize;
}

fn subtree_stats<A: TreeAdapter>(adapter: &A, start: A::Node) -> (usize, usize) {
    let mut vertices = 0;
    let mut max_degree = 0;
    let mut stack = vec![start];
    while let Some(node) = stack.pop() {
        vertices += 1;
        let children = adapter.children_of(node);
        max_degree = max_degree.max(children.len());
        stack.extend(children);
    }
    (vertices, max_degree)
}

struct Frame<N> {
    parent: N,
    siblings: Vec<N>,
    index: usize,
}

/// Cursor for adapters without parent links. Keeps the path from the start
/// vertex as an explicit stack; the start vertex counts as root.
pub struct StackCursor<'a, A: TreeAdapter> {
    adapter: &'a A,
    current: A::Node,
    stack: Vec<Frame<A::Node>>,
}

impl<'a, A: TreeAdapter> StackCursor<'a, A> {
    pub fn new(adapter: &'a A, root: A::Node) -> Self {
        Self {
            adapter,
            current: root,
            stack: Vec::new(),
        }
    }

    fn descend(&mut self, last: bool) -> Result<(), AlignError> {
        let children = self.adapter.children_of(self.current);
        if children.is_empty() {
            return Err(AlignError::Navigation("vertex has no children"));
        }
        let index = if last { children.len() - 1 } else { 0 };
        let next = children[index];
        self.stack.push(Frame {
            parent: self.current,
            siblings: children,
            index,
        });
        self.current = next;
        Ok(())
    }

    fn shift(&mut self, forward: bool) -> Result<(), AlignError> {
        let frame = self
            .stack
            .last_mut()
            .ok_or(AlignError::Navigation("root has no siblings"))?;
        let index = if forward {
            frame.index + 1
        } else {
            frame
                .index
                .checked_sub(1)
                .ok_or(AlignError::Navigation("no previous sibling"))?
        };
        let next = *frame
            .siblings
            .get(index)
            .ok_or(AlignError::Navigation("no next sibling"))?;
        frame.index = index;
        self.current = next;
        Ok(())
    }
}

impl<'a, A: TreeAdapter> TreeCursor<A::Node> for StackCursor<'a, A> {
    fn node(&self) -> A::Node {
        self.current
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }

    fn is_root(&self) -> bool {
        self.stack.is_empty()
    }

    fn is_leaf(&self) -> bool {
        self.adapter.degree_of(self.current) == 0
    }

    fn goto_parent(&mut self) -> Result<(), AlignError> {
        let frame = self
            .stack
            .pop()
            .ok_or(AlignError::Navigation("root has no parent"))?;
        self.current = frame.parent;
        Ok(())
    }

    fn goto_first_child(&mut self) -> Result<(), AlignError> {
        self.descend(false)
    }

    fn goto_last_child(&mut self) -> Result<(), AlignError> {
        self.descend(true)
    }

    fn goto_next_sibling(&mut self) -> Result<(), AlignError> {
        self.shift(true)
    }

    fn goto_previous_sibling(&mut self) -> Result<(), AlignError> {
        self.shift(false)
    }

    fn number_of_vertices(&self) -> usize {
        subtree_stats(self.adapter, self.current).0
    }

    fn max_degree(&self) -> usize {
        subtree_stats(self.adapter, self.current).1
    }
}

/// Cursor for adapters with parent links. Needs no stack.
pub struct BackrefCursor<'a, A: BackrefTreeAdapter> {
    adapter: &'a A,
    current: A::Node,
    depth: usize,
}

impl<'a, A: BackrefTreeAdapter> BackrefCursor<'a, A> {
    pub fn new(adapter: &'a A, node: A::Node) -> Self {
        let mut depth = 0;
        let mut up = adapter.parent_of(node);
        while let Some(parent) = up {
            depth += 1;
            up = adapter.parent_of(parent);
        }
        Self {
            adapter,
            current: node,
            depth,
        }
    }

    fn sibling(&mut self, forward: bool) -> Result<(), AlignError> {
        let parent = self
            .adapter
            .parent_of(self.current)
            .ok_or(AlignError::Navigation("root has no siblings"))?;
        let index = self.adapter.index_of(self.current);
        let index = if forward {
            index + 1
        } else {
            index
                .checked_sub(1)
                .ok_or(AlignError::Navigation("no previous sibling"))?
        };
        let next = *self
            .adapter
            .children_of(parent)
            .get(index)
            .ok_or(AlignError::Navigation("no next sibling"))?;
        self.current = next;
        Ok(())
    }
}

impl<'a, A: BackrefTreeAdapter> TreeCursor<A::Node> for BackrefCursor<'a, A> {
    fn node(&self) -> A::Node {
        self.current
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn is_root(&self) -> bool {
        self.adapter.parent_of(self.current).is_none()
    }

    fn is_leaf(&self) -> bool {
        self.adapter.degree_of(self.current) == 0
    }

    fn goto_parent(&mut self) -> Result<(), AlignError> {
        let parent = self
            .adapter
            .parent_of(self.current)
            .ok_or(AlignError::Navigation("root has no parent"))?;
        self.current = parent;
        self.depth -= 1;
        Ok(())
    }

    fn goto_first_child(&mut self) -> Result<(), AlignError> {
        let first = *self
            .adapter
            .children_of(self.current)
            .first()
            .ok_or(AlignError::Navigation("vertex has no children"))?;
        self.current = first;
        self.depth += 1;
        Ok(())
    }

    fn goto_last_child(&mut self) -> Result<(), AlignError> {
        let last = *self
            .adapter
            .children_of(self.current)
            .last()
            .ok_or(AlignError::Navigation("vertex has no children"))?;
        self.current = last;
        self.depth += 1;
        Ok(())
    }

    fn goto_next_sibling(&mut self) -> Result<(), AlignError> {
        self.sibling(true)
    }

    fn goto_previous_sibling(&mut self) -> Result<(), AlignError> {
        self.sibling(false)
    }

    fn number_of_vertices(&self) -> usize {
        subtree_stats(self.adapter, self.current).0
    }

    fn max_degree(&self) -> usize {
        subtree_stats(self.adapter, self.current).1
    }
}
