use super::adapter::TreeAdapter;

/// Post-order walk: children left to right, then the parent.
pub struct PostOrderTraversal<'a, A: TreeAdapter> {
    adapter: &'a A,
    root: A::Node,
}

impl<'a, A: TreeAdapter> PostOrderTraversal<'a, A> {
    pub fn new(adapter: &'a A, root: A::Node) -> Self {
        Self { adapter, root }
    }

    /// Calls `f(node, is_root)` for each vertex.
    pub fn run<F>(&self, mut f: F)
    where
        F: FnMut(A::Node, bool),
    {
        self.call(|node, _: Vec<()>, is_root| f(node, is_root));
    }

    /// Folds the tree bottom-up. `f` receives the vertex, the results of its
    /// children in order, and whether it is the root.
    pub fn call<R, F>(&self, mut f: F) -> R
    where
        F: FnMut(A::Node, Vec<R>, bool) -> R,
    {
        struct Frame<N, R> {
            node: N,
            children: std::vec::IntoIter<N>,
            results: Vec<R>,
        }

        let mut stack = vec![Frame {
            node: self.root,
            children: self.adapter.children_of(self.root).into_iter(),
            results: Vec::new(),
        }];

        while let Some(mut frame) = stack.pop() {
            if let Some(child) = frame.children.next() {
                stack.push(frame);
                stack.push(Frame {
                    node: child,
                    children: self.adapter.children_of(child).into_iter(),
                    results: Vec::new(),
                });
                continue;
            }
            let result = f(frame.node, frame.results, stack.is_empty());
            match stack.last_mut() {
                Some(parent) => parent.results.push(result),
                None => return result,
            }
        }
        unreachable!("the root frame returns its result")
    }

    /// Lazy post-order iterator.
    pub fn iter(&self) -> PostOrderIter<'a, A> {
        PostOrderIter::new(self.adapter, self.root)
    }
}

/// Lazy post-order iterator. The stack holds one entry per level of the
/// current path, with the children still to visit.
pub struct PostOrderIter<'a, A: TreeAdapter> {
    adapter: &'a A,
    stack: Vec<(A::Node, std::vec::IntoIter<A::Node>)>,
}

impl<'a, A: TreeAdapter> PostOrderIter<'a, A> {
    pub fn new(adapter: &'a A, root: A::Node) -> Self {
        Self {
            adapter,
            stack: vec![(root, adapter.children_of(root).into_iter())],
        }
    }
}

impl<'a, A: TreeAdapter> Iterator for PostOrderIter<'a, A> {
    type Item = A::Node;

    fn next(&mut self) -> Option<A::Node> {
        loop {
            let (_, children) = self.stack.last_mut()?;
            match children.next() {
                Some(child) => {
                    let grandchildren = self.adapter.children_of(child).into_iter();
                    self.stack.push((child, grandchildren));
                }
                None => return self.stack.pop().map(|(node, _)| node),
            }
        }
    }
}

/// Pre-order walk: the parent, then its children left to right.
pub struct PreOrderTraversal<'a, A: TreeAdapter> {
    adapter: &'a A,
    root: A::Node,
}

impl<'a, A: TreeAdapter> PreOrderTraversal<'a, A> {
    pub fn new(adapter: &'a A, root: A::Node) -> Self {
        Self { adapter, root }
    }

    /// Folds the tree top-down. `f` receives the result computed for the
    /// parent (`None` at the root) and the vertex. Results come back in
    /// pre-order.
    pub fn call<R, F>(&self, mut f: F) -> Vec<R>
    where
        F: FnMut(Option<&R>, A::Node) -> R,
    {
        let mut results: Vec<R> = Vec::new();
        let mut stack: Vec<(A::Node, Option<usize>)> = vec![(self.root, None)];
        while let Some((node, parent)) = stack.pop() {
            let result = f(parent.map(|i| &results[i]), node);
            let slot = results.len();
            results.push(result);
            for child in self.adapter.children_of(node).into_iter().rev() {
                stack.push((child, Some(slot)));
            }
        }
        results
    }

    /// Lazy pre-order iterator.
    pub fn iter(&self) -> PreOrderIter<'a, A> {
        PreOrderIter::new(self.adapter, self.root)
    }
}

/// Lazy pre-order iterator; [`PreOrderIter::reset`] starts over from the root.
pub struct PreOrderIter<'a, A: TreeAdapter> {
    adapter: &'a A,
    root: A::Node,
    stack: Vec<A::Node>,
}

impl<'a, A: TreeAdapter> PreOrderIter<'a, A> {
    pub fn new(adapter: &'a A, root: A::Node) -> Self {
        Self {
            adapter,
            root,
            stack: vec![root],
        }
    }

    pub fn reset(&mut self) {
        self.stack.clear();
        self.stack.push(self.root);
    }
}

impl<'a, A: TreeAdapter> Iterator for PreOrderIter<'a, A> {
    type Item = A::Node;

    fn next(&mut self) -> Option<A::Node> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.adapter.children_of(node).into_iter().rev());
        Some(node)
    }
}
