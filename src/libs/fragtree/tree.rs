use super::error::FragTreeError;
use super::formula::Formula;
use super::parser::{parse_newick_multi, ParsedNode};
use crate::libs::treealign::{BackrefTreeAdapter, PreOrderTraversal, TreeAdapter};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// FragId is an index into the tree's fragment vector.
pub type FragId = usize;

#[derive(Debug, Clone)]
pub struct Fragment {
    /// Index in the arena
    pub id: FragId,

    /// Parent fragment (None for root)
    pub parent: Option<FragId>,

    pub children: Vec<FragId>,

    /// Molecular formula of the fragment ion
    pub formula: Formula,

    /// Neutral loss on the edge from the parent. Empty for the root.
    pub loss: Formula,

    /// NHX tags of the node
    pub properties: Option<BTreeMap<String, String>>,
}

impl Fragment {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Fragmentation tree: fragments connected by neutral losses.
///
/// ```
/// use ftalign::libs::fragtree::FragTree;
///
/// let trees = FragTree::from_newick("((C5H5)C7H7,C6H5)C8H10O;", "toluene").unwrap();
/// let tree = &trees[0];
/// assert_eq!(tree.name(), "toluene");
/// assert_eq!(tree.len(), 4);
/// assert_eq!(tree.get(1).loss.to_string(), "CH3O");
/// ```
#[derive(Debug, Clone)]
pub struct FragTree {
    name: String,
    nodes: Vec<Fragment>,
    root: FragId,
}

impl FragTree {
    /// Parses all trees of a Newick string. A tree is named by the `id` tag
    /// of its root, otherwise by `default_name`, suffixed with the position
    /// when the input holds several trees.
    pub fn from_newick(input: &str, default_name: &str) -> Result<Vec<FragTree>, FragTreeError> {
        let roots = parse_newick_multi(input)?;
        let multiple = roots.len() > 1;
        roots
            .into_iter()
            .enumerate()
            .map(|(i, root)| {
                let fallback = if multiple {
                    format!("{}_{}", default_name, i + 1)
                } else {
                    default_name.to_string()
                };
                Self::from_parsed(root, fallback)
            })
            .collect()
    }

    fn from_parsed(root: ParsedNode, fallback: String) -> Result<FragTree, FragTreeError> {
        let name = root
            .properties
            .as_ref()
            .and_then(|p| p.get("id"))
            .cloned()
            .unwrap_or(fallback);
        let mut tree = FragTree {
            name,
            nodes: Vec::new(),
            root: 0,
        };

        // pre-order with an explicit stack, the root gets id 0
        let mut stack = vec![(root, None)];
        while let Some((parsed, parent)) = stack.pop() {
            let id = tree.add_fragment(parsed.name, parsed.properties, parent)?;
            if let Some(p) = parent {
                tree.nodes[p].children.push(id);
            }
            stack.extend(parsed.children.into_iter().rev().map(|child| (child, Some(id))));
        }
        Ok(tree)
    }

    fn add_fragment(
        &mut self,
        label: Option<String>,
        properties: Option<BTreeMap<String, String>>,
        parent: Option<FragId>,
    ) -> Result<FragId, FragTreeError> {
        let label = label.ok_or_else(|| {
            FragTreeError::LogicError(format!("a fragment of {} has no formula", self.name))
        })?;
        let formula: Formula = label.parse()?;
        let loss = match parent {
            Some(p) => {
                let loss = self.nodes[p].formula.sub(&formula)?;
                if loss.is_empty() || !loss.is_non_negative() {
                    return Err(FragTreeError::LogicError(format!(
                        "{} is not a fragment of {} in {}",
                        formula, self.nodes[p].formula, self.name
                    )));
                }
                loss
            }
            None => Formula::new(),
        };

        let id = self.nodes.len();
        self.nodes.push(Fragment {
            id,
            parent,
            children: Vec::new(),
            formula,
            loss,
            properties,
        });
        Ok(id)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Parsed trees always hold their root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: FragId) -> &Fragment {
        &self.nodes[id]
    }

    pub fn root(&self) -> FragRef<'_> {
        self.node(self.root)
    }

    pub fn node(&self, id: FragId) -> FragRef<'_> {
        FragRef { tree: self, id }
    }

    pub fn leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Longest root-to-leaf path in edges.
    pub fn depth(&self) -> usize {
        let adapter = FragAdapter::new();
        PreOrderTraversal::new(&adapter, self.root())
            .call(|parent: Option<&usize>, _| parent.map_or(0, |d| d + 1))
            .into_iter()
            .max()
            .unwrap_or(0)
    }
}

/// Handle to one fragment of one tree.
#[derive(Clone, Copy)]
pub struct FragRef<'a> {
    tree: &'a FragTree,
    id: FragId,
}

impl<'a> FragRef<'a> {
    pub fn id(&self) -> FragId {
        self.id
    }

    pub fn tree(&self) -> &'a FragTree {
        self.tree
    }

    pub fn fragment(&self) -> &'a Fragment {
        &self.tree.nodes[self.id]
    }

    pub fn formula(&self) -> &'a Formula {
        &self.fragment().formula
    }

    pub fn loss(&self) -> &'a Formula {
        &self.fragment().loss
    }

    pub fn is_root(&self) -> bool {
        self.fragment().parent.is_none()
    }
}

impl PartialEq for FragRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for FragRef<'_> {}

impl Hash for FragRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.tree, state);
        self.id.hash(state);
    }
}

impl fmt::Debug for FragRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formula())
    }
}

impl fmt::Display for FragRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "{}", self.formula())
        } else {
            write!(f, "{} (-{})", self.formula(), self.loss())
        }
    }
}

/// Adapter over any number of fragmentation trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct FragAdapter<'a> {
    marker: PhantomData<&'a FragTree>,
}

impl<'a> FragAdapter<'a> {
    pub fn new() -> Self {
        Self {
            marker: PhantomData,
        }
    }
}

impl<'a> TreeAdapter for FragAdapter<'a> {
    type Node = FragRef<'a>;

    fn children_of(&self, node: FragRef<'a>) -> Vec<FragRef<'a>> {
        node.fragment()
            .children
            .iter()
            .map(|&id| FragRef {
                tree: node.tree,
                id,
            })
            .collect()
    }

    fn degree_of(&self, node: FragRef<'a>) -> usize {
        node.fragment().children.len()
    }
}

impl<'a> BackrefTreeAdapter for FragAdapter<'a> {
    fn parent_of(&self, node: FragRef<'a>) -> Option<FragRef<'a>> {
        node.fragment().parent.map(|id| FragRef {
            tree: node.tree,
            id,
        })
    }

    fn index_of(&self, node: FragRef<'a>) -> usize {
        node.fragment()
            .parent
            .and_then(|p| node.tree.nodes[p].children.iter().position(|&c| c == node.id))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::treealign::{BackrefCursor, TreeCursor};

    fn toluene() -> FragTree {
        FragTree::from_newick("((C5H5)C7H7,C6H5)C8H10O[&&NHX:id=tol];", "x")
            .unwrap()
            .remove(0)
    }

    #[test]
    fn test_build() {
        let tree = toluene();
        assert_eq!(tree.name(), "tol");
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.leaves(), 2);
        assert_eq!(tree.depth(), 2);

        let root = tree.root();
        assert!(root.is_root());
        assert!(root.loss().is_empty());
        let c5h5 = tree.node(2);
        assert_eq!(c5h5.formula().to_string(), "C5H5");
        assert_eq!(c5h5.loss().to_string(), "C2H2");
        assert_eq!(format!("{}", c5h5), "C5H5 (-C2H2)");
    }

    #[test]
    fn test_names() {
        let trees = FragTree::from_newick("C2H4O;\n(CO)C2H4O;", "file").unwrap();
        let names: Vec<&str> = trees.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["file_1", "file_2"]);
    }

    #[test]
    fn test_deep_chain() {
        // C100H200 -> C99H198 -> ... -> CH2, each losing CH2
        let depth = 100;
        let mut newick = "(".repeat(depth - 1);
        newick.push_str("CH2");
        for atoms in 2..=depth {
            newick.push_str(&format!(")C{}H{}", atoms, atoms * 2));
        }
        newick.push(';');

        let tree = FragTree::from_newick(&newick, "chain").unwrap().remove(0);
        assert_eq!(tree.len(), depth);
        assert_eq!(tree.depth(), depth - 1);
        assert_eq!(tree.root().formula().to_string(), "C100H200");
        assert_eq!(tree.get(1).formula.to_string(), "C99H198");
        assert_eq!(tree.get(depth - 1).loss.to_string(), "CH2");
        assert_eq!(tree.get(depth - 1).parent, Some(depth - 2));
    }

    #[test]
    fn test_child_order() {
        let tree = FragTree::from_newick("((C4H4,C3H3)C5H5,C6H5)C8H10O;", "x")
            .unwrap()
            .remove(0);
        let formulas: Vec<String> = (0..tree.len())
            .map(|id| tree.get(id).formula.to_string())
            .collect();
        assert_eq!(formulas, vec!["C8H10O", "C5H5", "C4H4", "C3H3", "C6H5"]);
        assert_eq!(tree.get(0).children, vec![1, 4]);
        assert_eq!(tree.get(1).children, vec![2, 3]);
    }

    #[test]
    fn test_invalid() {
        // child larger than parent
        assert!(matches!(
            FragTree::from_newick("(C8H10O)C7H7;", "x"),
            Err(FragTreeError::LogicError(_))
        ));
        // missing label
        assert!(matches!(
            FragTree::from_newick("(C5H5,)C7H7;", "x"),
            Err(FragTreeError::LogicError(_))
        ));
        assert!(matches!(
            FragTree::from_newick("(benzene)C7H7;", "x"),
            Err(FragTreeError::FormulaError(_))
        ));
    }

    #[test]
    fn test_adapter() {
        let tree = toluene();
        let other = toluene();
        let adapter = FragAdapter::new();

        let children = adapter.children_of(tree.root());
        assert_eq!(children.len(), 2);
        assert_eq!(adapter.index_of(children[1]), 1);
        assert_eq!(adapter.parent_of(children[1]), Some(tree.root()));
        // same formula, different tree
        assert_ne!(tree.root(), other.root());

        let mut cursor = BackrefCursor::new(&adapter, tree.node(2));
        assert_eq!(cursor.depth(), 2);
        cursor.goto_parent().unwrap();
        assert_eq!(cursor.node().id(), 1);
    }
}
