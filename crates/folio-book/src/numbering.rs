//! Hierarchical section numbers.

use std::fmt;

use crate::tree::{BookTree, NodeId};

/// Section number of a node, e.g. `[2, 1]` for "2.1".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NumberPath(Vec<usize>);

impl NumberPath {
    pub fn components(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// Display label for the sidebar: "1." for top-level nodes, "2.1" below.
    pub fn label(&self) -> String {
        if self.0.len() == 1 {
            format!("{}.", self.0[0])
        } else {
            self.to_string()
        }
    }

    fn child(&self, n: usize) -> Self {
        let mut path = self.0.clone();
        path.push(n);
        Self(path)
    }
}

impl fmt::Display for NumberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, n) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{n}")?;
        }
        Ok(())
    }
}

/// Number paths of every node of a tree, indexed by [`NodeId`].
#[derive(Debug, Clone, Default)]
pub struct Numbering {
    numbers: Vec<NumberPath>,
}

impl Numbering {
    /// Numbers siblings 1-based in tree order; a child extends its parent's path.
    pub fn assign(tree: &BookTree) -> Self {
        let mut numbers = vec![NumberPath::default(); tree.len()];
        let mut stack: Vec<(NumberPath, &[NodeId])> = vec![(NumberPath::default(), tree.roots())];

        while let Some((prefix, ids)) = stack.pop() {
            for (i, &id) in ids.iter().enumerate() {
                let path = prefix.child(i + 1);
                stack.push((path.clone(), tree.children(id)));
                numbers[id.index()] = path;
            }
        }

        Self { numbers }
    }

    pub fn get(&self, id: NodeId) -> &NumberPath {
        &self.numbers[id.index()]
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}
