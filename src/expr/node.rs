//! Expression tree over matrices.
//!
//! A `ComputationNode` is either a matrix leaf or an operator with operand
//! children. Evaluation repeatedly picks a node whose operands are all leaves
//! and collapses it into a leaf with [`ComputationNode::resolve`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Row-major matrix value held by a leaf.
pub type MatrixData = Vec<Vec<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Matrix,
    Add,
    Multiply,
    Negate,
    Transpose,
}

impl NodeKind {
    /// Operator symbol used in JSON input.
    pub fn symbol(&self) -> &'static str {
        match self {
            NodeKind::Matrix => "matrix",
            NodeKind::Add => "+",
            NodeKind::Multiply => "*",
            NodeKind::Negate => "-",
            NodeKind::Transpose => "T",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(NodeKind::Add),
            "*" => Some(NodeKind::Multiply),
            "-" => Some(NodeKind::Negate),
            "T" => Some(NodeKind::Transpose),
            _ => None,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, NodeKind::Add | NodeKind::Multiply)
    }

    pub fn is_unary(&self) -> bool {
        matches!(self, NodeKind::Negate | NodeKind::Transpose)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Matrix => write!(f, "MATRIX"),
            NodeKind::Add => write!(f, "ADD"),
            NodeKind::Multiply => write!(f, "MULTIPLY"),
            NodeKind::Negate => write!(f, "NEGATE"),
            NodeKind::Transpose => write!(f, "TRANSPOSE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputationNode {
    kind: NodeKind,
    matrix: Option<MatrixData>,
    children: Vec<ComputationNode>,
}

impl ComputationNode {
    /// A matrix leaf.
    pub fn matrix(data: MatrixData) -> Self {
        Self {
            kind: NodeKind::Matrix,
            matrix: Some(data),
            children: Vec::new(),
        }
    }

    /// An operator node.
    ///
    /// # Errors
    ///
    /// `Parse` when the operand count does not fit the operator: negate and
    /// transpose take one, add and multiply take two or more.
    pub fn op(kind: NodeKind, children: Vec<ComputationNode>) -> Result<Self> {
        let arity_ok = if kind.is_unary() {
            children.len() == 1
        } else {
            kind.is_binary() && children.len() >= 2
        };
        if !arity_ok {
            return Err(Error::Parse(format!(
                "operator {} cannot take {} operand(s)",
                kind,
                children.len()
            )));
        }
        Ok(Self {
            kind,
            matrix: None,
            children,
        })
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_matrix(&self) -> bool {
        self.kind == NodeKind::Matrix
    }

    pub fn children(&self) -> &[ComputationNode] {
        &self.children
    }

    /// The leaf value. `None` for operator nodes.
    pub fn get_matrix(&self) -> Option<&MatrixData> {
        self.matrix.as_ref()
    }

    /// Consume a leaf and return its value.
    pub fn into_matrix(self) -> Option<MatrixData> {
        self.matrix
    }

    /// Turn this node into a matrix leaf holding `data`.
    pub fn resolve(&mut self, data: MatrixData) {
        self.kind = NodeKind::Matrix;
        self.matrix = Some(data);
        self.children.clear();
    }

    /// Rewrite additions and multiplications with more than two operands
    /// into left-nested binary chains: `a + b + c` becomes `(a + b) + c`.
    /// Operand order is kept.
    pub fn associative_nesting(&mut self) {
        for child in &mut self.children {
            child.associative_nesting();
        }
        if !self.kind.is_binary() || self.children.len() <= 2 {
            return;
        }

        let mut operands = std::mem::take(&mut self.children).into_iter();
        let (Some(first), Some(second)) = (operands.next(), operands.next()) else {
            return;
        };
        let mut acc = Self {
            kind: self.kind,
            matrix: None,
            children: vec![first, second],
        };
        let last = operands.next_back();
        for operand in operands {
            acc = Self {
                kind: self.kind,
                matrix: None,
                children: vec![acc, operand],
            };
        }
        self.children = match last {
            Some(last) => vec![acc, last],
            None => acc.children,
        };
    }

    /// First operator node, depth first, whose operands are all matrix
    /// leaves. `None` when this node is itself a leaf.
    pub fn find_resolvable(&mut self) -> Option<&mut ComputationNode> {
        if self.is_matrix() {
            return None;
        }
        if self.children.iter().all(ComputationNode::is_matrix) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(ComputationNode::find_resolvable)
    }

    /// Number of operator nodes left to evaluate.
    pub fn pending_operations(&self) -> usize {
        let own = usize::from(!self.is_matrix());
        own + self
            .children
            .iter()
            .map(ComputationNode::pending_operations)
            .sum::<usize>()
    }
}
