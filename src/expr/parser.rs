//! JSON input for expression trees.
//!
//! An operand is either a matrix literal (an array of equally long numeric
//! rows) or an operator object:
//!
//! ```json
//! {
//!   "operator": "*",
//!   "operands": [
//!     [[1, 1], [2, 1]],
//!     {"operator": "T", "operands": [[[3, 0], [0, 2]]]}
//!   ]
//! }
//! ```
//!
//! Operators are `+`, `*` (two or more operands), `-` (negate) and `T`
//! (transpose), each of the last two with exactly one operand.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::expr::node::{ComputationNode, MatrixData, NodeKind};
use crate::lae_log_debug;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNode {
    Matrix(MatrixData),
    Operator {
        operator: String,
        operands: Vec<RawNode>,
    },
}

pub fn parse_file(path: &Path) -> Result<ComputationNode> {
    lae_log_debug!("Parsing expression from {}", path.display());
    parse_str(&fs::read_to_string(path)?)
}

pub fn parse_str(json: &str) -> Result<ComputationNode> {
    let raw: RawNode = serde_json::from_str(json)?;
    build(raw)
}

fn build(raw: RawNode) -> Result<ComputationNode> {
    match raw {
        RawNode::Matrix(data) => {
            check_rectangular(&data)?;
            Ok(ComputationNode::matrix(data))
        }
        RawNode::Operator { operator, operands } => {
            let kind = NodeKind::from_symbol(&operator)
                .ok_or_else(|| Error::Parse(format!("unknown operator '{}'", operator)))?;
            let children = operands
                .into_iter()
                .map(build)
                .collect::<Result<Vec<_>>>()?;
            ComputationNode::op(kind, children)
        }
    }
}

fn check_rectangular(data: &MatrixData) -> Result<()> {
    let width = data
        .first()
        .map(Vec::len)
        .ok_or_else(|| Error::Parse("empty matrix literal".to_string()))?;
    if width == 0 || data.iter().any(|row| row.len() != width) {
        return Err(Error::Parse(
            "matrix literal must be a non-empty rectangle".to_string(),
        ));
    }
    Ok(())
}
