//! Expression trees and their JSON input format.

pub mod node;
pub mod parser;

pub use node::{ComputationNode, MatrixData, NodeKind};
pub use parser::{parse_file, parse_str};
