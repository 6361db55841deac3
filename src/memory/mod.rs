//! Shared numeric containers.
//!
//! [`SharedVector`] carries one reader-writer lock per row (or column) and
//! [`SharedMatrix`] is an ordered sequence of them. Whenever several vectors
//! of one matrix are locked together they are locked in ascending index order.

pub mod matrix;
pub mod vector;

pub use matrix::SharedMatrix;
pub use vector::{Orientation, SharedVector};
