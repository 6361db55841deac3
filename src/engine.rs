//! Expression evaluation on the worker pool.
//!
//! The `Engine` owns two working matrices and a [`WorkerPool`]. Each round it
//! picks an operator node whose operands are already matrices, loads the
//! operands into the working matrices, fans the operation out as one task per
//! row, waits for the batch, and folds the result back into the tree. Rounds
//! never overlap: the next operands are loaded only after the previous
//! batch's barrier returned.

use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::expr::{ComputationNode, MatrixData, NodeKind};
use crate::memory::SharedMatrix;
use crate::scheduling::{PoolReport, RowTask, WorkerPool};
use crate::{lae_log, lae_log_debug};

pub struct Engine {
    left: Arc<SharedMatrix>,
    right: Arc<SharedMatrix>,
    pool: WorkerPool,
}

impl Engine {
    /// Create an engine backed by `threads` workers.
    pub fn new(threads: usize) -> Result<Self> {
        Self::with_config(threads, &Config::default())
    }

    pub fn with_config(threads: usize, config: &Config) -> Result<Self> {
        let pool = WorkerPool::with_config(threads, config)?;
        lae_log_debug!("Engine ready with {} workers", pool.size());
        Ok(Self {
            left: Arc::new(SharedMatrix::new()),
            right: Arc::new(SharedMatrix::new()),
            pool,
        })
    }

    /// Evaluate `root` in place until it is a single matrix leaf.
    ///
    /// Chains of additions or multiplications with more than two operands
    /// are regrouped into binary steps first.
    ///
    /// # Errors
    ///
    /// Shape errors from incompatible operands, `TaskFailed` when a row task
    /// fails, and `InternalInconsistency` if the tree has no evaluable node
    /// while its root is still an operator.
    pub fn evaluate(&mut self, root: &mut ComputationNode) -> Result<()> {
        root.associative_nesting();
        lae_log!(
            "Evaluating expression with {} operation(s)",
            root.pending_operations()
        );

        while !root.is_matrix() {
            let node = root.find_resolvable().ok_or_else(|| {
                Error::InternalInconsistency("no resolvable node found".to_string())
            })?;
            self.load_and_compute(node)?;
        }
        Ok(())
    }

    /// Evaluate `root` and return it as a matrix leaf.
    pub fn run(&mut self, mut root: ComputationNode) -> Result<ComputationNode> {
        self.evaluate(&mut root)?;
        Ok(root)
    }

    /// Evaluate a single node whose operands are all matrix leaves and
    /// resolve it into a leaf.
    pub fn load_and_compute(&mut self, node: &mut ComputationNode) -> Result<()> {
        let kind = node.kind();
        let tasks = match kind {
            NodeKind::Matrix => {
                return Err(Error::InvalidArgument(
                    "node is already a matrix".to_string(),
                ))
            }
            NodeKind::Add => {
                self.left.load_row_major(operand(node, 0)?)?;
                self.right.load_row_major(operand(node, 1)?)?;
                self.check_add()?;
                self.add_tasks()
            }
            NodeKind::Multiply => {
                self.left.load_row_major(operand(node, 0)?)?;
                self.right.load_row_major(operand(node, 1)?)?;
                self.check_multiply()?;
                self.multiply_tasks()
            }
            NodeKind::Negate => {
                self.left.load_row_major(operand(node, 0)?)?;
                self.negate_tasks()
            }
            NodeKind::Transpose => {
                // Columns become the vectors, so each task flips one of them.
                self.left.load_column_major(operand(node, 0)?)?;
                self.transpose_tasks()
            }
        };

        lae_log_debug!("Resolving {} node with {} row task(s)", kind, tasks.len());
        self.pool.submit_all(tasks)?;
        node.resolve(self.left.read_row_major()?);
        Ok(())
    }

    fn check_add(&self) -> Result<()> {
        let (left, right) = (self.left.as_ref(), self.right.as_ref());
        if left.len() != right.len() || left.vector_len() != right.vector_len() {
            return Err(Error::Shape(format!(
                "cannot add a {}x{} matrix to a {}x{} matrix",
                left.len(),
                left.vector_len(),
                right.len(),
                right.vector_len()
            )));
        }
        Ok(())
    }

    fn check_multiply(&self) -> Result<()> {
        let (left, right) = (self.left.as_ref(), self.right.as_ref());
        if left.vector_len() != right.len() {
            return Err(Error::Shape(format!(
                "left matrix has {} columns but right matrix has {} rows",
                left.vector_len(),
                right.len()
            )));
        }
        Ok(())
    }

    fn add_tasks(&self) -> Vec<RowTask> {
        (0..self.left.len())
            .map(|row| {
                let left = Arc::clone(&self.left);
                let right = Arc::clone(&self.right);
                Box::new(move || {
                    let rhs = right.get(row)?;
                    left.get(row)?.add(&rhs)
                }) as RowTask
            })
            .collect()
    }

    fn multiply_tasks(&self) -> Vec<RowTask> {
        (0..self.left.len())
            .map(|row| {
                let left = Arc::clone(&self.left);
                let right = Arc::clone(&self.right);
                Box::new(move || left.get(row)?.project(&right)) as RowTask
            })
            .collect()
    }

    fn negate_tasks(&self) -> Vec<RowTask> {
        (0..self.left.len())
            .map(|row| {
                let left = Arc::clone(&self.left);
                Box::new(move || {
                    left.get(row)?.negate();
                    Ok(())
                }) as RowTask
            })
            .collect()
    }

    fn transpose_tasks(&self) -> Vec<RowTask> {
        (0..self.left.len())
            .map(|row| {
                let left = Arc::clone(&self.left);
                Box::new(move || {
                    left.get(row)?.transpose();
                    Ok(())
                }) as RowTask
            })
            .collect()
    }

    pub fn worker_report(&self) -> PoolReport {
        self.pool.report()
    }

    /// Wait for outstanding work and stop the workers.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

fn operand(node: &ComputationNode, index: usize) -> Result<&MatrixData> {
    node.children()
        .get(index)
        .and_then(ComputationNode::get_matrix)
        .ok_or_else(|| {
            Error::InternalInconsistency(format!(
                "{} node operand {} is not a matrix",
                node.kind(),
                index
            ))
        })
}
