//! End-to-end runs: input file in, result document out.

use lae::app;
use lae::{ComputationNode, Engine, NodeKind};

use crate::fixtures::{counting_matrix, reference_product, seeded_config, RunDir};

/// Test: Addition of two matrices
/// Given an input file adding two 2x2 matrices
/// When the run completes with 4 threads
/// Then the output holds the element-wise sum
#[test]
fn test_add_two_matrices() {
    let dir = RunDir::with_input(
        r#"{"operator": "+", "operands": [[[2, -1], [0.5, 3.5]], [[4, 6], [1.5, -0.5]]]}"#,
    );
    app::run(&dir.args("4"), &seeded_config()).unwrap();
    assert_eq!(dir.result(), vec![vec![6.0, 5.0], vec![2.0, 3.0]]);
}

/// Test: Nested multiply then add
/// Given (A x B) + ones with A = [[1,1],[2,1]] and B = [[3,2],[3,2]]
/// When the run completes
/// Then the product is resolved first and the sum is [[7,5],[10,7]]
#[test]
fn test_multiply_then_add() {
    let dir = RunDir::with_input(
        r#"{
            "operator": "+",
            "operands": [
                {"operator": "*", "operands": [[[1, 1], [2, 1]], [[3, 2], [3, 2]]]},
                [[1, 1], [1, 1]]
            ]
        }"#,
    );
    app::run(&dir.args("2"), &seeded_config()).unwrap();
    assert_eq!(dir.result(), vec![vec![7.0, 5.0], vec![10.0, 7.0]]);
}

/// Test: Transpose of a row
/// Given T([[5,6,7]])
/// When the run completes
/// Then the output is a single column
#[test]
fn test_transpose_row_to_column() {
    let dir = RunDir::with_input(r#"{"operator": "T", "operands": [[[5, 6, 7]]]}"#);
    app::run(&dir.args("1"), &seeded_config()).unwrap();
    assert_eq!(dir.result(), vec![vec![5.0], vec![6.0], vec![7.0]]);
}

/// Test: Negate
/// Given -([[-1, 4], [2, -3]])
/// When the run completes
/// Then every sign flips
#[test]
fn test_negate() {
    let dir = RunDir::with_input(r#"{"operator": "-", "operands": [[[-1, 4], [2, -3]]]}"#);
    app::run(&dir.args("3"), &seeded_config()).unwrap();
    assert_eq!(dir.result(), vec![vec![1.0, -4.0], vec![-2.0, 3.0]]);
}

/// Test: Shape mismatch
/// Given an addition of a 1x2 and a 2x2 matrix
/// When the run completes
/// Then the output is an error document naming an illegal operation
#[test]
fn test_shape_mismatch_writes_error() {
    let dir = RunDir::with_input(
        r#"{"operator": "+", "operands": [[[1, 2]], [[1, 2], [3, 4]]]}"#,
    );
    let report = app::run(&dir.args("2"), &seeded_config()).unwrap();
    assert!(dir.error().contains("Illegal operation"));
    // The pool was built, so workers are still reported.
    assert_eq!(report.workers.map(|w| w.workers.len()), Some(2));
}

/// Test: Invalid thread count
/// Given thread counts of 0, -1 and a word
/// When the run starts
/// Then no engine is built and the output holds the diagnostic
#[test]
fn test_invalid_thread_count() {
    for threads in ["0", "-1", "lots"] {
        let dir = RunDir::with_input("[[1]]");
        let report = app::run(&dir.args(threads), &seeded_config()).unwrap();
        assert_eq!(dir.error(), app::INVALID_THREADS);
        assert!(report.workers.is_none());
    }
}

/// Test: Unreadable input
/// Given malformed JSON and an unknown operator
/// When the run starts
/// Then the output is an error document
#[test]
fn test_bad_input_writes_error() {
    let dir = RunDir::with_input("{not json");
    app::run(&dir.args("2"), &seeded_config()).unwrap();
    assert!(!dir.error().is_empty());

    let dir = RunDir::with_input(r#"{"operator": "^", "operands": [[[1]], [[2]]]}"#);
    app::run(&dir.args("2"), &seeded_config()).unwrap();
    assert!(dir.error().contains("unknown operator"));
}

/// Test: Leaf input
/// Given an input that is just a matrix
/// When the run completes
/// Then the matrix is written back unchanged
#[test]
fn test_leaf_input_echoes_matrix() {
    let dir = RunDir::with_input("[[1.25, 2], [3, 4]]");
    app::run(&dir.args("2"), &seeded_config()).unwrap();
    assert_eq!(dir.result(), vec![vec![1.25, 2.0], vec![3.0, 4.0]]);
}

/// Test: Compact output
/// Given pretty output disabled in the config
/// When the run completes
/// Then the document is written on one line
#[test]
fn test_compact_output() {
    let dir = RunDir::with_input(r#"{"operator": "-", "operands": [[[1]]]}"#);
    let config = lae::config::Config {
        pretty_output: false,
        ..seeded_config()
    };
    app::run(&dir.args("1"), &config).unwrap();
    let text = std::fs::read_to_string(&dir.output).unwrap();
    assert_eq!(text, r#"{"result":[[-1.0]]}"#);
}

/// Test: Larger product against a sequential reference
/// Given two 12x12 matrices and 4 workers
/// When the engine multiplies them
/// Then the result matches the plain triple loop
#[test]
fn test_large_product_matches_reference() {
    let a = counting_matrix(12);
    let b: Vec<Vec<f64>> = counting_matrix(12)
        .into_iter()
        .map(|row| row.into_iter().map(|x| x - 50.0).collect())
        .collect();
    let expected = reference_product(&a, &b);

    let mut engine = Engine::with_config(4, &seeded_config()).unwrap();
    let node = ComputationNode::op(
        NodeKind::Multiply,
        vec![ComputationNode::matrix(a), ComputationNode::matrix(b)],
    )
    .unwrap();
    let result = engine.run(node).unwrap().into_matrix().unwrap();
    assert_eq!(result, expected);

    engine.shutdown();
    let completed: u64 = engine.worker_report().workers.iter().map(|w| w.completed).sum();
    assert_eq!(completed, 12);
}

/// Test: Mixed tree
/// Given T(-(A) + B * C) built through the parser with a three-way product
/// When the run completes
/// Then every stage is applied in order
#[test]
fn test_mixed_tree() {
    let dir = RunDir::with_input(
        r#"{
            "operator": "T",
            "operands": [{
                "operator": "+",
                "operands": [
                    {"operator": "-", "operands": [[[1, 2], [3, 4]]]},
                    {"operator": "*", "operands": [[[1, 0], [0, 1]], [[2, 0], [0, 2]], [[1, 1], [0, 1]]]}
                ]
            }]
        }"#,
    );
    app::run(&dir.args("3"), &seeded_config()).unwrap();
    // -(A) = [[-1,-2],[-3,-4]], I * 2I * [[1,1],[0,1]] = [[2,2],[0,2]]
    // sum = [[1,0],[-3,-2]], transposed = [[1,-3],[0,-2]]
    assert_eq!(dir.result(), vec![vec![1.0, -3.0], vec![0.0, -2.0]]);
}
