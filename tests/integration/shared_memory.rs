//! Shared vectors and matrices used from many threads.

use std::sync::Arc;
use std::thread;

use lae::{Orientation, SharedMatrix, SharedVector};

/// Test: Concurrent accumulation
/// Given 8 threads each adding a ones vector 100 times into one target
/// When all threads finish
/// Then no update was lost
#[test]
fn test_concurrent_adds_into_one_vector() {
    let target = Arc::new(SharedVector::new(&[0.0, 0.0, 0.0], Orientation::Row));
    let ones = Arc::new(SharedVector::new(&[1.0, 1.0, 1.0], Orientation::Row));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let target = Arc::clone(&target);
            let ones = Arc::clone(&ones);
            thread::spawn(move || {
                for _ in 0..100 {
                    target.add(&ones).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(target.to_vec(), vec![800.0, 800.0, 800.0]);
}

/// Test: Row projections share one right-hand matrix
/// Given every row of a 6x6 matrix projected onto the same matrix from its own thread
/// When all threads finish
/// Then the rows hold the matrix square
#[test]
fn test_parallel_row_projections() {
    let rows: Vec<Vec<f64>> = (0..6)
        .map(|i| (0..6).map(|j| ((i + j) % 4) as f64 - 1.0).collect())
        .collect();
    let left = Arc::new(SharedMatrix::from_rows(&rows).unwrap());
    let right = Arc::new(SharedMatrix::from_rows(&rows).unwrap());

    let handles: Vec<_> = (0..6)
        .map(|row| {
            let left = Arc::clone(&left);
            let right = Arc::clone(&right);
            thread::spawn(move || left.get(row).unwrap().project(&right).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let expected: Vec<Vec<f64>> = rows
        .iter()
        .map(|row| {
            (0..6)
                .map(|j| row.iter().zip(&rows).map(|(x, r)| x * r[j]).sum())
                .collect()
        })
        .collect();
    assert_eq!(left.read_row_major().unwrap(), expected);
    assert_eq!(right.read_row_major().unwrap(), rows);
}

/// Test: Snapshots never see half-updated rows
/// Given writers negating whole rows while a reader materializes the matrix
/// When the reader inspects each snapshot
/// Then every row is either the original or its full negation
#[test]
fn test_read_row_major_sees_whole_rows() {
    let rows = vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]];
    let matrix = Arc::new(SharedMatrix::from_rows(&rows).unwrap());

    let writers: Vec<_> = (0..2)
        .map(|row| {
            let matrix = Arc::clone(&matrix);
            thread::spawn(move || {
                let vector = matrix.get(row).unwrap();
                for _ in 0..500 {
                    vector.negate();
                }
            })
        })
        .collect();

    for _ in 0..200 {
        for (seen, original) in matrix.read_row_major().unwrap().iter().zip(&rows) {
            let negated: Vec<f64> = original.iter().map(|x| -x).collect();
            assert!(seen == original || *seen == negated, "torn row {:?}", seen);
        }
    }
    for writer in writers {
        writer.join().unwrap();
    }

    // An even number of negations restores every row.
    assert_eq!(matrix.read_row_major().unwrap(), rows);
}

/// Test: Column-major load
/// Given a 2x3 matrix loaded column-major
/// When it is read back
/// Then the values are unchanged while the storage holds 3 column vectors
#[test]
fn test_column_major_load_reads_back() {
    let rows = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
    let matrix = SharedMatrix::new();
    matrix.load_column_major(&rows).unwrap();

    assert_eq!(matrix.len(), 3);
    assert_eq!(matrix.orientation(), Orientation::Column);
    assert_eq!(matrix.read_row_major().unwrap(), rows);
}
