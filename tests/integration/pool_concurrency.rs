//! Worker pool scheduling under concurrent load.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use lae::scheduling::RowTask;
use lae::{Error, WorkerPool};

use crate::fixtures::seeded_config;

fn counting_task(counter: &Arc<AtomicUsize>, sleep: Duration) -> RowTask {
    let counter = Arc::clone(counter);
    Box::new(move || {
        thread::sleep(sleep);
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

/// Test: Every worker gets work
/// Given 4 workers and 16 short tasks submitted one by one
/// When the batch finishes
/// Then each worker completed at least one task
#[test]
fn test_unused_workers_are_preferred() {
    let pool = WorkerPool::with_config(4, &seeded_config()).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<RowTask> = (0..16)
        .map(|_| counting_task(&counter, Duration::from_millis(2)))
        .collect();
    pool.submit_all(tasks).unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 16);
    let report = pool.report();
    assert!(report.workers.iter().all(|w| w.completed >= 1));
    assert_eq!(report.workers.iter().map(|w| w.completed).sum::<u64>(), 16);
}

/// Test: Barrier waits for the whole batch
/// Given tasks of uneven length
/// When submit_all returns
/// Then nothing is in flight and every task has run
#[test]
fn test_barrier_covers_slow_tasks() {
    let pool = WorkerPool::with_config(3, &seeded_config()).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<RowTask> = (0..9)
        .map(|i| counting_task(&counter, Duration::from_millis(if i % 3 == 0 { 20 } else { 1 })))
        .collect();
    pool.submit_all(tasks).unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 9);
    assert_eq!(pool.in_flight(), 0);
}

/// Test: Failures from several workers
/// Given a batch where every third task fails
/// When the barrier returns
/// Then all healthy tasks ran and the failure count is exact
#[test]
fn test_failures_counted_across_workers() {
    let pool = WorkerPool::with_config(4, &seeded_config()).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<RowTask> = (0..12)
        .map(|i| {
            if i % 3 == 0 {
                Box::new(move || Err::<(), _>(Error::Shape(format!("row {}", i)))) as RowTask
            } else {
                counting_task(&counter, Duration::from_millis(1))
            }
        })
        .collect();

    match pool.submit_all(tasks) {
        Err(Error::TaskFailed { failed, first }) => {
            assert_eq!(failed, 4);
            assert!(first.is_shape_error());
        }
        other => panic!("Expected TaskFailed, got {:?}", other),
    }
    assert_eq!(counter.load(Ordering::SeqCst), 8);

    // Failures were drained by the barrier.
    pool.submit_all(vec![counting_task(&counter, Duration::ZERO)]).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 9);
}

/// Test: Concurrent submitters
/// Given 4 threads each submitting 10 tasks to a 2-worker pool
/// When all threads finish and the pool waits
/// Then all 40 tasks ran exactly once
#[test]
fn test_concurrent_submitters() {
    let pool = Arc::new(WorkerPool::with_config(2, &seeded_config()).unwrap());
    let counter = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..10 {
                    pool.submit(counting_task(&counter, Duration::from_micros(200)))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    pool.wait_idle().unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 40);
}

/// Test: Shutdown finishes submitted work
/// Given tasks still running when shutdown is called
/// When shutdown returns
/// Then every task has completed and new submissions are refused
#[test]
fn test_shutdown_drains_work() {
    let pool = WorkerPool::with_config(2, &seeded_config()).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        pool.submit(counting_task(&counter, Duration::from_millis(30)))
            .unwrap();
    }
    pool.shutdown();

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert!(pool.is_shut_down());
    assert!(matches!(
        pool.submit(counting_task(&counter, Duration::ZERO)),
        Err(Error::InvalidArgument(_))
    ));
}

/// Test: Report after work
/// Given a finished batch
/// When the pool is shut down and reported
/// Then no worker is busy and fatigue reflects time used
#[test]
fn test_report_after_shutdown() {
    let pool = WorkerPool::with_config(3, &seeded_config()).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    let tasks: Vec<RowTask> = (0..6)
        .map(|_| counting_task(&counter, Duration::from_millis(2)))
        .collect();
    pool.submit_all(tasks).unwrap();
    pool.shutdown();

    for worker in pool.report().workers {
        assert!(!worker.busy);
        assert!((0.5..1.5).contains(&worker.fatigue_factor));
        let expected = worker.time_used.as_nanos() as f64 * worker.fatigue_factor;
        assert!((worker.fatigue - expected).abs() <= 1.0);
    }
}
