use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use super::*;
use crate::config::ReserveConfig;
use crate::queue::{record_channel, RecordSender};
use crate::schema::SchemaProjection;
use crate::store::mock::MockStore;

struct Harness {
    sender: RecordSender,
    store: MockStore,
    metrics: Arc<PipelineMetrics>,
    task: tokio::task::JoinHandle<MetricsSnapshot>,
}

fn start_flusher(
    store: MockStore,
    capacity: usize,
    batch_size: usize,
    flush_interval: Duration,
    reserve: Option<Reserve>,
) -> Harness {
    let (sender, receiver) = record_channel(capacity);
    let projection = Arc::new(SchemaProjection::derive(&[]).expect("derive"));
    let writer = SinkWriter::new(store.clone(), projection, "access_log");
    let metrics = Arc::new(PipelineMetrics::new());
    let flusher = Flusher::new(
        receiver,
        writer,
        reserve,
        batch_size,
        flush_interval,
        Arc::clone(&metrics),
    );
    let task = tokio::spawn(flusher.run());
    Harness {
        sender,
        store,
        metrics,
        task,
    }
}

fn record(uri: &str) -> AccessRecord {
    AccessRecord {
        request_uri: uri.into(),
        ..AccessRecord::default()
    }
}

/// Let the consumer task run until `done` holds or the budget is exhausted.
async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached");
}

#[tokio::test(start_paused = true)]
async fn size_threshold_triggers_one_transaction_in_enqueue_order() {
    // Queue capacity 2, threshold 3, periodic flushing disabled.
    let store = MockStore::new();
    let h = start_flusher(store, 2, 3, Duration::ZERO, None);

    h.sender.submit(record("/a")).await.unwrap();
    h.sender.submit(record("/b")).await.unwrap();
    h.sender.submit(record("/c")).await.unwrap();

    wait_until(|| !h.store.committed().is_empty()).await;

    let committed = h.store.committed();
    assert_eq!(committed.len(), 1, "exactly one transaction");
    let uris: Vec<&str> = committed[0].iter().map(|r| r.request_uri.as_str()).collect();
    assert_eq!(uris, ["/a", "/b", "/c"]);

    drop(h.sender);
    h.task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn undersized_batch_flushes_within_one_interval() {
    let store = MockStore::new();
    let h = start_flusher(store, 8, 100, Duration::from_secs(5), None);

    h.sender.submit(record("/lonely")).await.unwrap();

    // Well under the threshold; only the timer can flush it.
    tokio::time::sleep(Duration::from_secs(6)).await;
    let committed = h.store.committed();
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0][0].request_uri, "/lonely");

    drop(h.sender);
    h.task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn zero_interval_disables_periodic_flushing() {
    let store = MockStore::new();
    let h = start_flusher(store, 8, 100, Duration::ZERO, None);

    h.sender.submit(record("/waiting")).await.unwrap();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(h.store.committed().is_empty(), "no timer, no flush");

    // Closing the queue still forces the final flush.
    drop(h.sender);
    let snapshot = h.task.await.unwrap();
    assert_eq!(h.store.committed().len(), 1);
    assert_eq!(snapshot.records_written, 1);
}

#[tokio::test(start_paused = true)]
async fn close_with_buffered_record_flushes_exactly_once() {
    let store = MockStore::new();
    let h = start_flusher(store, 4, 100, Duration::ZERO, None);

    h.sender.submit(record("/last")).await.unwrap();
    wait_until(|| h.metrics.snapshot().records_received == 1).await;

    drop(h.sender);
    let snapshot = h.task.await.unwrap();

    let committed = h.store.committed();
    assert_eq!(committed.len(), 1, "one final flush");
    assert_eq!(committed[0][0].request_uri, "/last");
    assert_eq!(snapshot.batches_written, 1);
}

#[tokio::test(start_paused = true)]
async fn failed_flush_spills_to_reserve_and_clears_the_batch() {
    let dir = TempDir::new().unwrap();
    let reserve = Reserve::open(&ReserveConfig {
        dir: dir.path().to_path_buf(),
        max_segment_size: 1024 * 1024,
        max_files: 5,
    })
    .unwrap();

    let store = MockStore::new();
    store.fail_writes(1);
    let h = start_flusher(store, 8, 2, Duration::ZERO, Some(reserve));

    h.sender.submit(record("/d")).await.unwrap();
    h.sender.submit(record("/e")).await.unwrap();
    wait_until(|| h.metrics.snapshot().flush_errors == 1).await;

    // The failed batch went to disk, not the store.
    assert!(h.store.committed().is_empty());
    assert_eq!(h.metrics.snapshot().records_reserved, 2);
    let spilled = std::fs::read_dir(dir.path()).unwrap().count();
    assert!(spilled >= 1);

    // The batch was cleared: later records are not piled on top of it.
    h.sender.submit(record("/f")).await.unwrap();
    h.sender.submit(record("/g")).await.unwrap();
    wait_until(|| !h.store.committed().is_empty()).await;

    let committed = h.store.committed();
    assert_eq!(committed.len(), 1);
    let uris: Vec<&str> = committed[0].iter().map(|r| r.request_uri.as_str()).collect();
    assert_eq!(uris, ["/f", "/g"], "no duplicates from the failed batch");

    drop(h.sender);
    h.task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failed_flush_without_reserve_drops_the_batch() {
    let store = MockStore::new();
    store.fail_writes(1);
    let h = start_flusher(store, 8, 2, Duration::ZERO, None);

    h.sender.submit(record("/d")).await.unwrap();
    h.sender.submit(record("/e")).await.unwrap();
    wait_until(|| h.metrics.snapshot().records_dropped == 2).await;

    assert!(h.store.committed().is_empty());
    assert_eq!(h.metrics.snapshot().flush_errors, 1);

    drop(h.sender);
    h.task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn interval_tick_with_empty_batch_is_a_no_op() {
    let store = MockStore::new();
    let h = start_flusher(store, 4, 10, Duration::from_millis(100), None);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(h.store.committed().is_empty());

    drop(h.sender);
    let snapshot = h.task.await.unwrap();
    assert_eq!(snapshot.batches_written, 0);
}

#[tokio::test(start_paused = true)]
async fn drain_snapshot_accounts_for_every_record() {
    let store = MockStore::new();
    let h = start_flusher(store, 16, 4, Duration::ZERO, None);

    for i in 0..10 {
        h.sender.submit(record(&format!("/{i}"))).await.unwrap();
    }
    drop(h.sender);
    let snapshot = h.task.await.unwrap();

    assert_eq!(snapshot.records_received, 10);
    assert_eq!(snapshot.records_written, 10);
    // Two size-triggered batches of 4, one final flush of 2.
    assert_eq!(snapshot.batches_written, 3);
    assert_eq!(snapshot.records_dropped, 0);
}
