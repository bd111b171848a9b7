//! Integration tests for the windowed batch driver

use indicatif::ProgressBar;
use std::sync::Arc;

use swapi_people_loader::harvester::{BatchDriver, HarvestConfig, HarvestError, IdWindow};
use swapi_people_loader::people::PeopleEndpoint;
use swapi_people_loader::shutdown::ShutdownCoordinator;
use swapi_people_loader::store::memory::MemoryStore;
use swapi_people_loader::store::PeopleStore;

use crate::support::{stub_universe, RecordingStore, StubSource};

const BASE: &str = "https://swapi.test/api/";

fn endpoint() -> PeopleEndpoint {
    PeopleEndpoint::new(format!("{BASE}people/"))
}

fn driver(
    source: &Arc<StubSource>,
    store: Arc<dyn PeopleStore>,
    config: HarvestConfig,
) -> BatchDriver<StubSource> {
    BatchDriver::new(Arc::clone(source), endpoint(), store, config)
}

fn person_url(id: u32) -> String {
    format!("{BASE}people/{id}")
}

#[tokio::test]
async fn test_seven_people_in_windows_of_three() {
    let source = Arc::new(stub_universe(BASE, 7, 1..=7, [8, 9]));
    let store = Arc::new(RecordingStore::new());

    let summary = driver(&source, store.clone(), HarvestConfig::new(3))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.expected, 7);
    assert_eq!(summary.processed, 7);
    assert_eq!(
        summary.windows,
        vec![IdWindow::new(1, 3), IdWindow::new(4, 3), IdWindow::new(7, 3)]
    );
    assert_eq!(store.saved_ids(), (1..=7).collect::<Vec<_>>());

    // The last window is scanned in full, nothing past it
    assert_eq!(source.calls(&person_url(8)), 1);
    assert_eq!(source.calls(&person_url(9)), 1);
    assert_eq!(source.calls(&person_url(10)), 0);
}

#[tokio::test]
async fn test_each_record_fetched_once() {
    let source = Arc::new(stub_universe(BASE, 4, 1..=4, []));
    let store = Arc::new(MemoryStore::new());

    let processed = driver(&source, store.clone(), HarvestConfig::new(2))
        .run_all()
        .await
        .unwrap();

    assert_eq!(processed, 4);
    assert_eq!(store.len().await, 4);
    for id in 1..=4 {
        assert_eq!(source.calls(&person_url(id)), 1);
    }
}

#[tokio::test]
async fn test_gap_in_ids_extends_scan() {
    // ID 3 was deleted upstream; the count still says 4
    let source = Arc::new(stub_universe(BASE, 4, [1, 2, 4, 5], [3, 6]));
    let store = Arc::new(RecordingStore::new());

    let summary = driver(&source, store.clone(), HarvestConfig::new(2))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.processed, 4);
    assert_eq!(summary.last_id(), 6);
    assert!(summary.overscanned());
    assert_eq!(store.saved_ids(), vec![1, 2, 4, 5]);
    assert_eq!(source.calls(&person_url(7)), 0);
}

#[tokio::test]
async fn test_overscan_within_final_window() {
    // Completion is only checked between windows, so ID 5 is loaded as well
    let source = Arc::new(stub_universe(BASE, 3, 1..=6, []));
    let store = Arc::new(RecordingStore::new());

    let summary = driver(&source, store.clone(), HarvestConfig::new(5))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.processed, 5);
    assert!(summary.overscanned());
    assert_eq!(store.saved_ids(), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_zero_count_scans_nothing() {
    let source = Arc::new(stub_universe(BASE, 0, [], []));
    let store = Arc::new(RecordingStore::new());

    let summary = driver(&source, store.clone(), HarvestConfig::new(10))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.processed, 0);
    assert!(summary.windows.is_empty());
    assert_eq!(source.total_calls(), 1);
}

#[tokio::test]
async fn test_count_larger_than_population_stalls() {
    let mut source = stub_universe(BASE, 5, [1, 2], []);
    for id in 3..=20 {
        source = source.with_not_found(person_url(id));
    }
    let source = Arc::new(source);
    let store = Arc::new(RecordingStore::new());

    let config = HarvestConfig::new(2).with_max_idle_windows(3);
    let err = driver(&source, store.clone(), config)
        .run()
        .await
        .expect_err("only two of five records exist");

    match err {
        HarvestError::Stalled {
            processed,
            expected,
            last_id,
        } => {
            assert_eq!(processed, 2);
            assert_eq!(expected, 5);
            // One productive window then three empty ones
            assert_eq!(last_id, 8);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.saved_ids(), vec![1, 2]);
}

#[tokio::test]
async fn test_failed_record_stops_run() {
    let source = stub_universe(BASE, 6, 1..=6, []).with_failure(person_url(2));
    let source = Arc::new(source);
    let store = Arc::new(RecordingStore::new());

    let err = driver(&source, store.clone(), HarvestConfig::new(3))
        .run()
        .await
        .expect_err("record 2 cannot be fetched");

    assert!(matches!(err, HarvestError::Record { id: 2, .. }));
    assert_eq!(err.record_id(), Some(2));

    // Siblings in the failing window still finish; the next window never starts
    assert_eq!(store.saved_ids(), vec![1, 3]);
    assert_eq!(source.calls(&person_url(4)), 0);
}

#[tokio::test]
async fn test_failed_reference_persists_nothing_for_that_person() {
    let planet = format!("{BASE}planets/1/");
    let source = Arc::new(stub_universe(BASE, 1, [1], []).with_failure(planet));
    let store = Arc::new(RecordingStore::new());

    let err = driver(&source, store.clone(), HarvestConfig::new(1))
        .run()
        .await
        .expect_err("homeworld cannot be resolved");

    assert!(matches!(err, HarvestError::Record { id: 1, .. }));
    assert!(store.saved().is_empty());
}

#[tokio::test]
async fn test_store_failure_is_reported_with_id() {
    let source = Arc::new(stub_universe(BASE, 3, 1..=3, []));
    let store = Arc::new(RecordingStore::failing_on(2));

    let err = driver(&source, store.clone(), HarvestConfig::new(3))
        .run()
        .await
        .expect_err("store refuses id 2");

    assert!(matches!(err, HarvestError::Persist { id: 2, .. }));
    assert_eq!(store.saved_ids(), vec![1, 3]);
}

#[tokio::test]
async fn test_missing_count_fails_before_any_window() {
    let source = Arc::new(
        StubSource::new().with_json(format!("{BASE}people/"), serde_json::json!({ "results": [] })),
    );
    let store = Arc::new(RecordingStore::new());

    let err = driver(&source, store, HarvestConfig::new(3))
        .run()
        .await
        .expect_err("collection has no count");

    assert!(matches!(err, HarvestError::Fetch(_)));
    assert_eq!(source.total_calls(), 1);
}

#[tokio::test]
async fn test_zero_page_size_rejected() {
    let source = Arc::new(stub_universe(BASE, 3, 1..=3, []));
    let store = Arc::new(RecordingStore::new());

    let err = driver(&source, store, HarvestConfig::new(0))
        .run()
        .await
        .expect_err("page size 0 is invalid");

    assert!(matches!(err, HarvestError::InvalidConfig(_)));
    assert_eq!(source.total_calls(), 0);
}

#[tokio::test]
async fn test_shutdown_stops_before_next_window() {
    let source = Arc::new(stub_universe(BASE, 3, 1..=3, []));
    let store = Arc::new(RecordingStore::new());
    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();

    let err = driver(&source, store.clone(), HarvestConfig::new(3))
        .with_shutdown(Arc::clone(&shutdown))
        .run()
        .await
        .expect_err("shutdown was requested");

    assert!(matches!(err, HarvestError::Cancelled { processed: 0 }));
    assert_eq!(source.calls(&person_url(1)), 0);
    assert!(store.saved().is_empty());
}

#[tokio::test]
async fn test_process_window_counts_found_records() {
    let source = Arc::new(stub_universe(BASE, 3, [1, 3], [2]));
    let store = Arc::new(RecordingStore::new());

    let found = driver(&source, store.clone(), HarvestConfig::new(3))
        .process_window(IdWindow::first(3))
        .await
        .unwrap();

    assert_eq!(found, 2);
    assert_eq!(store.saved_ids(), vec![1, 3]);
}

#[tokio::test]
async fn test_progress_length_grows_with_overscan() {
    let source = Arc::new(stub_universe(BASE, 3, 1..=6, []));
    let store = Arc::new(RecordingStore::new());
    let progress = ProgressBar::hidden();

    let summary = driver(&source, store, HarvestConfig::new(5))
        .with_progress(progress.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.processed, 5);
    assert_eq!(progress.length(), Some(5));
    assert_eq!(progress.position(), 5);
}

#[tokio::test]
async fn test_progress_length_matches_count_without_overscan() {
    let source = Arc::new(stub_universe(BASE, 4, 1..=4, []));
    let store = Arc::new(RecordingStore::new());
    let progress = ProgressBar::hidden();

    driver(&source, store, HarvestConfig::new(2))
        .with_progress(progress.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(progress.length(), Some(4));
    assert_eq!(progress.position(), 4);
}
