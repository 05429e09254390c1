//! Integration tests for the harvester
//!
//! These tests drive full crawl passes through the public API, with an
//! in-memory catalog for the pass mechanics and a wiremock server for the
//! HTTP catalog end to end.

use async_trait::async_trait;
use catalog_harvest::config::Config;
use catalog_harvest::output::{published_page_path, PublishedPage};
use catalog_harvest::state::{CheckpointState, CheckpointStore};
use catalog_harvest::storage::RawStore;
use catalog_harvest::{
    CatalogSource, CycleOutcome, Entity, EntityKeys, HarvestError, Harvester, HttpCatalog,
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Catalog backed by a map of page index to entities; missing pages are empty
struct ScriptedCatalog {
    pages: HashMap<u64, Vec<Entity>>,
    requests: Mutex<Vec<u64>>,
}

impl ScriptedCatalog {
    fn new(pages: Vec<Vec<Entity>>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .enumerate()
                .map(|(i, page)| (i as u64, page))
                .collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<u64> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogSource for ScriptedCatalog {
    async fn fetch_page(&self, page: u64) -> catalog_harvest::Result<Vec<Entity>> {
        self.requests.lock().unwrap().push(page);
        Ok(self.pages.get(&page).cloned().unwrap_or_default())
    }
}

/// Creates a test configuration rooted in `dir`
fn create_test_config(dir: &Path, base_url: &str, minimum_known_pages: u64) -> Config {
    let mut config = Config::with_base_url(base_url);
    config.harvest.minimum_known_pages = minimum_known_pages;
    config.harvest.page_length = 25;
    config.retry.attempts = 3;
    config.retry.delay_ms = 1;
    config.storage.checkpoint_path = dir.join("data").join("state.json");
    config.storage.raw_store_path = dir.join("data").join("shows.jsonl");
    config.storage.serve_root = dir.join("scraped");
    config.storage.published_dir = dir.join("scraped").join("most-popular");
    config
}

fn show(id: u64, rating: Option<f64>) -> Entity {
    Entity::new(json!({
        "id": id,
        "name": format!("Show {}", id),
        "rating": { "average": rating },
    }))
}

/// Builds `page_count` pages of `per_page` shows with varied ratings
fn catalog_pages(page_count: u64, per_page: u64) -> Vec<Vec<Entity>> {
    (0..page_count)
        .map(|page| {
            (0..per_page)
                .map(|i| {
                    let id = page * per_page + i;
                    let rating = match id % 5 {
                        0 => None,
                        n => Some((id % 97) as f64 / 10.0 + n as f64),
                    };
                    show(id, rating)
                })
                .collect()
        })
        .collect()
}

fn read_published(dir: &Path) -> Vec<PublishedPage> {
    let count = std::fs::read_dir(dir).unwrap().count() as u64;
    (1..=count)
        .map(|page| {
            let text = std::fs::read_to_string(published_page_path(dir, page)).unwrap();
            serde_json::from_str(&text).unwrap()
        })
        .collect()
}

async fn run_until_reorganized<C: CatalogSource>(harvester: &Harvester<C>) -> CycleOutcome {
    for _ in 0..10_000 {
        let outcome = harvester.run_cycle().await.expect("Cycle failed");
        if matches!(outcome, CycleOutcome::Reorganized { .. }) {
            return outcome;
        }
    }
    panic!("pass never completed");
}

#[tokio::test]
async fn test_cursor_and_raw_store_advance_together() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), "http://127.0.0.1:9", 100);
    let pages = vec![
        vec![show(1, Some(1.0)), show(2, Some(2.0))],
        vec![show(3, None)],
        vec![show(4, Some(4.0)), show(5, Some(5.0)), show(6, Some(6.0))],
    ];
    let harvester = Harvester::new(&config, ScriptedCatalog::new(pages));

    let mut total = 0;
    for expected_page in 0..3u64 {
        match harvester.run_cycle().await.unwrap() {
            CycleOutcome::PageAppended { page, entities } => {
                assert_eq!(page, expected_page);
                total += entities as u64;
            }
            other => panic!("unexpected {:?}", other),
        }
        let state = harvester.checkpoint().await;
        assert_eq!(state.last_scraped_page, expected_page as i64);
        assert_eq!(harvester.raw_store().record_count().await.unwrap(), total);
    }
    assert_eq!(total, 6);
}

#[tokio::test]
async fn test_full_pass_at_known_page_count() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), "http://127.0.0.1:9", 342);
    let harvester = Harvester::new(&config, ScriptedCatalog::new(catalog_pages(342, 3)));

    let outcome = run_until_reorganized(&harvester).await;

    let CycleOutcome::Reorganized { page, summary } = outcome else {
        unreachable!()
    };
    assert_eq!(page, 342);
    assert_eq!(summary.total_entities, 1026);
    assert_eq!(summary.total_pages, 42);

    let state = harvester.checkpoint().await;
    assert_eq!(state.last_scraped_page, -1);
    assert_eq!(state.total_entities, 1026);
    assert_eq!(state.total_pages, 42);

    assert_eq!(harvester.raw_store().record_count().await.unwrap(), 0);
    assert!(!config.storage.raw_store_path.exists());

    let published = std::fs::read_dir(&config.storage.published_dir)
        .unwrap()
        .count();
    assert_eq!(published, 42);
}

#[tokio::test]
async fn test_published_pages_are_ranked_deduplicated_and_paginated() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), "http://127.0.0.1:9", 0);

    // 57 unique shows, with the catalog shifting and repeating some of them
    let mut pages = catalog_pages(3, 19);
    pages.push(vec![show(0, Some(9.9)), show(20, None), show(56, Some(0.1))]);
    let harvester = Harvester::new(&config, ScriptedCatalog::new(pages));

    run_until_reorganized(&harvester).await;

    let published = read_published(&config.storage.published_dir);
    let sizes: Vec<usize> = published.iter().map(|p| p.data.len()).collect();
    assert_eq!(sizes, vec![25, 25, 7]);

    let keys = EntityKeys::default();
    let mut seen = HashSet::new();
    for (index, page) in published.iter().enumerate() {
        assert_eq!(page.meta.page, index as u64 + 1);
        assert_eq!(page.meta.total_pages, 3);
        assert_eq!(page.meta.total_entities, 57);
        assert_eq!(page.meta.start, index as u64 * 25 + 1);
        assert_eq!(page.meta.end, page.meta.start + page.data.len() as u64 - 1);

        for entity in &page.data {
            assert!(seen.insert(keys.dedup_key(entity)), "duplicate {:?}", entity);
        }
    }
    assert_eq!(seen.len(), 57);

    let scores: Vec<f64> = published
        .iter()
        .flat_map(|p| p.data.iter().map(|e| keys.score(e)))
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));

    for pair in published.windows(2) {
        let min_current = pair[0]
            .data
            .iter()
            .map(|e| keys.score(e))
            .fold(f64::INFINITY, f64::min);
        let max_next = pair[1]
            .data
            .iter()
            .map(|e| keys.score(e))
            .fold(f64::NEG_INFINITY, f64::max);
        assert!(min_current >= max_next);
    }
}

#[tokio::test]
async fn test_premature_end_guard() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), "http://127.0.0.1:9", 10);
    let harvester = Harvester::new(&config, ScriptedCatalog::new(catalog_pages(3, 2)));

    for _ in 0..3 {
        harvester.run_cycle().await.unwrap();
    }
    let err = harvester.run_cycle().await.unwrap_err();
    assert!(matches!(
        err,
        HarvestError::PrematureEndOfCatalog { page: 3, .. }
    ));
    assert!(!config.storage.published_dir.exists());

    // Past the threshold an empty page completes the pass
    let mut state = CheckpointState {
        last_scraped_page: 10,
        ..Default::default()
    };
    CheckpointStore::new(&config.storage.checkpoint_path)
        .save(&mut state)
        .await
        .unwrap();

    let outcome = harvester.run_cycle().await.unwrap();
    assert!(matches!(
        outcome,
        CycleOutcome::Reorganized { page: 11, .. }
    ));
    assert!(config.storage.published_dir.exists());
}

#[tokio::test]
async fn test_resume_after_restart() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), "http://127.0.0.1:9", 0);
    let pages = catalog_pages(8, 4);

    // A previous process consumed pages 0 through 5
    let raw = RawStore::new(&config.storage.raw_store_path);
    for page in &pages[..6] {
        raw.append(page).await.unwrap();
    }
    let mut state = CheckpointState {
        last_scraped_page: 5,
        ..Default::default()
    };
    CheckpointStore::new(&config.storage.checkpoint_path)
        .save(&mut state)
        .await
        .unwrap();

    let harvester = Harvester::new(&config, ScriptedCatalog::new(pages));
    let outcome = run_until_reorganized(&harvester).await;

    assert_eq!(harvester.catalog().requests(), vec![6, 7, 8]);
    let CycleOutcome::Reorganized { summary, .. } = outcome else {
        unreachable!()
    };
    assert_eq!(summary.total_entities, 32);
    assert_eq!(summary.duplicate_records, 0);
}

#[tokio::test]
async fn test_failed_publish_is_retried_next_cycle() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), "http://127.0.0.1:9", 0);
    let harvester = Harvester::new(&config, ScriptedCatalog::new(catalog_pages(2, 5)));

    harvester.run_cycle().await.unwrap();
    harvester.run_cycle().await.unwrap();

    // Block the published directory with a plain file
    std::fs::write(&config.storage.serve_root, "in the way").unwrap();
    let err = harvester.run_cycle().await.unwrap_err();
    assert!(matches!(err, HarvestError::Persistence { .. }));
    assert!(err.is_retryable());

    let state = harvester.checkpoint().await;
    assert_eq!(state.last_scraped_page, 1);
    assert_eq!(harvester.raw_store().record_count().await.unwrap(), 10);

    std::fs::remove_file(&config.storage.serve_root).unwrap();
    let outcome = harvester.run_cycle().await.unwrap();

    let CycleOutcome::Reorganized { summary, .. } = outcome else {
        panic!("expected reorganization");
    };
    assert_eq!(summary.total_entities, 10);
    assert_eq!(harvester.catalog().requests(), vec![0, 1, 2, 2]);
}

#[tokio::test]
async fn test_http_catalog_pass_with_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/shows"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Under the Dome", "rating": {"average": 6.5}},
            {"id": 2, "name": "Person of Interest", "rating": {"average": 8.8}}
        ])))
        .mount(&mock_server)
        .await;

    // Page 1 fails once, then succeeds
    Mock::given(method("GET"))
        .and(path("/shows"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shows"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 2, "name": "Person of Interest", "rating": {"average": 8.8}},
            {"id": 3, "name": "Bitten", "rating": {"average": null}}
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/shows"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &mock_server.uri(), 2);
    let harvester = Harvester::new(&config, HttpCatalog::new(config.catalog.clone()).unwrap());

    for _ in 0..2 {
        let outcome = harvester.run_cycle_with_retry().await.expect("Cycle failed");
        assert!(matches!(outcome, CycleOutcome::PageAppended { .. }));
    }
    let outcome = harvester.run_cycle_with_retry().await.expect("Cycle failed");
    assert!(matches!(outcome, CycleOutcome::Reorganized { .. }));

    let published = read_published(&config.storage.published_dir);
    assert_eq!(published.len(), 1);
    let names: Vec<&str> = published[0]
        .data
        .iter()
        .map(|e| e.as_value()["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Person of Interest", "Under the Dome", "Bitten"]);
    assert_eq!(published[0].meta.total_entities, 3);
}
