//! Crawl driver end-to-end against mock nodes

use crate::common::{test_config, MockNode, UNREACHABLE};
use fedimap::crawler::CrawlDriver;
use fedimap::state::{EdgeStatus, InstanceType, Phase};
use fedimap::storage::{NodeFilter, NodeUpdate, RunStatus, SqliteStorage, Stage, Storage};
use fedimap::url::{DOMAIN_BLOCKS_PATH, INSTANCE_PATH, PEERS_PATH};
use std::collections::BTreeSet;
use tempfile::TempDir;

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn open_store(dir: &TempDir) -> SqliteStorage {
    SqliteStorage::new(&dir.path().join("fedimap.db")).expect("Failed to open DB")
}

#[tokio::test]
async fn test_full_crawl_discovers_and_classifies() {
    let b = MockNode::start().await.mastodon().await;
    let c = MockNode::start().await.other_software().await;
    let a = MockNode::start()
        .await
        .mastodon()
        .await
        .peers(&[b.name.as_str(), c.name.as_str(), "*.hidden.example"])
        .await
        .blocks(&[UNREACHABLE])
        .await;
    // b lists a back, which is already known
    let b = b.peers(&[a.name.as_str()]).await.blocks(&[]).await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(vec![a.name.clone()], &dir.path().join("x.db"), &dir.path().join("e.txt"));

    let driver = CrawlDriver::new(&config, open_store(&dir), "hash").unwrap();
    let report = driver.run().await.expect("Crawl failed");

    assert_eq!(report.seeded, 1);
    assert_eq!(report.rounds, 2);
    assert_eq!(report.processed, 4);
    assert_eq!(report.confirmed, 2);
    assert_eq!(report.not_of_protocol, 2);
    assert_eq!(report.discovered, 3);
    assert!(!report.interrupted);

    let store = driver.into_store().unwrap();
    assert_eq!(store.count_where(&NodeFilter::all()).unwrap(), 4);

    let seed = store.get_node(&a.name).unwrap().unwrap();
    assert_eq!(seed.instance_type, InstanceType::Confirmed);
    assert_eq!(seed.peers, set(&[b.name.as_str(), c.name.as_str()]));
    assert_eq!(seed.blocked, set(&[UNREACHABLE]));
    assert!(seed.errors.is_empty());
    assert_eq!(seed.edge_col_status, EdgeStatus::NotStarted);

    let peer = store.get_node(&b.name).unwrap().unwrap();
    assert_eq!(peer.instance_type, InstanceType::Confirmed);
    assert_eq!(peer.peers, set(&[a.name.as_str()]));

    for name in [c.name.as_str(), UNREACHABLE] {
        let node = store.get_node(name).unwrap().unwrap();
        assert_eq!(node.instance_type, InstanceType::NotOfProtocol);
        assert!(node.peers.is_empty());
    }

    // Each list is fetched once per confirmed node
    assert_eq!(a.hits(PEERS_PATH).await, 1);
    assert_eq!(a.hits(DOMAIN_BLOCKS_PATH).await, 1);

    // Non-confirmed nodes are never asked for their lists
    assert_eq!(c.hits(PEERS_PATH).await, 0);
    assert_eq!(c.hits(DOMAIN_BLOCKS_PATH).await, 0);

    let run = store.get_latest_run(Stage::Crawl).unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_partial_list_failure_keeps_peers() {
    let a = MockNode::start()
        .await
        .mastodon()
        .await
        .peers(&[UNREACHABLE])
        .await
        .fail(DOMAIN_BLOCKS_PATH, 500)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(vec![a.name.clone()], &dir.path().join("x.db"), &dir.path().join("e.txt"));

    let driver = CrawlDriver::new(&config, open_store(&dir), "hash").unwrap();
    let report = driver.run().await.unwrap();

    assert_eq!(report.partial, 1);
    assert_eq!(report.discovered, 1);

    let store = driver.into_store().unwrap();
    let node = store.get_node(&a.name).unwrap().unwrap();
    assert_eq!(node.instance_type, InstanceType::Confirmed);
    assert_eq!(node.peers, set(&[UNREACHABLE]));
    assert!(node.blocked.is_empty());
    assert_eq!(node.errors.len(), 1);
    assert_eq!(node.errors[0].phase, Phase::Blocks);
}

#[tokio::test]
async fn test_resume_leaves_processed_nodes_untouched() {
    let done = MockNode::start().await.mastodon().await;
    let left = MockNode::start()
        .await
        .mastodon()
        .await
        .peers(&[])
        .await
        .blocks(&[])
        .await;
    let also_left = MockNode::start().await.other_software().await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(vec![], &dir.path().join("x.db"), &dir.path().join("e.txt"));

    // State left behind by a run interrupted after its first node
    let mut store = open_store(&dir);
    store
        .insert_many(&[done.name.clone(), left.name.clone(), also_left.name.clone()])
        .unwrap();
    store
        .update_one(
            done.name.as_str(),
            &NodeUpdate {
                instance_type: Some(InstanceType::Confirmed),
                peers: Some(set(&["old.example"])),
                errors: Some(vec![]),
                ..NodeUpdate::default()
            },
        )
        .unwrap();
    let before = store.get_node(&done.name).unwrap().unwrap();

    let driver = CrawlDriver::new(&config, store, "hash").unwrap();
    let report = driver.run().await.unwrap();
    assert_eq!(report.seeded, 0);
    assert_eq!(report.processed, 2);

    let store = driver.into_store().unwrap();
    assert_eq!(store.get_node(&done.name).unwrap().unwrap(), before);
    assert_eq!(done.hits(INSTANCE_PATH).await, 0);
    assert_eq!(
        store.get_node(&left.name).unwrap().unwrap().instance_type,
        InstanceType::Confirmed
    );
    assert_eq!(
        store.get_node(&also_left.name).unwrap().unwrap().instance_type,
        InstanceType::NotOfProtocol
    );

    // A finished crawl re-run is a no-op
    let driver = CrawlDriver::new(&config, store, "hash").unwrap();
    let report = driver.run().await.unwrap();
    assert_eq!(report.rounds, 0);
    assert_eq!(report.processed, 0);
    assert_eq!(left.hits(INSTANCE_PATH).await, 1);
}

#[tokio::test]
async fn test_concurrent_overlapping_expansion_inserts_once() {
    let shared = MockNode::start()
        .await
        .mastodon()
        .await
        .peers(&[])
        .await
        .blocks(&[])
        .await;
    let mut seeds = Vec::new();
    let mut nodes = Vec::new();
    for _ in 0..4 {
        let node = MockNode::start()
            .await
            .mastodon()
            .await
            .peers(&[shared.name.as_str()])
            .await
            .blocks(&[shared.name.as_str()])
            .await;
        seeds.push(node.name.clone());
        nodes.push(node);
    }

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(seeds, &dir.path().join("x.db"), &dir.path().join("e.txt"));
    config.crawler.concurrency = 4;

    let driver = CrawlDriver::new(&config, open_store(&dir), "hash").unwrap();
    let report = driver.run().await.unwrap();

    assert_eq!(report.processed, 5);
    assert_eq!(report.discovered, 1);

    let store = driver.into_store().unwrap();
    assert_eq!(store.count_where(&NodeFilter::all()).unwrap(), 5);
    assert_eq!(shared.hits(INSTANCE_PATH).await, 1);
}

#[tokio::test]
async fn test_seeds_are_only_used_for_an_empty_store() {
    let seed = MockNode::start().await.other_software().await;

    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(&dir);
    store.insert_many(&[UNREACHABLE.to_string()]).unwrap();

    let config = test_config(vec![seed.name.clone()], &dir.path().join("x.db"), &dir.path().join("e.txt"));
    let driver = CrawlDriver::new(&config, store, "hash").unwrap();
    let report = driver.run().await.unwrap();

    assert_eq!(report.seeded, 0);
    assert_eq!(report.processed, 1);
    assert_eq!(seed.hits(INSTANCE_PATH).await, 0);
}
