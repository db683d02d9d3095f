//! Edge validation and materialization against mock nodes

use crate::common::{test_config, MockNode};
use fedimap::crawler::CrawlDriver;
use fedimap::edges::{materialize_edges, Edge, EdgeValidator};
use fedimap::state::{EdgeStatus, InstanceType, Phase};
use fedimap::storage::{
    NodeFilter, NodeRecord, NodeUpdate, RunRecord, RunStatus, SqliteStorage, Stage, Storage,
    StorageResult,
};
use fedimap::url::{DOMAIN_BLOCKS_PATH, PEERS_PATH};
use std::cell::Cell;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use tempfile::TempDir;

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn open_store(dir: &TempDir) -> SqliteStorage {
    SqliteStorage::new(&dir.path().join("fedimap.db")).expect("Failed to open DB")
}

/// Inserts `name` with the given classification and edge status
fn put(store: &mut SqliteStorage, name: &str, instance_type: InstanceType, status: EdgeStatus) {
    store.insert_many(&[name.to_string()]).unwrap();
    store
        .update_one(
            name,
            &NodeUpdate {
                instance_type: Some(instance_type),
                edge_col_status: Some(status),
                ..NodeUpdate::default()
            },
        )
        .unwrap();
}

#[tokio::test]
async fn test_valid_neighbors_exclude_self_blocked_and_unconfirmed() {
    let x = MockNode::start().await;
    let own_name = x.name.clone();
    let x = x
        .peers(&["a.org", "b.org", own_name.as_str()])
        .await
        .blocks(&["b.org"])
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(vec![], &dir.path().join("x.db"), &dir.path().join("e.txt"));

    let mut store = open_store(&dir);
    put(&mut store, &x.name, InstanceType::Confirmed, EdgeStatus::NotStarted);
    // Already validated, so only part of the snapshot
    put(&mut store, "a.org", InstanceType::Confirmed, EdgeStatus::Success);
    put(&mut store, "c.org", InstanceType::Confirmed, EdgeStatus::Success);
    put(&mut store, "b.org", InstanceType::NotOfProtocol, EdgeStatus::NotStarted);

    let validator = EdgeValidator::new(&config, store, "hash").unwrap();
    let report = validator.run().await.expect("Validation failed");

    assert_eq!(report.snapshot_size, 3);
    assert_eq!(report.processed, 1);
    assert_eq!(report.success, 1);

    let store = validator.into_store().unwrap();
    let node = store.get_node(&x.name).unwrap().unwrap();
    assert_eq!(node.edge_col_status, EdgeStatus::Success);
    assert_eq!(node.valid_neighbors, set(&["a.org"]));
    assert!(node.errors.is_empty());

    // Unconfirmed nodes are never validated
    let blocked = store.get_node("b.org").unwrap().unwrap();
    assert_eq!(blocked.edge_col_status, EdgeStatus::NotStarted);

    let run = store.get_latest_run(Stage::Validate).unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
}

/// Confirms `late.org` during the first node update and counts snapshot queries
struct LateConfirmingStorage {
    inner: SqliteStorage,
    confirmed_late: bool,
    snapshot_queries: Cell<usize>,
}

impl Storage for LateConfirmingStorage {
    fn find_batch(
        &self,
        filter: &NodeFilter,
        limit: Option<usize>,
    ) -> StorageResult<Vec<NodeRecord>> {
        self.inner.find_batch(filter, limit)
    }
    fn get_node(&self, name: &str) -> StorageResult<Option<NodeRecord>> {
        self.inner.get_node(name)
    }
    fn existing_names(&self, candidates: &[String]) -> StorageResult<HashSet<String>> {
        self.inner.existing_names(candidates)
    }
    fn names_where(&self, filter: &NodeFilter) -> StorageResult<HashSet<String>> {
        self.snapshot_queries.set(self.snapshot_queries.get() + 1);
        self.inner.names_where(filter)
    }
    fn count_where(&self, filter: &NodeFilter) -> StorageResult<u64> {
        self.inner.count_where(filter)
    }
    fn insert_many(&mut self, names: &[String]) -> StorageResult<usize> {
        self.inner.insert_many(names)
    }
    fn update_one(&mut self, name: &str, update: &NodeUpdate) -> StorageResult<()> {
        if !self.confirmed_late {
            self.confirmed_late = true;
            self.inner.update_one(
                "late.org",
                &NodeUpdate {
                    instance_type: Some(InstanceType::Confirmed),
                    edge_col_status: Some(EdgeStatus::Success),
                    ..NodeUpdate::default()
                },
            )?;
        }
        self.inner.update_one(name, update)
    }
    fn requeue_instances(&mut self, from: InstanceType) -> StorageResult<u64> {
        self.inner.requeue_instances(from)
    }
    fn reset_edge_status(&mut self, from: EdgeStatus) -> StorageResult<u64> {
        self.inner.reset_edge_status(from)
    }
    fn create_run(&mut self, stage: Stage, config_hash: &str) -> StorageResult<i64> {
        self.inner.create_run(stage, config_hash)
    }
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.inner.get_run(run_id)
    }
    fn get_latest_run(&self, stage: Stage) -> StorageResult<Option<RunRecord>> {
        self.inner.get_latest_run(stage)
    }
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        self.inner.finish_run(run_id, status)
    }
}

#[tokio::test]
async fn test_node_confirmed_mid_run_stays_out_of_valid_neighbors() {
    let p = MockNode::start()
        .await
        .peers(&["late.org", "a.org"])
        .await
        .blocks(&[])
        .await;
    let q = MockNode::start()
        .await
        .peers(&["late.org", "a.org"])
        .await
        .blocks(&[])
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(vec![], &dir.path().join("x.db"), &dir.path().join("e.txt"));
    config.crawler.batch_size = 1;

    let mut inner = open_store(&dir);
    put(&mut inner, &p.name, InstanceType::Confirmed, EdgeStatus::NotStarted);
    put(&mut inner, &q.name, InstanceType::Confirmed, EdgeStatus::NotStarted);
    put(&mut inner, "a.org", InstanceType::Confirmed, EdgeStatus::Success);
    inner.insert_many(&["late.org".to_string()]).unwrap();
    let store = LateConfirmingStorage {
        inner,
        confirmed_late: false,
        snapshot_queries: Cell::new(0),
    };

    let validator = EdgeValidator::new(&config, store, "hash").unwrap();
    let report = validator.run().await.unwrap();

    assert_eq!(report.snapshot_size, 3);
    assert_eq!(report.rounds, 2);
    assert_eq!(report.success, 2);

    let store = validator.into_store().unwrap();
    assert_eq!(store.snapshot_queries.get(), 1);
    assert_eq!(
        store.get_node("late.org").unwrap().unwrap().instance_type,
        InstanceType::Confirmed
    );
    for name in [p.name.as_str(), q.name.as_str()] {
        let node = store.get_node(name).unwrap().unwrap();
        assert_eq!(node.valid_neighbors, set(&["a.org"]));
    }
}

#[tokio::test]
async fn test_unreachable_lists_set_status_by_precedence() {
    let no_peers = MockNode::start()
        .await
        .fail(PEERS_PATH, 503)
        .await
        .fail(DOMAIN_BLOCKS_PATH, 503)
        .await;
    let no_blocks = MockNode::start()
        .await
        .peers(&["a.org", "z.org"])
        .await
        .fail(DOMAIN_BLOCKS_PATH, 401)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(vec![], &dir.path().join("x.db"), &dir.path().join("e.txt"));

    let mut store = open_store(&dir);
    put(&mut store, &no_peers.name, InstanceType::Confirmed, EdgeStatus::NotStarted);
    put(&mut store, &no_blocks.name, InstanceType::Confirmed, EdgeStatus::NotStarted);
    put(&mut store, "a.org", InstanceType::Confirmed, EdgeStatus::Success);

    let validator = EdgeValidator::new(&config, store, "hash").unwrap();
    let report = validator.run().await.unwrap();

    assert_eq!(report.peers_unreachable, 1);
    assert_eq!(report.blocklist_unreachable, 1);

    let store = validator.into_store().unwrap();

    let node = store.get_node(&no_peers.name).unwrap().unwrap();
    assert_eq!(node.edge_col_status, EdgeStatus::PeersUnreachable);
    assert!(node.valid_neighbors.is_empty());
    let phases: Vec<Phase> = node.errors.iter().map(|e| e.phase).collect();
    assert_eq!(phases, vec![Phase::Peers, Phase::Blocks]);

    let node = store.get_node(&no_blocks.name).unwrap().unwrap();
    assert_eq!(node.edge_col_status, EdgeStatus::BlocklistUnreachable);
    assert_eq!(node.valid_neighbors, set(&["a.org"]));
}

#[tokio::test]
async fn test_validated_nodes_are_not_fetched_again() {
    let node = MockNode::start().await.peers(&[]).await.blocks(&[]).await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(vec![], &dir.path().join("x.db"), &dir.path().join("e.txt"));

    let mut store = open_store(&dir);
    put(&mut store, &node.name, InstanceType::Confirmed, EdgeStatus::NotStarted);

    let validator = EdgeValidator::new(&config, store, "hash").unwrap();
    validator.run().await.unwrap();
    let store = validator.into_store().unwrap();

    let validator = EdgeValidator::new(&config, store, "hash").unwrap();
    let report = validator.run().await.unwrap();

    assert_eq!(report.processed, 0);
    assert_eq!(node.hits(PEERS_PATH).await, 1);
}

#[test]
fn test_materialize_collapses_mutual_edges_and_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let edges_path = dir.path().join("edges.txt");
    fs::write(&edges_path, "stale.org zombie.org\n").unwrap();

    let mut store = open_store(&dir);
    for (name, status, neighbors) in [
        ("p.org", EdgeStatus::Success, vec!["q.org", "p.org"]),
        ("q.org", EdgeStatus::Success, vec!["p.org", "r.org"]),
        ("r.org", EdgeStatus::PeersUnreachable, vec!["q.org"]),
    ] {
        store.insert_many(&[name.to_string()]).unwrap();
        store
            .update_one(
                name,
                &NodeUpdate {
                    instance_type: Some(InstanceType::Confirmed),
                    valid_neighbors: Some(set(&neighbors)),
                    edge_col_status: Some(status),
                    ..NodeUpdate::default()
                },
            )
            .unwrap();
    }

    let report = materialize_edges(&store, &edges_path).unwrap();

    assert_eq!(report.nodes, 2);
    assert_eq!(report.edges, 1);
    assert_eq!(fs::read_to_string(&edges_path).unwrap(), "p.org q.org\n");
}

#[tokio::test]
async fn test_crawl_validate_export_pipeline() {
    let p = MockNode::start().await.mastodon().await;
    let q = MockNode::start().await.mastodon().await;
    let other = MockNode::start().await.other_software().await;
    let p = p
        .peers(&[q.name.as_str(), other.name.as_str()])
        .await
        .blocks(&[])
        .await;
    let q = q.peers(&[p.name.as_str()]).await.blocks(&[]).await;

    let dir = tempfile::tempdir().unwrap();
    let edges_path = dir.path().join("edges.txt");
    let config = test_config(vec![p.name.clone()], &dir.path().join("x.db"), &edges_path);

    let driver = CrawlDriver::new(&config, open_store(&dir), "hash").unwrap();
    driver.run().await.unwrap();
    let store = driver.into_store().unwrap();
    assert_eq!(
        store
            .count_where(&NodeFilter::instance_type(InstanceType::Confirmed))
            .unwrap(),
        2
    );

    let validator = EdgeValidator::new(&config, store, "hash").unwrap();
    let report = validator.run().await.unwrap();
    assert_eq!(report.success, 2);
    let store = validator.into_store().unwrap();

    let report = materialize_edges(&store, &edges_path).unwrap();
    assert_eq!(report.edges, 1);

    let expected = Edge::new(&p.name, &q.name).unwrap();
    assert_eq!(
        fs::read_to_string(&edges_path).unwrap(),
        format!("{}\n", expected)
    );
}
