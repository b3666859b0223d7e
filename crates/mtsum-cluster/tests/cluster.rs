//! Distributed-run properties: rank-count equivalence and shape fidelity.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mtsum::{partition, BuilderConfig, ChunkReader, HashAlgorithm, TreeBuilder};
use mtsum_cluster::{fold_digests, ClusterDriver, ClusterError, LocalCluster};

const KB: u64 = 1024;

fn fixture(bytes: &[u8]) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.bin");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(bytes).unwrap();
    (dir, path)
}

fn config() -> BuilderConfig {
    BuilderConfig::new(HashAlgorithm::Sha256)
        .with_workers(2)
        .with_block_size(KB)
        .with_balance_threshold(4 * KB)
}

/// Run a whole cluster in-process and return rank 0's root hex.
async fn run_cluster(path: &Path, file_size: u64, world: usize) -> Result<String, ClusterError> {
    let tasks: Vec<_> = LocalCluster::ranks(world)
        .into_iter()
        .map(|cluster| {
            let path = path.to_path_buf();
            let config = config();
            tokio::spawn(async move {
                ClusterDriver::new(cluster, config).run(&path, file_size).await
            })
        })
        .collect();

    let mut root = None;
    for task in tasks {
        if let Some(tree) = task.await.unwrap()? {
            root = tree.root_hex();
        }
    }
    Ok(root.expect("rank 0 did not produce a tree"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_rank_matches_single_process() {
    use rand::RngCore;
    let mut data = vec![0u8; (16 * KB + 77) as usize];
    rand::thread_rng().fill_bytes(&mut data);
    let (_dir, path) = fixture(&data);

    let distributed = run_cluster(&path, data.len() as u64, 1).await.unwrap();
    let local = TreeBuilder::new(config())
        .build(&path)
        .await
        .unwrap()
        .root_hex()
        .unwrap();

    assert_eq!(distributed, local);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn four_ranks_match_reference_fold() {
    // Rank 0's output must equal folding the four per-rank local roots with
    // the same balanced shape the partition used.
    let data = vec![0u8; (32 * KB) as usize];
    let file_size = data.len() as u64;
    let (_dir, path) = fixture(&data);

    let distributed = run_cluster(&path, file_size, 4).await.unwrap();

    let cfg = config();
    let parts = partition::partition_ranks(file_size, 4, cfg.block_size);
    let mut gathered = Vec::new();
    for &(offset, size) in &parts {
        let reader = Arc::new(ChunkReader::open(&path).unwrap());
        let local = TreeBuilder::new(cfg.clone())
            .build_range(reader, offset, size)
            .await
            .unwrap();
        gathered.extend_from_slice(local.root_digest().unwrap());
    }
    let reference = fold_digests(cfg.algorithm, &gathered, 4)
        .unwrap()
        .root_hex()
        .unwrap();

    assert_eq!(distributed, reference);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rank_count_changes_root() {
    // The tree shape depends on the rank count, so the root does too.
    let data = vec![3u8; (32 * KB) as usize];
    let (_dir, path) = fixture(&data);
    let file_size = data.len() as u64;

    let two = run_cluster(&path, file_size, 2).await.unwrap();
    let four = run_cluster(&path, file_size, 4).await.unwrap();
    assert_ne!(two, four);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deterministic_across_runs() {
    let data = vec![0xA7u8; (24 * KB) as usize];
    let (_dir, path) = fixture(&data);
    let file_size = data.len() as u64;

    let first = run_cluster(&path, file_size, 4).await.unwrap();
    let second = run_cluster(&path, file_size, 4).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn non_power_of_two_world_rejected() {
    let data = vec![0u8; (32 * KB) as usize];
    let (_dir, path) = fixture(&data);
    let file_size = data.len() as u64;

    let tasks: Vec<_> = LocalCluster::ranks(3)
        .into_iter()
        .map(|cluster| {
            let path = path.clone();
            tokio::spawn(async move {
                ClusterDriver::new(cluster, config()).run(&path, file_size).await
            })
        })
        .collect();

    for task in tasks {
        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, ClusterError::WorldNotPow2(3)));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn too_small_file_rejected() {
    // 4 KiB threshold and 4 ranks need at least 16 KiB.
    let data = vec![0u8; (8 * KB) as usize];
    let (_dir, path) = fixture(&data);
    let file_size = data.len() as u64;

    let tasks: Vec<_> = LocalCluster::ranks(4)
        .into_iter()
        .map(|cluster| {
            let path = path.clone();
            tokio::spawn(async move {
                ClusterDriver::new(cluster, config()).run(&path, file_size).await
            })
        })
        .collect();

    for task in tasks {
        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, ClusterError::FileTooSmall { .. }));
    }
}
