//! mtsum-cluster - distributed Merkle-tree digest of a file
//!
//! Runs every rank of an in-process cluster: each rank hashes its slice of
//! the file, rank 0 folds the gathered roots and prints the global root.
//!
//! Usage:
//!   mtsum-cluster [-r ranks] [-p processors] [-a algorithm] [-g] [-b] [-v] <path>

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use mtsum::{dot, partition, BuilderConfig, HashAlgorithm, MerkleTree, DEFAULT_WORKERS};
use mtsum_cluster::{ClusterDriver, Collective, LocalCluster};

#[derive(Parser)]
#[command(name = "mtsum-cluster", version)]
#[command(about = "Distributed Merkle-tree digest of a file", long_about = None)]
struct Cli {
    /// Path to input file
    path: PathBuf,

    /// Number of processors to use per rank
    #[arg(short = 'p', value_name = "processors", default_value_t = DEFAULT_WORKERS)]
    processors: usize,

    /// Hashing algorithm to use, supported algorithms are md5, sha1, sha256, sha384, sha512
    #[arg(short = 'a', value_name = "algorithm", default_value = "sha256")]
    algorithm: HashAlgorithm,

    /// Number of ranks to run, must be a power of 2
    #[arg(short = 'r', value_name = "ranks", default_value_t = 2)]
    ranks: usize,

    /// Output the merkle tree as DOT graph
    #[arg(short = 'g')]
    graph: bool,

    /// Enable benchmark
    #[arg(short = 'b')]
    benchmark: bool,

    /// Enable verbose output
    #[arg(short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Argument errors exit 1, not clap's default 2; help and version stay 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            err.print().expect("failed to render argument error");
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    if cli.processors < 1 {
        bail!("number of processors must be at least 1");
    }
    if !cli.ranks.is_power_of_two() {
        bail!("number of ranks must be a power of 2");
    }

    let file_size = std::fs::metadata(&cli.path)
        .with_context(|| format!("error opening file: {}", cli.path.display()))?
        .len();

    if file_size / (cli.ranks as u64) < partition::BALANCE_THRESHOLD {
        bail!("file is too small to distribute across {} ranks", cli.ranks);
    }

    if cli.verbose {
        let parts = partition::partition_ranks(file_size, cli.ranks, partition::BLOCK_SIZE);
        println!("Algorithm: {}", cli.algorithm);
        println!("Number of processors: {}", cli.processors);
        println!("Number of ranks: {}", cli.ranks);
        println!("File size: {file_size} bytes");
        println!("Size per rank: {} bytes", parts[0].1);
        for (rank, (offset, size)) in parts.iter().enumerate() {
            println!("Rank {rank}: offset={offset}, size={size}");
        }
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cli.processors)
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    let started = Instant::now();
    let global = runtime.block_on(run_ranks(&cli, file_size))?;
    let elapsed = started.elapsed().as_secs_f64();

    let tree = global.context("rank 0 produced no tree")?;
    if cli.graph {
        print!("{}", dot::render(&tree));
    } else {
        println!("{}", tree.root_hex().context("global tree has no root")?);
    }

    if cli.verbose || cli.benchmark {
        let gb_per_second = file_size as f64 / 1e9 / elapsed;
        println!("{elapsed:.2} s ({gb_per_second:.2} GB/s)");
    }

    Ok(())
}

/// Spawn one task per rank and collect their results.
///
/// Non-zero ranks report failures on stderr; the process exit status
/// reflects whether the run as a whole produced a global tree.
async fn run_ranks(cli: &Cli, file_size: u64) -> Result<Option<MerkleTree>> {
    let config = BuilderConfig::new(cli.algorithm).with_workers(cli.processors);

    let tasks: Vec<_> = LocalCluster::ranks(cli.ranks)
        .into_iter()
        .map(|cluster| {
            let config = config.clone();
            let path = cli.path.clone();
            tokio::spawn(async move {
                let rank = cluster.rank();
                let driver = ClusterDriver::new(cluster, config);
                (rank, driver.run(&path, file_size).await)
            })
        })
        .collect();

    let mut global = None;
    let mut failed = false;
    for task in tasks {
        let (rank, result) = task.await.context("rank task panicked")?;
        match result {
            Ok(Some(tree)) => global = Some(tree),
            Ok(None) => {}
            Err(err) => {
                eprintln!("Rank {rank}: {err}");
                failed = true;
            }
        }
    }

    if failed {
        bail!("distributed run failed");
    }
    Ok(global)
}
