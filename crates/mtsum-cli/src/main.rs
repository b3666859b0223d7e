//! mtsum - Merkle-tree digest of a file
//!
//! Usage:
//!   mtsum [-p processors] [-a algorithm] [-g] [-b] [-v] <path>
//!
//! Prints the lowercase hex root digest, or the task graph as a DOT
//! document with `-g`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use mtsum::{dot, BuilderConfig, HashAlgorithm, TreeBuilder, DEFAULT_WORKERS};

#[derive(Parser)]
#[command(name = "mtsum", version)]
#[command(about = "Merkle-tree digest of a file", long_about = None)]
struct Cli {
    /// Path to input file
    path: PathBuf,

    /// Number of processors to use
    #[arg(short = 'p', value_name = "processors", default_value_t = DEFAULT_WORKERS)]
    processors: usize,

    /// Hashing algorithm to use, supported algorithms are md5, sha1, sha256, sha384, sha512
    #[arg(short = 'a', value_name = "algorithm", default_value = "sha256")]
    algorithm: HashAlgorithm,

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

    let file_size = std::fs::metadata(&cli.path)
        .with_context(|| format!("error opening file: {}", cli.path.display()))?
        .len();

    if cli.verbose {
        println!("Algorithm: {}", cli.algorithm);
        println!("Number of processors: {}", cli.processors);
        println!("File size: {file_size} bytes");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cli.processors)
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    let builder = TreeBuilder::new(
        BuilderConfig::new(cli.algorithm).with_workers(cli.processors),
    );

    let started = Instant::now();
    let tree = runtime.block_on(builder.build(&cli.path))?;
    let elapsed = started.elapsed().as_secs_f64();

    if cli.graph {
        print!("{}", dot::render(&tree));
    } else {
        println!("{}", tree.root_hex().context("engine produced no root")?);
    }

    if cli.verbose || cli.benchmark {
        let gb_per_second = file_size as f64 / 1e9 / elapsed;
        println!("{elapsed:.2} s ({gb_per_second:.2} GB/s)");
    }

    Ok(())
}
