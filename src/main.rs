// Tiered hash map driver
// Entry point exercising the placement and memory benchmarks.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use tiered_hash_map::config::Config;
use tiered_hash_map::driver::{run_memory, run_placement};
use tiered_hash_map::Result;

#[derive(Parser)]
#[command(author, version, about = "tiered hash map research driver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Payload bytes per allocator chunk.
    #[arg(long, global = true, default_value_t = Config::default().chunk_size)]
    chunk_size: usize,

    /// Chunks provisioned per tier.
    #[arg(long, global = true, default_value_t = Config::default().num_chunks)]
    num_chunks: usize,

    /// Bucket array size for the hash map.
    #[arg(long, global = true, default_value_t = Config::default().bucket_cap)]
    bucket_cap: u32,

    /// Chain heads allowed to stay in the fast tier before eviction kicks in.
    #[arg(long, global = true, default_value_t = Config::default().fast_cap)]
    fast_cap: u32,

    /// Backing file for the disk tier.
    #[arg(long, global = true, default_value = "/var/tmp/ssd")]
    disk_path: PathBuf,

    /// zstd compression level for the compressed tier.
    #[arg(long, global = true, default_value_t = Config::default().compression_level)]
    compression_level: i32,
}

#[derive(Subcommand)]
enum Commands {
    /// Word-count a text file and report key placement across tiers.
    Placement {
        /// Path to the text file to tokenize.
        input: PathBuf,
    },
    /// Time an acquire/mutate/flush cycle against each tier.
    Memory {
        /// Number of acquire/flush cycles to run per tier.
        #[arg(long, default_value_t = 100_000)]
        iterations: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = Config {
        chunk_size: cli.chunk_size,
        num_chunks: cli.num_chunks,
        bucket_cap: cli.bucket_cap,
        fast_cap: cli.fast_cap,
        disk_path: cli.disk_path,
        compression_level: cli.compression_level,
    };

    info!(chunk_size = config.chunk_size, num_chunks = config.num_chunks, "starting driver");

    match cli.command {
        Commands::Placement { input } => run_placement(&config, &input),
        Commands::Memory { iterations } => run_memory(&config, iterations),
    }
}
