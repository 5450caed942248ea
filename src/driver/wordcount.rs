//! `placement` subcommand: tokenizes a text file and counts words into a
//! `ChainedHashMap`, then reports how the keys ended up placed across
//! tiers.

use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::map::ChainedHashMap;

pub fn run_placement(config: &Config, input_path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(input_path)?;
    let bytes_read = text.len();

    let mut map = ChainedHashMap::new(config)?;

    let start = Instant::now();
    for word in text.split_whitespace() {
        let key = normalize(word);
        if key.is_empty() {
            continue;
        }
        let count = map.get(key.as_bytes()).unwrap_or(0);
        map.put(key.as_bytes(), count + 1)?;
    }
    let elapsed = start.elapsed();

    let throughput_mib_s = (bytes_read as f64 / (1024.0 * 1024.0)) / elapsed.as_secs_f64().max(1e-9);
    let mem_mib = map.memory_usage_total() as f64 / (1024.0 * 1024.0);
    let fast_pct = map.fast_fraction() * 100.0;

    info!(%bytes_read, entries = map.len(), elapsed_ms = elapsed.as_millis() as u64, "placement run complete");
    info!("{}", map.debug_summary());

    println!("{fast_pct:.2} {throughput_mib_s:.2} {mem_mib:.2}");

    Ok(())
}

fn normalize(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
