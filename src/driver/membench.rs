//! `memory` subcommand: times an acquire/mutate/flush cycle against each
//! tier directly, bypassing the hash map, run as a CLI report instead of
//! under `criterion`.

use std::time::Instant;

use tracing::info;

use crate::alloc::TieredAllocator;
use crate::common::Tier;
use crate::config::Config;
use crate::error::Result;

pub fn run_memory(config: &Config, iterations: u64) -> Result<()> {
    let mut alloc = TieredAllocator::new(config)?;

    for &tier in Tier::ALL.iter() {
        let handle = alloc.create(tier);

        let start = Instant::now();
        for i in 0..iterations {
            let bytes = alloc.acquire(handle);
            bytes[0] = (i & 0xff) as u8;
            alloc.flush(handle);
        }
        let elapsed = start.elapsed();

        alloc.destroy(handle);

        let ns_per_op = elapsed.as_nanos() as f64 / iterations.max(1) as f64;
        info!(tier = tier.name(), iterations, ns_per_op, "acquire/flush cycle");
        println!("{} {iterations} {ns_per_op:.1}", tier.name());
    }

    Ok(())
}
