//! Command-line entry point: builds `main(n)` for a CLI-supplied `n`,
//! normalizes it, and prints the resulting term plus cost/size stats.

mod sample;

use std::sync::Arc;

use clap::Parser;
use inets_core::cell::Cell;
use inets_core::{Runtime, RuntimeConfig};
use tracing_subscriber::EnvFilter;

use sample::{SampleProgram, MAIN};

#[derive(Parser, Debug)]
#[command(version, about = "Runs the sample gen_tree/sum_tree program to normal form")]
struct Args {
    /// Tree depth passed to `main(n)`.
    n: i64,

    /// Number of worker threads.
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Cells per worker band.
    #[arg(long, default_value_t = 1 << 20)]
    band_size: u32,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut rt = Runtime::new(
        Arc::new(SampleProgram),
        RuntimeConfig {
            workers: args.workers,
            band_size: args.band_size,
        },
    )
    .expect("sample program failed its own arity/strictness validation");

    let host = {
        let heap = rt.builder();
        let call = heap.alloc(1);
        heap.set(call, Cell::num(args.n as u64));
        let fun = heap.alloc(1);
        heap.set(fun, Cell::fun(MAIN, call));
        fun
    };

    let report = rt.normalize(host);
    println!("{}", rt.read_back(host));
    eprintln!("cost={} size={}", report.cost, report.size);
}
