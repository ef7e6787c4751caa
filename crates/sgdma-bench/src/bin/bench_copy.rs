//! CPU-copy vs DMA copy-speed comparison.
//!
//! Times a CPU word-loop copy into the destination RAM, then the same
//! transfer through the mem-to-mem dispatcher (launch overhead and total,
//! busy-polled), verifies the DMA result word for word, and reports the
//! offload ratio.
//!
//! Usage:
//!   cargo run --bin bench_copy                 # real fabric (/dev/mem, root)
//!   cargo run --bin bench_copy -- --sim        # simulated fabric
//!   cargo run --bin bench_copy -- --pattern-base 700

use anyhow::Result;
use sgdma_driver::{
    ticks_to_us, CopyReport, DataPattern, DevMemFabric, FabricBus, FabricCapabilities, Harness,
    HostTimebase, SimFabric, Timebase,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_PATTERN_BASE: i32 = 400;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let use_sim = args.iter().any(|a| a == "--sim");
    let base = parse_arg(&args, "--pattern-base", DEFAULT_PATTERN_BASE);

    println!("=== Transfer Speed Test: CPU Copy vs DMA ===");
    println!("Source pattern : value[i] = {base} + i");
    println!();

    if use_sim {
        run(SimFabric::new(), base)
    } else {
        run(DevMemFabric::open()?, base)
    }
}

fn run(bus: impl FabricBus, base: i32) -> Result<()> {
    let timebase = HostTimebase::probe()?;
    let frequency = timebase.frequency();
    let mut harness = Harness::new(bus, FabricCapabilities::standard(), timebase);

    let sanity = harness.sanity_check()?;
    if !sanity.passed() {
        println!(
            "Destination range sanity check FAILED: {} bad words",
            sanity.mismatch_count
        );
        return Ok(());
    }

    match harness.copy_phase(DataPattern::Offset(base)) {
        Ok(report) => print_report(&report, frequency),
        Err(e) => println!("Error: could not run DMA copy phase: {e}"),
    }
    Ok(())
}

fn print_report(report: &CopyReport, frequency: u32) {
    println!("Dataset: {} words", sgdma_chip::regs::BUFFER_WORDS);
    println!(
        "1. CPU Copy Cycles    : {:>10}  ({} us)",
        report.cpu_cycles,
        ticks_to_us(report.cpu_cycles, frequency)
    );
    println!(
        "2. DMA Launch Overhead: {:>10}  ({} us)",
        report.launch_cycles,
        ticks_to_us(report.launch_cycles, frequency)
    );
    println!(
        "3. DMA Total Cycles   : {:>10}  ({} us)",
        report.total_cycles,
        ticks_to_us(report.total_cycles, frequency)
    );

    match report.offload_ratio {
        Some(r) => println!(">> CPU Offload Ratio (Total) : {r:.2}x"),
        None => println!(">> CPU Offload Ratio (Total) : n/a (zero DMA cycles)"),
    }

    if report.verification.passed() {
        println!("Transfer verification successful.");
    } else {
        println!(
            "Transfer verification finished with {} errors.",
            report.verification.mismatch_count
        );
        for m in &report.verification.examples {
            println!(
                "  Mismatch at {}: expected {:#x}, read {:#x}",
                m.index, m.expected, m.actual
            );
        }
    }
}

fn parse_arg(args: &[String], flag: &str, default: i32) -> i32 {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
