//! `sgdma` — command-line interface for the SG-DMA validation harness.
//!
//! ```text
//! USAGE:
//!   sgdma sanity                     Destination range read/write check
//!   sgdma copy [--pattern-base K]    CPU-vs-DMA copy-speed comparison
//!   sgdma stream [--coeff C] [--bypass]
//!                                    Streaming multdiv pipeline test
//!   sgdma all                        Every phase in firmware order
//!
//! All commands accept --sim to run against the simulated fabric instead
//! of /dev/mem.
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use sgdma_driver::{
    ticks_to_us, DataPattern, DevMemFabric, FabricBus, FabricCapabilities, Harness, HostTimebase,
    SgdmaError, SimFabric, StreamConfig, Timebase,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sgdma", about = "SG-DMA / stream-processor validation harness", version)]
struct Cli {
    /// Run against the simulated fabric (no hardware, no root).
    #[arg(long, global = true)]
    sim: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Write/read-back walk of the destination register range.
    Sanity,
    /// CPU word-loop copy vs mem-to-mem DMA, with offload ratio.
    Copy {
        /// Source pattern constant: value[i] = K + i.
        #[arg(long, default_value_t = 400)]
        pattern_base: i32,
    },
    /// Memory → stream processor → memory pipeline test.
    Stream {
        /// Coefficient numerator (the divisor is fixed at 400).
        #[arg(long, default_value_t = 900)]
        coeff: i32,
        /// Passthrough mode instead of multiply-divide.
        #[arg(long)]
        bypass: bool,
    },
    /// Run every phase in the firmware's order.
    All,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    if cli.sim {
        dispatch(SimFabric::new(), &cli.command)
    } else {
        dispatch(DevMemFabric::open()?, &cli.command)
    }
}

fn dispatch(bus: impl FabricBus, command: &Cmd) -> Result<()> {
    let timebase = HostTimebase::probe()?;
    let frequency = timebase.frequency();
    let mut harness = Harness::new(bus, FabricCapabilities::standard(), timebase);

    match command {
        Cmd::Sanity => cmd_sanity(&mut harness)?,
        Cmd::Copy { pattern_base } => cmd_copy(&mut harness, *pattern_base, frequency)?,
        Cmd::Stream { coeff, bypass } => cmd_stream(&mut harness, *coeff, *bypass, frequency)?,
        Cmd::All => {
            cmd_sanity(&mut harness)?;
            cmd_copy(&mut harness, 400, frequency)?;
            cmd_stream(&mut harness, 900, true, frequency)?;
            cmd_stream(&mut harness, 900, false, frequency)?;
        }
    }

    Ok(())
}

fn cmd_sanity<B: FabricBus, T: sgdma_driver::Timebase>(harness: &mut Harness<B, T>) -> Result<()> {
    let report = harness.sanity_check()?;
    if report.passed() {
        println!("Destination range sanity check passed.");
    } else {
        println!(
            "Destination range sanity check FAILED: {} bad words",
            report.mismatch_count
        );
    }
    Ok(())
}

fn cmd_copy<B: FabricBus, T: sgdma_driver::Timebase>(
    harness: &mut Harness<B, T>,
    pattern_base: i32,
    frequency: u32,
) -> Result<()> {
    match harness.copy_phase(DataPattern::Offset(pattern_base)) {
        Ok(r) => {
            println!(
                "copy: cpu {} cy, launch {} cy, total {} cy ({} us)",
                r.cpu_cycles,
                r.launch_cycles,
                r.total_cycles,
                ticks_to_us(r.total_cycles, frequency)
            );
            match r.offload_ratio {
                Some(ratio) => println!("copy: offload ratio {ratio:.2}x"),
                None => println!("copy: offload ratio n/a"),
            }
            println!(
                "copy: verification {}",
                if r.verification.passed() {
                    "PASS".to_owned()
                } else {
                    format!("FAIL ({} errors)", r.verification.mismatch_count)
                }
            );
        }
        Err(e) => println!("copy: skipped ({e})"),
    }
    Ok(())
}

fn cmd_stream<B: FabricBus, T: sgdma_driver::Timebase>(
    harness: &mut Harness<B, T>,
    coeff: i32,
    bypass: bool,
    frequency: u32,
) -> Result<()> {
    let pattern = if bypass {
        DataPattern::Offset(900)
    } else {
        DataPattern::Scaled(400)
    };
    match harness.stream_phase(&StreamConfig::new(pattern, coeff, bypass)) {
        Ok(r) => {
            println!(
                "stream (coeff {coeff}, bypass {bypass}): hw {} cy ({} us), sw {} cy ({} us)",
                r.hw_cycles,
                ticks_to_us(r.hw_cycles, frequency),
                r.sw_cycles,
                ticks_to_us(r.sw_cycles, frequency)
            );
            if let Some(s) = r.speedup {
                println!("stream: speedup {s:.2}x");
            }
            println!(
                "stream: hw echo coeff {}, {} valid beats, verification {}",
                r.diagnostics.coefficient,
                r.diagnostics.valid_count,
                if r.verification.passed() {
                    "PASS".to_owned()
                } else {
                    format!("FAIL ({} errors)", r.verification.mismatch_count)
                }
            );
        }
        Err(e @ SgdmaError::StreamProcessorAbsent) => println!("stream: skipped ({e})"),
        Err(e) => println!("stream: error ({e})"),
    }
    Ok(())
}
