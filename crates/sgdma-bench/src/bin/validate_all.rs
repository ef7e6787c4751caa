//! Full validation run, mirroring the board firmware's main():
//!
//! 1. Destination register range read/write sanity check
//! 2. CPU-vs-DMA copy-speed comparison (pattern 400 + i)
//! 3. Streaming pipeline, bypass mode (pattern 900 + i)
//! 4. Streaming pipeline, multiply mode (pattern i * 400, coeff 900)
//!
//! Each phase reports independently; an open failure or a capability gap
//! skips that phase and the run continues. The exit code reflects whether
//! every phase that ran verified clean.
//!
//! Usage:
//!   cargo run --bin validate_all              # real fabric (/dev/mem, root)
//!   cargo run --bin validate_all -- --sim     # simulated fabric

use anyhow::Result;
use sgdma_driver::{
    DataPattern, DevMemFabric, FabricBus, FabricCapabilities, Harness, HostTimebase, SgdmaError,
    SimFabric, StreamConfig,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let use_sim = args.iter().any(|a| a == "--sim");

    println!("SG-DMA / stream-processor validation suite");
    println!("==========================================");
    println!(
        "Fabric: {}",
        if use_sim { "simulated" } else { "/dev/mem" }
    );
    println!();

    let clean = if use_sim {
        run_suite(SimFabric::new())?
    } else {
        run_suite(DevMemFabric::open()?)?
    };

    if clean {
        println!();
        println!("All phases verified clean.");
        Ok(())
    } else {
        anyhow::bail!("one or more phases failed verification")
    }
}

fn run_suite(bus: impl FabricBus) -> Result<bool> {
    let timebase = HostTimebase::probe()?;
    let mut harness = Harness::new(bus, FabricCapabilities::standard(), timebase);
    let mut clean = true;

    // Phase 1: sanity.
    let sanity = harness.sanity_check()?;
    report_phase("destination range sanity", sanity.passed(), &mut clean);
    if !sanity.passed() {
        // Nothing downstream is trustworthy if the CPU cannot read back
        // its own destination writes.
        return Ok(false);
    }

    // Phase 2: copy comparison.
    match harness.copy_phase(DataPattern::Offset(400)) {
        Ok(r) => {
            report_phase("CPU vs DMA copy", r.verification.passed(), &mut clean);
            if let Some(ratio) = r.offload_ratio {
                println!("         offload ratio {ratio:.2}x");
            }
        }
        Err(e) => report_skip("CPU vs DMA copy", &e, &mut clean),
    }

    // Phase 3: bypass pipeline.
    match harness.stream_phase(&StreamConfig::new(DataPattern::Offset(900), 900, true)) {
        Ok(r) => report_phase("stream bypass", r.verification.passed(), &mut clean),
        Err(e @ SgdmaError::StreamProcessorAbsent) => report_warn("stream bypass", &e),
        Err(e) => report_skip("stream bypass", &e, &mut clean),
    }

    // Phase 4: multiply pipeline.
    match harness.stream_phase(&StreamConfig::new(DataPattern::Scaled(400), 900, false)) {
        Ok(r) => {
            report_phase("stream multiply", r.verification.passed(), &mut clean);
            if let Some(speedup) = r.speedup {
                println!("         speedup {speedup:.2}x");
            }
            println!(
                "         hw diagnostics: coeff {}, {} valid beats",
                r.diagnostics.coefficient, r.diagnostics.valid_count
            );
        }
        Err(e @ SgdmaError::StreamProcessorAbsent) => report_warn("stream multiply", &e),
        Err(e) => report_skip("stream multiply", &e, &mut clean),
    }

    Ok(clean)
}

fn report_phase(name: &str, passed: bool, clean: &mut bool) {
    if passed {
        println!("[PASS]   {name}");
    } else {
        println!("[FAIL]   {name}");
        *clean = false;
    }
}

fn report_skip(name: &str, err: &SgdmaError, clean: &mut bool) {
    println!("[ERROR]  {name}: {err}");
    *clean = false;
}

fn report_warn(name: &str, err: &SgdmaError) {
    println!("[SKIP]   {name}: {err}");
}
