//! End-to-end protocol tests over the simulated fabric.
//!
//! Every invariant the harness exists to check is exercised here without
//! hardware: copy fidelity, the streaming arithmetic pipeline in both
//! modes, the sink-before-source launch ordering, cache-flush discipline,
//! and the open-failure path.

use sgdma_chip::regs::{self, devices};
use sgdma_chip::Descriptor;
use sgdma_driver::{
    flush_range, verify, DataPattern, Dispatcher, Expectation, FabricBus, FabricCapabilities,
    Harness, ManualTimebase, SgdmaError, SimFabric, StreamConfig,
};

fn harness() -> Harness<SimFabric, ManualTimebase> {
    // 10 ticks per timestamp read at 50 MHz: deterministic nonzero timings.
    Harness::new(
        SimFabric::new(),
        FabricCapabilities::standard(),
        ManualTimebase::new(10, 50_000_000),
    )
}

fn read_dest(bus: &impl FabricBus) -> Vec<u32> {
    (0..regs::DEST_WORDS as u32)
        .map(|i| bus.read_word(regs::DEST_BASE, i))
        .collect()
}

#[test]
fn sanity_check_passes_on_healthy_fabric() {
    let mut h = harness();
    let report = h.sanity_check().unwrap();
    assert!(report.passed());
}

#[test]
fn copy_phase_offset_pattern_is_exact() {
    // Source pattern 400 + i, mem-to-mem transfer: destination must equal
    // the source word for word, mismatch count zero.
    let mut h = harness();
    let report = h.copy_phase(DataPattern::Offset(400)).unwrap();

    assert_eq!(report.verification.mismatch_count, 0);
    assert!(report.cpu_cycles > 0);
    assert!(report.total_cycles >= report.launch_cycles);
    assert!(report.offload_ratio.is_some());

    for (i, &word) in read_dest(h.bus()).iter().enumerate() {
        assert_eq!(word as i32, 400 + i as i32, "index {i}");
    }
}

#[test]
fn stream_multiply_within_one_of_software_division() {
    // Pattern i * 400, coefficient 800: dest[i] within 1 of i * 800.
    let mut h = harness();
    let config = StreamConfig::new(DataPattern::Scaled(400), 800, false);
    let report = h.stream_phase(&config).unwrap();

    assert!(
        report.verification.passed(),
        "mismatches: {:?}",
        report.verification.examples
    );
    assert_eq!(report.diagnostics.coefficient, 800);
    assert!(!report.diagnostics.bypass);
    assert_eq!(report.diagnostics.valid_count, regs::BUFFER_WORDS as u32);
}

#[test]
fn stream_bypass_is_identity() {
    let mut h = harness();
    let config = StreamConfig::new(DataPattern::Offset(900), 800, true);
    let report = h.stream_phase(&config).unwrap();

    assert!(report.verification.passed());
    assert!(report.diagnostics.bypass);
    assert_eq!(report.diagnostics.valid_count, regs::BUFFER_WORDS as u32);
    // Last beat through the unit was the last source word, 900 + 255.
    assert_eq!(report.diagnostics.last_input, 1155);
}

#[test]
fn reversed_launch_order_loses_data_at_the_sink() {
    // Required ordering invariant: the sink must be armed before the
    // source pushes. Submit read first and the sink never sees a beat.
    let caps = FabricCapabilities::standard();
    let mut bus = SimFabric::new();

    // Seed dest so "unchanged" is observable.
    for i in 0..regs::DEST_WORDS as u32 {
        bus.write_word(regs::DEST_BASE, i, 0xDEAD_0000 + i);
    }
    for i in 0..regs::BUFFER_WORDS as u32 {
        bus.write_word(regs::SCRATCH_BASE, i, 400 + i);
    }
    flush_range(&mut bus, regs::SCRATCH_BASE, regs::BUFFER_BYTES);

    let dma_read = Dispatcher::open(&caps, devices::MSGDMA_READ).unwrap();
    let dma_write = Dispatcher::open(&caps, devices::MSGDMA_WRITE).unwrap();

    let desc_read = Descriptor::mm_to_st(regs::SCRATCH_BASE, regs::BUFFER_BYTES).unwrap();
    let desc_write = Descriptor::st_to_mm(regs::DEST_BASE, regs::BUFFER_BYTES).unwrap();

    // Wrong order: source before sink.
    dma_read.submit(&mut bus, &desc_read);
    dma_write.submit(&mut bus, &desc_write);

    // The sink is armed but its data already went by; it never completes.
    assert!(matches!(
        dma_write.wait_idle_with_budget(&bus, 100).unwrap_err(),
        SgdmaError::Timeout { .. }
    ));

    // Nothing reached the destination.
    for (i, &word) in read_dest(&bus).iter().enumerate() {
        assert_eq!(word, 0xDEAD_0000 + i as u32, "index {i}");
    }
}

#[test]
fn unresolved_write_dispatcher_skips_phase_and_leaves_dest_alone() {
    let mut caps = FabricCapabilities::standard();
    caps.dispatchers.retain(|d| d.name != devices::MSGDMA_WRITE);

    let mut h = Harness::new(SimFabric::new(), caps, ManualTimebase::new(10, 50_000_000));

    // Prior state: a passing copy phase filled the destination.
    h.copy_phase(DataPattern::Offset(400)).unwrap();
    let before = read_dest(h.bus());

    let config = StreamConfig::new(DataPattern::Scaled(400), 800, false);
    let err = h.stream_phase(&config).unwrap_err();
    assert!(
        matches!(&err, SgdmaError::DeviceNotFound { name } if name == devices::MSGDMA_WRITE)
    );

    // No transfer ran; destination holds its prior contents.
    assert_eq!(read_dest(h.bus()), before);

    // The run continues: the next resolvable phase still works.
    let report = h.copy_phase(DataPattern::Offset(700)).unwrap();
    assert!(report.verification.passed());
}

#[test]
fn missing_stream_processor_gates_the_phase() {
    let mut h = Harness::new(
        SimFabric::new(),
        FabricCapabilities::without_stream_processor(),
        ManualTimebase::new(10, 50_000_000),
    );

    let config = StreamConfig::new(DataPattern::Scaled(400), 800, false);
    assert!(matches!(
        h.stream_phase(&config).unwrap_err(),
        SgdmaError::StreamProcessorAbsent
    ));

    // Copy phases need no stream processor and still run.
    assert!(h.copy_phase(DataPattern::Offset(400)).unwrap().verification.passed());
}

#[test]
fn skipping_the_source_flush_feeds_the_dma_stale_data() {
    // The invariant behind flush-before-submit: CPU stores sit in cache
    // lines the dispatcher cannot see.
    let caps = FabricCapabilities::standard();
    let mut bus = SimFabric::new();

    let source: Vec<i32> = (0..regs::BUFFER_WORDS as i32).map(|i| 400 + i).collect();
    for (i, &v) in source.iter().enumerate() {
        bus.write_word(regs::SCRATCH_BASE, i as u32, v as u32);
    }
    // No flush_range here.

    let dma = Dispatcher::open(&caps, devices::MSGDMA_ONCHIP_DP).unwrap();
    let d = Descriptor::mm_to_mm(regs::SCRATCH_BASE, regs::DEST_BASE, regs::BUFFER_BYTES).unwrap();
    dma.submit(&mut bus, &d);
    dma.wait_idle(&bus);

    let dest: Vec<i32> = read_dest(&bus).iter().map(|&w| w as i32).collect();
    let report = verify(&dest, &source, Expectation::Identity, 0);
    assert_eq!(
        report.mismatch_count,
        regs::BUFFER_WORDS,
        "stale cache should corrupt every word"
    );
}

#[test]
fn phase_sequence_matches_the_original_program() {
    // One process invocation: sanity check, copy comparison, bypass
    // pipeline check, multiply pipeline check — re-entrant per phase.
    let mut h = harness();

    assert!(h.sanity_check().unwrap().passed());
    assert!(h.copy_phase(DataPattern::Offset(400)).unwrap().verification.passed());

    let bypass = StreamConfig::new(DataPattern::Offset(900), 900, true);
    assert!(h.stream_phase(&bypass).unwrap().verification.passed());

    let multiply = StreamConfig::new(DataPattern::Scaled(400), 900, false);
    let report = h.stream_phase(&multiply).unwrap();
    assert!(report.verification.passed());

    // Diagnostics accumulate across streaming phases.
    assert_eq!(report.diagnostics.valid_count, 2 * regs::BUFFER_WORDS as u32);
}
