//! Display session coordinator against the simulated panel.

use std::sync::Arc;
use std::time::Duration;

use eink_frame::{pack, Palette, Quantizer, RasterImage};
use inkframe::error::RenderError;
use inkframe::models::PanelSpec;
use inkframe::panel::commands::{
    CMD_DRF, CMD_DSLP, CMD_DTM1, CMD_POF, CMD_PON, INIT_SEQUENCE,
};
use inkframe::panel::{
    BoxedBus, BusError, BusyTrigger, Failure, PanelDriver, PanelState, PanelTiming,
    SimulatedPanel, SimulatedPanelLog,
};
use inkframe::services::{CoordinatorOptions, DisplayCoordinator};
use pretty_assertions::assert_eq;

const SPEC: PanelSpec = PanelSpec {
    name: "test",
    width: 16,
    height: 8,
};

const FAST: PanelTiming = PanelTiming {
    poll_interval: Duration::from_millis(1),
    command_timeout: Duration::from_millis(500),
    refresh_timeout: Duration::from_millis(500),
    reset_settle: Duration::from_millis(0),
};

fn coordinator(
    panel: SimulatedPanel,
    timing: PanelTiming,
    queue_timeout: Duration,
) -> (Arc<DisplayCoordinator>, SimulatedPanelLog) {
    let log = panel.log();
    let bus: BoxedBus = Box::new(panel);
    let driver = PanelDriver::new(bus, SPEC, timing);
    let options = CoordinatorOptions {
        queue_timeout,
        preview_dir: None,
        preview_keep: 0,
    };
    let coordinator = DisplayCoordinator::new(driver, Quantizer::new(Palette::acep_7color()), options);
    (Arc::new(coordinator), log)
}

fn cycle_commands() -> Vec<u8> {
    let mut commands: Vec<u8> = INIT_SEQUENCE.iter().map(|&(cmd, _)| cmd).collect();
    commands.extend([CMD_DTM1, CMD_PON, CMD_DRF, CMD_POF, CMD_DSLP]);
    commands
}

async fn wait_for_state(coordinator: &DisplayCoordinator, leave: PanelState) {
    for _ in 0..1000 {
        if coordinator.panel_state() != leave {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("panel never left {leave}");
}

#[tokio::test]
async fn test_render_sends_quantized_frame() {
    let (coordinator, log) = coordinator(SimulatedPanel::new(), FAST, Duration::from_secs(5));
    let image = RasterImage::filled(32, 16, [200, 40, 40]).unwrap();

    let expected = pack(
        &Quantizer::new(Palette::acep_7color())
            .quantize(&image, SPEC.width, SPEC.height)
            .unwrap(),
    );
    let report = coordinator.render(image).await.unwrap();

    assert_eq!(report.cycle, 1);
    assert_eq!(log.commands(), cycle_commands());
    assert_eq!(log.last_frame().as_deref(), Some(expected.as_bytes()));
    assert_eq!(coordinator.panel_state(), PanelState::Sleeping);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_renders_do_not_interleave() {
    let panel = SimulatedPanel::new().busy_polls(5).real_time(true);
    let (coordinator, log) = coordinator(panel, FAST, Duration::from_secs(10));

    let a = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            let image = RasterImage::filled(16, 8, [0, 0, 0]).unwrap();
            coordinator.render(image).await
        })
    };
    let b = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            let image = RasterImage::filled(16, 8, [255, 255, 255]).unwrap();
            coordinator.render(image).await
        })
    };

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();

    let mut cycles = vec![a.cycle, b.cycle];
    cycles.sort();
    assert_eq!(cycles, vec![1, 2]);

    // two complete cycles back to back
    let mut expected = cycle_commands();
    expected.extend(cycle_commands());
    assert_eq!(log.commands(), expected);
    assert_eq!(log.resets(), 2);
    assert_eq!(coordinator.status().completed, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_conversion_keeps_its_place_in_line() {
    let (coordinator, log) = coordinator(SimulatedPanel::new(), FAST, Duration::from_secs(10));

    // the large photo takes far longer to quantize than the small one
    let large = RasterImage::filled(3000, 2000, [0, 0, 0]).unwrap();
    let small = RasterImage::filled(16, 8, [255, 255, 255]).unwrap();

    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.render(large).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.render(small).await })
    };

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert_eq!((first.cycle, second.cycle), (1, 2));
    // the white frame went out last
    let last = log.last_frame().unwrap();
    assert!(last.iter().all(|&b| b == 0x11));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_queue_timeout_when_panel_held() {
    // each busy wait takes ~100 ms of real time, a cycle ~400 ms
    let panel = SimulatedPanel::new().busy_polls(100).real_time(true);
    let timing = PanelTiming {
        command_timeout: Duration::from_secs(2),
        refresh_timeout: Duration::from_secs(2),
        ..FAST
    };
    let (coordinator, log) = coordinator(panel, timing, Duration::from_millis(100));

    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            let image = RasterImage::filled(16, 8, [0, 0, 255]).unwrap();
            coordinator.render(image).await
        })
    };
    wait_for_state(&coordinator, PanelState::Uninitialized).await;

    let image = RasterImage::filled(16, 8, [255, 0, 0]).unwrap();
    let err = coordinator.render(image).await.unwrap_err();

    assert!(matches!(err, RenderError::ConcurrencyTimeout { waited_ms } if waited_ms >= 100));
    assert!(!err.hardware_touched());

    let report = first.await.unwrap().unwrap();
    assert_eq!(report.cycle, 1);
    assert_eq!(log.resets(), 1, "timed-out request never reached the panel");

    let status = coordinator.status();
    assert_eq!(status.completed, 1);
    assert_eq!(status.queue_timeouts, 1);
    assert_eq!(status.waiting, 0);
}

#[tokio::test]
async fn test_refresh_timeout_aborts_cycle() {
    let panel = SimulatedPanel::new().hang_after(BusyTrigger::Command(CMD_DRF));
    let timing = PanelTiming {
        refresh_timeout: Duration::from_millis(50),
        ..FAST
    };
    let (coordinator, log) = coordinator(panel, timing, Duration::from_secs(5));

    let image = RasterImage::filled(16, 8, [0, 255, 0]).unwrap();
    let err = coordinator.render(image).await.unwrap_err();

    assert!(matches!(err, RenderError::RefreshTimeout { timeout_ms: 50 }));
    assert!(err.hardware_touched());
    assert_eq!(coordinator.panel_state(), PanelState::Faulted);

    // power-off skipped, best-effort sleep still sent
    let commands = log.commands();
    assert_eq!(log.count_command(CMD_POF), 0);
    assert_eq!(commands.last(), Some(&CMD_DSLP));

    let status = coordinator.status();
    assert_eq!(status.failed, 1);
    assert!(status.last_error.unwrap().contains("50 ms"));
}

#[tokio::test]
async fn test_bus_failure_then_recovery_on_next_cycle() {
    let (coordinator, log) = coordinator(
        SimulatedPanel::new().fail(Failure::Command(CMD_PON)),
        FAST,
        Duration::from_secs(5),
    );

    let image = RasterImage::filled(16, 8, [255, 255, 0]).unwrap();
    let err = coordinator.render(image.clone()).await.unwrap_err();
    assert!(matches!(err, RenderError::Bus(_)));
    assert_eq!(log.count_command(CMD_DRF), 0, "failed cycle never refreshed");

    // the next request re-initializes from Faulted and fails the same way,
    // without skipping the reset
    let _ = coordinator.render(image).await.unwrap_err();
    assert_eq!(log.resets(), 2);
    assert_eq!(coordinator.status().failed, 2);
}

#[tokio::test]
async fn test_busy_line_read_failure() {
    let (coordinator, log) = coordinator(
        SimulatedPanel::new().fail(Failure::BusyRead),
        FAST,
        Duration::from_secs(5),
    );

    let image = RasterImage::filled(16, 8, [0, 0, 0]).unwrap();
    let err = coordinator.render(image).await.unwrap_err();

    assert!(matches!(err, RenderError::Bus(BusError::BusyRead(_))));
    assert!(err.hardware_touched());
    assert_eq!(coordinator.panel_state(), PanelState::Faulted);

    // the wait after reset failed before any register write; only the
    // best-effort sleep followed
    assert_eq!(log.resets(), 1);
    assert_eq!(log.commands(), vec![CMD_DSLP]);
    assert_eq!(coordinator.status().failed, 1);
}
