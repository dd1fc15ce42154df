//! End-to-end interlock scenarios against the simulated host.

use std::sync::Arc;
use std::time::Duration;

use gateguard_hal::{ChannelMap, SimHost};
use gateguard_kernel::MemorySink;
use gateguard_runtime::{pump_notifications, GateRuntime, RuntimeConfig, RuntimeHandle};
use gateguard_types::{
    Diagnostic, Direction, GateError, HostEvent, InputMode, LimitState, OutputCommand,
    SensorPolarity,
};
use tokio::task::JoinHandle;

const POLL: Duration = Duration::from_millis(5);
const DEADLINE: Duration = Duration::from_secs(2);

fn active_low() -> RuntimeConfig {
    RuntimeConfig {
        open_polarity: SensorPolarity::ActiveLow,
        close_polarity: SensorPolarity::ActiveLow,
        ..RuntimeConfig::default()
    }
}

fn start(
    config: RuntimeConfig,
    host: Arc<SimHost>,
) -> (RuntimeHandle, MemorySink, JoinHandle<gateguard_kernel::GateState>) {
    let sink = MemorySink::new();
    let runtime = GateRuntime::new(config, host, Arc::new(sink.clone()));
    let handle = runtime.handle();
    let task = tokio::spawn(runtime.run());
    (handle, sink, task)
}

async fn initialized(handle: &RuntimeHandle) -> gateguard_kernel::GateState {
    tokio::time::timeout(DEADLINE, handle.wait_initialized(POLL))
        .await
        .expect("startup reads did not resolve in time")
        .expect("runtime stopped")
}

async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(DEADLINE, async {
        while !condition() {
            tokio::time::sleep(POLL).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn count(commands: &[OutputCommand], wanted: OutputCommand) -> usize {
    commands.iter().filter(|&&c| c == wanted).count()
}

#[tokio::test]
async fn active_low_open_limit_then_close_activation() {
    let host = Arc::new(
        SimHost::new(ChannelMap::default())
            .with_input_level(Direction::Open, true)
            .with_input_level(Direction::Close, true),
    );
    let (handle, _sink, task) = start(active_low(), Arc::clone(&host));
    let state = initialized(&handle).await;
    assert_eq!(state.limit(Direction::Open), LimitState::NotReached);
    assert_eq!(state.limit(Direction::Close), LimitState::NotReached);
    assert!(host.commands().is_empty());

    handle
        .send(HostEvent::SensorLevelChanged {
            direction: Direction::Open,
            raw: false,
        })
        .await
        .unwrap();
    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.limit(Direction::Open), LimitState::Reached);
    eventually(|| !host.commands().is_empty()).await;
    assert_eq!(host.commands(), vec![OutputCommand::off(Direction::Open)]);

    host.clear_commands();
    handle
        .send(HostEvent::OutputChanged {
            direction: Direction::Close,
            on: true,
        })
        .await
        .unwrap();
    eventually(|| !host.commands().is_empty()).await;
    assert_eq!(host.commands(), vec![OutputCommand::off(Direction::Open)]);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn both_startup_reads_fail() {
    let host = Arc::new(
        SimHost::new(ChannelMap::default())
            .with_failing_read(Direction::Open)
            .with_failing_read(Direction::Close),
    );
    let (handle, sink, task) = start(RuntimeConfig::default(), Arc::clone(&host));
    let state = initialized(&handle).await;

    assert_eq!(state.limit(Direction::Open), LimitState::Reached);
    assert_eq!(state.limit(Direction::Close), LimitState::Reached);

    eventually(|| host.commands().len() >= 2).await;
    let commands = host.commands();
    assert_eq!(commands.len(), 2);
    assert_eq!(count(&commands, OutputCommand::off(Direction::Open)), 1);
    assert_eq!(count(&commands, OutputCommand::off(Direction::Close)), 1);

    let diagnostics = sink.diagnostics();
    assert!(diagnostics.contains(&Diagnostic::BothLimitsReached));
    let failures = diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::StartupReadFailed { .. }))
        .count();
    assert_eq!(failures, 2);

    handle.shutdown().await.unwrap();
    let final_state = task.await.unwrap();
    assert!(final_state.is_initialized());
}

#[tokio::test]
async fn activation_while_a_read_is_pending_is_inert() {
    let host = Arc::new(
        SimHost::new(ChannelMap::default())
            .with_read_delay(Direction::Open, Duration::from_millis(200)),
    );
    let (handle, _sink, task) = start(RuntimeConfig::default(), Arc::clone(&host));

    handle
        .send(HostEvent::OutputChanged {
            direction: Direction::Close,
            on: true,
        })
        .await
        .unwrap();
    let state = handle.snapshot().await.unwrap();
    assert!(!state.is_initialized());
    assert!(host.commands().is_empty());

    // CLOSE resolves first, OPEN later; the flag flips only after both.
    initialized(&handle).await;
    handle
        .send(HostEvent::OutputChanged {
            direction: Direction::Close,
            on: true,
        })
        .await
        .unwrap();
    eventually(|| !host.commands().is_empty()).await;
    assert_eq!(host.commands(), vec![OutputCommand::off(Direction::Open)]);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn closed_loop_with_host_notifications() {
    let map = ChannelMap::default();
    let (host, notifications) = SimHost::new(map).with_notifications();
    let host = Arc::new(host);
    let (handle, _sink, task) = start(RuntimeConfig::default(), Arc::clone(&host));
    let pump = tokio::spawn(pump_notifications(notifications, map, handle.clone()));
    initialized(&handle).await;

    // Somebody presses CLOSE while OPEN is running.
    host.energize(Direction::Open);
    eventually(|| host.commands().contains(&OutputCommand::off(Direction::Close))).await;
    host.energize(Direction::Close);
    eventually(|| !host.output(Direction::Open)).await;
    assert!(host.output(Direction::Close));

    // CLOSE travels until its limit switch trips.
    host.set_input_level(Direction::Close, true);
    eventually(|| !host.output(Direction::Close)).await;
    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.limit(Direction::Close), LimitState::Reached);

    // Pressing CLOSE again at the limit is reversed immediately.
    host.clear_commands();
    host.energize(Direction::Close);
    eventually(|| !host.output(Direction::Close)).await;
    assert!(
        host.commands()
            .iter()
            .all(|c| *c == OutputCommand::off(Direction::Close)),
        "a blocked activation must not command the opposite output"
    );

    handle.shutdown().await.unwrap();
    task.await.unwrap();
    // Dropping the last host closes the notification stream and ends the pump.
    drop(host);
    pump.await.unwrap();
}

#[tokio::test]
async fn failed_command_is_reported_and_loop_continues() {
    let host = Arc::new(SimHost::new(ChannelMap::default()));
    let (handle, sink, task) = start(RuntimeConfig::default(), Arc::clone(&host));
    initialized(&handle).await;

    host.fail_outputs(Direction::Open, true);
    handle
        .send(HostEvent::SensorLevelChanged {
            direction: Direction::Open,
            raw: true,
        })
        .await
        .unwrap();
    eventually(|| {
        sink.diagnostics().iter().any(|d| matches!(
            d,
            Diagnostic::CommandFailed { command, .. }
                if *command == OutputCommand::off(Direction::Open)
        ))
    })
    .await;

    // Not retried by itself, but the next activation re-issues the cutoff.
    host.fail_outputs(Direction::Open, false);
    host.clear_commands();
    handle
        .send(HostEvent::OutputChanged {
            direction: Direction::Open,
            on: true,
        })
        .await
        .unwrap();
    eventually(|| !host.commands().is_empty()).await;
    assert_eq!(host.commands(), vec![OutputCommand::off(Direction::Open)]);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn inputs_are_detached_once_when_configured() {
    let host = Arc::new(SimHost::new(ChannelMap::default()));
    let config = RuntimeConfig {
        detach_inputs: true,
        ..RuntimeConfig::default()
    };
    let (handle, _sink, task) = start(config, Arc::clone(&host));
    initialized(&handle).await;

    eventually(|| host.input_mode(Direction::Close) == InputMode::Detached).await;
    assert_eq!(host.input_mode(Direction::Open), InputMode::Detached);
    assert_eq!(host.input_mode(Direction::Close), InputMode::Detached);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn rejected_input_mode_does_not_block_startup() {
    let host = Arc::new(SimHost::new(ChannelMap::default()).with_failing_modes());
    let config = RuntimeConfig {
        detach_inputs: true,
        ..RuntimeConfig::default()
    };
    let (handle, sink, task) = start(config, Arc::clone(&host));
    initialized(&handle).await;

    let mode_failures = || {
        sink.diagnostics()
            .iter()
            .filter(|d| matches!(d, Diagnostic::InputModeFailed { .. }))
            .count()
    };
    eventually(|| mode_failures() >= 2).await;
    assert_eq!(mode_failures(), 2);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
    assert_eq!(handle.snapshot().await, Err(GateError::RuntimeStopped));
}
