//! [`GateRuntime`] – the single consumer that owns the safety kernel.
//!
//! Host notifications, startup-read completions and control requests all go
//! through one bounded queue.  The loop takes one message at a time, runs it
//! through the kernel [`Pipeline`], and hands the resulting commands to the
//! dispatcher of their direction before it looks at the next message.  This
//! gives the strict arrival-order guarantee the interlock depends on without
//! any lock around the gate state.
//!
//! The loop never waits for a host acknowledgment.  Each direction has its
//! own dispatcher task that issues commands in order and reports failures, so
//! a host call that never returns stalls only that one output.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gateguard_hal::{ChannelMap, SimHost};
//! use gateguard_kernel::TracingSink;
//! use gateguard_runtime::{GateRuntime, RuntimeConfig};
//!
//! # async fn demo() {
//! let host = Arc::new(SimHost::new(ChannelMap::default()));
//! let runtime = GateRuntime::new(RuntimeConfig::default(), host, Arc::new(TracingSink));
//! let handle = runtime.handle();
//! let task = tokio::spawn(runtime.run());
//!
//! handle.shutdown().await.ok();
//! let final_state = task.await.unwrap();
//! # let _ = final_state;
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use gateguard_hal::{ChannelMap, OutputDriver, SensorReader, StatusNotification};
use gateguard_kernel::{DiagnosticSink, GateState, Pipeline};
use gateguard_types::{
    Diagnostic, Direction, GateError, HostEvent, InputMode, OutputCommand, SensorPolarity,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument};

/// Static configuration of one runtime instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub open_polarity: SensorPolarity,
    pub close_polarity: SensorPolarity,
    /// Issue `set_input_mode(d, Detached)` for both directions at startup.
    pub detach_inputs: bool,
    /// Capacity of the event queue.
    pub queue_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            open_polarity: SensorPolarity::ActiveHigh,
            close_polarity: SensorPolarity::ActiveHigh,
            detach_inputs: false,
            queue_capacity: 64,
        }
    }
}

/// Per-direction command queues, indexed by [`Direction::index`].
type Lanes = [mpsc::UnboundedSender<OutputCommand>; 2];

enum Envelope {
    Event(HostEvent),
    Snapshot(oneshot::Sender<GateState>),
    Shutdown,
}

/// Cheap, cloneable sender side of a running [`GateRuntime`].
#[derive(Clone)]
pub struct RuntimeHandle {
    tx: mpsc::Sender<Envelope>,
}

impl RuntimeHandle {
    /// Queue a host event.  Waits only while the queue is full.
    ///
    /// # Errors
    ///
    /// [`GateError::RuntimeStopped`] once the loop has exited.
    pub async fn send(&self, event: HostEvent) -> Result<(), GateError> {
        self.tx
            .send(Envelope::Event(event))
            .await
            .map_err(|_| GateError::RuntimeStopped)
    }

    /// Current gate state, taken after every previously queued event.
    ///
    /// # Errors
    ///
    /// [`GateError::RuntimeStopped`] once the loop has exited.
    pub async fn snapshot(&self) -> Result<GateState, GateError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope::Snapshot(reply))
            .await
            .map_err(|_| GateError::RuntimeStopped)?;
        rx.await.map_err(|_| GateError::RuntimeStopped)
    }

    /// Poll until both limit sensors are known.
    ///
    /// There is no timeout here; wrap the call in `tokio::time::timeout` when
    /// a bound is needed.
    ///
    /// # Errors
    ///
    /// [`GateError::RuntimeStopped`] once the loop has exited.
    pub async fn wait_initialized(&self, poll: Duration) -> Result<GateState, GateError> {
        loop {
            let state = self.snapshot().await?;
            if state.is_initialized() {
                return Ok(state);
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Ask the loop to exit after the messages already queued.
    ///
    /// # Errors
    ///
    /// [`GateError::RuntimeStopped`] if it already has.
    pub async fn shutdown(&self) -> Result<(), GateError> {
        self.tx
            .send(Envelope::Shutdown)
            .await
            .map_err(|_| GateError::RuntimeStopped)
    }
}

/// Event loop owning the kernel [`Pipeline`] and the host.
pub struct GateRuntime<H> {
    pipeline: Pipeline,
    host: Arc<H>,
    detach_inputs: bool,
    tx: mpsc::Sender<Envelope>,
    rx: mpsc::Receiver<Envelope>,
}

impl<H> GateRuntime<H>
where
    H: OutputDriver + SensorReader + 'static,
{
    pub fn new(config: RuntimeConfig, host: Arc<H>, sink: Arc<dyn DiagnosticSink>) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        Self {
            pipeline: Pipeline::new(config.open_polarity, config.close_polarity, sink),
            host,
            detach_inputs: config.detach_inputs,
            tx,
            rx,
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            tx: self.tx.clone(),
        }
    }

    /// Run until [`RuntimeHandle::shutdown`] and return the final state.
    ///
    /// Startup issues the optional input-mode commands, then one read per
    /// direction, without waiting for either.  Read completions re-enter the
    /// queue as [`HostEvent::StartupRead`], so they are ordered with live
    /// events.
    pub async fn run(mut self) -> GateState {
        info!(
            open_polarity = %self.pipeline.sensor_cache().polarity(Direction::Open),
            close_polarity = %self.pipeline.sensor_cache().polarity(Direction::Close),
            "gate supervisor starting"
        );
        let lanes = self.spawn_dispatchers();
        if self.detach_inputs {
            self.configure_inputs();
        }
        self.spawn_startup_reads();

        while let Some(envelope) = self.rx.recv().await {
            match envelope {
                Envelope::Event(event) => self.handle_event(event, &lanes),
                Envelope::Snapshot(reply) => {
                    let _ = reply.send(self.pipeline.state());
                }
                Envelope::Shutdown => break,
            }
        }

        info!("gate supervisor stopped");
        self.pipeline.state()
    }

    #[instrument(level = "debug", skip(self, lanes), fields(direction = %event.direction()))]
    fn handle_event(&mut self, event: HostEvent, lanes: &Lanes) {
        for command in self.pipeline.handle(&event) {
            // A closed lane means the runtime is shutting down.
            let _ = lanes[command.direction.index()].send(command);
        }
    }

    /// One ordered dispatcher per direction.  A failure is reported, never
    /// retried: the next event re-triggers the same command if the unsafe
    /// condition persists.
    fn spawn_dispatchers(&self) -> Lanes {
        Direction::ALL.map(|direction| {
            let (tx, mut rx) = mpsc::unbounded_channel::<OutputCommand>();
            let host = Arc::clone(&self.host);
            let sink = Arc::clone(self.pipeline.sink());
            tokio::spawn(async move {
                while let Some(command) = rx.recv().await {
                    debug!(%command, "dispatching");
                    if let Err(e) = host.set_output(command.direction, command.on).await {
                        sink.emit(Diagnostic::CommandFailed {
                            command,
                            error: e.to_string(),
                        });
                    }
                }
                debug!(%direction, "dispatcher stopped");
            });
            tx
        })
    }

    fn configure_inputs(&self) {
        for direction in Direction::ALL {
            let host = Arc::clone(&self.host);
            let sink = Arc::clone(self.pipeline.sink());
            tokio::spawn(async move {
                if let Err(e) = host.set_input_mode(direction, InputMode::Detached).await {
                    sink.emit(Diagnostic::InputModeFailed {
                        direction,
                        error: e.to_string(),
                    });
                }
            });
        }
    }

    fn spawn_startup_reads(&self) {
        for direction in Direction::ALL {
            let host = Arc::clone(&self.host);
            let tx = self.tx.clone();
            tokio::spawn(async move {
                let result = host.read_sensor_level(direction).await;
                let event = HostEvent::StartupRead { direction, result };
                // A stopped runtime has nothing left to initialize.
                let _ = tx.send(Envelope::Event(event)).await;
            });
        }
    }
}

/// Forward raw host notifications into a runtime until either side closes.
pub async fn pump_notifications(
    mut notifications: mpsc::UnboundedReceiver<StatusNotification>,
    map: ChannelMap,
    handle: RuntimeHandle,
) {
    while let Some(notification) = notifications.recv().await {
        let Some(event) = map.route(&notification) else {
            continue;
        };
        if handle.send(event).await.is_err() {
            break;
        }
    }
}
