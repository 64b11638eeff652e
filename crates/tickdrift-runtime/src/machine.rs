//! Machine - the simulated process
//!
//! A machine owns its Lamport clock, its inbox consumer, its event log and
//! its RNG. Only its own loop mutates the clock or pops the inbox; other
//! tasks interact with it through `InboxSender` and `MachineHandle`.

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use tickdrift_clock::{DriftStats, LamportClock, ReceiveOutcome, TickRate};
use tickdrift_core::{
    wall_clock_secs, Ack, ClockMessage, EventKind, LogRecord, MachineId, SimError, SimResult,
};
use tickdrift_transport::Transport;

use crate::{Action, EventCounts, EventLog, Inbox, InboxSender, MachineConfig, StopSignal};

#[derive(Clone, Copy, Debug, Default)]
pub struct MachineStats {
    /// Iterations that ran a step (excludes the final, stopping wake-up)
    pub iterations: u64,
    pub send_failures: u64,
    pub drift: DriftStats,
}

/// Result of one send transition. The outer `SimResult` of `send_to`
/// covers log failures; `delivery` covers the transport.
#[derive(Debug)]
pub struct SendReport {
    pub message: ClockMessage,
    pub delivery: SimResult<Ack>,
}

/// What a single loop iteration did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Received { from: MachineId, clock: u64 },
    Sent { to: Vec<MachineId>, clock: u64 },
    Internal { clock: u64 },
    /// A send failed; later sends of the same iteration were skipped
    SendFailed { to: MachineId, clock: u64 },
    /// A send was drawn but there are no peers
    Idle,
}

/// Final state of a machine after its loop ended
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MachineReport {
    pub id: MachineId,
    pub tick_rate: TickRate,
    pub logical_clock: u64,
    pub iterations: u64,
    pub events: EventCounts,
    pub send_failures: u64,
    pub drift: DriftStats,
    pub log_path: Option<PathBuf>,
}

pub struct Machine<T, R = StdRng> {
    id: MachineId,
    clock: LamportClock,
    tick_rate: TickRate,
    inbox: Inbox,
    /// Ascending, without self
    peers: Vec<MachineId>,
    transport: T,
    log: EventLog,
    rng: R,
    stats: MachineStats,
}

impl<T: Transport> Machine<T, StdRng> {
    /// Create a machine with a seeded (or entropy-seeded) `StdRng`
    pub fn new(
        id: MachineId,
        peers: impl IntoIterator<Item = MachineId>,
        transport: T,
        log: EventLog,
        config: &MachineConfig,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(id, peers, transport, log, config.tick_rate, rng)
    }
}

impl<T, R> Machine<T, R>
where
    T: Transport,
    R: Rng + Send + 'static,
{
    /// Create a machine drawing from `rng`. The tick rate, unless pinned,
    /// is the first draw.
    pub fn with_rng(
        id: MachineId,
        peers: impl IntoIterator<Item = MachineId>,
        transport: T,
        log: EventLog,
        tick_rate: Option<TickRate>,
        mut rng: R,
    ) -> Self {
        let tick_rate = tick_rate.unwrap_or_else(|| TickRate::random(&mut rng));

        let mut peers: Vec<MachineId> = peers.into_iter().filter(|peer| *peer != id).collect();
        peers.sort();
        peers.dedup();

        Machine {
            id,
            clock: LamportClock::new(),
            tick_rate,
            inbox: Inbox::new(),
            peers,
            transport,
            log,
            rng,
            stats: MachineStats::default(),
        }
    }

    pub fn id(&self) -> MachineId {
        self.id
    }

    pub fn tick_rate(&self) -> TickRate {
        self.tick_rate
    }

    pub fn logical_clock(&self) -> u64 {
        self.clock.now()
    }

    pub fn peers(&self) -> &[MachineId] {
        &self.peers
    }

    pub fn queue_length(&self) -> usize {
        self.inbox.len()
    }

    pub fn stats(&self) -> &MachineStats {
        &self.stats
    }

    pub fn events(&self) -> EventCounts {
        self.log.counts()
    }

    /// Producer handle for the transport
    pub fn inbox_sender(&self) -> InboxSender {
        self.inbox.sender()
    }

    /// Enqueue an inbound message
    pub fn deliver(&self, message: ClockMessage) {
        self.inbox.sender().push(message);
    }

    fn record(&mut self, kind: EventKind, system_time: f64, queue_length: u64) -> SimResult<()> {
        let record = LogRecord::new(kind, system_time, queue_length, self.clock.now());
        self.log.record(&record)
    }

    /// Send transition. The clock advances and the SEND record is written
    /// before the transport is called; a failed delivery does not undo either.
    pub async fn send_to(&mut self, target: MachineId) -> SimResult<SendReport> {
        let clock = self.clock.on_send();
        let queue_length = self.inbox.len() as u64;
        let message = ClockMessage::send_now(self.id, clock, queue_length);
        self.record(EventKind::Send, message.sender_system_time, queue_length)?;

        let delivery = self.transport.send(target, message.clone()).await;
        if let Err(e) = &delivery {
            self.stats.send_failures += 1;
            tracing::warn!(machine = %self.id, peer = %target, clock, "send failed: {}", e);
        }

        Ok(SendReport { message, delivery })
    }

    /// Receive transition for a message already taken off the inbox
    pub fn receive(&mut self, message: &ClockMessage) -> SimResult<ReceiveOutcome> {
        let outcome = self.clock.on_receive(message.logical_clock);
        self.stats.drift.observe(&outcome);
        let queue_length = self.inbox.len() as u64;
        self.record(EventKind::Receive, wall_clock_secs(), queue_length)?;
        Ok(outcome)
    }

    /// Internal transition
    pub fn internal_step(&mut self) -> SimResult<u64> {
        let clock = self.clock.tick();
        let queue_length = self.inbox.len() as u64;
        self.record(EventKind::Internal, wall_clock_secs(), queue_length)?;
        Ok(clock)
    }

    /// One iteration without the tick sleep. A queued message always wins
    /// over drawing a new action.
    pub async fn step(&mut self) -> SimResult<StepOutcome> {
        if let Some(message) = self.inbox.pop() {
            let outcome = self.receive(&message)?;
            return Ok(StepOutcome::Received {
                from: message.sender_id,
                clock: outcome.after,
            });
        }

        match Action::draw(&mut self.rng) {
            Action::SendOne => match self.peers.choose(&mut self.rng).copied() {
                Some(target) => self.dispatch(vec![target]).await,
                None => Ok(StepOutcome::Idle),
            },
            Action::Broadcast if self.peers.is_empty() => Ok(StepOutcome::Idle),
            Action::Broadcast => {
                let targets = self.peers.clone();
                self.dispatch(targets).await
            }
            Action::Internal => {
                let clock = self.internal_step()?;
                Ok(StepOutcome::Internal { clock })
            }
        }
    }

    async fn dispatch(&mut self, targets: Vec<MachineId>) -> SimResult<StepOutcome> {
        for target in &targets {
            let report = self.send_to(*target).await?;
            if report.delivery.is_err() {
                return Ok(StepOutcome::SendFailed {
                    to: *target,
                    clock: self.clock.now(),
                });
            }
        }
        Ok(StepOutcome::Sent {
            to: targets,
            clock: self.clock.now(),
        })
    }

    pub fn report(&self) -> MachineReport {
        MachineReport {
            id: self.id,
            tick_rate: self.tick_rate,
            logical_clock: self.clock.now(),
            iterations: self.stats.iterations,
            events: self.log.counts(),
            send_failures: self.stats.send_failures,
            drift: self.stats.drift,
            log_path: self.log.path().map(|p| p.to_path_buf()),
        }
    }

    /// The event loop. Returns when the stop signal is seen after a tick
    /// sleep, or on the first log failure. The machine, and with it the
    /// log file, is dropped on return.
    pub async fn run(mut self, stop: StopSignal) -> SimResult<MachineReport> {
        let period = self.tick_rate.period();
        tracing::info!(
            machine = %self.id,
            tick_rate = self.tick_rate.per_second(),
            peers = self.peers.len(),
            "event loop started"
        );

        loop {
            tokio::time::sleep(period).await;
            if stop.is_stopped() {
                break;
            }

            self.stats.iterations += 1;
            if let Err(e) = self.step().await {
                tracing::error!(machine = %self.id, "machine failed: {}", e);
                return Err(e);
            }
        }

        let report = self.report();
        tracing::info!(
            machine = %self.id,
            logical_clock = report.logical_clock,
            iterations = report.iterations,
            "event loop stopped"
        );
        Ok(report)
    }

    /// Spawn the event loop on the current tokio runtime
    pub fn start(self) -> MachineHandle {
        let stop = StopSignal::new();
        let id = self.id;
        let tick_rate = self.tick_rate;
        let sender = self.inbox.sender();
        let task = tokio::spawn(self.run(stop.clone()));

        MachineHandle {
            id,
            tick_rate,
            sender,
            stop,
            task,
        }
    }
}

/// Handle to a running machine
pub struct MachineHandle {
    id: MachineId,
    tick_rate: TickRate,
    sender: InboxSender,
    stop: StopSignal,
    task: JoinHandle<SimResult<MachineReport>>,
}

impl MachineHandle {
    pub fn id(&self) -> MachineId {
        self.id
    }

    pub fn tick_rate(&self) -> TickRate {
        self.tick_rate
    }

    pub fn deliver(&self, message: ClockMessage) {
        self.sender.push(message);
    }

    pub fn sender(&self) -> InboxSender {
        self.sender.clone()
    }

    /// Ask the loop to exit after its current sleep. Safe to call repeatedly.
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// True once the loop has exited, normally or not
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to exit
    pub async fn join(self) -> SimResult<MachineReport> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(SimError::TaskFailed(format!("machine {}: {}", self.id, e))),
        }
    }
}
