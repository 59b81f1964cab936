use std::time::{Duration, Instant};

use tracing::{trace, warn};

use crate::{
    dsp::mix::mix_blocks,
    engine::{
        queue::StandbyQueues,
        worker::{AckStatus, RenderAck, RenderRequest, WorkerHandle},
    },
    error::WorkerError,
    io::sink::OutputSink,
};

/*
Render Tick
===========

One tick turns every worker's queued register writes into one mixed block:

    Idle ──► Dispatching ──► AwaitingAcks ──► Mixing ──► Emitted ──► Idle

  Dispatching   For each worker in index order: swap standby → active and
                send the active batch plus the worker's output buffer.
  AwaitingAcks  Wait for every dispatched worker, all sharing one deadline.
  Mixing        Sum the workers' latest buffers into the accumulator.
  Emitted       Hand the accumulator to the sink.

A tick only starts when the sink can take a whole block, so we never render
faster than the device drains.


Failure Handling
----------------

Nothing here aborts a tick:

  send fails (disconnected)   batch is dropped, buffer kept, logged
  worker gone mid-render      its buffer is lost; from then on every
                              tick drops its queued commands
  ack times out               worker contributes its last-known block;
                              the request stays in flight
  negative ack                worker contributes the partial block it
                              returned
  ack arrives late            picked up at the start of the next tick,
                              before dispatch

A worker with a request still in flight is not dispatched again, so there is
never more than one outstanding request per worker. Its standby commands
stay queued and go out with the next request that can be sent.


Buffer Ownership
----------------

Each worker has two blocks: one travelling with the request and one the
coordinator keeps as that worker's latest output. An ack swaps them. Nothing
is copied or allocated per tick beyond the final mix.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    Idle,
    Dispatching,
    AwaitingAcks,
    Mixing,
    Emitted,
}

/// What happened to one worker during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Fresh block rendered this tick.
    Rendered,
    /// Worker replied with a failure; its partial block was mixed.
    Rejected,
    /// No reply in time; last-known block was mixed.
    TimedOut,
    /// Previous request still outstanding, not dispatched this tick.
    Skipped,
    /// Worker channel closed.
    Disconnected,
}

/// Per-tick summary, mainly for tests and diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub outcomes: Vec<WorkerOutcome>,
    pub samples_written: usize,
}

impl TickReport {
    pub fn all_rendered(&self) -> bool {
        self.outcomes.iter().all(|o| *o == WorkerOutcome::Rendered)
    }
}

struct WorkerSlot {
    handle: WorkerHandle,
    /// Buffer available for the next request; `None` while in flight.
    spare: Option<Box<[i16]>>,
    /// Latest block this worker produced.
    latest: Box<[i16]>,
    in_flight: bool,
}

/// Drives the per-tick request/ack/mix cycle across all workers.
pub struct RenderCoordinator {
    workers: Vec<WorkerSlot>,
    accumulator: Vec<i16>,
    frames: usize,
    ack_timeout: Duration,
    phase: TickPhase,
    ticks: u64,
    /// Reused every tick.
    report: TickReport,
}

impl RenderCoordinator {
    /// `handles` must be in worker index order.
    pub fn new(handles: Vec<WorkerHandle>, frames: usize, ack_timeout: Duration) -> Self {
        let samples = frames * 2;
        let report = TickReport {
            outcomes: Vec::with_capacity(handles.len()),
            samples_written: 0,
        };
        let workers = handles
            .into_iter()
            .map(|handle| WorkerSlot {
                handle,
                spare: Some(vec![0; samples].into_boxed_slice()),
                latest: vec![0; samples].into_boxed_slice(),
                in_flight: false,
            })
            .collect();

        Self {
            workers,
            accumulator: vec![0; samples],
            frames,
            ack_timeout,
            phase: TickPhase::Idle,
            ticks: 0,
            report,
        }
    }

    /// Interleaved samples per block.
    pub fn block_samples(&self) -> usize {
        self.accumulator.len()
    }

    /// True when `sink` can take a whole block on channel 0.
    pub fn sink_ready(&self, sink: &impl OutputSink) -> bool {
        sink.writable_samples(0) >= self.block_samples()
    }

    /// Run one full tick if the sink has room. Returns `None` when the sink
    /// was not ready and nothing happened.
    pub fn tick(
        &mut self,
        queues: &mut StandbyQueues,
        sink: &mut impl OutputSink,
    ) -> Option<&TickReport> {
        if !self.sink_ready(sink) {
            return None;
        }

        self.report.outcomes.clear();
        self.reclaim_late_acks(queues);

        self.enter(TickPhase::Dispatching);
        self.dispatch(queues);

        self.enter(TickPhase::AwaitingAcks);
        self.await_acks(queues);

        self.enter(TickPhase::Mixing);
        self.mix();

        let samples_written = sink.write(0, &self.accumulator);
        if samples_written < self.accumulator.len() {
            warn!(
                written = samples_written,
                expected = self.accumulator.len(),
                "sink accepted a partial block"
            );
        }
        self.enter(TickPhase::Emitted);

        self.ticks += 1;
        self.enter(TickPhase::Idle);

        self.report.samples_written = samples_written;
        Some(&self.report)
    }

    fn enter(&mut self, phase: TickPhase) {
        trace!(tick = self.ticks, ?phase, "tick phase");
        self.phase = phase;
    }

    fn reclaim_late_acks(&mut self, queues: &mut StandbyQueues) {
        for index in 0..self.workers.len() {
            if !self.workers[index].in_flight {
                continue;
            }
            if let Some(ack) = self.workers[index].handle.try_recv() {
                trace!(worker = index, "late ack reclaimed");
                // The block belongs to a tick that already went out.
                self.accept(ack, queues, false);
            }
        }
    }

    fn dispatch(&mut self, queues: &mut StandbyQueues) {
        let frames = self.frames;
        let outcomes = &mut self.report.outcomes;

        for (index, slot) in self.workers.iter_mut().enumerate() {
            if slot.in_flight {
                warn!(worker = index, "previous render still in flight, skipping dispatch");
                outcomes.push(WorkerOutcome::Skipped);
                continue;
            }

            // Idle without a buffer: the worker dropped its last request.
            let Some(buffer) = slot.spare.take() else {
                if let Some(queue) = queues.get_mut(index) {
                    let batch = queue.swap();
                    if !batch.is_empty() {
                        trace!(
                            worker = index,
                            dropped = batch.len(),
                            "worker gone, dropping commands"
                        );
                    }
                    queue.recycle(batch);
                }
                outcomes.push(WorkerOutcome::Disconnected);
                continue;
            };
            let commands = queues
                .get_mut(index)
                .map(|q| q.swap())
                .unwrap_or_default();

            let request = RenderRequest {
                commands,
                buffer,
                frames,
            };

            match slot.handle.send(request) {
                Ok(()) => {
                    slot.in_flight = true;
                    outcomes.push(WorkerOutcome::Rendered);
                }
                Err((err, request)) => {
                    warn!(
                        worker = index,
                        error = %err,
                        dropped = request.commands.len(),
                        "render request not sent"
                    );
                    slot.spare = Some(request.buffer);
                    if let Some(queue) = queues.get_mut(index) {
                        queue.recycle(request.commands);
                    }
                    outcomes.push(match err {
                        WorkerError::Busy(_) => WorkerOutcome::Skipped,
                        _ => WorkerOutcome::Disconnected,
                    });
                }
            }
        }
    }

    fn await_acks(&mut self, queues: &mut StandbyQueues) {
        let deadline = Instant::now() + self.ack_timeout;

        for index in 0..self.workers.len() {
            // Rendered here only means the request went out this tick.
            if self.report.outcomes[index] != WorkerOutcome::Rendered
                || !self.workers[index].in_flight
            {
                continue;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.workers[index].handle.recv_timeout(remaining) {
                Ok(ack) => {
                    if ack.status == AckStatus::Failed {
                        warn!(worker = index, "worker reported a failed render");
                        self.report.outcomes[index] = WorkerOutcome::Rejected;
                    }
                    self.accept(ack, queues, true);
                }
                Err(err @ WorkerError::Timeout { .. }) => {
                    warn!(worker = index, error = %err, "using last-known block");
                    self.report.outcomes[index] = WorkerOutcome::TimedOut;
                }
                Err(err) => {
                    warn!(worker = index, error = %err, "worker gone, using last-known block");
                    self.workers[index].in_flight = false;
                    self.report.outcomes[index] = WorkerOutcome::Disconnected;
                }
            }
        }
    }

    /// Take back an acknowledged request's storage. With `fresh`, its block
    /// becomes the worker's latest output.
    fn accept(&mut self, ack: RenderAck, queues: &mut StandbyQueues, fresh: bool) {
        let RenderAck {
            worker,
            commands,
            mut buffer,
            ..
        } = ack;

        let Some(slot) = self.workers.get_mut(worker) else {
            return;
        };

        if buffer.len() == slot.latest.len() {
            if fresh {
                std::mem::swap(&mut slot.latest, &mut buffer);
            }
        } else {
            // Short buffer: keep what was rendered, silence the rest, and
            // replace the buffer so the next request can succeed.
            if fresh {
                let n = buffer.len().min(slot.latest.len());
                slot.latest[..n].copy_from_slice(&buffer[..n]);
                slot.latest[n..].fill(0);
            }
            buffer = vec![0; slot.latest.len()].into_boxed_slice();
        }
        slot.spare = Some(buffer);
        slot.in_flight = false;

        if let Some(queue) = queues.get_mut(worker) {
            queue.recycle(commands);
        }
    }

    fn mix(&mut self) {
        mix_blocks(
            &mut self.accumulator,
            self.workers.iter().map(|w| &w.latest[..]),
        );
    }

    /// Write `count` silent blocks, or as many as the sink accepts whole.
    pub fn prime(&self, sink: &mut impl OutputSink, count: usize) -> usize {
        let silence = vec![0i16; self.block_samples()];
        let mut primed = 0;

        while primed < count && self.sink_ready(sink) {
            sink.write(0, &silence);
            primed += 1;
        }
        primed
    }

    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn in_flight(&self, worker: usize) -> bool {
        self.workers.get(worker).is_some_and(|w| w.in_flight)
    }
}
