//! Synthesis worker threads.
//!
//! Each worker owns one chip and renders the channels assigned to it. The
//! control thread talks to it with a strict request/acknowledge exchange:
//!
//! ```text
//! Control Thread                         Worker Thread
//!     │                                       │
//! [swap standby → active]                     │
//! [RenderRequest]──────(bounded 1)──────►[apply register writes]
//!     │                                  [render block into buffer]
//! [recv_timeout]◄──────(bounded 1)───────[RenderAck]
//!     │                                       │
//! [mix]                                       │
//! ```
//!
//! The command batch and the PCM buffer move into the request and come back
//! in the acknowledgment, so the worker has the buffer to itself while it
//! renders and the control thread never reads a buffer mid-render.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, trace};

use crate::{
    chip::{ToneChip, WorkerLayout},
    dsp::mix::write_stereo_frame,
    error::WorkerError,
    synth::register::RegisterCommand,
};

/// One tick of work for a worker.
#[derive(Debug)]
pub struct RenderRequest {
    /// Register writes to apply before rendering, in order.
    pub commands: Vec<RegisterCommand>,
    /// Interleaved stereo output, owned by the worker until acknowledged.
    pub buffer: Box<[i16]>,
    /// Stereo frames to render.
    pub frames: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    /// The whole block was rendered.
    Rendered,
    /// The buffer could not hold the requested frames; only a prefix was
    /// rendered.
    Failed,
}

/// Reply to a [`RenderRequest`], carrying its storage back.
#[derive(Debug)]
pub struct RenderAck {
    pub worker: usize,
    pub status: AckStatus,
    pub commands: Vec<RegisterCommand>,
    pub buffer: Box<[i16]>,
}

/// Apply a request to `chip` and produce its acknowledgment.
///
/// This is the whole job of a worker thread; it is public so tests and
/// benches can run a worker's tick synchronously.
pub fn render<C: ToneChip + ?Sized>(
    worker: usize,
    chip: &mut C,
    request: RenderRequest,
) -> RenderAck {
    let RenderRequest {
        commands,
        mut buffer,
        frames,
    } = request;

    for command in &commands {
        chip.write_register(command.address, command.value);
    }

    let wanted = frames * 2;
    let available = buffer.len().min(wanted) & !1;
    for frame in buffer[..available].chunks_exact_mut(2) {
        write_stereo_frame(frame, chip.next_sample());
    }

    let status = if available == wanted {
        AckStatus::Rendered
    } else {
        AckStatus::Failed
    };

    RenderAck {
        worker,
        status,
        commands,
        buffer,
    }
}

/// Handle to a running worker thread.
///
/// Dropping the handle closes the request channel, which ends the worker
/// loop, and then joins the thread.
pub struct WorkerHandle {
    index: usize,
    /// Option so it can be dropped before join
    tx: Option<Sender<RenderRequest>>,
    rx: Receiver<RenderAck>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn spawn<C: ToneChip + 'static>(
        layout: &WorkerLayout,
        chip: C,
    ) -> Result<Self, WorkerError> {
        let index = layout.index;
        let (request_tx, request_rx) = bounded::<RenderRequest>(1);
        let (ack_tx, ack_rx) = bounded::<RenderAck>(1);

        let handle = thread::Builder::new()
            .name(format!("fmtg-worker-{index}"))
            .spawn(move || run(index, chip, request_rx, ack_tx))
            .map_err(|e| WorkerError::Spawn {
                worker: index,
                reason: e.to_string(),
            })?;

        debug!(
            worker = index,
            channels = ?layout.channels,
            percussion = layout.percussion,
            "worker spawned"
        );

        Ok(Self {
            index,
            tx: Some(request_tx),
            rx: ack_rx,
            handle: Some(handle),
        })
    }

    /// Queue a request without blocking.
    ///
    /// On failure the request is handed back so its buffer is not lost.
    pub fn send(&self, request: RenderRequest) -> Result<(), (WorkerError, RenderRequest)> {
        let Some(tx) = &self.tx else {
            return Err((WorkerError::Disconnected(self.index), request));
        };
        match tx.try_send(request) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(request)) => Err((WorkerError::Busy(self.index), request)),
            Err(TrySendError::Disconnected(request)) => {
                Err((WorkerError::Disconnected(self.index), request))
            }
        }
    }

    /// Wait up to `timeout` for the next acknowledgment.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<RenderAck, WorkerError> {
        match self.rx.recv_timeout(timeout) {
            Ok(ack) => Ok(ack),
            Err(RecvTimeoutError::Timeout) => Err(WorkerError::Timeout {
                worker: self.index,
                timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(WorkerError::Disconnected(self.index)),
        }
    }

    /// Pick up an acknowledgment that already arrived, if any.
    pub fn try_recv(&self) -> Option<RenderAck> {
        self.rx.try_recv().ok()
    }

    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        // Close the request channel first or the join below never returns.
        drop(self.tx.take());

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run<C: ToneChip>(
    index: usize,
    mut chip: C,
    requests: Receiver<RenderRequest>,
    acks: Sender<RenderAck>,
) {
    while let Ok(request) = requests.recv() {
        trace!(worker = index, commands = request.commands.len(), "render request");
        let ack = render(index, &mut chip, request);
        if acks.send(ack).is_err() {
            break;
        }
    }
    debug!(worker = index, "worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Chip that records writes and outputs a ramp.
    #[derive(Default)]
    struct Ramp {
        writes: Vec<(u8, u8)>,
        counter: i16,
    }

    impl ToneChip for Ramp {
        fn write_register(&mut self, address: u8, value: u8) {
            self.writes.push((address, value));
        }

        fn next_sample(&mut self) -> i16 {
            self.counter += 1;
            self.counter
        }
    }

    fn layout(index: usize) -> WorkerLayout {
        WorkerLayout {
            index,
            channels: 0..3,
            percussion: false,
            sample_rate: 48_000,
        }
    }

    fn request(frames: usize, buffer_len: usize) -> RenderRequest {
        RenderRequest {
            commands: vec![RegisterCommand::new(0x20, 0x10), RegisterCommand::new(0x30, 0x05)],
            buffer: vec![0i16; buffer_len].into_boxed_slice(),
            frames,
        }
    }

    #[test]
    fn test_render_applies_writes_before_samples() {
        let mut chip = Ramp::default();
        let ack = render(0, &mut chip, request(3, 6));

        assert_eq!(chip.writes, vec![(0x20, 0x10), (0x30, 0x05)]);
        assert_eq!(ack.status, AckStatus::Rendered);
        assert_eq!(&ack.buffer[..], &[1, 1, 2, 2, 3, 3]);
        assert_eq!(ack.commands.len(), 2);
    }

    #[test]
    fn test_render_short_buffer_fails_with_partial_block() {
        let mut chip = Ramp::default();
        let ack = render(0, &mut chip, request(4, 5));

        assert_eq!(ack.status, AckStatus::Failed);
        assert_eq!(&ack.buffer[..], &[1, 1, 2, 2, 0]);
    }

    #[test]
    fn test_worker_round_trip() {
        let worker = WorkerHandle::spawn(&layout(1), Ramp::default()).unwrap();

        worker.send(request(2, 4)).unwrap();
        let ack = worker.recv_timeout(Duration::from_secs(1)).unwrap();

        assert_eq!(ack.worker, 1);
        assert_eq!(&ack.buffer[..], &[1, 1, 2, 2]);
    }

    #[test]
    fn test_chip_state_carries_across_requests() {
        let worker = WorkerHandle::spawn(&layout(0), Ramp::default()).unwrap();

        worker.send(request(1, 2)).unwrap();
        let first = worker.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(first.status, AckStatus::Rendered);
        assert_eq!(&first.buffer[..], &[1, 1]);

        worker.send(request(1, 2)).unwrap();
        let second = worker.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(&second.buffer[..], &[2, 2]);
    }

    #[test]
    fn test_recv_timeout_without_request() {
        let worker = WorkerHandle::spawn(&layout(2), Ramp::default()).unwrap();

        let err = worker.recv_timeout(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, WorkerError::Timeout { worker: 2, .. }));
        assert!(worker.try_recv().is_none());
    }

    #[test]
    fn test_drop_joins_thread() {
        let worker = WorkerHandle::spawn(&layout(0), Ramp::default()).unwrap();
        assert!(worker.is_alive());

        let (tx, rx) = std::sync::mpsc::channel();
        let dropper = std::thread::spawn(move || {
            drop(worker);
            let _ = tx.send(());
        });

        match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(()) => dropper.join().unwrap(),
            Err(_) => panic!("WorkerHandle::drop() deadlocked"),
        }
    }
}
