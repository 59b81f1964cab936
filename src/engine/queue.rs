use std::mem;

use crate::synth::register::{CommandSink, RegisterCommand};

/// Double-buffered command staging for one worker.
///
/// Note handling appends to `standby`. Once per tick the coordinator calls
/// [`swap`](Self::swap), which moves the whole standby batch out as the active
/// batch and leaves standby empty. The active batch travels to the worker by
/// value and comes back with the acknowledgment, where
/// [`recycle`](Self::recycle) keeps its allocation for the next swap.
#[derive(Debug, Default)]
pub struct CommandQueue {
    standby: Vec<RegisterCommand>,
    spare: Vec<RegisterCommand>,
}

impl CommandQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            standby: Vec::with_capacity(capacity),
            spare: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, command: RegisterCommand) {
        self.standby.push(command);
    }

    /// Insert `commands` ahead of everything already in standby.
    pub fn prepend(&mut self, commands: &[RegisterCommand]) {
        self.standby.splice(0..0, commands.iter().copied());
    }

    /// Take every standby command as the active batch.
    pub fn swap(&mut self) -> Vec<RegisterCommand> {
        mem::swap(&mut self.standby, &mut self.spare);
        self.standby.clear();
        mem::take(&mut self.spare)
    }

    /// Hand back an acknowledged batch so its storage can be reused.
    pub fn recycle(&mut self, mut batch: Vec<RegisterCommand>) {
        batch.clear();
        if batch.capacity() > self.spare.capacity() {
            self.spare = batch;
        }
    }

    pub fn standby(&self) -> &[RegisterCommand] {
        &self.standby
    }

    pub fn is_empty(&self) -> bool {
        self.standby.is_empty()
    }
}

/// One [`CommandQueue`] per worker, addressable as a [`CommandSink`].
#[derive(Debug, Default)]
pub struct StandbyQueues {
    queues: Vec<CommandQueue>,
}

impl StandbyQueues {
    pub fn new(workers: usize, capacity: usize) -> Self {
        Self {
            queues: (0..workers)
                .map(|_| CommandQueue::with_capacity(capacity))
                .collect(),
        }
    }

    pub fn get(&self, worker: usize) -> Option<&CommandQueue> {
        self.queues.get(worker)
    }

    pub fn get_mut(&mut self, worker: usize) -> Option<&mut CommandQueue> {
        self.queues.get_mut(worker)
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

impl CommandSink for StandbyQueues {
    fn push(&mut self, worker: usize, command: RegisterCommand) {
        match self.queues.get_mut(worker) {
            Some(queue) => queue.push(command),
            None => debug_assert!(false, "no command queue for worker {worker}"),
        }
    }
}
