//! Command queue: FIFO of debounced commands, deduplicated by key.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use tokio::sync::Notify;

use hvacq_domain::command::{Batch, Command};

/// What [`CommandQueue::enqueue`] did with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    Appended,
    /// An older command with the same key was replaced where it stood.
    Replaced,
}

#[derive(Default)]
pub struct CommandQueue {
    commands: Mutex<VecDeque<Command>>,
    notify: Notify,
}

impl CommandQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `command`, or replace a queued command with the same key in
    /// place so it keeps its original position.
    pub fn enqueue(&self, command: Command) -> Enqueued {
        let outcome = {
            let mut commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = commands.iter_mut().find(|c| c.key() == command.key()) {
                *slot = command;
                Enqueued::Replaced
            } else {
                commands.push_back(command);
                Enqueued::Appended
            }
        };
        self.notify.notify_one();
        outcome
    }

    /// Take every queued command as one batch, or `None` if empty.
    pub fn drain(&self) -> Option<Batch> {
        let mut commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        if commands.is_empty() {
            return None;
        }
        Some(Batch::new(commands.drain(..).collect()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve once the queue holds at least one command.
    pub async fn ready(&self) {
        loop {
            if !self.is_empty() {
                return;
            }
            self.notify.notified().await;
        }
    }
}
