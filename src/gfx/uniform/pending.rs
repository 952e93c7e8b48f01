// src/gfx/uniform/pending.rs
//! Deferred uniform writes
//!
//! A write to a program that is not bound cannot be issued (GL uniform calls
//! target the current program), so it is queued on the program and replayed
//! when that program is next activated.

use std::collections::{HashSet, VecDeque};

use log::warn;

use crate::backend::{GpuContext, UniformLocation};
use crate::error::Result;

use super::UniformValue;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommand {
    pub name: String,
    pub value: UniformValue,
}

/// FIFO of writes owned by one program
#[derive(Debug, Default)]
pub struct PendingQueue {
    commands: VecDeque<PendingCommand>,
    warned: HashSet<String>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, name: impl Into<String>, value: UniformValue) {
        self.commands.push_back(PendingCommand {
            name: name.into(),
            value,
        });
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingCommand> {
        self.commands.iter()
    }

    /// Executes every queued write in order, resolving locations just in time
    ///
    /// The owning program must be bound. Commands whose location cannot be
    /// resolved are dropped with one warning per name. Returns the number of
    /// writes issued.
    pub fn flush(
        &mut self,
        gpu: &GpuContext,
        mut resolve: impl FnMut(&str, &UniformValue) -> Result<UniformLocation>,
    ) -> usize {
        let mut written = 0;
        while let Some(command) = self.commands.pop_front() {
            match resolve(&command.name, &command.value) {
                Ok(location) => {
                    gpu.api().set_uniform(location, &command.value);
                    written += 1;
                }
                Err(err) => {
                    if self.warned.insert(command.name.clone()) {
                        warn!("dropping deferred write: {}", err);
                    }
                }
            }
        }
        written
    }
}
