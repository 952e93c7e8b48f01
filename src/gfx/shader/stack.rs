// src/gfx/shader/stack.rs
use std::rc::Rc;

use log::{error, warn};

use crate::error::GfxError;

use super::ShaderProgram;

/// Programs in effect during traversal
///
/// The base program is always present. Pushing never deduplicates: a program
/// pushed twice must be popped twice.
#[derive(Debug)]
pub struct ShaderStack {
    base: Rc<ShaderProgram>,
    pushed: Vec<Rc<ShaderProgram>>,
}

impl ShaderStack {
    pub fn new(base: Rc<ShaderProgram>) -> Self {
        Self {
            base,
            pushed: Vec::new(),
        }
    }

    pub fn push(&mut self, program: Rc<ShaderProgram>) {
        self.pushed.push(program);
    }

    /// Removes the top program; the base is never removed
    ///
    /// A popped program stops taking immediate writes even while the GPU still
    /// has it bound; the next [`top`](Self::top) re-activates whatever is on top.
    pub fn pop(&mut self) -> Option<Rc<ShaderProgram>> {
        let popped = self.pushed.pop();
        match &popped {
            Some(program) => program.release(),
            None => warn!("{}", GfxError::StackUnderflow { stack: "shader" }),
        }
        popped
    }

    /// Top program, without touching GPU state
    pub fn peek(&self) -> &Rc<ShaderProgram> {
        self.pushed.last().unwrap_or(&self.base)
    }

    /// Top program, activated if it is not already the GPU program
    ///
    /// Activation flushes the program's deferred writes.
    pub fn top(&self) -> &Rc<ShaderProgram> {
        let program = self.peek();
        if !program.is_current() {
            if let Err(err) = program.activate() {
                error!("failed to activate program '{}': {}", program.label(), err);
            }
        }
        program
    }

    pub fn base(&self) -> &Rc<ShaderProgram> {
        &self.base
    }

    /// Number of programs on the stack, base included
    pub fn depth(&self) -> usize {
        self.pushed.len() + 1
    }
}
