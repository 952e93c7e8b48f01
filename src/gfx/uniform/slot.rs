// src/gfx/uniform/slot.rs
//! Typed single-uniform slot

use log::debug;

use crate::backend::{GpuContext, ProgramHandle, UniformLocation};

use super::{UniformKind, UniformType, UniformValue};

/// Resolution state of a slot against one program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotBinding {
    /// Never resolved, or invalidated
    Unbound,
    Resolved {
        program: ProgramHandle,
        location: UniformLocation,
    },
    /// The program has no active uniform with this name
    Missing { program: ProgramHandle },
    /// The program declares the uniform with a different type; writes are suppressed
    Mismatched {
        program: ProgramHandle,
        declared: UniformKind,
    },
}

impl SlotBinding {
    pub fn program(&self) -> Option<ProgramHandle> {
        match *self {
            SlotBinding::Unbound => None,
            SlotBinding::Resolved { program, .. }
            | SlotBinding::Missing { program }
            | SlotBinding::Mismatched { program, .. } => Some(program),
        }
    }
}

/// A named uniform fed by a pull provider
///
/// The provider is called on every [`apply`](Self::apply) and must be cheap
/// and free of side effects. A slot is bound to at most one program at a time;
/// binding it to another program discards the memoized location.
pub struct UniformSlot {
    name: String,
    kind: UniformKind,
    provider: Box<dyn Fn() -> UniformValue>,
    binding: SlotBinding,
    /// Generation of the bound program name when the binding was made
    generation: u64,
}

impl UniformSlot {
    pub fn new<T: UniformType>(name: impl Into<String>, provider: impl Fn() -> T + 'static) -> Self {
        Self {
            name: name.into(),
            kind: T::KIND,
            provider: Box::new(move || provider().into()),
            binding: SlotBinding::Unbound,
            generation: 0,
        }
    }

    /// Replaces the provider; a change of type forces re-resolution
    pub fn set_provider<T: UniformType>(&mut self, provider: impl Fn() -> T + 'static) {
        if self.kind != T::KIND {
            self.kind = T::KIND;
            self.binding = SlotBinding::Unbound;
        }
        self.provider = Box::new(move || provider().into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> UniformKind {
        self.kind
    }

    pub fn binding(&self) -> SlotBinding {
        self.binding
    }

    pub fn location(&self) -> Option<UniformLocation> {
        match self.binding {
            SlotBinding::Resolved { location, .. } => Some(location),
            _ => None,
        }
    }

    /// Current provider value
    pub fn value(&self) -> UniformValue {
        (self.provider)()
    }

    /// Resolves the location against `program`, memoized per program
    ///
    /// `declared` is the type the program reports for this name, when known.
    /// A memo made against a deleted program whose name was reused is redone.
    pub fn bind(
        &mut self,
        gpu: &GpuContext,
        program: ProgramHandle,
        declared: Option<UniformKind>,
    ) -> SlotBinding {
        let generation = gpu.program_generation(program);
        if self.binding.program() == Some(program) && self.generation == generation {
            return self.binding;
        }
        self.generation = generation;

        self.binding = match gpu.api().uniform_location(program, &self.name) {
            None => SlotBinding::Missing { program },
            Some(_) if declared.is_some_and(|d| !d.accepts(self.kind)) => {
                SlotBinding::Mismatched {
                    program,
                    declared: declared.unwrap_or(self.kind),
                }
            }
            Some(location) => SlotBinding::Resolved { program, location },
        };
        self.binding
    }

    pub fn invalidate(&mut self) {
        self.binding = SlotBinding::Unbound;
    }

    /// Pulls the provider and writes the value to the resolved location
    ///
    /// No-op when unresolved, missing, mismatched, or when the program the slot
    /// is bound to is not the one currently in use. Returns whether a write
    /// was issued.
    pub fn apply(&self, gpu: &GpuContext) -> bool {
        let SlotBinding::Resolved { program, location } = self.binding else {
            return false;
        };
        if gpu.current_program() != Some(program) {
            debug!(
                "uniform '{}' skipped: program {} is not bound",
                self.name, program.0
            );
            return false;
        }
        if gpu.program_generation(program) != self.generation {
            debug!(
                "uniform '{}' skipped: program {} was deleted since binding",
                self.name, program.0
            );
            return false;
        }
        gpu.api().set_uniform(location, &self.value());
        true
    }
}

impl std::fmt::Debug for UniformSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniformSlot")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("binding", &self.binding)
            .finish()
    }
}
