//! CPU compute executor - In-process stand-in for the GPU pipeline.
//!
//! Same contract as a GPU backend: ping-pong render targets per variable,
//! every pass reads the previous frame's outputs of its dependencies, passes
//! run in registration order, and read-backs may arrive frames later.

use bevy::prelude::*;

use super::*;
use crate::grid::{Texel, TexelBuffer};

/// Per-slot program: computes one output texel from the pass inputs.
pub type Kernel = Box<dyn Fn(&PassContext<'_>, usize) -> Texel + Send + Sync>;

/// Inputs visible to a pass: its dependencies' previous outputs, in declared order.
pub struct PassContext<'a> {
    pub width: usize,
    inputs: Vec<&'a TexelBuffer>,
}

impl<'a> PassContext<'a> {
    pub fn input(&self, index: usize) -> Option<&'a TexelBuffer> {
        self.inputs.get(index).copied()
    }

    /// Texel of dependency `input` at `slot`. Zero when out of range.
    pub fn texel(&self, input: usize, slot: usize) -> Texel {
        self.input(input).and_then(|b| b.get(slot)).unwrap_or(Texel::ZERO)
    }
}

struct CpuVariable {
    name: String,
    kernel: Kernel,
    dependencies: Vec<VariableId>,
    targets: [TexelBuffer; 2],
}

struct InFlight {
    variable: VariableId,
    buffer: TexelBuffer,
    frames_left: u32,
}

/// Reference executor running kernels on the CPU.
pub struct CpuExecutor {
    width: usize,
    variables: Vec<CpuVariable>,
    current: usize,
    initialized: bool,
    readback_latency: u32,
    in_flight: Vec<InFlight>,
    frame: u64,
}

impl CpuExecutor {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            variables: Vec::new(),
            current: 0,
            initialized: false,
            readback_latency: 0,
            in_flight: Vec::new(),
            frame: 0,
        }
    }

    /// Deliver read-backs `frames` advances after they were requested.
    pub fn with_readback_latency(mut self, frames: u32) -> Self {
        self.readback_latency = frames;
        self
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Latest output of a variable (what a renderer would sample).
    pub fn read_current(&self, variable: VariableId) -> Option<&TexelBuffer> {
        self.variables.get(variable.0).map(|v| &v.targets[self.current])
    }

    /// Read-backs requested but not yet delivered.
    pub fn pending_readbacks(&self) -> usize {
        self.in_flight.len()
    }
}

impl ComputeExecutor for CpuExecutor {
    type Program = Kernel;

    fn create_buffer(&self) -> TexelBuffer {
        TexelBuffer::new(self.width)
    }

    fn register_variable(&mut self, name: &str, program: Kernel, initial: TexelBuffer) -> VariableId {
        let id = VariableId(self.variables.len());
        self.variables.push(CpuVariable {
            name: name.to_string(),
            kernel: program,
            dependencies: Vec::new(),
            targets: [initial.clone(), initial],
        });
        id
    }

    fn set_dependencies(&mut self, variable: VariableId, dependencies: &[VariableId]) {
        if let Some(v) = self.variables.get_mut(variable.0) {
            v.dependencies = dependencies.to_vec();
        }
    }

    fn initialize(&mut self) -> Result<(), PipelineError> {
        if self.variables.is_empty() {
            return Err(PipelineError::NoVariables);
        }
        let expected = self.width * self.width;
        for (i, v) in self.variables.iter().enumerate() {
            if self.variables[..i].iter().any(|other| other.name == v.name) {
                return Err(PipelineError::DuplicateVariable(v.name.clone()));
            }
            if v.targets[0].len() != expected {
                return Err(PipelineError::BufferSize {
                    name: v.name.clone(),
                    expected,
                    actual: v.targets[0].len(),
                });
            }
            if let Some(dep) = v.dependencies.iter().find(|d| d.0 >= self.variables.len()) {
                return Err(PipelineError::UnknownDependency {
                    variable: v.name.clone(),
                    dependency: dep.0,
                });
            }
        }
        self.initialized = true;
        Ok(())
    }

    fn advance(&mut self, request: &ReadbackRequest) -> Readbacks {
        let mut delivered = Readbacks::default();
        if !self.initialized {
            warn!("CpuExecutor::advance called before initialize");
            return delivered;
        }

        let prev = self.current;
        let next = 1 - prev;
        let capacity = self.width * self.width;

        // Every pass reads last frame's targets, so outputs can be computed independently.
        let outputs: Vec<TexelBuffer> = self
            .variables
            .iter()
            .map(|var| {
                let ctx = PassContext {
                    width: self.width,
                    inputs: var
                        .dependencies
                        .iter()
                        .map(|d| &self.variables[d.0].targets[prev])
                        .collect(),
                };
                let mut out = TexelBuffer::new(self.width);
                for (slot, texel) in out.texels_mut().iter_mut().enumerate().take(capacity) {
                    *texel = (var.kernel)(&ctx, slot);
                }
                out
            })
            .collect();

        for (var, out) in self.variables.iter_mut().zip(outputs) {
            var.targets[next] = out;
        }
        self.current = next;
        self.frame += 1;

        // Age read-backs already in flight.
        let mut still_in_flight = Vec::with_capacity(self.in_flight.len());
        for mut pending in self.in_flight.drain(..) {
            pending.frames_left = pending.frames_left.saturating_sub(1);
            if pending.frames_left == 0 {
                delivered.push(pending.variable, pending.buffer);
            } else {
                still_in_flight.push(pending);
            }
        }
        self.in_flight = still_in_flight;

        for &variable in request.variables() {
            let Some(var) = self.variables.get(variable.0) else { continue };
            let buffer = var.targets[self.current].clone();
            if self.readback_latency == 0 {
                delivered.push(variable, buffer);
            } else {
                self.in_flight.push(InFlight {
                    variable,
                    buffer,
                    frames_left: self.readback_latency,
                });
            }
        }
        delivered
    }

    fn current_output(&self, variable: VariableId) -> RenderTargetHandle {
        RenderTargetHandle { variable, target: self.current }
    }

    fn write_buffer(&mut self, buffer: &TexelBuffer, variable: VariableId) {
        let current = self.current;
        if let Some(v) = self.variables.get_mut(variable.0) {
            if buffer.len() == v.targets[current].len() {
                v.targets[current] = buffer.clone();
            } else {
                warn!("write_buffer: size mismatch for '{}'", v.name);
            }
        }
    }

    fn write_texels(&mut self, texels: &[(usize, Texel)], variable: VariableId) {
        let current = self.current;
        let Some(v) = self.variables.get_mut(variable.0) else { return };
        let target = &mut v.targets[current];
        for &(slot, texel) in texels {
            if slot < target.len() {
                target.set(slot, texel);
            } else {
                warn!("write_texels: slot {} out of range for '{}'", slot, v.name);
            }
        }
    }
}
