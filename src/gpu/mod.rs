//! GPU Compute Module - Seam to the compute pipeline executor.
//!
//! Three variables advance every frame, each reading the previous frame's
//! outputs of its dependencies:
//! - `tV` velocity  ← position, velocity
//! - `tP` position  ← position, velocity
//! - `tA` aggregate ← position, velocity
//!
//! Data flow:
//! - CPU → GPU: `write_buffer` force-injects a staged buffer into a variable's
//!   current render target (bypasses that variable's pass for one frame);
//!   `write_texels` does the same for individual slots only
//! - GPU → CPU: read-backs are requested per `advance` call and delivered as
//!   one buffer per requested variable, possibly on a later frame

pub mod cpu;
pub mod kernels;

use bevy::prelude::*;
use std::fmt;

use crate::constants::*;
use crate::grid::{Texel, TexelBuffer};
use crate::sync::GridPatch;
use crate::targets::TargetTable;

// =============================================================================
// HANDLES
// =============================================================================

/// Index of a registered pipeline variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VariableId(pub usize);

/// Opaque handle to a variable's current render target, consumed by rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderTargetHandle {
    pub variable: VariableId,
    /// Ping-pong index of the target holding the latest output.
    pub target: usize,
}

/// Variables whose next output should be copied back to the CPU.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadbackRequest {
    variables: Vec<VariableId>,
}

impl ReadbackRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, variable: VariableId) -> Self {
        self.add(variable);
        self
    }

    pub fn add(&mut self, variable: VariableId) {
        if !self.variables.contains(&variable) {
            self.variables.push(variable);
        }
    }

    pub fn variables(&self) -> &[VariableId] {
        &self.variables
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Read-backs delivered by one `advance` call. At most one buffer per variable.
#[derive(Debug, Default)]
pub struct Readbacks {
    buffers: Vec<(VariableId, TexelBuffer)>,
}

impl Readbacks {
    pub fn push(&mut self, variable: VariableId, buffer: TexelBuffer) {
        match self.buffers.iter_mut().find(|(v, _)| *v == variable) {
            Some(entry) => entry.1 = buffer,
            None => self.buffers.push((variable, buffer)),
        }
    }

    pub fn take(&mut self, variable: VariableId) -> Option<TexelBuffer> {
        let idx = self.buffers.iter().position(|(v, _)| *v == variable)?;
        Some(self.buffers.swap_remove(idx).1)
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Pipeline setup failure. Fatal: no simulation runs without a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    NoVariables,
    DuplicateVariable(String),
    BufferSize { name: String, expected: usize, actual: usize },
    UnknownDependency { variable: String, dependency: usize },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::NoVariables => write!(f, "no variables registered"),
            PipelineError::DuplicateVariable(name) => write!(f, "variable '{}' registered twice", name),
            PipelineError::BufferSize { name, expected, actual } => {
                write!(f, "variable '{}' has {} texels, expected {}", name, actual, expected)
            }
            PipelineError::UnknownDependency { variable, dependency } => {
                write!(f, "variable '{}' depends on unknown variable #{}", variable, dependency)
            }
        }
    }
}

impl std::error::Error for PipelineError {}

// =============================================================================
// EXECUTOR TRAIT
// =============================================================================

/// Runs the compute passes. Treated as a black box by the simulation.
pub trait ComputeExecutor: Send + Sync + 'static {
    /// Shader program type understood by this executor.
    type Program: Send + Sync + 'static;

    /// Fresh zero-filled buffer of the executor's grid size.
    fn create_buffer(&self) -> TexelBuffer;

    fn register_variable(
        &mut self,
        name: &str,
        program: Self::Program,
        initial: TexelBuffer,
    ) -> VariableId;

    /// Declare which variables' previous-frame outputs a pass reads.
    fn set_dependencies(&mut self, variable: VariableId, dependencies: &[VariableId]);

    fn initialize(&mut self) -> Result<(), PipelineError>;

    /// Run one frame of every pass in order. Requested read-backs are
    /// delivered in the returned set once available.
    fn advance(&mut self, request: &ReadbackRequest) -> Readbacks;

    fn current_output(&self, variable: VariableId) -> RenderTargetHandle;

    /// Overwrite a variable's current render target with CPU data.
    fn write_buffer(&mut self, buffer: &TexelBuffer, variable: VariableId);

    /// Overwrite single texels of a variable's current render target.
    fn write_texels(&mut self, texels: &[(usize, Texel)], variable: VariableId);
}

// =============================================================================
// SIMULATION PIPELINE
// =============================================================================

/// Programs for the three passes.
pub struct PassPrograms<P> {
    pub velocity: P,
    pub position: P,
    pub aggregate: P,
}

/// The executor with the three simulation variables wired up.
#[derive(Resource)]
pub struct SimPipeline<E: ComputeExecutor> {
    executor: E,
    pub velocity: VariableId,
    pub position: VariableId,
    pub aggregate: VariableId,
    width: usize,
}

impl<E: ComputeExecutor> SimPipeline<E> {
    /// Register variables, fill initial state from the target table and initialize.
    pub fn new(
        mut executor: E,
        programs: PassPrograms<E::Program>,
        targets: &TargetTable,
    ) -> Result<Self, PipelineError> {
        let mut positions = executor.create_buffer();
        let mut velocities = executor.create_buffer();
        let width = positions.width();
        fill_initial_buffers(&mut positions, &mut velocities, targets);

        let velocity = executor.register_variable("tV", programs.velocity, velocities);
        let position = executor.register_variable("tP", programs.position, positions);
        let aggregates = executor.create_buffer();
        let aggregate = executor.register_variable("tA", programs.aggregate, aggregates);

        executor.set_dependencies(velocity, &[position, velocity]);
        executor.set_dependencies(position, &[position, velocity]);
        executor.set_dependencies(aggregate, &[position, velocity]);

        executor.initialize()?;
        info!("Compute pipeline initialized ({}x{} slots)", width, width);

        Ok(Self { executor, velocity, position, aggregate, width })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn advance(&mut self, request: &ReadbackRequest) -> Readbacks {
        self.executor.advance(request)
    }

    /// Write a sync round's patch into the current position and velocity targets.
    pub fn inject(&mut self, patch: &GridPatch) {
        self.executor.write_texels(&patch.positions, self.position);
        self.executor.write_texels(&patch.velocities, self.velocity);
    }

    /// Render targets fed to the unit renderer.
    pub fn render_targets(&self) -> (RenderTargetHandle, RenderTargetHandle) {
        (
            self.executor.current_output(self.position),
            self.executor.current_output(self.velocity),
        )
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}

/// Starting state: occupied reserved slots are targets, everything else empty.
pub fn fill_initial_buffers(positions: &mut TexelBuffer, velocities: &mut TexelBuffer, targets: &TargetTable) {
    let width = positions.width();
    for (i, (p, v)) in positions
        .texels_mut()
        .iter_mut()
        .zip(velocities.texels_mut().iter_mut())
        .enumerate()
    {
        match targets.get(i).filter(|_| i < width) {
            Some(target) => {
                *p = Texel::from_vec3(target.position, KIND_TARGET);
                *v = Texel::new(0.0, 0.0, 0.0, TARGET_MASS);
            }
            None => {
                *p = Texel::empty_position();
                *v = Texel::ZERO;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::Owner;
    use crate::targets::{Target, TargetKind};

    #[test]
    fn readbacks_hold_one_buffer_per_variable() {
        let mut rb = Readbacks::default();
        rb.push(VariableId(0), TexelBuffer::new(2));
        rb.push(VariableId(0), TexelBuffer::filled(2, Texel::new(1.0, 0.0, 0.0, 0.0)));
        let buf = rb.take(VariableId(0)).unwrap();
        assert_eq!(buf.get(0).unwrap().x, 1.0);
        assert!(rb.take(VariableId(0)).is_none());
        assert!(rb.is_empty());
    }

    #[test]
    fn request_ignores_duplicates() {
        let req = ReadbackRequest::new().with(VariableId(1)).with(VariableId(1)).with(VariableId(2));
        assert_eq!(req.variables(), &[VariableId(1), VariableId(2)]);
    }

    #[test]
    fn initial_fill_marks_targets_and_empties() {
        let mut targets = TargetTable::new(4);
        targets.spawn_at(Target::new(2, Vec3::new(1.0, 2.0, 3.0), Owner::Enemy, TargetKind::Drifting, 6));
        let mut p = TexelBuffer::new(4);
        let mut v = TexelBuffer::new(4);
        fill_initial_buffers(&mut p, &mut v, &targets);
        assert_eq!(p.get(2), Some(Texel::new(1.0, 2.0, 3.0, KIND_TARGET)));
        assert_eq!(v.get(2).unwrap().w, TARGET_MASS);
        assert_eq!(p.get(0).unwrap().w, KIND_EMPTY);
        assert_eq!(v.get(0).unwrap().w, 0.0);
        assert_eq!(p.get(9).unwrap().w, KIND_EMPTY);
    }

    #[test]
    fn render_targets_follow_the_ping_pong() {
        use crate::gpu::cpu::CpuExecutor;
        use crate::gpu::kernels::reference_programs;
        use crate::settings::SimSettings;

        let settings = SimSettings { grid_width: 4, ..Default::default() };
        let targets = TargetTable::new(4);
        let mut pipeline =
            SimPipeline::new(CpuExecutor::new(4), reference_programs(&settings), &targets).unwrap();
        let (p0, v0) = pipeline.render_targets();
        assert_eq!((p0.variable, v0.variable), (pipeline.position, pipeline.velocity));

        pipeline.advance(&ReadbackRequest::new());
        let (p1, v1) = pipeline.render_targets();
        assert_ne!(p0.target, p1.target);
        assert_eq!(p1.target, v1.target);
    }

    #[test]
    fn error_messages_name_the_variable() {
        let e = PipelineError::BufferSize { name: "tP".into(), expected: 16, actual: 4 };
        assert_eq!(e.to_string(), "variable 'tP' has 4 texels, expected 16");
    }
}
