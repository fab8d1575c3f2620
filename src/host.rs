//! Seams to the embedding application: the map, the GPU and the idle scheduler.

use bevy_math::{Mat4, UVec2};

use crate::mesh::PrismMesh;
use crate::projection::GeoBounds;
use crate::uniforms::Uniforms;

/// The host map the overlay is drawn over.
pub trait MapView {
    /// Viewport size in CSS pixels.
    fn size(&self) -> UVec2;
    /// Planar world coordinates to clip space.
    fn projection_matrix(&self) -> Mat4;
    /// Currently visible geographic box.
    fn bounds(&self) -> GeoBounds;
}

/// Handle to a vertex buffer owned by a [`GpuBackend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

/// Receives geometry and draw calls.
///
/// Buffers are released explicitly; the controller never holds more than one
/// live buffer and releases it before uploading its replacement.
pub trait GpuBackend {
    fn upload(&mut self, mesh: &PrismMesh) -> BufferId;
    fn release(&mut self, buffer: BufferId);
    /// Draw `vertex_count` vertices of `buffer` as a triangle list.
    fn draw(&mut self, buffer: BufferId, uniforms: &Uniforms, vertex_count: usize);
}

/// Lets the overlay defer work until the host is idle.
pub trait IdleScheduler {
    /// Ask for one call to `OverlayController::run_idle` at the next idle period.
    fn request_idle(&mut self);
}

/// Scheduler for hosts that simply call `run_idle` every frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct PollIdle;

impl IdleScheduler for PollIdle {
    fn request_idle(&mut self) {}
}
