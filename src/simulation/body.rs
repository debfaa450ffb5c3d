//! The body record shared by host and device.

use bytemuck::{Pod, Zeroable};

/// One simulated body.
///
/// The layout is thirteen packed `f32` values and matches `struct Body` in the
/// leap-frog kernel exactly, so a `&[Body]` can be copied to the device as is.
/// `previous` holds the initial position before a run and the position one step
/// back after it.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Body {
    pub previous: [f32; 3],
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub acceleration: [f32; 3],
    pub mass: f32,
}

impl Body {
    /// Size of one record in bytes.
    pub const SIZE: usize = std::mem::size_of::<Body>();

    /// A body starting at `position` with initial `velocity`.
    pub fn new(position: [f32; 3], velocity: [f32; 3], mass: f32) -> Self {
        Self {
            previous: position,
            position: [0.0; 3],
            velocity,
            acceleration: [0.0; 3],
            mass,
        }
    }

    pub fn momentum(&self) -> [f32; 3] {
        self.velocity.map(|v| v * self.mass)
    }

    pub fn kinetic_energy(&self) -> f32 {
        0.5 * self.mass * self.velocity.iter().map(|v| v * v).sum::<f32>()
    }
}

/// Uniform block passed to the leap-frog kernel at binding 1.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct SimParams {
    pub dt: f32,
    pub count: u32,
    pub t_max: f32,
    pub steps: u32,
}
