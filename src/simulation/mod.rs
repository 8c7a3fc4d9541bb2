//! Particle simulation core: host-side state, GPU buffer lifecycle, and the
//! compute-pass integration step.

pub mod gpu_buffers;
pub mod integrate;
pub mod particles;

pub use gpu_buffers::{ParticleBuffers, ATTRIBUTE_COUNT};
pub use integrate::{workgroup_count, IntegratePipeline, WORKGROUP_SIZE};
pub use particles::ParticleState;

/// Default particle population. Fixed for the process lifetime and a multiple
/// of the compute workgroup width so no dispatch thread is wasted.
pub const PARTICLE_COUNT: u32 = 1024;

/// Headless device for GPU-dependent tests. Returns `None` when no adapter is
/// available so those tests skip instead of failing.
#[cfg(test)]
pub(crate) fn request_test_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter =
        pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
            .ok()?;
    pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("pointflow test device"),
        ..Default::default()
    }))
    .ok()
}
