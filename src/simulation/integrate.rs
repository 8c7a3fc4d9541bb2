//! Compute-pass integration of particle positions.
//!
//! One dispatch per frame advances every particle by one Verlet step, reading
//! and writing the six attribute buffers in place. The bind group layout
//! mirrors the kernel's storage declarations at bindings 0–5 in the fixed
//! attribute order; see `shaders/integrate.wgsl` for the binding contract.

use crate::simulation::gpu_buffers::ATTRIBUTE_COUNT;

/// Thread-group width declared by the compute kernel (`@workgroup_size(64)`).
pub const WORKGROUP_SIZE: u32 = 64;

/// Number of workgroups needed to cover `particle_count` threads.
///
/// Exact for multiples of [`WORKGROUP_SIZE`]; rounds up otherwise, with
/// out-of-range threads bounds-checked to no-ops in the kernel.
pub fn workgroup_count(particle_count: u32) -> u32 {
    particle_count.div_ceil(WORKGROUP_SIZE)
}

#[derive(Debug)]
pub struct IntegratePipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl IntegratePipeline {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("particle integrate shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shaders/integrate.wgsl").into()),
        });

        // All six attributes are read_write: the step swaps the current
        // position into the previous slot in place.
        let entries: [wgpu::BindGroupLayoutEntry; ATTRIBUTE_COUNT] =
            std::array::from_fn(|i| wgpu::BindGroupLayoutEntry {
                binding: i as u32,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("particle integrate bind group layout"),
                entries: &entries,
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("particle integrate pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("particle integrate pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
        }
    }

    /// Bind all six attribute buffers at slots 0–5, in binding order.
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        buffers: &[wgpu::Buffer; ATTRIBUTE_COUNT],
    ) -> wgpu::BindGroup {
        let entries: [wgpu::BindGroupEntry; ATTRIBUTE_COUNT] =
            std::array::from_fn(|i| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: buffers[i].as_entire_binding(),
            });

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("particle integrate bind group"),
            layout: &self.bind_group_layout,
            entries: &entries,
        })
    }

    /// Record one integration dispatch into `encoder`.
    ///
    /// Must be recorded ahead of the frame's render pass in the same encoder;
    /// submission order is what guarantees the render pass observes this
    /// step's writes.
    pub fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &wgpu::BindGroup,
        particle_count: u32,
    ) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("particle integrate pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(workgroup_count(particle_count), 1, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::gpu_buffers::ParticleBuffers;
    use crate::simulation::particles::ParticleState;
    use crate::simulation::request_test_device;

    #[test]
    fn workgroup_count_is_exact_for_multiples() {
        assert_eq!(workgroup_count(64), 1);
        assert_eq!(workgroup_count(1024), 16);
        assert_eq!(workgroup_count(64 * 300), 300);
    }

    #[test]
    fn workgroup_count_rounds_up_for_non_multiples() {
        assert_eq!(workgroup_count(1), 1);
        assert_eq!(workgroup_count(63), 1);
        assert_eq!(workgroup_count(65), 2);
        assert_eq!(workgroup_count(1023), 16);
    }

    fn dispatch_once(particle_count: usize) {
        let Some((device, queue)) = request_test_device() else {
            return;
        };

        let state = ParticleState::seeded(particle_count, 800, 600);
        let buffers = ParticleBuffers::new(&device, &queue, &state).unwrap();
        let integrate = IntegratePipeline::new(&device);
        let bind_group =
            integrate.create_bind_group(&device, buffers.attribute_buffers().unwrap());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("test dispatch"),
        });
        integrate.dispatch(&mut encoder, &bind_group, buffers.particle_count());
        queue.submit(std::iter::once(encoder.finish()));

        let mut expected = state;
        expected.step_reference();
        let actual = buffers.read_back(&device, &queue).unwrap();

        for i in 0..particle_count {
            assert!((actual.x_curr[i] - expected.x_curr[i]).abs() < 1e-6);
            assert!((actual.y_curr[i] - expected.y_curr[i]).abs() < 1e-6);
            assert!((actual.x_prev[i] - expected.x_prev[i]).abs() < 1e-6);
            assert!((actual.y_prev[i] - expected.y_prev[i]).abs() < 1e-6);
            assert_eq!(actual.mass[i], expected.mass[i]);
            assert_eq!(actual.density[i], expected.density[i]);
        }
    }

    #[test]
    fn dispatch_matches_cpu_reference() {
        dispatch_once(1024);
    }

    #[test]
    fn dispatch_tolerates_non_multiple_counts() {
        // 70 particles need two workgroups; threads 70..127 must be no-ops.
        dispatch_once(70);
    }
}
