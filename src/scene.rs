//! Per-frame orchestration of the particle simulation.
//!
//! [`ParticleScene`] is the exclusively-owned context object tying the GPU
//! resource manager, the compute step, and the point renderer together. One
//! call to [`ParticleScene::step_and_render`] records the compute dispatch
//! and the render pass into a single command encoder and submits once —
//! submission order, not explicit fences, is what guarantees the render pass
//! observes this frame's integration writes. Do not reorder the recording or
//! split it across two submissions without adding a cross-pass barrier.

use crate::error::{SimError, SimResult};
use crate::rendering::PointRenderer;
use crate::simulation::{IntegratePipeline, ParticleBuffers, ParticleState};

/// Result of one frame: either work was submitted and presented, or there was
/// no swapchain image this frame (minimized window, outdated surface) and the
/// frame was validly skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered,
    Skipped,
}

#[derive(Debug)]
struct SceneResources {
    buffers: ParticleBuffers,
    integrate: IntegratePipeline,
    renderer: PointRenderer,
    compute_bind_group: wgpu::BindGroup,
    render_bind_group: wgpu::BindGroup,
}

impl SceneResources {
    /// Record this frame's integration dispatch into a fresh encoder. The
    /// render pass, if any, is recorded into the same encoder afterwards.
    fn record_step(&self, device: &wgpu::Device, particle_count: u32) -> wgpu::CommandEncoder {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame encoder"),
        });
        self.integrate
            .dispatch(&mut encoder, &self.compute_bind_group, particle_count);
        encoder
    }
}

#[derive(Debug)]
pub struct ParticleScene {
    particle_count: u32,
    resources: Option<SceneResources>,
}

impl ParticleScene {
    /// Initialize every device resource the simulation owns: seed host-side
    /// state, upload it into the six attribute buffers, and build both
    /// pipelines and their bind groups.
    ///
    /// Any failure here is fatal to startup; resources created before the
    /// failure are dropped before the error propagates.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        particle_count: u32,
        drawable_width: u32,
        drawable_height: u32,
    ) -> SimResult<Self> {
        let state = ParticleState::seeded(particle_count as usize, drawable_width, drawable_height);
        let buffers = ParticleBuffers::new(device, queue, &state)?;

        let integrate = IntegratePipeline::new(device);
        let renderer = PointRenderer::new(device, surface_format);

        let attribute_buffers = buffers.attribute_buffers().ok_or_else(|| {
            SimError::ResourceCreation("attribute buffers released during init".into())
        })?;
        let compute_bind_group = integrate.create_bind_group(device, attribute_buffers);

        let (x_curr, y_curr) = buffers.position_buffers().ok_or_else(|| {
            SimError::ResourceCreation("position buffers released during init".into())
        })?;
        let render_bind_group = renderer.create_bind_group(device, x_curr, y_curr);

        log::info!("initialized scene with {} particles", particle_count);

        Ok(Self {
            particle_count,
            resources: Some(SceneResources {
                buffers,
                integrate,
                renderer,
                compute_bind_group,
                render_bind_group,
            }),
        })
    }

    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }

    /// Advance the simulation one step and draw the result.
    ///
    /// The compute dispatch is recorded before image acquisition and is
    /// submitted on every outcome: an unavailable swapchain image skips only
    /// the draw, never the step, so the simulation keeps advancing while the
    /// window is minimized. Errors are fatal to the session; the caller
    /// terminates the loop and shuts down.
    pub fn step_and_render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface: &wgpu::Surface,
        config: &wgpu::SurfaceConfiguration,
    ) -> SimResult<FrameOutcome> {
        let resources = self
            .resources
            .as_ref()
            .ok_or_else(|| SimError::FrameAcquisition("scene already shut down".into()))?;

        // Compute first, render second, one submission.
        let mut encoder = resources.record_step(device, self.particle_count);

        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Timeout) => {
                log::debug!("swapchain timeout, stepping without drawing");
                queue.submit(std::iter::once(encoder.finish()));
                return Ok(FrameOutcome::Skipped);
            }
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                // Resize or mode change; reconfigure and draw again next frame.
                surface.configure(device, config);
                queue.submit(std::iter::once(encoder.finish()));
                return Ok(FrameOutcome::Skipped);
            }
            Err(err) => return Err(SimError::SwapchainAcquisition(err.to_string())),
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        resources.renderer.draw(
            &mut encoder,
            &view,
            &resources.render_bind_group,
            self.particle_count,
            config.width,
            config.height,
        );

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        Ok(FrameOutcome::Rendered)
    }

    /// Release every owned device resource, newest first: bind groups, then
    /// pipelines, then the attribute buffers. Waits for device idle before
    /// releasing anything. Idempotent.
    pub fn shutdown(&mut self, device: &wgpu::Device) {
        let Some(resources) = self.resources.take() else {
            return;
        };

        let _ = device.poll(wgpu::PollType::Wait);

        let SceneResources {
            mut buffers,
            integrate,
            renderer,
            compute_bind_group,
            render_bind_group,
        } = resources;

        drop(render_bind_group);
        drop(compute_bind_group);
        drop(renderer);
        drop(integrate);
        buffers.shutdown(device);

        log::info!("scene shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::request_test_device;

    #[test]
    fn scene_initializes_and_shuts_down_idempotently() {
        let Some((device, queue)) = request_test_device() else {
            return;
        };

        let mut scene = ParticleScene::new(
            &device,
            &queue,
            wgpu::TextureFormat::Bgra8UnormSrgb,
            256,
            800,
            600,
        )
        .unwrap();
        assert_eq!(scene.particle_count(), 256);

        scene.shutdown(&device);
        scene.shutdown(&device);
    }

    #[test]
    fn integration_step_advances_without_a_draw() {
        let Some((device, queue)) = request_test_device() else {
            return;
        };

        // A minimized window never yields a swapchain image, but the
        // simulation must still advance: submit the step encoder alone, with
        // no render pass, and check the buffers moved one Verlet step.
        let scene = ParticleScene::new(
            &device,
            &queue,
            wgpu::TextureFormat::Bgra8UnormSrgb,
            128,
            800,
            600,
        )
        .unwrap();
        let resources = scene.resources.as_ref().unwrap();

        let mut expected = resources.buffers.read_back(&device, &queue).unwrap();
        expected.step_reference();

        let encoder = resources.record_step(&device, scene.particle_count());
        queue.submit(std::iter::once(encoder.finish()));

        let actual = resources.buffers.read_back(&device, &queue).unwrap();
        for i in 0..actual.len() {
            assert!((actual.x_curr[i] - expected.x_curr[i]).abs() < 1e-6);
            assert!((actual.y_curr[i] - expected.y_curr[i]).abs() < 1e-6);
            assert!((actual.x_prev[i] - expected.x_prev[i]).abs() < 1e-6);
            assert!((actual.y_prev[i] - expected.y_prev[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn zero_particles_fail_initialization() {
        let Some((device, queue)) = request_test_device() else {
            return;
        };

        let err = ParticleScene::new(
            &device,
            &queue,
            wgpu::TextureFormat::Bgra8UnormSrgb,
            0,
            800,
            600,
        )
        .unwrap_err();
        assert!(matches!(err, SimError::ResourceCreation(_)));
    }
}
