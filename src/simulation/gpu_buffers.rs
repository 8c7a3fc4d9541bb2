//! GPU buffer lifecycle for the particle simulation.
//!
//! Owns the six device-local attribute buffers for their entire lifetime.
//! The compute and render passes borrow them per frame; nothing else writes
//! them after the initial upload.
//!
//! ## Upload path
//!
//! The attribute buffers are device-local and not host-writable, so initial
//! population goes through one staging buffer per attribute: created mapped,
//! written, unmapped, then all six buffer-to-buffer copies are batched into a
//! single command encoder and submitted once. Staging buffers are dropped
//! immediately after submission — the device completes the enqueued copies
//! before any read ordered after them, so no frame can observe a partially
//! initialized attribute set.

use crate::error::{SimError, SimResult};
use crate::simulation::particles::ParticleState;

/// Number of per-particle attributes: x/y current, x/y previous, mass,
/// density. Also the number of storage bindings the compute kernel declares.
pub const ATTRIBUTE_COUNT: usize = 6;

/// The six particle attribute storage buffers.
///
/// `buffers` is `None` only after [`ParticleBuffers::shutdown`]; every buffer
/// is created in [`ParticleBuffers::new`] and released exactly once, in
/// reverse creation order.
#[derive(Debug)]
pub struct ParticleBuffers {
    buffers: Option<[wgpu::Buffer; ATTRIBUTE_COUNT]>,
    particle_count: u32,
}

impl ParticleBuffers {
    /// Allocate the attribute buffers and populate them from `state` via
    /// staging buffers and one batched copy submission.
    ///
    /// On error, everything created so far is dropped before returning; no
    /// partial state escapes.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        state: &ParticleState,
    ) -> SimResult<Self> {
        if state.is_empty() {
            return Err(SimError::ResourceCreation(
                "particle count must be positive".into(),
            ));
        }

        let size = (state.len() * std::mem::size_of::<f32>()) as u64;
        let attributes = state.attributes();

        // STORAGE covers both the compute read/write bindings and the
        // vertex-stage read-only bindings; COPY_SRC enables debug readback.
        let buffers = attributes.map(|(label, _)| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        });

        let staging = attributes.map(|(label, data)| {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: true,
            });
            {
                let mut view = buffer.slice(..).get_mapped_range_mut();
                view.copy_from_slice(bytemuck::cast_slice(data));
            }
            buffer.unmap();
            buffer
        });

        // One copy submission batches all six transfers.
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("particle upload"),
        });
        for (src, dst) in staging.iter().zip(buffers.iter()) {
            encoder.copy_buffer_to_buffer(src, 0, dst, 0, size);
        }
        queue.submit(std::iter::once(encoder.finish()));
        // Staging buffers drop here; their contents are no longer needed once
        // the copies are enqueued.

        Ok(Self {
            buffers: Some(buffers),
            particle_count: state.len() as u32,
        })
    }

    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }

    /// All six attribute buffers in binding order, or `None` after shutdown.
    pub fn attribute_buffers(&self) -> Option<&[wgpu::Buffer; ATTRIBUTE_COUNT]> {
        self.buffers.as_ref()
    }

    /// The x/y current-position buffers consumed by the render pass.
    pub fn position_buffers(&self) -> Option<(&wgpu::Buffer, &wgpu::Buffer)> {
        self.buffers.as_ref().map(|b| (&b[0], &b[1]))
    }

    /// Debug readback of every attribute buffer into host memory.
    ///
    /// Blocks until the device finishes outstanding work. Not part of the
    /// frame loop; used to validate uploads and kernel output.
    pub fn read_back(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> SimResult<ParticleState> {
        let buffers = self
            .buffers
            .as_ref()
            .ok_or_else(|| SimError::Upload("particle buffers already released".into()))?;

        let size = (self.particle_count as usize * std::mem::size_of::<f32>()) as u64;
        let staging: Vec<wgpu::Buffer> = (0..ATTRIBUTE_COUNT)
            .map(|_| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("particle readback"),
                    size,
                    usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("particle readback"),
        });
        for (src, dst) in buffers.iter().zip(staging.iter()) {
            encoder.copy_buffer_to_buffer(src, 0, dst, 0, size);
        }
        queue.submit(std::iter::once(encoder.finish()));

        let mut receivers = Vec::with_capacity(ATTRIBUTE_COUNT);
        for buffer in &staging {
            let (tx, rx) = std::sync::mpsc::channel();
            buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result);
            });
            receivers.push(rx);
        }

        device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| SimError::Upload(format!("device poll failed: {e}")))?;

        for rx in receivers {
            rx.recv()
                .map_err(|_| SimError::Upload("readback callback dropped".into()))?
                .map_err(|e| SimError::Upload(format!("readback map failed: {e}")))?;
        }

        let mut columns = Vec::with_capacity(ATTRIBUTE_COUNT);
        for buffer in &staging {
            {
                let view = buffer.slice(..).get_mapped_range();
                columns.push(bytemuck::cast_slice::<u8, f32>(&view[..]).to_vec());
            }
            buffer.unmap();
        }

        let columns: [Vec<f32>; ATTRIBUTE_COUNT] = columns
            .try_into()
            .map_err(|_| SimError::Upload("attribute column count mismatch".into()))?;
        Ok(ParticleState::from_columns(columns))
    }

    /// Release the attribute buffers, in reverse creation order, after
    /// waiting for the device to go idle. Idempotent: repeated calls and
    /// calls on a partially-initialized manager are no-ops.
    pub fn shutdown(&mut self, device: &wgpu::Device) {
        let Some(buffers) = self.buffers.take() else {
            return;
        };

        // An in-flight submission may still be reading these.
        let _ = device.poll(wgpu::PollType::Wait);

        for buffer in buffers.into_iter().rev() {
            drop(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::request_test_device;

    #[test]
    fn upload_round_trips_exactly() {
        let Some((device, queue)) = request_test_device() else {
            return;
        };

        let state = ParticleState::seeded(256, 800, 600);
        let buffers = ParticleBuffers::new(&device, &queue, &state).unwrap();

        // Before any dispatch runs, readback must equal the seeded values
        // bit-for-bit.
        let read = buffers.read_back(&device, &queue).unwrap();
        assert_eq!(read, state);
    }

    #[test]
    fn zero_particle_count_is_a_creation_error() {
        let Some((device, queue)) = request_test_device() else {
            return;
        };

        let state = ParticleState::zeroed(0);
        let err = ParticleBuffers::new(&device, &queue, &state).unwrap_err();
        assert!(matches!(err, SimError::ResourceCreation(_)));
    }

    #[test]
    fn shutdown_is_idempotent() {
        let Some((device, queue)) = request_test_device() else {
            return;
        };

        let state = ParticleState::seeded(64, 800, 600);
        let mut buffers = ParticleBuffers::new(&device, &queue, &state).unwrap();

        buffers.shutdown(&device);
        assert!(buffers.attribute_buffers().is_none());

        // Second call must not panic or double-release.
        buffers.shutdown(&device);
        assert!(buffers.attribute_buffers().is_none());
    }

    #[test]
    fn readback_after_shutdown_reports_upload_error() {
        let Some((device, queue)) = request_test_device() else {
            return;
        };

        let state = ParticleState::seeded(64, 800, 600);
        let mut buffers = ParticleBuffers::new(&device, &queue, &state).unwrap();
        buffers.shutdown(&device);

        let err = buffers.read_back(&device, &queue).unwrap_err();
        assert!(matches!(err, SimError::Upload(_)));
    }
}
