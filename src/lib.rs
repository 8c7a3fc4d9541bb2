//! # Pointflow: GPU-Resident Verlet Particle Simulation
//!
//! Pointflow integrates thousands of point particles on the GPU each frame
//! via a compute pass and immediately rasterizes the result via a render
//! pass. The two passes share the same storage buffers and are recorded into
//! one command buffer: submission order, not explicit synchronization, is
//! what guarantees the render pass observes the compute pass's writes.
//!
//! ## Architecture
//!
//! - [`simulation::ParticleBuffers`] — GPU resource lifecycle: allocates the
//!   six per-particle attribute buffers (x/y current, x/y previous, mass,
//!   density), populates them through staging buffers in one batched copy
//!   submission, and tears them down in reverse creation order.
//! - [`simulation::IntegratePipeline`] — one compute dispatch per frame
//!   advances particle state in place (position Verlet; velocity is implicit
//!   in the current/previous position difference).
//! - [`rendering::PointRenderer`] — one point-list draw call per frame binds
//!   the position buffers as vertex-stage storage inputs; no vertex attribute
//!   buffers.
//! - [`scene::ParticleScene`] — the exclusively-owned context tying the
//!   three together: initialize, step-and-render, shutdown.
//! - [`app::App`] — winit/wgpu shell driving the frame loop on a single
//!   logical thread.
//!
//! ## Data model
//!
//! Particle state lives in six index-aligned `f32` storage buffers; index
//! `i` in every buffer refers to the same logical particle. The population is
//! fixed for the process lifetime (1024 by default, a multiple of the 64-wide
//! compute workgroup) — no emitters, no lifetimes, no resizing.
//!
//! ## Error handling
//!
//! [`error::SimError`] covers the four failure classes: resource creation,
//! upload/readback, frame acquisition, and swapchain acquisition. Startup
//! errors abort the process; frame errors end the session and trigger an
//! orderly, idempotent shutdown. An unavailable swapchain image is a valid
//! skipped frame, not an error.

pub mod app;
pub mod error;
pub mod rendering;
pub mod scene;
pub mod simulation;
