//! Error taxonomy for the simulation core.
//!
//! Every fallible core operation returns [`SimError`] with a human-readable
//! detail string. Initialization errors are fatal to startup; per-frame errors
//! are fatal to the session and lead to orderly shutdown. The one non-error
//! outcome — no swapchain image this frame — is reported as
//! [`crate::scene::FrameOutcome::Skipped`], not as an error.

use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    /// Buffer, pipeline, or staging-buffer creation failed during startup.
    #[error("resource creation failed: {0}")]
    ResourceCreation(String),

    /// A staging buffer could not be mapped or read back.
    #[error("buffer transfer failed: {0}")]
    Upload(String),

    /// A command buffer or pass could not be begun for this frame.
    #[error("frame acquisition failed: {0}")]
    FrameAcquisition(String),

    /// The swapchain reported a genuine device error, as opposed to the
    /// valid no-image-this-frame skip.
    #[error("swapchain acquisition failed: {0}")]
    SwapchainAcquisition(String),
}
