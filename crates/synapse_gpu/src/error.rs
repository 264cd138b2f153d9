//! # Resource Bridge Error Types
//!
//! All errors that can occur at the GPU interop boundary.

use synapse_core::{GpuApi, TextureFormat};
use thiserror::Error;

/// Errors that can occur in the GPU resource bridge.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceBridgeError {
    /// A texture belonging to one API was handed to a backend of another.
    #[error("gpu api mismatch: backend is {backend:?}, texture is {texture:?}")]
    ApiMismatch {
        /// API of the backend that rejected the texture.
        backend: GpuApi,
        /// API the texture belongs to.
        texture: GpuApi,
    },

    /// The two sides of the bridge share no GPU API.
    #[error("no common gpu api between host and engine")]
    NoCommonApi,

    /// The device behind this backend was lost.
    ///
    /// Every outstanding handle is invalid; the instance must reconnect and
    /// re-create its resources.
    #[error("gpu device lost")]
    DeviceLost,

    /// The handle does not name a live texture (stale, released, or from a
    /// previous device generation).
    #[error("unknown texture handle")]
    UnknownHandle,

    /// The backend cannot share textures of this format.
    #[error("unsupported texture format: {0:?}")]
    UnsupportedFormat(TextureFormat),

    /// The descriptor is internally inconsistent (null handle, zero size,
    /// or a row pitch smaller than a packed row).
    #[error("invalid texture descriptor")]
    InvalidDescriptor,

    /// The backend's pre-allocated slot table is full.
    #[error("texture slots exhausted: capacity {capacity}")]
    SlotsExhausted {
        /// Fixed slot capacity of the backend.
        capacity: usize,
    },

    /// A fence signal tried to move backwards.
    #[error("fence regression: current {current}, requested {requested}")]
    FenceRegression {
        /// Last signaled value.
        current: u64,
        /// The lower value that was requested.
        requested: u64,
    },
}
