//! # SYNAPSE Core Types
//!
//! Shared vocabulary for the frame-interchange bridge:
//!
//! - **Parameters**: named, typed values flowing between the host engine and
//!   the external compositing engine
//! - **Frame time**: the host-supplied clock driving cook requests
//! - **Texture descriptors**: transport-safe descriptions of shared GPU
//!   resources (opaque OS handle + format + fence, never a pointer)
//! - **Capabilities**: what each side of the bridge can do, negotiated once
//!   at connect time
//!
//! ## Architecture Rules
//!
//! 1. **No transport here** - wire framing lives in `synapse_transport`
//! 2. **No device access here** - backend logic lives in `synapse_gpu`
//! 3. **Identity is the name** - a parameter is identified by its stable name
//!    for the lifetime of the loaded content

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod capability;
pub mod param;
pub mod texture;
pub mod time;

pub use capability::{CapabilitySet, GpuApi, SemaphoreKind};
pub use param::{
    ParamIntent, ParamKind, ParamLayout, ParamRange, ParamScope, ParamSpec, ParamValue, Severity,
    TextureToken,
};
pub use texture::{FenceRef, OsHandle, SharedTextureDescriptor, TextureDesc, TextureFormat};
pub use time::{FrameTime, TimeMode};
