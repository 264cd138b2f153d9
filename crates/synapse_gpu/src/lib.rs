//! # SYNAPSE GPU - The Resource Bridge
//!
//! Cross-API shared-texture bookkeeping between the host engine and the
//! external compositing engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     RESOURCE BRIDGE                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │   SharedTextureDescriptor            SharedTextureHandle     │
//! │   (wire side: handle+format+fence)   (host side: slot+token) │
//! │            │                                  ▲              │
//! │            ▼                                  │              │
//! │  ┌─────────────────────────────────────────────────────┐     │
//! │  │ GpuBackend (one of D3D11 / D3D12 / Vulkan)          │     │
//! │  │  - import_texture / export_texture                  │     │
//! │  │  - signal_fence / wait_fence (exact values)         │     │
//! │  │  - device-lost invalidation                         │     │
//! │  └─────────────────────────────────────────────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//!
//! 1. No raw pointer ever crosses the process boundary; a texture is an
//!    opaque OS handle plus a fence value pair
//! 2. Consumers wait on the exact fence value a producer announced, never on
//!    "latest", so a late producer cannot tear a frame
//! 3. Device loss invalidates every outstanding handle; nothing is reused
//!    across a reconnect

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod backend;
pub mod backends;
pub mod error;
pub mod fence;

mod table;

pub use backend::{negotiate_api, select_backend, GpuBackend, HandleId, LocalTexture, SharedTextureHandle};
pub use backends::{D3D11Backend, D3D12Backend, VulkanBackend};
pub use error::ResourceBridgeError;
pub use fence::{FenceMode, FenceTracker, FenceWait};

/// Maximum number of simultaneously live shared textures per backend.
pub const MAX_SHARED_TEXTURES: usize = 256;
