//! # Backend Interface
//!
//! The capability seam between the bridge and one GPU API.
//!
//! ## Design
//!
//! One [`GpuBackend`] is selected at lifecycle init from the negotiated
//! capability intersection and lives until teardown or device loss. The
//! bridge is the only component allowed to cross the GPU interop boundary;
//! everything above it works with opaque handles and tokens.

use std::time::Duration;

use synapse_core::{
    CapabilitySet, GpuApi, OsHandle, SharedTextureDescriptor, TextureDesc, TextureToken,
};

use crate::backends::{D3D11Backend, D3D12Backend, VulkanBackend};
use crate::error::ResourceBridgeError;
use crate::fence::FenceWait;

/// Index of a texture slot inside a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandleId(pub u32);

impl HandleId {
    /// Invalid/null handle ID.
    pub const NULL: Self = Self(u32::MAX);

    /// Returns true if this is a null/invalid ID.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u32::MAX
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::NULL
    }
}

/// A host-side texture the host wants to share with the external engine.
///
/// The OS handle comes from the host's own GPU device; the bridge wraps it
/// with a fence and turns it into a transport-safe descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalTexture {
    /// API the texture was created with.
    pub api: GpuApi,
    /// Size, format and layout.
    pub desc: TextureDesc,
    /// Shareable OS handle produced by the host's device.
    pub os_handle: OsHandle,
}

/// A shared texture registered with a backend.
///
/// Valid until released, torn down, or invalidated by device loss. The
/// token is the identity that flows through parameter values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SharedTextureHandle {
    /// Slot inside the owning backend.
    pub id: HandleId,
    /// Identity used by [`synapse_core::ParamValue::Texture`].
    pub token: TextureToken,
    /// Size, format and layout.
    pub desc: TextureDesc,
    /// API of the owning backend.
    pub api: GpuApi,
}

/// One GPU API's implementation of the resource bridge.
pub trait GpuBackend: Send + Sync {
    /// The API this backend drives.
    fn api(&self) -> GpuApi;

    /// Capabilities to advertise during the handshake.
    fn capabilities(&self) -> CapabilitySet;

    /// Registers a texture produced by the external engine.
    ///
    /// The returned handle's fence starts unsignaled; the caller records the
    /// producer's signal when the protocol announces it.
    ///
    /// # Errors
    ///
    /// `DeviceLost`, `InvalidDescriptor`, `UnsupportedFormat`,
    /// `SlotsExhausted`.
    fn import_texture(
        &self,
        descriptor: &SharedTextureDescriptor,
    ) -> Result<SharedTextureHandle, ResourceBridgeError>;

    /// Registers a host texture for sharing and builds its wire descriptor.
    ///
    /// # Errors
    ///
    /// `DeviceLost`, `ApiMismatch`, `InvalidDescriptor`,
    /// `UnsupportedFormat`, `SlotsExhausted`.
    fn export_texture(
        &self,
        texture: &LocalTexture,
    ) -> Result<(SharedTextureHandle, SharedTextureDescriptor), ResourceBridgeError>;

    /// Releases a texture without waiting on its fence.
    ///
    /// # Errors
    ///
    /// `UnknownHandle` if the handle is stale or already released.
    fn release_texture(&self, handle: &SharedTextureHandle) -> Result<(), ResourceBridgeError>;

    /// Records a producer-side signal at `value`.
    ///
    /// # Errors
    ///
    /// `UnknownHandle`; `FenceRegression` on monotonic fences.
    fn signal_fence(
        &self,
        handle: &SharedTextureHandle,
        value: u64,
    ) -> Result<(), ResourceBridgeError>;

    /// Waits until `value` is reached or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// `UnknownHandle` if the handle is stale.
    fn wait_fence(
        &self,
        handle: &SharedTextureHandle,
        value: u64,
        timeout: Duration,
    ) -> Result<FenceWait, ResourceBridgeError>;

    /// Returns true if `handle` still names a live texture.
    fn is_live(&self, handle: &SharedTextureHandle) -> bool;

    /// Number of live textures.
    fn live_textures(&self) -> usize;

    /// Invalidates every handle; imports fail until [`Self::reset`].
    fn notify_device_lost(&self);

    /// Returns true if the device is currently lost.
    fn is_device_lost(&self) -> bool;

    /// Clears device-lost state after a reconnect rebuilt the device.
    fn reset(&self);
}

/// Selects the backend for a negotiated API.
#[must_use]
pub fn select_backend(api: GpuApi) -> Box<dyn GpuBackend> {
    match api {
        GpuApi::D3D11 => Box::new(D3D11Backend::new()),
        GpuApi::D3D12 => Box::new(D3D12Backend::new()),
        GpuApi::Vulkan => Box::new(VulkanBackend::new()),
    }
}

/// Picks the GPU API to use, preferring the host's order.
///
/// # Errors
///
/// [`ResourceBridgeError::NoCommonApi`] if the sets do not intersect.
pub fn negotiate_api(
    host: &CapabilitySet,
    engine: &CapabilitySet,
) -> Result<GpuApi, ResourceBridgeError> {
    host.common_apis(engine)
        .first()
        .copied()
        .ok_or(ResourceBridgeError::NoCommonApi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_backend_matches_api() {
        for api in [GpuApi::D3D11, GpuApi::D3D12, GpuApi::Vulkan] {
            assert_eq!(select_backend(api).api(), api);
        }
    }

    #[test]
    fn test_negotiate_prefers_host_order() {
        let host = CapabilitySet {
            gpu_apis: vec![GpuApi::Vulkan, GpuApi::D3D12],
            formats: Vec::new(),
        };
        let engine = CapabilitySet {
            gpu_apis: vec![GpuApi::D3D12, GpuApi::Vulkan],
            formats: Vec::new(),
        };
        assert_eq!(negotiate_api(&host, &engine).unwrap(), GpuApi::Vulkan);
    }

    #[test]
    fn test_negotiate_fails_without_intersection() {
        let host = CapabilitySet {
            gpu_apis: vec![GpuApi::D3D11],
            formats: Vec::new(),
        };
        let engine = CapabilitySet {
            gpu_apis: vec![GpuApi::Vulkan],
            formats: Vec::new(),
        };
        assert_eq!(
            negotiate_api(&host, &engine).unwrap_err(),
            ResourceBridgeError::NoCommonApi
        );
    }
}
