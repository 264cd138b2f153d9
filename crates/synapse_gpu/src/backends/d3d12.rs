//! Direct3D 12 backend: shared fences with monotonically increasing values.

use std::time::Duration;

use synapse_core::{CapabilitySet, GpuApi, SharedTextureDescriptor};

use super::BackendCore;
use crate::backend::{GpuBackend, LocalTexture, SharedTextureHandle};
use crate::error::ResourceBridgeError;
use crate::fence::{FenceMode, FenceWait};

/// Resource bridge over D3D12 shared heaps and `ID3D12Fence`-style values.
pub struct D3D12Backend {
    core: BackendCore,
}

impl D3D12Backend {
    /// Creates the backend with an empty slot table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: BackendCore::new(GpuApi::D3D12, FenceMode::AtLeast),
        }
    }
}

impl Default for D3D12Backend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for D3D12Backend {
    fn api(&self) -> GpuApi {
        self.core.api()
    }

    fn capabilities(&self) -> CapabilitySet {
        self.core.capabilities()
    }

    fn import_texture(
        &self,
        descriptor: &SharedTextureDescriptor,
    ) -> Result<SharedTextureHandle, ResourceBridgeError> {
        self.core.import_texture(descriptor)
    }

    fn export_texture(
        &self,
        texture: &LocalTexture,
    ) -> Result<(SharedTextureHandle, SharedTextureDescriptor), ResourceBridgeError> {
        self.core.export_texture(texture)
    }

    fn release_texture(&self, handle: &SharedTextureHandle) -> Result<(), ResourceBridgeError> {
        self.core.release_texture(handle)
    }

    fn signal_fence(
        &self,
        handle: &SharedTextureHandle,
        value: u64,
    ) -> Result<(), ResourceBridgeError> {
        self.core.signal_fence(handle, value)
    }

    fn wait_fence(
        &self,
        handle: &SharedTextureHandle,
        value: u64,
        timeout: Duration,
    ) -> Result<FenceWait, ResourceBridgeError> {
        self.core.wait_fence(handle, value, timeout)
    }

    fn is_live(&self, handle: &SharedTextureHandle) -> bool {
        self.core.is_live(handle)
    }

    fn live_textures(&self) -> usize {
        self.core.live_textures()
    }

    fn notify_device_lost(&self) {
        self.core.notify_device_lost();
    }

    fn is_device_lost(&self) -> bool {
        self.core.is_device_lost()
    }

    fn reset(&self) {
        self.core.reset();
    }
}
