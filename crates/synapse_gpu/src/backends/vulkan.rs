//! Vulkan backend: timeline semaphores over external memory.
//!
//! Shared images travel as external-memory handles; synchronization uses
//! timeline semaphores, which behave like D3D12 fences (monotonic values,
//! waits complete at `signaled >= value`).

use std::time::Duration;

use synapse_core::{CapabilitySet, GpuApi, SharedTextureDescriptor};

use super::BackendCore;
use crate::backend::{GpuBackend, LocalTexture, SharedTextureHandle};
use crate::error::ResourceBridgeError;
use crate::fence::{FenceMode, FenceWait};

/// Resource bridge over Vulkan external memory and timeline semaphores.
pub struct VulkanBackend {
    core: BackendCore,
}

impl VulkanBackend {
    /// Creates the backend with an empty slot table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: BackendCore::new(GpuApi::Vulkan, FenceMode::AtLeast),
        }
    }
}

impl Default for VulkanBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for VulkanBackend {
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

#[cfg(test)]
mod tests {
    use super::*;
    use synapse_core::{OsHandle, TextureDesc, TextureFormat};

    #[test]
    fn test_timeline_advances_across_frames() {
        let backend = VulkanBackend::new();
        let local = LocalTexture {
            api: GpuApi::Vulkan,
            desc: TextureDesc::packed(640, 360, TextureFormat::Rgba8),
            os_handle: OsHandle(0x99),
        };
        let (handle, descriptor) = backend.export_texture(&local).unwrap();

        // Frame 1: host writes, signals the advertised ready value.
        backend
            .signal_fence(&handle, descriptor.fence.ready_value)
            .unwrap();
        // Frames 2..5: the timeline only ever moves forward.
        for frame in 2..5u64 {
            backend.signal_fence(&handle, frame).unwrap();
            assert_eq!(
                backend.wait_fence(&handle, frame, Duration::ZERO).unwrap(),
                FenceWait::Signaled
            );
        }
    }
}
