//! # Backend Variants
//!
//! One module per GPU API. The bookkeeping (slot table, token allocation,
//! descriptor validation) is identical across APIs and lives in
//! [`BackendCore`]; what differs is the synchronization primitive each API
//! shares across the process boundary.
//!
//! | Backend  | Primitive                | Wait semantics        |
//! |----------|--------------------------|-----------------------|
//! | D3D12    | shared fence             | `signaled >= value`   |
//! | Vulkan   | timeline semaphore       | `signaled >= value`   |
//! | D3D11    | keyed mutex              | `key == value`        |

mod d3d11;
mod d3d12;
mod vulkan;

pub use d3d11::D3D11Backend;
pub use d3d12::D3D12Backend;
pub use vulkan::VulkanBackend;

use std::time::Duration;

use synapse_core::{
    CapabilitySet, FenceRef, GpuApi, OsHandle, SharedTextureDescriptor, TextureFormat,
};

use crate::backend::{LocalTexture, SharedTextureHandle};
use crate::error::ResourceBridgeError;
use crate::fence::{FenceMode, FenceWait};
use crate::table::TextureTable;
use crate::MAX_SHARED_TEXTURES;

/// Fence value an exported texture's first consumer waits for.
///
/// The host signals it after its first write; later frames signal higher
/// values (or hand the key back, on keyed-mutex backends).
pub(crate) const EXPORT_READY_VALUE: u64 = 1;

/// Namespace tag for bridge-allocated fence handles.
///
/// Fence handles only need to be stable names both processes agree on; the
/// bridge derives them from the texture token under this tag.
const FENCE_NAME_TAG: u64 = 0xFE00_0000_0000_0000;

/// Shared bookkeeping behind every backend variant.
pub(crate) struct BackendCore {
    api: GpuApi,
    mode: FenceMode,
    formats: Vec<TextureFormat>,
    table: TextureTable,
}

impl BackendCore {
    /// Creates a core for one API with the given fence semantics.
    pub fn new(api: GpuApi, mode: FenceMode) -> Self {
        Self {
            api,
            mode,
            formats: TextureFormat::ALL.to_vec(),
            table: TextureTable::new(MAX_SHARED_TEXTURES),
        }
    }

    pub fn api(&self) -> GpuApi {
        self.api
    }

    pub fn capabilities(&self) -> CapabilitySet {
        CapabilitySet {
            gpu_apis: vec![self.api],
            formats: self.formats.clone(),
        }
    }

    pub fn import_texture(
        &self,
        descriptor: &SharedTextureDescriptor,
    ) -> Result<SharedTextureHandle, ResourceBridgeError> {
        if self.table.is_device_lost() {
            return Err(ResourceBridgeError::DeviceLost);
        }
        if !descriptor.is_valid() {
            return Err(ResourceBridgeError::InvalidDescriptor);
        }
        if !self.formats.contains(&descriptor.desc.format) {
            return Err(ResourceBridgeError::UnsupportedFormat(
                descriptor.desc.format,
            ));
        }

        let (id, token, _) = self.table.insert(self.mode)?;

        Ok(SharedTextureHandle {
            id,
            token,
            desc: descriptor.desc,
            api: self.api,
        })
    }

    pub fn export_texture(
        &self,
        texture: &LocalTexture,
    ) -> Result<(SharedTextureHandle, SharedTextureDescriptor), ResourceBridgeError> {
        if self.table.is_device_lost() {
            return Err(ResourceBridgeError::DeviceLost);
        }
        if texture.api != self.api {
            return Err(ResourceBridgeError::ApiMismatch {
                backend: self.api,
                texture: texture.api,
            });
        }
        if texture.os_handle.is_null() || !texture.desc.is_valid() {
            return Err(ResourceBridgeError::InvalidDescriptor);
        }
        if !self.formats.contains(&texture.desc.format) {
            return Err(ResourceBridgeError::UnsupportedFormat(texture.desc.format));
        }

        let (id, token, _) = self.table.insert(self.mode)?;

        let handle = SharedTextureHandle {
            id,
            token,
            desc: texture.desc,
            api: self.api,
        };
        let descriptor = SharedTextureDescriptor {
            os_handle: texture.os_handle,
            desc: texture.desc,
            fence: FenceRef {
                handle: OsHandle(FENCE_NAME_TAG | token.0),
                ready_value: EXPORT_READY_VALUE,
            },
        };
        Ok((handle, descriptor))
    }

    pub fn release_texture(
        &self,
        handle: &SharedTextureHandle,
    ) -> Result<(), ResourceBridgeError> {
        self.table.remove(handle.id, handle.token)
    }

    pub fn signal_fence(
        &self,
        handle: &SharedTextureHandle,
        value: u64,
    ) -> Result<(), ResourceBridgeError> {
        self.table.fence(handle.id, handle.token)?.signal(value)
    }

    pub fn wait_fence(
        &self,
        handle: &SharedTextureHandle,
        value: u64,
        timeout: Duration,
    ) -> Result<FenceWait, ResourceBridgeError> {
        let fence = self.table.fence(handle.id, handle.token)?;
        Ok(fence.wait_for(value, timeout))
    }

    pub fn is_live(&self, handle: &SharedTextureHandle) -> bool {
        self.table.contains(handle.id, handle.token)
    }

    pub fn live_textures(&self) -> usize {
        self.table.live()
    }

    pub fn notify_device_lost(&self) {
        let invalidated = self.table.mark_device_lost();
        tracing::warn!(
            "{:?} device lost, invalidated {} shared textures",
            self.api,
            invalidated
        );
    }

    pub fn is_device_lost(&self) -> bool {
        self.table.is_device_lost()
    }

    pub fn reset(&self) {
        self.table.reset();
        tracing::info!("{:?} resource bridge reset", self.api);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synapse_core::TextureDesc;

    fn descriptor() -> SharedTextureDescriptor {
        SharedTextureDescriptor {
            os_handle: OsHandle(0xAB),
            desc: TextureDesc::packed(128, 128, TextureFormat::Bgra8),
            fence: FenceRef {
                handle: OsHandle(0xCD),
                ready_value: 3,
            },
        }
    }

    #[test]
    fn test_import_then_signal_then_wait() {
        let core = BackendCore::new(GpuApi::D3D12, FenceMode::AtLeast);
        let handle = core.import_texture(&descriptor()).unwrap();

        // Not signaled yet: wait must not report ready.
        assert_eq!(
            core.wait_fence(&handle, 3, Duration::ZERO).unwrap(),
            FenceWait::TimedOut
        );

        core.signal_fence(&handle, 3).unwrap();
        assert_eq!(
            core.wait_fence(&handle, 3, Duration::ZERO).unwrap(),
            FenceWait::Signaled
        );
    }

    #[test]
    fn test_export_builds_transport_safe_descriptor() {
        let core = BackendCore::new(GpuApi::Vulkan, FenceMode::AtLeast);
        let local = LocalTexture {
            api: GpuApi::Vulkan,
            desc: TextureDesc::packed(256, 256, TextureFormat::Rgba16F),
            os_handle: OsHandle(0x44),
        };
        let (handle, wire) = core.export_texture(&local).unwrap();

        assert!(wire.is_valid());
        assert_eq!(wire.os_handle, local.os_handle);
        assert_eq!(wire.fence.ready_value, EXPORT_READY_VALUE);
        assert!(!wire.fence.handle.is_null());
        assert!(core.is_live(&handle));
    }

    #[test]
    fn test_export_rejects_foreign_api() {
        let core = BackendCore::new(GpuApi::D3D12, FenceMode::AtLeast);
        let local = LocalTexture {
            api: GpuApi::Vulkan,
            desc: TextureDesc::packed(16, 16, TextureFormat::Rgba8),
            os_handle: OsHandle(1),
        };
        assert_eq!(
            core.export_texture(&local).unwrap_err(),
            ResourceBridgeError::ApiMismatch {
                backend: GpuApi::D3D12,
                texture: GpuApi::Vulkan,
            }
        );
    }

    #[test]
    fn test_import_rejects_invalid_descriptor() {
        let core = BackendCore::new(GpuApi::D3D12, FenceMode::AtLeast);
        let mut bad = descriptor();
        bad.os_handle = OsHandle::NULL;
        assert_eq!(
            core.import_texture(&bad).unwrap_err(),
            ResourceBridgeError::InvalidDescriptor
        );
    }

    #[test]
    fn test_device_lost_blocks_imports_until_reset() {
        let core = BackendCore::new(GpuApi::D3D12, FenceMode::AtLeast);
        let handle = core.import_texture(&descriptor()).unwrap();

        core.notify_device_lost();
        assert!(core.is_device_lost());
        assert!(!core.is_live(&handle));
        assert_eq!(
            core.import_texture(&descriptor()).unwrap_err(),
            ResourceBridgeError::DeviceLost
        );
        assert_eq!(
            core.signal_fence(&handle, 1).unwrap_err(),
            ResourceBridgeError::UnknownHandle
        );

        core.reset();
        assert!(!core.is_device_lost());
        let fresh = core.import_texture(&descriptor()).unwrap();
        assert_ne!(fresh.token, handle.token);
    }

    #[test]
    fn test_release_without_waiting() {
        let core = BackendCore::new(GpuApi::D3D12, FenceMode::AtLeast);
        let handle = core.import_texture(&descriptor()).unwrap();
        // Fence never signaled; release must still return immediately.
        core.release_texture(&handle).unwrap();
        assert_eq!(core.live_textures(), 0);
        assert_eq!(
            core.release_texture(&handle).unwrap_err(),
            ResourceBridgeError::UnknownHandle
        );
    }
}
