//! Direct3D 11 backend: keyed-mutex synchronization.
//!
//! D3D11 has no shareable fence; shared surfaces carry a keyed mutex whose
//! key is handed back and forth between the two processes. The bridge models
//! the mutex as a fence in [`FenceMode::Exact`]: a wait completes only while
//! the current key equals the awaited one, and "signaling" hands the key
//! over rather than counting upwards.

use std::time::Duration;

use synapse_core::{CapabilitySet, GpuApi, SharedTextureDescriptor};

use super::BackendCore;
use crate::backend::{GpuBackend, LocalTexture, SharedTextureHandle};
use crate::error::ResourceBridgeError;
use crate::fence::{FenceMode, FenceWait};

/// Key the producing side holds while writing.
#[allow(dead_code)]
pub const KEY_PRODUCER: u64 = 0;

/// Key the consuming side waits for before sampling.
#[allow(dead_code)]
pub const KEY_CONSUMER: u64 = 1;

/// Resource bridge over D3D11 shared surfaces and keyed mutexes.
pub struct D3D11Backend {
    core: BackendCore,
}

impl D3D11Backend {
    /// Creates the backend with an empty slot table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: BackendCore::new(GpuApi::D3D11, FenceMode::Exact),
        }
    }
}

impl Default for D3D11Backend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for D3D11Backend {
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
    use synapse_core::{FenceRef, OsHandle, TextureDesc, TextureFormat};

    fn descriptor() -> SharedTextureDescriptor {
        SharedTextureDescriptor {
            os_handle: OsHandle(11),
            desc: TextureDesc::packed(64, 64, TextureFormat::Bgra8),
            fence: FenceRef {
                handle: OsHandle(12),
                ready_value: KEY_CONSUMER,
            },
        }
    }

    #[test]
    fn test_key_ping_pong() {
        let backend = D3D11Backend::new();
        let handle = backend.import_texture(&descriptor()).unwrap();

        // Producer hands the key to the consumer.
        backend.signal_fence(&handle, KEY_CONSUMER).unwrap();
        assert_eq!(
            backend
                .wait_fence(&handle, KEY_CONSUMER, Duration::ZERO)
                .unwrap(),
            FenceWait::Signaled
        );

        // Consumer hands it back; the consumer key no longer matches.
        backend.signal_fence(&handle, KEY_PRODUCER).unwrap();
        assert_eq!(
            backend
                .wait_fence(&handle, KEY_CONSUMER, Duration::ZERO)
                .unwrap(),
            FenceWait::TimedOut
        );
        assert_eq!(
            backend
                .wait_fence(&handle, KEY_PRODUCER, Duration::ZERO)
                .unwrap(),
            FenceWait::Signaled
        );
    }
}
