//! # Capability Negotiation
//!
//! What each side of the bridge can do, exchanged once during the handshake.
//!
//! ## Design
//!
//! The host advertises what it supports; the external engine answers with its
//! own set. The Lifecycle Manager operates on the intersection and selects
//! one GPU backend for the lifetime of the connection.

use serde::{Deserialize, Serialize};

use crate::texture::TextureFormat;

/// GPU API used for shared resources on one side of the bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GpuApi {
    /// Direct3D 11, keyed-mutex synchronized.
    #[serde(rename = "d3d11")]
    D3D11 = 0,
    /// Direct3D 12, fence synchronized.
    #[serde(rename = "d3d12")]
    D3D12 = 1,
    /// Vulkan, timeline-semaphore synchronized.
    #[serde(rename = "vulkan")]
    Vulkan = 2,
}

impl GpuApi {
    /// Decodes an API from its wire discriminant.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::D3D11),
            1 => Some(Self::D3D12),
            2 => Some(Self::Vulkan),
            _ => None,
        }
    }

    /// Synchronization primitive native to this API.
    #[must_use]
    pub const fn semaphore_kind(self) -> SemaphoreKind {
        match self {
            Self::D3D11 => SemaphoreKind::KeyedMutex,
            Self::D3D12 => SemaphoreKind::D3DFence,
            Self::Vulkan => SemaphoreKind::VulkanSemaphore,
        }
    }
}

/// Kind of cross-process synchronization primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SemaphoreKind {
    /// Direct3D shared fence with monotonically increasing values.
    D3DFence = 0,
    /// Vulkan timeline semaphore.
    VulkanSemaphore = 1,
    /// Legacy Direct3D 11 keyed mutex, modeled as alternating key values.
    KeyedMutex = 2,
}

impl SemaphoreKind {
    /// Decodes a kind from its wire discriminant.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::D3DFence),
            1 => Some(Self::VulkanSemaphore),
            2 => Some(Self::KeyedMutex),
            _ => None,
        }
    }
}

/// Capabilities advertised by one side of the bridge.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CapabilitySet {
    /// GPU APIs this side can share resources through.
    pub gpu_apis: Vec<GpuApi>,
    /// Texture formats this side can produce and consume.
    pub formats: Vec<TextureFormat>,
}

impl CapabilitySet {
    /// Creates an empty capability set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            gpu_apis: Vec::new(),
            formats: Vec::new(),
        }
    }

    /// Returns true if the given API is supported.
    #[must_use]
    pub fn supports_api(&self, api: GpuApi) -> bool {
        self.gpu_apis.contains(&api)
    }

    /// Returns true if the given format is supported.
    #[must_use]
    pub fn supports_format(&self, format: TextureFormat) -> bool {
        self.formats.contains(&format)
    }

    /// APIs supported by both this set and `other`, in this set's preference
    /// order.
    #[must_use]
    pub fn common_apis(&self, other: &Self) -> Vec<GpuApi> {
        self.gpu_apis
            .iter()
            .copied()
            .filter(|api| other.supports_api(*api))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_round_trip() {
        for api in [GpuApi::D3D11, GpuApi::D3D12, GpuApi::Vulkan] {
            assert_eq!(GpuApi::from_u8(api as u8), Some(api));
        }
        assert_eq!(GpuApi::from_u8(3), None);
    }

    #[test]
    fn test_semaphore_kind_per_api() {
        assert_eq!(GpuApi::D3D11.semaphore_kind(), SemaphoreKind::KeyedMutex);
        assert_eq!(GpuApi::D3D12.semaphore_kind(), SemaphoreKind::D3DFence);
        assert_eq!(
            GpuApi::Vulkan.semaphore_kind(),
            SemaphoreKind::VulkanSemaphore
        );
    }

    #[test]
    fn test_common_apis_preserves_preference_order() {
        let host = CapabilitySet {
            gpu_apis: vec![GpuApi::D3D12, GpuApi::Vulkan, GpuApi::D3D11],
            formats: Vec::new(),
        };
        let engine = CapabilitySet {
            gpu_apis: vec![GpuApi::D3D11, GpuApi::D3D12],
            formats: Vec::new(),
        };
        assert_eq!(host.common_apis(&engine), vec![GpuApi::D3D12, GpuApi::D3D11]);
    }
}
