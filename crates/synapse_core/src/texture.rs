//! # Transport-Safe Texture Descriptors
//!
//! The only representation of a shared GPU resource that is allowed to cross
//! the process boundary.
//!
//! ## Design
//!
//! - An opaque OS handle plus format, size and row pitch, never a pointer
//! - Every descriptor carries its synchronization fence and the exact value
//!   the consumer must wait for
//! - Ownership transfer is a protocol event (signal then wait), not an
//!   automatic lifetime

/// Opaque OS shared-resource handle.
///
/// The numeric value is only meaningful to the producing process's driver;
/// the bridge stores and forwards it, and never dereferences it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct OsHandle(pub u64);

impl OsHandle {
    /// Handle value that never names a live resource.
    pub const NULL: Self = Self(0);

    /// Returns true if this is the null handle.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Pixel format of a shared texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TextureFormat {
    /// 8-bit RGBA, unsigned normalized.
    Rgba8 = 0,
    /// 8-bit BGRA, unsigned normalized.
    Bgra8 = 1,
    /// 8-bit sRGB RGBA.
    Srgba8 = 2,
    /// 16-bit float RGBA.
    Rgba16F = 3,
    /// 32-bit float RGBA.
    Rgba32F = 4,
    /// 8-bit single channel.
    R8 = 5,
    /// 16-bit float single channel.
    R16F = 6,
    /// 32-bit float single channel.
    R32F = 7,
    /// 8-bit two channel.
    Rg8 = 8,
    /// 16-bit float two channel.
    Rg16F = 9,
}

impl TextureFormat {
    /// Every format the bridge knows, in wire-tag order.
    pub const ALL: [Self; 10] = [
        Self::Rgba8,
        Self::Bgra8,
        Self::Srgba8,
        Self::Rgba16F,
        Self::Rgba32F,
        Self::R8,
        Self::R16F,
        Self::R32F,
        Self::Rg8,
        Self::Rg16F,
    ];

    /// Decodes a format from its wire discriminant.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Rgba8),
            1 => Some(Self::Bgra8),
            2 => Some(Self::Srgba8),
            3 => Some(Self::Rgba16F),
            4 => Some(Self::Rgba32F),
            5 => Some(Self::R8),
            6 => Some(Self::R16F),
            7 => Some(Self::R32F),
            8 => Some(Self::Rg8),
            9 => Some(Self::Rg16F),
            _ => None,
        }
    }

    /// Bytes per pixel for this format.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::R8 => 1,
            Self::Rg8 | Self::R16F => 2,
            Self::Rgba8 | Self::Bgra8 | Self::Srgba8 | Self::R32F | Self::Rg16F => 4,
            Self::Rgba16F => 8,
            Self::Rgba32F => 16,
        }
    }
}

/// Size, format and memory layout of a texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDesc {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: TextureFormat,
    /// Bytes per row, including any driver padding.
    pub row_pitch: u32,
}

impl TextureDesc {
    /// Creates a descriptor with the tightly packed row pitch.
    #[must_use]
    pub const fn packed(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            row_pitch: width * format.bytes_per_pixel(),
        }
    }

    /// Returns true if the dimensions and pitch are consistent.
    ///
    /// A pitch smaller than a packed row cannot address every pixel.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.row_pitch >= self.width * self.format.bytes_per_pixel()
    }
}

/// Reference to a synchronization fence shared alongside a texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FenceRef {
    /// Opaque OS handle of the fence object.
    pub handle: OsHandle,
    /// Value the producer will signal when the texture contents are ready.
    ///
    /// The consumer must wait for exactly this value, never for "latest".
    pub ready_value: u64,
}

/// A shared texture as it crosses the process boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SharedTextureDescriptor {
    /// OS handle of the shared resource.
    pub os_handle: OsHandle,
    /// Size, format and layout.
    pub desc: TextureDesc,
    /// Fence guarding reads of the resource.
    pub fence: FenceRef,
}

impl SharedTextureDescriptor {
    /// Returns true if the handle is present and the descriptor consistent.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !self.os_handle.is_null() && self.desc.is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_round_trip() {
        for raw in 0..=9u8 {
            let format = TextureFormat::from_u8(raw).unwrap();
            assert_eq!(format as u8, raw);
        }
        assert_eq!(TextureFormat::from_u8(10), None);
    }

    #[test]
    fn test_packed_pitch() {
        let desc = TextureDesc::packed(1920, 1080, TextureFormat::Bgra8);
        assert_eq!(desc.row_pitch, 1920 * 4);
        assert!(desc.is_valid());
    }

    #[test]
    fn test_underpitched_desc_is_invalid() {
        let mut desc = TextureDesc::packed(64, 64, TextureFormat::Rgba32F);
        desc.row_pitch = 64;
        assert!(!desc.is_valid());
    }

    #[test]
    fn test_descriptor_validity_requires_handle() {
        let desc = SharedTextureDescriptor {
            os_handle: OsHandle::NULL,
            desc: TextureDesc::packed(4, 4, TextureFormat::Rgba8),
            fence: FenceRef::default(),
        };
        assert!(!desc.is_valid());
    }
}
