//! Frame encoding and decoding.
//!
//! Little-endian, hand-rolled, length-guarded on both sides. The writer
//! refuses to grow past [`crate::MAX_FRAME_SIZE`]; the reader never reads
//! past the payload slice it was given.

use synapse_core::{
    CapabilitySet, FenceRef, FrameTime, GpuApi, OsHandle, ParamIntent, ParamKind, ParamLayout,
    ParamRange, ParamScope, ParamSpec, ParamValue, Severity, SharedTextureDescriptor, TextureDesc,
    TextureFormat, TextureToken,
};

use super::{FrameHeader, Message, MessageType};
use crate::error::ChannelError;
use crate::{MAX_FRAME_SIZE, PROTOCOL_VERSION};

/// Hard cap on the encoded frame, header included.
const MAX_ENCODED_SIZE: usize = MAX_FRAME_SIZE + FrameHeader::SIZE;

/// Frame writer - encodes one message at a time into a reusable buffer.
///
/// Designed to be reused across frames to avoid re-allocating the buffer.
pub struct FrameWriter {
    buf: Vec<u8>,
}

impl FrameWriter {
    /// Creates a new writer with a modest pre-allocated buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(1024),
        }
    }

    /// Encodes a complete frame (header plus payload) for `message`.
    ///
    /// The returned slice is valid until the next call.
    ///
    /// # Errors
    ///
    /// [`ChannelError::FrameTooLarge`] if the payload would exceed
    /// [`crate::MAX_FRAME_SIZE`].
    pub fn encode(&mut self, message: &Message) -> Result<&[u8], ChannelError> {
        self.buf.clear();
        self.buf.extend_from_slice(&[0u8; FrameHeader::SIZE]);

        let ok = match message {
            Message::Hello { capabilities } | Message::HelloAck { capabilities } => {
                self.write_caps(capabilities)
            }
            Message::LoadContent { descriptor } => self.write_str(descriptor),
            Message::ContentLoaded { layout } | Message::LayoutChanged { layout } => {
                self.write_layout(layout)
            }
            Message::ParamSet { updates } => self.write_named_values(updates),
            Message::CookRequest {
                sequence,
                time,
                discontinuity,
                inputs,
                textures,
            } => {
                self.write_u64(*sequence)
                    && self.write_time(*time)
                    && self.write_bool(*discontinuity)
                    && self.write_named_values(inputs)
                    && self.write_named_textures(textures)
            }
            Message::CookResponse {
                sequence,
                outputs,
                textures,
            } => {
                self.write_u64(*sequence)
                    && self.write_named_values(outputs)
                    && self.write_named_textures(textures)
            }
            Message::CancelFrame { sequence } => self.write_u64(*sequence),
            Message::EngineMessage { severity, text } => {
                self.write_u8(*severity as u8) && self.write_str(text)
            }
            Message::Teardown => true,
            Message::ProtocolError { code, detail } => {
                self.write_u32(*code) && self.write_str(detail)
            }
        };

        if !ok {
            return Err(ChannelError::FrameTooLarge {
                size: self.buf.len(),
            });
        }

        let payload_len = (self.buf.len() - FrameHeader::SIZE) as u32;
        let header = FrameHeader::new(payload_len, PROTOCOL_VERSION, message.message_type() as u8);
        self.buf[..FrameHeader::SIZE].copy_from_slice(bytemuck::bytes_of(&header));

        Ok(&self.buf)
    }

    /// Returns true if `additional` more bytes fit under the frame cap.
    #[inline]
    fn fits(&self, additional: usize) -> bool {
        self.buf.len() + additional <= MAX_ENCODED_SIZE
    }

    /// Writes a single byte.
    #[inline]
    fn write_u8(&mut self, value: u8) -> bool {
        if !self.fits(1) {
            return false;
        }
        self.buf.push(value);
        true
    }

    /// Writes a bool as one byte.
    #[inline]
    fn write_bool(&mut self, value: bool) -> bool {
        self.write_u8(u8::from(value))
    }

    /// Writes a u16 in little-endian format.
    #[inline]
    fn write_u16(&mut self, value: u16) -> bool {
        if !self.fits(2) {
            return false;
        }
        self.buf.extend_from_slice(&value.to_le_bytes());
        true
    }

    /// Writes a u32 in little-endian format.
    #[inline]
    fn write_u32(&mut self, value: u32) -> bool {
        if !self.fits(4) {
            return false;
        }
        self.buf.extend_from_slice(&value.to_le_bytes());
        true
    }

    /// Writes a u64 in little-endian format.
    #[inline]
    fn write_u64(&mut self, value: u64) -> bool {
        if !self.fits(8) {
            return false;
        }
        self.buf.extend_from_slice(&value.to_le_bytes());
        true
    }

    /// Writes an i64 in little-endian format.
    #[inline]
    fn write_i64(&mut self, value: i64) -> bool {
        if !self.fits(8) {
            return false;
        }
        self.buf.extend_from_slice(&value.to_le_bytes());
        true
    }

    /// Writes an f32 in little-endian format.
    #[inline]
    fn write_f32(&mut self, value: f32) -> bool {
        if !self.fits(4) {
            return false;
        }
        self.buf.extend_from_slice(&value.to_le_bytes());
        true
    }

    /// Writes an f64 in little-endian format.
    #[inline]
    fn write_f64(&mut self, value: f64) -> bool {
        if !self.fits(8) {
            return false;
        }
        self.buf.extend_from_slice(&value.to_le_bytes());
        true
    }

    /// Writes a length-prefixed UTF-8 string.
    fn write_str(&mut self, value: &str) -> bool {
        let bytes = value.as_bytes();
        if bytes.len() > u32::MAX as usize || !self.fits(4 + bytes.len()) {
            return false;
        }
        self.buf
            .extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(bytes);
        true
    }

    /// Writes a frame time.
    fn write_time(&mut self, time: FrameTime) -> bool {
        self.write_i64(time.value) && self.write_u32(time.scale)
    }

    /// Writes a parameter value with its kind tag.
    fn write_value(&mut self, value: &ParamValue) -> bool {
        if !self.write_u8(value.kind() as u8) {
            return false;
        }
        match value {
            ParamValue::Bool(v) => self.write_bool(*v),
            ParamValue::Int(v) => self.write_i64(*v),
            ParamValue::Double(v) => self.write_f64(*v),
            ParamValue::Text(v) => self.write_str(v),
            ParamValue::FloatStream(channels) => {
                if channels.len() > u16::MAX as usize || !self.write_u16(channels.len() as u16) {
                    return false;
                }
                for channel in channels {
                    if channel.len() > u32::MAX as usize
                        || !self.write_u32(channel.len() as u32)
                    {
                        return false;
                    }
                    for sample in channel {
                        if !self.write_f32(*sample) {
                            return false;
                        }
                    }
                }
                true
            }
            ParamValue::Table(rows) => {
                if rows.len() > u32::MAX as usize || !self.write_u32(rows.len() as u32) {
                    return false;
                }
                for row in rows {
                    if row.len() > u32::MAX as usize || !self.write_u32(row.len() as u32) {
                        return false;
                    }
                    for cell in row {
                        if !self.write_str(cell) {
                            return false;
                        }
                    }
                }
                true
            }
            ParamValue::Texture(token) => self.write_u64(token.0),
        }
    }

    /// Writes a name/value list with a count prefix.
    fn write_named_values(&mut self, values: &[(String, ParamValue)]) -> bool {
        if values.len() > u32::MAX as usize || !self.write_u32(values.len() as u32) {
            return false;
        }
        for (name, value) in values {
            if !self.write_str(name) || !self.write_value(value) {
                return false;
            }
        }
        true
    }

    /// Writes a shared texture descriptor.
    fn write_descriptor(&mut self, descriptor: &SharedTextureDescriptor) -> bool {
        self.write_u64(descriptor.os_handle.0)
            && self.write_u32(descriptor.desc.width)
            && self.write_u32(descriptor.desc.height)
            && self.write_u8(descriptor.desc.format as u8)
            && self.write_u32(descriptor.desc.row_pitch)
            && self.write_u64(descriptor.fence.handle.0)
            && self.write_u64(descriptor.fence.ready_value)
    }

    /// Writes a name/descriptor list with a count prefix.
    fn write_named_textures(&mut self, textures: &[(String, SharedTextureDescriptor)]) -> bool {
        if textures.len() > u32::MAX as usize || !self.write_u32(textures.len() as u32) {
            return false;
        }
        for (name, descriptor) in textures {
            if !self.write_str(name) || !self.write_descriptor(descriptor) {
                return false;
            }
        }
        true
    }

    /// Writes a parameter spec.
    fn write_spec(&mut self, spec: &ParamSpec) -> bool {
        let mut ok = self.write_str(&spec.name)
            && self.write_str(&spec.label)
            && self.write_u8(spec.kind as u8)
            && self.write_u8(spec.scope as u8)
            && self.write_u8(spec.intent as u8);
        match spec.range {
            Some(range) => {
                ok = ok
                    && self.write_u8(1)
                    && self.write_f64(range.min)
                    && self.write_f64(range.max)
                    && self.write_f64(range.default);
            }
            None => {
                ok = ok && self.write_u8(0);
            }
        }
        ok
    }

    /// Writes a parameter layout.
    fn write_layout(&mut self, layout: &ParamLayout) -> bool {
        if layout.params.len() > u32::MAX as usize
            || !self.write_u32(layout.params.len() as u32)
        {
            return false;
        }
        layout.params.iter().all(|spec| self.write_spec(spec))
    }

    /// Writes a capability set.
    fn write_caps(&mut self, caps: &CapabilitySet) -> bool {
        if caps.gpu_apis.len() > u8::MAX as usize || caps.formats.len() > u8::MAX as usize {
            return false;
        }
        let mut ok = self.write_u8(caps.gpu_apis.len() as u8);
        for api in &caps.gpu_apis {
            ok = ok && self.write_u8(*api as u8);
        }
        ok = ok && self.write_u8(caps.formats.len() as u8);
        for format in &caps.formats {
            ok = ok && self.write_u8(*format as u8);
        }
        ok
    }
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame reader - decodes a payload slice.
pub struct FrameReader<'a> {
    buf: &'a [u8],
    position: usize,
}

impl<'a> FrameReader<'a> {
    /// Creates a reader over a payload slice.
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, position: 0 }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.position)
    }

    /// Reads a single byte.
    #[inline]
    fn read_u8(&mut self) -> Option<u8> {
        let value = *self.buf.get(self.position)?;
        self.position += 1;
        Some(value)
    }

    /// Reads a bool from one byte.
    #[inline]
    fn read_bool(&mut self) -> Option<bool> {
        self.read_u8().map(|v| v != 0)
    }

    /// Reads a u16 in little-endian format.
    #[inline]
    fn read_u16(&mut self) -> Option<u16> {
        let bytes = self.take(2)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a u32 in little-endian format.
    #[inline]
    fn read_u32(&mut self) -> Option<u32> {
        let bytes = self.take(4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a u64 in little-endian format.
    #[inline]
    fn read_u64(&mut self) -> Option<u64> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Some(u64::from_le_bytes(raw))
    }

    /// Reads an i64 in little-endian format.
    #[inline]
    fn read_i64(&mut self) -> Option<i64> {
        self.read_u64().map(|v| v as i64)
    }

    /// Reads an f32 in little-endian format.
    #[inline]
    fn read_f32(&mut self) -> Option<f32> {
        self.read_u32().map(f32::from_bits)
    }

    /// Reads an f64 in little-endian format.
    #[inline]
    fn read_f64(&mut self) -> Option<f64> {
        self.read_u64().map(f64::from_bits)
    }

    /// Takes `len` raw bytes.
    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.remaining() < len {
            return None;
        }
        let slice = &self.buf[self.position..self.position + len];
        self.position += len;
        Some(slice)
    }

    /// Reads a length-prefixed UTF-8 string.
    fn read_str(&mut self) -> Option<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).ok()
    }

    /// Reads a frame time.
    fn read_time(&mut self) -> Option<FrameTime> {
        Some(FrameTime {
            value: self.read_i64()?,
            scale: self.read_u32()?,
        })
    }

    /// Reads a parameter value.
    fn read_value(&mut self) -> Option<ParamValue> {
        let kind = ParamKind::from_u8(self.read_u8()?)?;
        match kind {
            ParamKind::Bool => Some(ParamValue::Bool(self.read_bool()?)),
            ParamKind::Int => Some(ParamValue::Int(self.read_i64()?)),
            ParamKind::Double => Some(ParamValue::Double(self.read_f64()?)),
            ParamKind::Text => Some(ParamValue::Text(self.read_str()?)),
            ParamKind::FloatStream => {
                let channel_count = self.read_u16()? as usize;
                let mut channels = Vec::new();
                for _ in 0..channel_count {
                    let sample_count = self.read_u32()? as usize;
                    if self.remaining() < sample_count * 4 {
                        return None;
                    }
                    let mut channel = Vec::with_capacity(sample_count);
                    for _ in 0..sample_count {
                        channel.push(self.read_f32()?);
                    }
                    channels.push(channel);
                }
                Some(ParamValue::FloatStream(channels))
            }
            ParamKind::Table => {
                let row_count = self.read_u32()? as usize;
                let mut rows = Vec::new();
                for _ in 0..row_count {
                    let col_count = self.read_u32()? as usize;
                    if self.remaining() < col_count * 4 {
                        return None;
                    }
                    let mut row = Vec::with_capacity(col_count);
                    for _ in 0..col_count {
                        row.push(self.read_str()?);
                    }
                    rows.push(row);
                }
                Some(ParamValue::Table(rows))
            }
            ParamKind::Texture => Some(ParamValue::Texture(TextureToken(self.read_u64()?))),
        }
    }

    /// Reads a name/value list.
    fn read_named_values(&mut self) -> Option<Vec<(String, ParamValue)>> {
        let count = self.read_u32()? as usize;
        let mut values = Vec::new();
        for _ in 0..count {
            let name = self.read_str()?;
            let value = self.read_value()?;
            values.push((name, value));
        }
        Some(values)
    }

    /// Reads a shared texture descriptor.
    fn read_descriptor(&mut self) -> Option<SharedTextureDescriptor> {
        Some(SharedTextureDescriptor {
            os_handle: OsHandle(self.read_u64()?),
            desc: TextureDesc {
                width: self.read_u32()?,
                height: self.read_u32()?,
                format: TextureFormat::from_u8(self.read_u8()?)?,
                row_pitch: self.read_u32()?,
            },
            fence: FenceRef {
                handle: OsHandle(self.read_u64()?),
                ready_value: self.read_u64()?,
            },
        })
    }

    /// Reads a name/descriptor list.
    fn read_named_textures(&mut self) -> Option<Vec<(String, SharedTextureDescriptor)>> {
        let count = self.read_u32()? as usize;
        let mut textures = Vec::new();
        for _ in 0..count {
            let name = self.read_str()?;
            let descriptor = self.read_descriptor()?;
            textures.push((name, descriptor));
        }
        Some(textures)
    }

    /// Reads a parameter spec.
    fn read_spec(&mut self) -> Option<ParamSpec> {
        let name = self.read_str()?;
        let label = self.read_str()?;
        let kind = ParamKind::from_u8(self.read_u8()?)?;
        let scope = ParamScope::from_u8(self.read_u8()?)?;
        let intent = ParamIntent::from_u8(self.read_u8()?)?;
        let range = if self.read_u8()? != 0 {
            Some(ParamRange {
                min: self.read_f64()?,
                max: self.read_f64()?,
                default: self.read_f64()?,
            })
        } else {
            None
        };
        Some(ParamSpec {
            name,
            label,
            kind,
            scope,
            intent,
            range,
        })
    }

    /// Reads a parameter layout.
    fn read_layout(&mut self) -> Option<ParamLayout> {
        let count = self.read_u32()? as usize;
        let mut params = Vec::new();
        for _ in 0..count {
            params.push(self.read_spec()?);
        }
        Some(ParamLayout { params })
    }

    /// Reads a capability set.
    fn read_caps(&mut self) -> Option<CapabilitySet> {
        let api_count = self.read_u8()? as usize;
        let mut gpu_apis = Vec::with_capacity(api_count);
        for _ in 0..api_count {
            gpu_apis.push(GpuApi::from_u8(self.read_u8()?)?);
        }
        let format_count = self.read_u8()? as usize;
        let mut formats = Vec::with_capacity(format_count);
        for _ in 0..format_count {
            formats.push(TextureFormat::from_u8(self.read_u8()?)?);
        }
        Some(CapabilitySet { gpu_apis, formats })
    }
}

/// Decodes a frame payload into a message.
///
/// Returns `Ok(None)` for frame types this build does not know, so newer
/// peers can add frames without breaking older hosts.
///
/// # Errors
///
/// [`ChannelError::Malformed`] if a known frame's payload does not decode.
pub fn decode_payload(message_type: u8, payload: &[u8]) -> Result<Option<Message>, ChannelError> {
    let Some(message_type) = MessageType::from_u8(message_type) else {
        return Ok(None);
    };

    let mut reader = FrameReader::new(payload);
    let malformed = |what: &str| ChannelError::Malformed(format!("{what} payload truncated"));

    let message = match message_type {
        MessageType::Hello => Message::Hello {
            capabilities: reader.read_caps().ok_or_else(|| malformed("hello"))?,
        },
        MessageType::HelloAck => Message::HelloAck {
            capabilities: reader.read_caps().ok_or_else(|| malformed("hello_ack"))?,
        },
        MessageType::LoadContent => Message::LoadContent {
            descriptor: reader.read_str().ok_or_else(|| malformed("load_content"))?,
        },
        MessageType::ContentLoaded => Message::ContentLoaded {
            layout: reader
                .read_layout()
                .ok_or_else(|| malformed("content_loaded"))?,
        },
        MessageType::ParamSet => Message::ParamSet {
            updates: reader
                .read_named_values()
                .ok_or_else(|| malformed("param_set"))?,
        },
        MessageType::CookRequest => Message::CookRequest {
            sequence: reader.read_u64().ok_or_else(|| malformed("cook_request"))?,
            time: reader.read_time().ok_or_else(|| malformed("cook_request"))?,
            discontinuity: reader
                .read_bool()
                .ok_or_else(|| malformed("cook_request"))?,
            inputs: reader
                .read_named_values()
                .ok_or_else(|| malformed("cook_request"))?,
            textures: reader
                .read_named_textures()
                .ok_or_else(|| malformed("cook_request"))?,
        },
        MessageType::CookResponse => Message::CookResponse {
            sequence: reader.read_u64().ok_or_else(|| malformed("cook_response"))?,
            outputs: reader
                .read_named_values()
                .ok_or_else(|| malformed("cook_response"))?,
            textures: reader
                .read_named_textures()
                .ok_or_else(|| malformed("cook_response"))?,
        },
        MessageType::CancelFrame => Message::CancelFrame {
            sequence: reader.read_u64().ok_or_else(|| malformed("cancel_frame"))?,
        },
        MessageType::EngineMessage => Message::EngineMessage {
            severity: reader
                .read_u8()
                .and_then(Severity::from_u8)
                .ok_or_else(|| malformed("engine_message"))?,
            text: reader.read_str().ok_or_else(|| malformed("engine_message"))?,
        },
        MessageType::LayoutChanged => Message::LayoutChanged {
            layout: reader
                .read_layout()
                .ok_or_else(|| malformed("layout_changed"))?,
        },
        MessageType::Teardown => Message::Teardown,
        MessageType::ProtocolError => Message::ProtocolError {
            code: reader.read_u32().ok_or_else(|| malformed("protocol_error"))?,
            detail: reader.read_str().ok_or_else(|| malformed("protocol_error"))?,
        },
    };

    Ok(Some(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(message: &Message) -> Message {
        let mut writer = FrameWriter::new();
        let frame = writer.encode(message).unwrap().to_vec();
        let header = FrameHeader::parse(&frame).unwrap();
        assert_eq!(header.payload_len as usize, frame.len() - FrameHeader::SIZE);
        decode_payload(header.message_type, &frame[FrameHeader::SIZE..])
            .unwrap()
            .unwrap()
    }

    fn sample_descriptor() -> SharedTextureDescriptor {
        SharedTextureDescriptor {
            os_handle: OsHandle(0xDEAD_BEEF),
            desc: TextureDesc::packed(1920, 1080, TextureFormat::Bgra8),
            fence: FenceRef {
                handle: OsHandle(0x77),
                ready_value: 42,
            },
        }
    }

    #[test]
    fn test_round_trip_handshake() {
        let message = Message::Hello {
            capabilities: CapabilitySet {
                gpu_apis: vec![GpuApi::D3D12, GpuApi::Vulkan],
                formats: vec![TextureFormat::Bgra8, TextureFormat::Rgba16F],
            },
        };
        assert_eq!(round_trip(&message), message);
    }

    #[test]
    fn test_round_trip_cook_request() {
        let message = Message::CookRequest {
            sequence: 7,
            time: FrameTime::new(1000, 60_000),
            discontinuity: true,
            inputs: vec![
                ("opacity".into(), ParamValue::Double(0.5)),
                ("label".into(), ParamValue::Text("hud".into())),
                (
                    "audio".into(),
                    ParamValue::FloatStream(vec![vec![0.0, 0.5], vec![1.0]]),
                ),
                (
                    "cues".into(),
                    ParamValue::Table(vec![vec!["a".into(), "b".into()], vec!["c".into()]]),
                ),
            ],
            textures: vec![("source".into(), sample_descriptor())],
        };
        assert_eq!(round_trip(&message), message);
    }

    #[test]
    fn test_round_trip_cook_response() {
        let message = Message::CookResponse {
            sequence: 7,
            outputs: vec![("brightness".into(), ParamValue::Double(0.8))],
            textures: vec![("composite".into(), sample_descriptor())],
        };
        assert_eq!(round_trip(&message), message);
    }

    #[test]
    fn test_round_trip_layout() {
        let mut spec = ParamSpec::new("opacity", ParamKind::Double, ParamScope::Input);
        spec.intent = ParamIntent::NotSpecified;
        spec.range = Some(ParamRange {
            min: 0.0,
            max: 1.0,
            default: 1.0,
        });
        let message = Message::ContentLoaded {
            layout: ParamLayout { params: vec![spec] },
        };
        assert_eq!(round_trip(&message), message);
    }

    #[test]
    fn test_round_trip_remaining_types() {
        for message in [
            Message::LoadContent {
                descriptor: "scenes/stage.bundle".into(),
            },
            Message::ParamSet {
                updates: vec![("armed".into(), ParamValue::Bool(true))],
            },
            Message::CancelFrame { sequence: 3 },
            Message::EngineMessage {
                severity: Severity::Warning,
                text: "dropped a cook".into(),
            },
            Message::Teardown,
            Message::ProtocolError {
                code: 2,
                detail: "unexpected frame".into(),
            },
        ] {
            assert_eq!(round_trip(&message), message);
        }
    }

    #[test]
    fn test_unknown_frame_type_is_skipped() {
        let decoded = decode_payload(200, &[1, 2, 3]).unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn test_truncated_payload_is_malformed() {
        let mut writer = FrameWriter::new();
        let frame = writer
            .encode(&Message::CookResponse {
                sequence: 1,
                outputs: vec![("x".into(), ParamValue::Double(1.0))],
                textures: Vec::new(),
            })
            .unwrap()
            .to_vec();
        let header = FrameHeader::parse(&frame).unwrap();
        let truncated = &frame[FrameHeader::SIZE..frame.len() - 3];
        let result = decode_payload(header.message_type, truncated);
        assert!(matches!(result, Err(ChannelError::Malformed(_))));
    }

    #[test]
    fn test_oversized_frame_is_rejected() {
        let samples = vec![0.0f32; crate::MAX_FRAME_SIZE / 4 + 16];
        let message = Message::ParamSet {
            updates: vec![("wave".into(), ParamValue::FloatStream(vec![samples]))],
        };
        let mut writer = FrameWriter::new();
        assert!(matches!(
            writer.encode(&message),
            Err(ChannelError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_writer_is_reusable() {
        let mut writer = FrameWriter::new();
        let first = writer.encode(&Message::Teardown).unwrap().to_vec();
        let second = writer
            .encode(&Message::CancelFrame { sequence: 9 })
            .unwrap()
            .to_vec();
        assert_ne!(first, second);
        let header = FrameHeader::parse(&second).unwrap();
        assert_eq!(header.message_type, MessageType::CancelFrame as u8);
    }
}
