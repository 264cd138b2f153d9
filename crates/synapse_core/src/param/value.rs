//! Parameter values and their kind discriminants.

/// Opaque host-side identity for a texture parameter value.
///
/// Tokens are allocated by the GPU resource bridge and are unique for the
/// lifetime of an engine instance. They are never reused, so a stale token
/// from before a reload can always be rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureToken(pub u64);

impl TextureToken {
    /// Token value that never names a live texture.
    pub const NULL: Self = Self(0);

    /// Returns true if this is the null token.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// A parameter value.
///
/// The variants mirror what the external engine exposes: scalars, text,
/// planar sample streams, string tables and textures.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// Boolean toggle or momentary pulse.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Double-precision scalar.
    Double(f64),
    /// UTF-8 text.
    Text(String),
    /// Planar float samples: one `Vec<f32>` per channel.
    FloatStream(Vec<Vec<f32>>),
    /// Row-major string table.
    Table(Vec<Vec<String>>),
    /// Shared texture, referenced by opaque token.
    Texture(TextureToken),
}

/// Kind discriminant for [`ParamValue`], used for type checking and wire tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ParamKind {
    /// Boolean toggle or momentary pulse.
    Bool = 0,
    /// Integer scalar.
    Int = 1,
    /// Double-precision scalar.
    Double = 2,
    /// UTF-8 text.
    Text = 3,
    /// Planar float samples.
    FloatStream = 4,
    /// Row-major string table.
    Table = 5,
    /// Shared texture.
    Texture = 6,
}

impl ParamKind {
    /// Decodes a kind from its wire discriminant.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Bool),
            1 => Some(Self::Int),
            2 => Some(Self::Double),
            3 => Some(Self::Text),
            4 => Some(Self::FloatStream),
            5 => Some(Self::Table),
            6 => Some(Self::Texture),
            _ => None,
        }
    }

    /// Short lowercase name, used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Double => "double",
            Self::Text => "text",
            Self::FloatStream => "float_stream",
            Self::Table => "table",
            Self::Texture => "texture",
        }
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl ParamValue {
    /// Returns the kind of this value.
    #[must_use]
    pub const fn kind(&self) -> ParamKind {
        match self {
            Self::Bool(_) => ParamKind::Bool,
            Self::Int(_) => ParamKind::Int,
            Self::Double(_) => ParamKind::Double,
            Self::Text(_) => ParamKind::Text,
            Self::FloatStream(_) => ParamKind::FloatStream,
            Self::Table(_) => ParamKind::Table,
            Self::Texture(_) => ParamKind::Texture,
        }
    }

    /// Returns the boolean payload, if this is a `Bool`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer payload, if this is an `Int`.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the double payload, if this is a `Double`.
    #[must_use]
    pub const fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text payload, if this is a `Text`.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the texture token, if this is a `Texture`.
    #[must_use]
    pub const fn as_texture(&self) -> Option<TextureToken> {
        match self {
            Self::Texture(t) => Some(*t),
            _ => None,
        }
    }
}
