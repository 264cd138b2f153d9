//! Parameter specifications published by the external engine.

use super::value::ParamKind;

/// Direction of a parameter relative to the external engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ParamScope {
    /// Written by the host, read by the external engine.
    Input = 0,
    /// Written by the external engine on cook completion, read by the host.
    Output = 1,
}

impl ParamScope {
    /// Decodes a scope from its wire discriminant.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Input),
            1 => Some(Self::Output),
            _ => None,
        }
    }
}

/// Hint about how a parameter's value should be interpreted or presented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum ParamIntent {
    /// No particular interpretation.
    #[default]
    NotSpecified = 0,
    /// Four doubles forming an RGBA color.
    ColorRgba = 1,
    /// Up to four doubles forming a position.
    PositionXyzw = 2,
    /// Two doubles forming a width/height pair.
    SizeWh = 3,
    /// Up to three doubles forming texture coordinates.
    Uvw = 4,
    /// Text naming a file path.
    FilePath = 5,
    /// Text naming a directory path.
    DirectoryPath = 6,
    /// A true value is transient, as from a button press.
    Momentary = 7,
}

impl ParamIntent {
    /// Decodes an intent from its wire discriminant.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NotSpecified),
            1 => Some(Self::ColorRgba),
            2 => Some(Self::PositionXyzw),
            3 => Some(Self::SizeWh),
            4 => Some(Self::Uvw),
            5 => Some(Self::FilePath),
            6 => Some(Self::DirectoryPath),
            7 => Some(Self::Momentary),
            _ => None,
        }
    }
}

/// Numeric range metadata for scalar parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ParamRange {
    /// Smallest accepted value.
    pub min: f64,
    /// Largest accepted value.
    pub max: f64,
    /// Value the parameter resets to.
    pub default: f64,
}

/// Specification of one parameter, as published by the external engine.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamSpec {
    /// Stable identity of the parameter.
    pub name: String,
    /// Human-readable label for UI surfaces.
    pub label: String,
    /// Value kind accepted or produced.
    pub kind: ParamKind,
    /// Direction relative to the external engine.
    pub scope: ParamScope,
    /// Interpretation hint.
    pub intent: ParamIntent,
    /// Range metadata, present only for numeric kinds.
    pub range: Option<ParamRange>,
}

impl ParamSpec {
    /// Creates a spec with no intent and no range.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ParamKind, scope: ParamScope) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            kind,
            scope,
            intent: ParamIntent::NotSpecified,
            range: None,
        }
    }

    /// Returns true if the host may write this parameter.
    #[inline]
    #[must_use]
    pub fn is_input(&self) -> bool {
        self.scope == ParamScope::Input
    }
}

/// Ordered set of parameter specifications for loaded content.
///
/// The order is the external engine's declaration order and is preserved for
/// UI purposes; lookups by name are the bridge's concern.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamLayout {
    /// Specifications in declaration order.
    pub params: Vec<ParamSpec>,
}

impl ParamLayout {
    /// Creates an empty layout.
    #[must_use]
    pub const fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Finds a spec by parameter name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Number of declared parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if no parameters are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterates over input specs only.
    pub fn inputs(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.scope == ParamScope::Input)
    }

    /// Iterates over output specs only.
    pub fn outputs(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.scope == ParamScope::Output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_layout() -> ParamLayout {
        ParamLayout {
            params: vec![
                ParamSpec::new("opacity", ParamKind::Double, ParamScope::Input),
                ParamSpec::new("source", ParamKind::Texture, ParamScope::Input),
                ParamSpec::new("brightness", ParamKind::Double, ParamScope::Output),
            ],
        }
    }

    #[test]
    fn test_layout_lookup() {
        let layout = sample_layout();
        assert_eq!(layout.len(), 3);
        assert!(layout.find("opacity").is_some());
        assert!(layout.find("missing").is_none());
        assert_eq!(layout.inputs().count(), 2);
        assert_eq!(layout.outputs().count(), 1);
    }

    #[test]
    fn test_scope_round_trip() {
        assert_eq!(ParamScope::from_u8(0), Some(ParamScope::Input));
        assert_eq!(ParamScope::from_u8(1), Some(ParamScope::Output));
        assert_eq!(ParamScope::from_u8(2), None);
    }

    #[test]
    fn test_intent_round_trip() {
        for raw in 0..=7u8 {
            let intent = ParamIntent::from_u8(raw).unwrap();
            assert_eq!(intent as u8, raw);
        }
        assert_eq!(ParamIntent::from_u8(8), None);
    }
}
