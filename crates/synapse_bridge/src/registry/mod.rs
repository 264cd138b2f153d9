//! # Parameter Registry
//!
//! The single source of truth for "current" parameter state.
//!
//! ## Design
//!
//! - One lock around the whole map; drains are atomic snapshots, so no
//!   per-parameter locking is needed
//! - [`ParameterRegistry::drain_dirty`] is the only path by which host
//!   writes reach the transport channel, giving at most one update per
//!   parameter per frame even under multiple writers
//! - Cook outputs are applied all-or-nothing: a response that fails
//!   validation leaves the registry untouched

use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;
use synapse_core::{ParamKind, ParamLayout, ParamValue, ParamSpec};

use crate::error::{BridgeError, BridgeResult};

struct RegistryInner {
    specs: HashMap<String, ParamSpec>,
    values: HashMap<String, ParamValue>,
    dirty: BTreeSet<String>,
}

/// Typed key-value store for the parameters of one engine instance.
pub struct ParameterRegistry {
    inner: Mutex<RegistryInner>,
}

impl ParameterRegistry {
    /// Creates an empty registry with no declared layout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                specs: HashMap::new(),
                values: HashMap::new(),
                dirty: BTreeSet::new(),
            }),
        }
    }

    /// Installs or replaces the parameter layout.
    ///
    /// Values of re-declared parameters with an unchanged kind survive.
    /// Numeric inputs with range metadata and no surviving value start at
    /// their declared default, clean (the engine already knows it).
    pub fn declare_layout(&self, layout: &ParamLayout) {
        let mut inner = self.inner.lock();

        let mut values = HashMap::new();
        for spec in &layout.params {
            if let Some(value) = inner.values.get(&spec.name) {
                if value.kind() == spec.kind {
                    values.insert(spec.name.clone(), value.clone());
                    continue;
                }
            }
            if spec.is_input() {
                if let Some(range) = spec.range {
                    let default = match spec.kind {
                        ParamKind::Double => Some(ParamValue::Double(range.default)),
                        ParamKind::Int => Some(ParamValue::Int(range.default as i64)),
                        _ => None,
                    };
                    if let Some(default) = default {
                        values.insert(spec.name.clone(), default);
                    }
                }
            }
        }

        inner.specs = layout
            .params
            .iter()
            .map(|spec| (spec.name.clone(), spec.clone()))
            .collect();
        inner.values = values;
        let inner = &mut *inner;
        inner.dirty.retain(|name| inner.specs.contains_key(name));
    }

    /// Writes an input parameter and marks it dirty.
    ///
    /// # Errors
    ///
    /// `UnknownParameter`, `NotAnInput`, or `ParameterTypeMismatch`.
    pub fn set(&self, name: &str, value: ParamValue) -> BridgeResult<()> {
        let mut inner = self.inner.lock();
        let spec = inner
            .specs
            .get(name)
            .ok_or_else(|| BridgeError::UnknownParameter(name.to_string()))?;
        if !spec.is_input() {
            return Err(BridgeError::NotAnInput(name.to_string()));
        }
        if spec.kind != value.kind() {
            return Err(BridgeError::ParameterTypeMismatch {
                name: name.to_string(),
                expected: spec.kind,
                got: value.kind(),
            });
        }
        inner.values.insert(name.to_string(), value);
        inner.dirty.insert(name.to_string());
        Ok(())
    }

    /// Reads the current value of a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.inner.lock().values.get(name).cloned()
    }

    /// Returns the declared spec of a parameter.
    #[must_use]
    pub fn spec(&self, name: &str) -> Option<ParamSpec> {
        self.inner.lock().specs.get(name).cloned()
    }

    /// Takes an atomic snapshot of every dirty parameter and clears the
    /// dirty set.
    ///
    /// Each value set since the previous drain appears exactly once, in
    /// name order; it will not appear again unless re-set.
    #[must_use]
    pub fn drain_dirty(&self) -> Vec<(String, ParamValue)> {
        let mut inner = self.inner.lock();
        let dirty = std::mem::take(&mut inner.dirty);
        dirty
            .into_iter()
            .filter_map(|name| {
                let value = inner.values.get(&name).cloned()?;
                Some((name, value))
            })
            .collect()
    }

    /// Returns true if any parameter is dirty.
    #[must_use]
    pub fn has_dirty(&self) -> bool {
        !self.inner.lock().dirty.is_empty()
    }

    /// Applies cook outputs atomically: either every entry is valid and all
    /// are written, or none are.
    ///
    /// # Errors
    ///
    /// `UnknownParameter`, `NotAnOutput`, or `ParameterTypeMismatch`; the
    /// registry is untouched on error.
    pub fn apply_outputs(&self, outputs: &[(String, ParamValue)]) -> BridgeResult<()> {
        let mut inner = self.inner.lock();

        for (name, value) in outputs {
            let spec = inner
                .specs
                .get(name)
                .ok_or_else(|| BridgeError::UnknownParameter(name.clone()))?;
            if spec.is_input() {
                return Err(BridgeError::NotAnOutput(name.clone()));
            }
            if spec.kind != value.kind() {
                return Err(BridgeError::ParameterTypeMismatch {
                    name: name.clone(),
                    expected: spec.kind,
                    got: value.kind(),
                });
            }
        }

        for (name, value) in outputs {
            inner.values.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    /// Number of declared parameters.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.inner.lock().specs.len()
    }
}

impl Default for ParameterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
