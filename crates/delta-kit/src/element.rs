//! Element-level deltas for collection fields and their accumulators.
//!
//! Sets produce [`KeyDelta`]s, scalar-valued maps produce
//! [`KeyValuePairDelta`]s and model-valued maps produce
//! [`KeyModelDeltaPairDelta`]s. Each has a builder that merges later deltas
//! for the same element following the [`DeltaTypeState`] collapse rules.

use core::fmt::Debug;

use crate::delta_type::{DeltaType, DeltaTypeState};
use crate::error::{ensure_same_key, Result};
use crate::model::{DeltaBuilderOf, Model, ModelDelta, ModelDeltaBuilder};

// ── Key-only set members ────────────────────────────────────────────

/// Membership change of one set element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyDelta<K> {
    delta_type: DeltaType,
    key: K,
}

impl<K: Clone + Ord + Debug> KeyDelta<K> {
    /// Create a membership change.
    pub fn new(delta_type: DeltaType, key: K) -> Self {
        Self { delta_type, key }
    }

    /// Whether the element is added or removed.
    #[must_use]
    pub fn delta_type(&self) -> DeltaType {
        self.delta_type
    }

    /// The set element.
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// An accumulator seeded with this delta.
    pub fn to_delta_builder(&self) -> KeyDeltaBuilder<K> {
        KeyDeltaBuilder::new(self.delta_type, self.key.clone())
    }
}

/// Accumulator for [`KeyDelta`]s of one set element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDeltaBuilder<K> {
    state: DeltaTypeState,
    key: K,
}

impl<K: Clone + Ord + Debug> KeyDeltaBuilder<K> {
    /// Create an accumulator for `key`.
    pub fn new(delta_type: DeltaType, key: K) -> Self {
        Self {
            state: DeltaTypeState::new(delta_type),
            key,
        }
    }

    /// The set element.
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Current intent.
    #[must_use]
    pub fn delta_type(&self) -> DeltaType {
        self.state.current()
    }

    /// Overwrite the current intent.
    pub fn set_delta_type(&mut self, delta_type: DeltaType) -> &mut Self {
        self.state.set(delta_type);
        self
    }

    /// Restore the initial intent.
    pub fn reset_delta_type(&mut self) -> &mut Self {
        self.state.reset();
        self
    }

    /// Merge a later delta for the same element.
    pub fn add_delta(&mut self, delta: &KeyDelta<K>) -> Result<&mut Self> {
        ensure_same_key("add_delta", &self.key, &delta.key)?;
        self.state.absorb(delta.delta_type);
        Ok(self)
    }

    /// Collapse into a single delta.
    #[must_use]
    pub fn build_delta(&self) -> KeyDelta<K> {
        KeyDelta::new(self.state.current(), self.key.clone())
    }
}

// ── Scalar-valued map entries ───────────────────────────────────────

/// Change of one entry of a scalar-valued map.
///
/// The value is `None` for deletions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyValuePairDelta<K, V> {
    delta_type: DeltaType,
    key: K,
    value: Option<V>,
}

impl<K: Clone + Ord + Debug, V: Clone> KeyValuePairDelta<K, V> {
    /// Create an entry change.
    pub fn new(delta_type: DeltaType, key: K, value: Option<V>) -> Self {
        Self {
            delta_type,
            key,
            value,
        }
    }

    /// Whether the entry is added, updated or removed.
    #[must_use]
    pub fn delta_type(&self) -> DeltaType {
        self.delta_type
    }

    /// The map key.
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The new value, absent for deletions.
    #[must_use]
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    /// An accumulator seeded with this delta.
    pub fn to_delta_builder(&self) -> KeyValuePairDeltaBuilder<K, V> {
        KeyValuePairDeltaBuilder::new(self.delta_type, self.key.clone(), self.value.clone())
    }
}

/// Accumulator for [`KeyValuePairDelta`]s of one map entry.
///
/// The most recent value wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValuePairDeltaBuilder<K, V> {
    state: DeltaTypeState,
    key: K,
    value: Option<V>,
}

impl<K: Clone + Ord + Debug, V: Clone> KeyValuePairDeltaBuilder<K, V> {
    /// Create an accumulator for `key`.
    pub fn new(delta_type: DeltaType, key: K, value: Option<V>) -> Self {
        Self {
            state: DeltaTypeState::new(delta_type),
            key,
            value,
        }
    }

    /// The map key.
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Current intent.
    #[must_use]
    pub fn delta_type(&self) -> DeltaType {
        self.state.current()
    }

    /// The latest value seen.
    #[must_use]
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    /// Overwrite the current intent.
    pub fn set_delta_type(&mut self, delta_type: DeltaType) -> &mut Self {
        self.state.set(delta_type);
        self
    }

    /// Restore the initial intent.
    pub fn reset_delta_type(&mut self) -> &mut Self {
        self.state.reset();
        self
    }

    /// Merge a later delta for the same entry.
    pub fn add_delta(&mut self, delta: &KeyValuePairDelta<K, V>) -> Result<&mut Self> {
        ensure_same_key("add_delta", &self.key, &delta.key)?;
        self.state.absorb(delta.delta_type);
        self.value = delta.value.clone();
        Ok(self)
    }

    /// Collapse into a single delta.
    #[must_use]
    pub fn build_delta(&self) -> KeyValuePairDelta<K, V> {
        KeyValuePairDelta::new(self.state.current(), self.key.clone(), self.value.clone())
    }
}

// ── Model-valued map entries ────────────────────────────────────────

/// Change of one entry of a model-valued map.
///
/// `key` is the map's own key; the nested delta carries the sub-model's
/// identity, which may be of a different type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyModelDeltaPairDelta<K, D> {
    delta_type: DeltaType,
    key: K,
    value: D,
}

impl<K: Clone + Ord + Debug, D: ModelDelta> KeyModelDeltaPairDelta<K, D> {
    /// Create an entry change.
    pub fn new(delta_type: DeltaType, key: K, value: D) -> Self {
        Self {
            delta_type,
            key,
            value,
        }
    }

    /// Whether the entry is added, updated or removed.
    #[must_use]
    pub fn delta_type(&self) -> DeltaType {
        self.delta_type
    }

    /// The map key.
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The nested model delta.
    #[must_use]
    pub fn value(&self) -> &D {
        &self.value
    }

    /// An accumulator seeded with this delta.
    pub fn to_delta_builder(&self) -> KeyModelDeltaPairDeltaBuilder<K, D::Model> {
        KeyModelDeltaPairDeltaBuilder::from_parts(
            self.delta_type,
            self.key.clone(),
            self.value.to_delta_builder(),
        )
    }
}

/// Accumulator for [`KeyModelDeltaPairDelta`]s of one map entry.
#[derive(Debug)]
pub struct KeyModelDeltaPairDeltaBuilder<K, M: Model> {
    state: DeltaTypeState,
    key: K,
    value: DeltaBuilderOf<M>,
}

impl<K: Clone + Ord + Debug, M: Model> KeyModelDeltaPairDeltaBuilder<K, M> {
    /// Create an accumulator around an existing nested delta builder.
    pub fn from_parts(delta_type: DeltaType, key: K, value: DeltaBuilderOf<M>) -> Self {
        Self {
            state: DeltaTypeState::new(delta_type),
            key,
            value,
        }
    }

    /// The map key.
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Current intent.
    #[must_use]
    pub fn delta_type(&self) -> DeltaType {
        self.state.current()
    }

    /// The nested delta builder.
    #[must_use]
    pub fn value(&self) -> &DeltaBuilderOf<M> {
        &self.value
    }

    /// Overwrite the current intent.
    pub fn set_delta_type(&mut self, delta_type: DeltaType) -> &mut Self {
        self.state.set(delta_type);
        self
    }

    /// Restore the initial intent.
    pub fn reset_delta_type(&mut self) -> &mut Self {
        self.state.reset();
        self
    }

    /// Merge a later delta for the same entry.
    ///
    /// The nested delta is merged when it is an update of the same
    /// sub-model. An add or a delete carries the whole sub-model and replaces
    /// what was accumulated, as does a delta for another sub-model.
    pub fn add_delta(&mut self, delta: &KeyModelDeltaPairDelta<K, M::Delta>) -> Result<&mut Self> {
        ensure_same_key("add_delta", &self.key, &delta.key)?;
        self.state.absorb(delta.delta_type);
        let incoming = &delta.value;
        if incoming.delta_type() != DeltaType::Update || self.value.key() != incoming.key() {
            self.value = incoming.to_delta_builder();
        } else {
            self.value.add_delta(incoming)?;
        }
        Ok(self)
    }

    /// Collapse into a single delta, or `None` when the nested delta is a
    /// no-op update.
    #[must_use]
    pub fn build_delta(&self) -> Option<KeyModelDeltaPairDelta<K, M::Delta>> {
        self.value
            .build_delta()
            .map(|value| KeyModelDeltaPairDelta::new(self.state.current(), self.key.clone(), value))
    }
}
