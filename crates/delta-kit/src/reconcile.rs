//! Diff (reconcile) and patch (apply) primitives for every field kind.
//!
//! Sets and maps are ordered, so emitted element deltas come out in a
//! deterministic order: deletions first, then additions, then updates, each
//! in key order. Consumers must still only rely on same-key grouping.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use core::fmt::Debug;

use crate::delta_type::DeltaType;
use crate::element::{
    KeyDelta, KeyDeltaBuilder, KeyModelDeltaPairDelta, KeyModelDeltaPairDeltaBuilder,
    KeyValuePairDelta, KeyValuePairDeltaBuilder,
};
use crate::error::Result;
use crate::model::{BuilderOf, DeltaOf, Model, ModelBuilder, ModelDelta};

// ── Scalars ─────────────────────────────────────────────────────────

/// Diff two scalar values.
///
/// Scalars never produce `Add` or `Delete` on their own: the answer is
/// `Update` with the current value, or nothing when both are equal.
///
/// ```
/// use delta_kit::{reconcile::reconcile_scalar, DeltaType};
///
/// assert_eq!(reconcile_scalar(&1, &1), None);
/// assert_eq!(reconcile_scalar(&1, &2), Some((DeltaType::Update, 2)));
/// assert_eq!(reconcile_scalar(&None, &Some("x")), Some((DeltaType::Update, Some("x"))));
/// ```
pub fn reconcile_scalar<T: PartialEq + Clone>(reference: &T, current: &T) -> Option<(DeltaType, T)> {
    if reference == current {
        None
    } else {
        Some((DeltaType::Update, current.clone()))
    }
}

// ── Key-only sets ───────────────────────────────────────────────────

/// Diff two sets: removed members become `Delete`, new members `Add`.
///
/// ```
/// use std::collections::BTreeSet;
/// use delta_kit::{reconcile::reconcile_keys, DeltaType, KeyDelta};
///
/// let reference: BTreeSet<_> = [1, 2, 3].into();
/// let current: BTreeSet<_> = [2, 3, 4].into();
/// assert_eq!(
///     reconcile_keys(&reference, &current),
///     vec![KeyDelta::new(DeltaType::Delete, 1), KeyDelta::new(DeltaType::Add, 4)]
/// );
/// ```
pub fn reconcile_keys<K: Clone + Ord + Debug>(
    reference: &BTreeSet<K>,
    current: &BTreeSet<K>,
) -> Vec<KeyDelta<K>> {
    let deltas: Vec<_> = reference
        .difference(current)
        .map(|key| KeyDelta::new(DeltaType::Delete, key.clone()))
        .chain(
            current
                .difference(reference)
                .map(|key| KeyDelta::new(DeltaType::Add, key.clone())),
        )
        .collect();
    tracing::trace!(count = deltas.len(), "reconciled key set");
    deltas
}

/// Patch a set. Both insertion and removal are idempotent.
pub fn apply_key_deltas<K: Clone + Ord + Debug>(deltas: &[KeyDelta<K>], target: &mut BTreeSet<K>) {
    for delta in deltas {
        match delta.delta_type() {
            DeltaType::Add | DeltaType::Update => {
                if !target.contains(delta.key()) {
                    target.insert(delta.key().clone());
                }
            }
            DeltaType::Delete => {
                target.remove(delta.key());
            }
        }
    }
}

/// Merge a set-member delta into a per-member accumulator map.
pub fn add_key_delta<K: Clone + Ord + Debug>(
    builders: &mut BTreeMap<K, KeyDeltaBuilder<K>>,
    delta: &KeyDelta<K>,
) -> Result<()> {
    match builders.get_mut(delta.key()) {
        Some(builder) => {
            builder.add_delta(delta)?;
        }
        None => {
            builders.insert(delta.key().clone(), delta.to_delta_builder());
        }
    }
    Ok(())
}

/// Collapse per-member accumulators into element deltas.
pub fn build_key_deltas<K: Clone + Ord + Debug>(
    builders: &BTreeMap<K, KeyDeltaBuilder<K>>,
) -> Vec<KeyDelta<K>> {
    builders.values().map(KeyDeltaBuilder::build_delta).collect()
}

// ── Scalar-valued maps ──────────────────────────────────────────────

/// Diff two scalar-valued maps.
///
/// ```
/// use std::collections::BTreeMap;
/// use delta_kit::{reconcile::reconcile_key_value_pairs, DeltaType, KeyValuePairDelta};
///
/// let reference: BTreeMap<_, _> = [("a", 1), ("b", 2)].into();
/// let current: BTreeMap<_, _> = [("a", 1), ("b", 3), ("c", 4)].into();
/// assert_eq!(
///     reconcile_key_value_pairs(&reference, &current),
///     vec![
///         KeyValuePairDelta::new(DeltaType::Update, "b", Some(3)),
///         KeyValuePairDelta::new(DeltaType::Add, "c", Some(4)),
///     ]
/// );
/// ```
pub fn reconcile_key_value_pairs<K, V>(
    reference: &BTreeMap<K, V>,
    current: &BTreeMap<K, V>,
) -> Vec<KeyValuePairDelta<K, V>>
where
    K: Clone + Ord + Debug,
    V: Clone + PartialEq,
{
    let mut deltas: Vec<_> = reference
        .keys()
        .filter(|key| !current.contains_key(*key))
        .map(|key| KeyValuePairDelta::new(DeltaType::Delete, key.clone(), None))
        .collect();
    for (key, value) in current {
        match reference.get(key) {
            None => deltas.push(KeyValuePairDelta::new(
                DeltaType::Add,
                key.clone(),
                Some(value.clone()),
            )),
            Some(previous) if previous != value => deltas.push(KeyValuePairDelta::new(
                DeltaType::Update,
                key.clone(),
                Some(value.clone()),
            )),
            Some(_) => {}
        }
    }
    tracing::trace!(count = deltas.len(), "reconciled key/value map");
    deltas
}

/// Patch a scalar-valued map.
///
/// Entries whose value is already equal are left untouched.
pub fn apply_key_value_pair_deltas<K, V>(
    deltas: &[KeyValuePairDelta<K, V>],
    target: &mut BTreeMap<K, V>,
) where
    K: Clone + Ord + Debug,
    V: Clone + PartialEq,
{
    for delta in deltas {
        match (delta.delta_type(), delta.value()) {
            (DeltaType::Delete, _) => {
                target.remove(delta.key());
            }
            (_, Some(value)) => {
                if target.get(delta.key()) != Some(value) {
                    target.insert(delta.key().clone(), value.clone());
                }
            }
            (_, None) => {
                tracing::debug!(key = ?delta.key(), "skipping value-less map entry delta");
            }
        }
    }
}

/// Merge a map-entry delta into a per-entry accumulator map.
pub fn add_key_value_pair_delta<K, V>(
    builders: &mut BTreeMap<K, KeyValuePairDeltaBuilder<K, V>>,
    delta: &KeyValuePairDelta<K, V>,
) -> Result<()>
where
    K: Clone + Ord + Debug,
    V: Clone,
{
    match builders.get_mut(delta.key()) {
        Some(builder) => {
            builder.add_delta(delta)?;
        }
        None => {
            builders.insert(delta.key().clone(), delta.to_delta_builder());
        }
    }
    Ok(())
}

/// Collapse per-entry accumulators into element deltas.
pub fn build_key_value_pair_deltas<K, V>(
    builders: &BTreeMap<K, KeyValuePairDeltaBuilder<K, V>>,
) -> Vec<KeyValuePairDelta<K, V>>
where
    K: Clone + Ord + Debug,
    V: Clone,
{
    builders
        .values()
        .map(KeyValuePairDeltaBuilder::build_delta)
        .collect()
}

// ── Single nested models ────────────────────────────────────────────

/// Diff an optional nested model field.
///
/// | reference | current | result |
/// |-----------|---------|--------|
/// | absent    | absent  | nothing |
/// | absent    | present | `Add` of the full content |
/// | present   | present, same key | `Update` diff |
/// | present   | present, other key | `Add` of the new content, no `Delete` of the old |
/// | present   | absent  | `Delete` teardown of the reference |
pub fn reconcile_model_field<M: Model>(
    reference: Option<&Arc<M>>,
    current: Option<&Arc<M>>,
) -> Result<Option<DeltaOf<M>>> {
    match (reference, current) {
        (None, None) => Ok(None),
        (None, Some(current)) => current
            .to_builder()
            .reconcile_against(DeltaType::Add, &M::empty(current.key().clone())),
        (Some(reference), Some(current)) if Arc::ptr_eq(reference, current) => Ok(None),
        (Some(reference), Some(current)) if reference.key() == current.key() => current
            .to_builder()
            .reconcile_against(DeltaType::Update, &**reference),
        (Some(reference), Some(current)) => {
            tracing::debug!(
                old = ?reference.key(),
                new = ?current.key(),
                "nested model key changed, reporting replacement as add"
            );
            current
                .to_builder()
                .reconcile_against(DeltaType::Add, &M::empty(current.key().clone()))
        }
        (Some(reference), None) => reference
            .to_builder_empty()
            .reconcile_against(DeltaType::Delete, &**reference),
    }
}

/// Diff an optional nested model field whose current value is still a
/// builder. Same table as [`reconcile_model_field`]; a builder whose last
/// delta was a deletion counts as absent.
pub fn reconcile_model_builder_field<M: Model>(
    reference: Option<&Arc<M>>,
    current: Option<&BuilderOf<M>>,
) -> Result<Option<DeltaOf<M>>> {
    let current = current.filter(|builder| !is_deleted(*builder));
    match (reference, current) {
        (None, None) => Ok(None),
        (None, Some(current)) => {
            current.reconcile_against(DeltaType::Add, &*current.build_empty())
        }
        (Some(reference), Some(current)) if reference.key() == current.key() => {
            current.reconcile_against(DeltaType::Update, &**reference)
        }
        (Some(reference), Some(current)) => {
            tracing::debug!(
                old = ?reference.key(),
                new = ?current.key(),
                "nested builder key changed, reporting replacement as add"
            );
            current.reconcile_against(DeltaType::Add, &*current.build_empty())
        }
        (Some(reference), None) => reference
            .to_builder_empty()
            .reconcile_against(DeltaType::Delete, &**reference),
    }
}

/// Patch an optional nested model builder.
///
/// A builder for the same sub-model is patched in place by `Update` and
/// `Delete` deltas. An `Add`, or a delta for a different sub-model, replaces
/// the slot with a fresh builder seeded from the delta.
pub fn apply_model_delta<M: Model>(
    delta: &DeltaOf<M>,
    target: &mut Option<BuilderOf<M>>,
) -> Result<()> {
    let in_place = delta.delta_type() != DeltaType::Add;
    if let Some(builder) = target
        .as_mut()
        .filter(|b| in_place && b.key() == delta.key())
    {
        builder.apply_delta(delta)?;
        return Ok(());
    }
    *target = Some(delta.to_builder()?);
    Ok(())
}

fn is_deleted<B: ModelBuilder>(builder: &B) -> bool {
    builder.last_delta_type() == Some(DeltaType::Delete)
}

// ── Model-valued maps ───────────────────────────────────────────────

/// Diff two model-valued maps, recursing into entries present on both
/// sides.
pub fn reconcile_key_model_pairs<K, M>(
    reference: &BTreeMap<K, Arc<M>>,
    current: &BTreeMap<K, Arc<M>>,
) -> Result<Vec<KeyModelDeltaPairDelta<K, DeltaOf<M>>>>
where
    K: Clone + Ord + Debug,
    M: Model,
{
    let mut deltas = Vec::new();
    for (key, model) in reference {
        if !current.contains_key(key) {
            push_teardown(&mut deltas, key, model)?;
        }
    }
    for (key, model) in current {
        match reference.get(key) {
            None => {
                if let Some(delta) = model.to_delta(DeltaType::Add)? {
                    deltas.push(KeyModelDeltaPairDelta::new(DeltaType::Add, key.clone(), delta));
                }
            }
            Some(previous) if Arc::ptr_eq(previous, model) => {}
            Some(previous) => {
                if let Some(delta) = reconcile_model_field(Some(previous), Some(model))? {
                    deltas.push(KeyModelDeltaPairDelta::new(
                        DeltaType::Update,
                        key.clone(),
                        delta,
                    ));
                }
            }
        }
    }
    tracing::trace!(count = deltas.len(), "reconciled key/model map");
    Ok(deltas)
}

/// Diff a model-valued map held as builders against its reference, without
/// building the entries first.
pub fn reconcile_key_model_builder_pairs<K, M>(
    reference: &BTreeMap<K, Arc<M>>,
    current: &BTreeMap<K, BuilderOf<M>>,
) -> Result<Vec<KeyModelDeltaPairDelta<K, DeltaOf<M>>>>
where
    K: Clone + Ord + Debug,
    M: Model,
{
    let live = |key: &K| current.get(key).filter(|b| !is_deleted(*b));

    let mut deltas = Vec::new();
    for (key, model) in reference {
        if live(key).is_none() {
            push_teardown(&mut deltas, key, model)?;
        }
    }
    for (key, builder) in current {
        if is_deleted(builder) {
            continue;
        }
        match reference.get(key) {
            None => {
                if let Some(delta) = builder.to_delta(DeltaType::Add)? {
                    deltas.push(KeyModelDeltaPairDelta::new(DeltaType::Add, key.clone(), delta));
                }
            }
            Some(previous) => {
                if let Some(delta) = reconcile_model_builder_field(Some(previous), Some(builder))? {
                    deltas.push(KeyModelDeltaPairDelta::new(
                        DeltaType::Update,
                        key.clone(),
                        delta,
                    ));
                }
            }
        }
    }
    tracing::trace!(count = deltas.len(), "reconciled key/builder map");
    Ok(deltas)
}

fn push_teardown<K, M>(
    deltas: &mut Vec<KeyModelDeltaPairDelta<K, DeltaOf<M>>>,
    key: &K,
    model: &Arc<M>,
) -> Result<()>
where
    K: Clone + Ord + Debug,
    M: Model,
{
    if let Some(delta) = model
        .to_builder_empty()
        .reconcile_against(DeltaType::Delete, &**model)?
    {
        deltas.push(KeyModelDeltaPairDelta::new(DeltaType::Delete, key.clone(), delta));
    }
    Ok(())
}

/// Patch a model-valued map held as builders.
///
/// Entries follow the same rule as [`apply_model_delta`]: a nested `Add`
/// always seeds a fresh builder.
pub fn apply_key_model_pair_deltas<K, M>(
    deltas: &[KeyModelDeltaPairDelta<K, DeltaOf<M>>],
    target: &mut BTreeMap<K, BuilderOf<M>>,
) -> Result<()>
where
    K: Clone + Ord + Debug,
    M: Model,
{
    for pair in deltas {
        match pair.delta_type() {
            DeltaType::Add | DeltaType::Update => {
                let nested = pair.value();
                let reusable = nested.delta_type() != DeltaType::Add
                    && target
                        .get(pair.key())
                        .map_or(false, |builder| builder.key() == nested.key());
                if reusable {
                    if let Some(builder) = target.get_mut(pair.key()) {
                        builder.apply_delta(nested)?;
                    }
                } else {
                    target.insert(pair.key().clone(), nested.to_builder()?);
                }
            }
            DeltaType::Delete => {
                target.remove(pair.key());
            }
        }
    }
    Ok(())
}

/// Merge a map-entry delta into a per-entry accumulator map.
pub fn add_key_model_pair_delta<K, M>(
    builders: &mut BTreeMap<K, KeyModelDeltaPairDeltaBuilder<K, M>>,
    delta: &KeyModelDeltaPairDelta<K, DeltaOf<M>>,
) -> Result<()>
where
    K: Clone + Ord + Debug,
    M: Model,
{
    match builders.get_mut(delta.key()) {
        Some(builder) => {
            builder.add_delta(delta)?;
        }
        None => {
            builders.insert(delta.key().clone(), delta.to_delta_builder());
        }
    }
    Ok(())
}

/// Collapse per-entry accumulators into element deltas, dropping entries
/// whose nested delta became a no-op.
pub fn build_key_model_pair_deltas<K, M>(
    builders: &BTreeMap<K, KeyModelDeltaPairDeltaBuilder<K, M>>,
) -> Vec<KeyModelDeltaPairDelta<K, DeltaOf<M>>>
where
    K: Clone + Ord + Debug,
    M: Model,
{
    builders
        .values()
        .filter_map(KeyModelDeltaPairDeltaBuilder::build_delta)
        .collect()
}
