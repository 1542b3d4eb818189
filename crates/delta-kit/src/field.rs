//! Field kinds and the per-field state held by builders and delta builders.
//!
//! Every `val` field of a model is declared with one of six marker types.
//! The marker fixes four representations of the field:
//!
//! | kind | model value | builder working copy | delta payload |
//! |------|-------------|----------------------|---------------|
//! | [`Scalar<T>`] | `T` | `T` | `T` |
//! | [`Opaque<T>`] | `Option<T>` | `Option<T>` | `Option<T>` |
//! | [`Nested<M>`] | `Option<Arc<M>>` | `Option<M::Builder>` | `M::Delta` |
//! | [`KeySet<K>`] | `Arc<BTreeSet<K>>` | `BTreeSet<K>` | `Vec<KeyDelta<K>>` |
//! | [`KeyValueMap<K, V>`] | `Arc<BTreeMap<K, V>>` | `BTreeMap<K, V>` | `Vec<KeyValuePairDelta<K, V>>` |
//! | [`KeyModelMap<K, M>`] | `Arc<BTreeMap<K, Arc<M>>>` | `BTreeMap<K, M::Builder>` | `Vec<KeyModelDeltaPairDelta<K, M::Delta>>` |
//!
//! Builders store each field in a [`Slot`], which defers to the reference
//! value until the field is first mutated. Delta builders store each field in
//! a [`DeltaSlot`], which accumulates payloads until the delta is built.

use core::fmt::{self, Debug};
use core::marker::PhantomData;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::delta_type::DeltaType;
use crate::element::{
    KeyDelta, KeyDeltaBuilder, KeyModelDeltaPairDelta, KeyModelDeltaPairDeltaBuilder,
    KeyValuePairDelta, KeyValuePairDeltaBuilder,
};
use crate::error::Result;
use crate::model::{BuilderOf, DeltaBuilderOf, DeltaOf, Model, ModelBuilder, ModelDelta, ModelDeltaBuilder};
use crate::reconcile;
use crate::schema::ValueKind;

/// Diff and patch behaviour of one field kind.
pub trait FieldKind {
    /// Immutable representation stored in the model.
    type Value: Clone + PartialEq + Debug;
    /// Mutable representation stored in a touched builder slot.
    type Working: Debug;
    /// Payload carried by a delta when the field changed.
    type Delta: Clone + PartialEq + Debug;
    /// Merge state held by a delta builder.
    type Pending: Default + Debug;

    /// Metadata tag of this kind.
    const KIND: ValueKind;

    /// Zero value for a freshly created model.
    fn empty() -> Self::Value;

    /// Zero value for a reset builder slot.
    fn zero() -> Self::Working;

    /// Derive a working copy from the reference value.
    fn materialize(value: &Self::Value) -> Self::Working;

    /// Freeze a working copy back into an immutable value.
    fn freeze(working: &Self::Working) -> Self::Value;

    /// Diff two immutable values.
    fn diff(reference: &Self::Value, current: &Self::Value) -> Result<Option<Self::Delta>>;

    /// Diff a working copy against an immutable reference value.
    fn diff_working(reference: &Self::Value, current: &Self::Working) -> Result<Option<Self::Delta>>;

    /// Patch a working copy.
    fn apply(working: &mut Self::Working, delta: &Self::Delta) -> Result<()>;

    /// Merge state seeded from a single payload.
    fn pending(delta: &Self::Delta) -> Self::Pending;

    /// Merge another payload into the pending state.
    fn merge(pending: &mut Self::Pending, delta: &Self::Delta) -> Result<()>;

    /// Collapse the pending state; `None` when it carries nothing.
    fn settle(pending: &Self::Pending) -> Option<Self::Delta>;

    /// Materialize nested builders below a working copy.
    fn init(_working: &mut Self::Working) {}
}

/// Kinds whose working copy can be read straight from the reference value.
pub trait FieldView: FieldKind {
    /// Borrow the reference value as if it were a working copy.
    fn view(value: &Self::Value) -> &Self::Working;
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

// ── Scalar ──────────────────────────────────────────────────────────

/// Primitive, enum or key-typed field compared by equality.
///
/// The zero value is `T::default()`.
#[derive(Debug)]
pub struct Scalar<T>(PhantomData<T>);

impl<T> FieldKind for Scalar<T>
where
    T: Clone + PartialEq + Debug + Default,
{
    type Value = T;
    type Working = T;
    type Delta = T;
    type Pending = Option<T>;

    const KIND: ValueKind = ValueKind::Scalar;

    fn empty() -> T {
        T::default()
    }

    fn zero() -> T {
        T::default()
    }

    fn materialize(value: &T) -> T {
        value.clone()
    }

    fn freeze(working: &T) -> T {
        working.clone()
    }

    fn diff(reference: &T, current: &T) -> Result<Option<T>> {
        Ok(reconcile::reconcile_scalar(reference, current).map(|(_, value)| value))
    }

    fn diff_working(reference: &T, current: &T) -> Result<Option<T>> {
        Self::diff(reference, current)
    }

    fn apply(working: &mut T, delta: &T) -> Result<()> {
        *working = delta.clone();
        Ok(())
    }

    fn pending(delta: &T) -> Option<T> {
        Some(delta.clone())
    }

    fn merge(pending: &mut Option<T>, delta: &T) -> Result<()> {
        *pending = Some(delta.clone());
        Ok(())
    }

    fn settle(pending: &Option<T>) -> Option<T> {
        pending.clone()
    }
}

impl<T> FieldView for Scalar<T>
where
    T: Clone + PartialEq + Debug + Default,
{
    fn view(value: &T) -> &T {
        value
    }
}

// ── Opaque ──────────────────────────────────────────────────────────

/// Externally defined immutable type; absent by default.
#[derive(Debug)]
pub struct Opaque<T>(PhantomData<T>);

impl<T> FieldKind for Opaque<T>
where
    T: Clone + PartialEq + Debug,
{
    type Value = Option<T>;
    type Working = Option<T>;
    type Delta = Option<T>;
    type Pending = Option<Option<T>>;

    const KIND: ValueKind = ValueKind::Opaque;

    fn empty() -> Option<T> {
        None
    }

    fn zero() -> Option<T> {
        None
    }

    fn materialize(value: &Option<T>) -> Option<T> {
        value.clone()
    }

    fn freeze(working: &Option<T>) -> Option<T> {
        working.clone()
    }

    fn diff(reference: &Option<T>, current: &Option<T>) -> Result<Option<Option<T>>> {
        Ok(reconcile::reconcile_scalar(reference, current).map(|(_, value)| value))
    }

    fn diff_working(reference: &Option<T>, current: &Option<T>) -> Result<Option<Option<T>>> {
        Self::diff(reference, current)
    }

    fn apply(working: &mut Option<T>, delta: &Option<T>) -> Result<()> {
        *working = delta.clone();
        Ok(())
    }

    fn pending(delta: &Option<T>) -> Option<Option<T>> {
        Some(delta.clone())
    }

    fn merge(pending: &mut Option<Option<T>>, delta: &Option<T>) -> Result<()> {
        *pending = Some(delta.clone());
        Ok(())
    }

    fn settle(pending: &Option<Option<T>>) -> Option<Option<T>> {
        pending.clone()
    }
}

impl<T> FieldView for Opaque<T>
where
    T: Clone + PartialEq + Debug,
{
    fn view(value: &Option<T>) -> &Option<T> {
        value
    }
}

// ── Nested model ────────────────────────────────────────────────────

/// Optional nested model, diffed recursively.
#[derive(Debug)]
pub struct Nested<M>(PhantomData<M>);

impl<M: Model> FieldKind for Nested<M> {
    type Value = Option<Arc<M>>;
    type Working = Option<BuilderOf<M>>;
    type Delta = DeltaOf<M>;
    type Pending = Option<DeltaBuilderOf<M>>;

    const KIND: ValueKind = ValueKind::Nested;

    fn empty() -> Self::Value {
        None
    }

    fn zero() -> Self::Working {
        None
    }

    fn materialize(value: &Self::Value) -> Self::Working {
        value.as_ref().map(|model| model.to_builder())
    }

    fn freeze(working: &Self::Working) -> Self::Value {
        working.as_ref().and_then(|builder| builder.build())
    }

    fn diff(reference: &Self::Value, current: &Self::Value) -> Result<Option<Self::Delta>> {
        reconcile::reconcile_model_field(reference.as_ref(), current.as_ref())
    }

    fn diff_working(reference: &Self::Value, current: &Self::Working) -> Result<Option<Self::Delta>> {
        reconcile::reconcile_model_builder_field::<M>(reference.as_ref(), current.as_ref())
    }

    fn apply(working: &mut Self::Working, delta: &Self::Delta) -> Result<()> {
        reconcile::apply_model_delta::<M>(delta, working)
    }

    fn pending(delta: &Self::Delta) -> Self::Pending {
        Some(delta.to_delta_builder())
    }

    fn merge(pending: &mut Self::Pending, delta: &Self::Delta) -> Result<()> {
        let mergeable = pending
            .as_ref()
            .map_or(false, |builder| {
                delta.delta_type() == DeltaType::Update && builder.key() == delta.key()
            });
        if !mergeable {
            *pending = Some(delta.to_delta_builder());
        } else if let Some(builder) = pending.as_mut() {
            builder.add_delta(delta)?;
        }
        Ok(())
    }

    fn settle(pending: &Self::Pending) -> Option<Self::Delta> {
        pending.as_ref().and_then(|builder| builder.build_delta())
    }

    fn init(working: &mut Self::Working) {
        if let Some(builder) = working {
            builder.init();
        }
    }
}

// ── Key set ─────────────────────────────────────────────────────────

/// Set of keys; members carry no payload beyond membership.
#[derive(Debug)]
pub struct KeySet<K>(PhantomData<K>);

impl<K> FieldKind for KeySet<K>
where
    K: Clone + Ord + Debug,
{
    type Value = Arc<BTreeSet<K>>;
    type Working = BTreeSet<K>;
    type Delta = Vec<KeyDelta<K>>;
    type Pending = BTreeMap<K, KeyDeltaBuilder<K>>;

    const KIND: ValueKind = ValueKind::KeySet;

    fn empty() -> Self::Value {
        Arc::default()
    }

    fn zero() -> Self::Working {
        BTreeSet::new()
    }

    fn materialize(value: &Self::Value) -> Self::Working {
        (**value).clone()
    }

    fn freeze(working: &Self::Working) -> Self::Value {
        Arc::new(working.clone())
    }

    fn diff(reference: &Self::Value, current: &Self::Value) -> Result<Option<Self::Delta>> {
        if Arc::ptr_eq(reference, current) {
            return Ok(None);
        }
        Self::diff_working(reference, current)
    }

    fn diff_working(reference: &Self::Value, current: &Self::Working) -> Result<Option<Self::Delta>> {
        Ok(non_empty(reconcile::reconcile_keys(reference, current)))
    }

    fn apply(working: &mut Self::Working, delta: &Self::Delta) -> Result<()> {
        reconcile::apply_key_deltas(delta, working);
        Ok(())
    }

    fn pending(delta: &Self::Delta) -> Self::Pending {
        delta
            .iter()
            .map(|element| (element.key().clone(), element.to_delta_builder()))
            .collect()
    }

    fn merge(pending: &mut Self::Pending, delta: &Self::Delta) -> Result<()> {
        delta
            .iter()
            .try_for_each(|element| reconcile::add_key_delta(pending, element))
    }

    fn settle(pending: &Self::Pending) -> Option<Self::Delta> {
        non_empty(reconcile::build_key_deltas(pending))
    }
}

impl<K> FieldView for KeySet<K>
where
    K: Clone + Ord + Debug,
{
    fn view(value: &Self::Value) -> &Self::Working {
        value
    }
}

// ── Key/value map ───────────────────────────────────────────────────

/// Map from keys to scalar values.
#[derive(Debug)]
pub struct KeyValueMap<K, V>(PhantomData<(K, V)>);

impl<K, V> FieldKind for KeyValueMap<K, V>
where
    K: Clone + Ord + Debug,
    V: Clone + PartialEq + Debug,
{
    type Value = Arc<BTreeMap<K, V>>;
    type Working = BTreeMap<K, V>;
    type Delta = Vec<KeyValuePairDelta<K, V>>;
    type Pending = BTreeMap<K, KeyValuePairDeltaBuilder<K, V>>;

    const KIND: ValueKind = ValueKind::KeyValueMap;

    fn empty() -> Self::Value {
        Arc::default()
    }

    fn zero() -> Self::Working {
        BTreeMap::new()
    }

    fn materialize(value: &Self::Value) -> Self::Working {
        (**value).clone()
    }

    fn freeze(working: &Self::Working) -> Self::Value {
        Arc::new(working.clone())
    }

    fn diff(reference: &Self::Value, current: &Self::Value) -> Result<Option<Self::Delta>> {
        if Arc::ptr_eq(reference, current) {
            return Ok(None);
        }
        Self::diff_working(reference, current)
    }

    fn diff_working(reference: &Self::Value, current: &Self::Working) -> Result<Option<Self::Delta>> {
        Ok(non_empty(reconcile::reconcile_key_value_pairs(reference, current)))
    }

    fn apply(working: &mut Self::Working, delta: &Self::Delta) -> Result<()> {
        reconcile::apply_key_value_pair_deltas(delta, working);
        Ok(())
    }

    fn pending(delta: &Self::Delta) -> Self::Pending {
        delta
            .iter()
            .map(|entry| (entry.key().clone(), entry.to_delta_builder()))
            .collect()
    }

    fn merge(pending: &mut Self::Pending, delta: &Self::Delta) -> Result<()> {
        delta
            .iter()
            .try_for_each(|entry| reconcile::add_key_value_pair_delta(pending, entry))
    }

    fn settle(pending: &Self::Pending) -> Option<Self::Delta> {
        non_empty(reconcile::build_key_value_pair_deltas(pending))
    }
}

impl<K, V> FieldView for KeyValueMap<K, V>
where
    K: Clone + Ord + Debug,
    V: Clone + PartialEq + Debug,
{
    fn view(value: &Self::Value) -> &Self::Working {
        value
    }
}

// ── Key/model map ───────────────────────────────────────────────────

/// Map from keys to nested models, diffed entry by entry.
#[derive(Debug)]
pub struct KeyModelMap<K, M>(PhantomData<(K, M)>);

impl<K, M> FieldKind for KeyModelMap<K, M>
where
    K: Clone + Ord + Debug,
    M: Model,
{
    type Value = Arc<BTreeMap<K, Arc<M>>>;
    type Working = BTreeMap<K, BuilderOf<M>>;
    type Delta = Vec<KeyModelDeltaPairDelta<K, DeltaOf<M>>>;
    type Pending = BTreeMap<K, KeyModelDeltaPairDeltaBuilder<K, M>>;

    const KIND: ValueKind = ValueKind::KeyModelMap;

    fn empty() -> Self::Value {
        Arc::default()
    }

    fn zero() -> Self::Working {
        BTreeMap::new()
    }

    fn materialize(value: &Self::Value) -> Self::Working {
        value
            .iter()
            .map(|(key, model)| (key.clone(), model.to_builder()))
            .collect()
    }

    fn freeze(working: &Self::Working) -> Self::Value {
        Arc::new(
            working
                .iter()
                .filter_map(|(key, builder)| builder.build().map(|model| (key.clone(), model)))
                .collect(),
        )
    }

    fn diff(reference: &Self::Value, current: &Self::Value) -> Result<Option<Self::Delta>> {
        if Arc::ptr_eq(reference, current) {
            return Ok(None);
        }
        Ok(non_empty(reconcile::reconcile_key_model_pairs(reference, current)?))
    }

    fn diff_working(reference: &Self::Value, current: &Self::Working) -> Result<Option<Self::Delta>> {
        Ok(non_empty(reconcile::reconcile_key_model_builder_pairs::<K, M>(
            reference, current,
        )?))
    }

    fn apply(working: &mut Self::Working, delta: &Self::Delta) -> Result<()> {
        reconcile::apply_key_model_pair_deltas::<K, M>(delta, working)
    }

    fn pending(delta: &Self::Delta) -> Self::Pending {
        delta
            .iter()
            .map(|entry| (entry.key().clone(), entry.to_delta_builder()))
            .collect()
    }

    fn merge(pending: &mut Self::Pending, delta: &Self::Delta) -> Result<()> {
        delta
            .iter()
            .try_for_each(|entry| reconcile::add_key_model_pair_delta(pending, entry))
    }

    fn settle(pending: &Self::Pending) -> Option<Self::Delta> {
        non_empty(reconcile::build_key_model_pair_deltas(pending))
    }

    fn init(working: &mut Self::Working) {
        for builder in working.values_mut() {
            builder.init();
        }
    }
}

// ── Builder slot ────────────────────────────────────────────────────

/// Builder-side state of one field.
///
/// A slot starts either deferred (mirroring the reference value, which is
/// shared, not copied) or touched (a fresh builder's zero value). The first
/// mutable access moves a deferred slot to touched; it never moves back.
pub enum Slot<F: FieldKind> {
    /// Mirrors the reference value.
    Deferred(F::Value),
    /// Holds a materialized working copy.
    Touched(F::Working),
}

impl<F: FieldKind> Slot<F> {
    /// A slot mirroring `value`.
    pub fn deferred(value: F::Value) -> Self {
        Slot::Deferred(value)
    }

    /// A touched slot holding the kind's zero value.
    pub fn zeroed() -> Self {
        Slot::Touched(F::zero())
    }

    /// Whether the slot has been materialized.
    #[must_use]
    pub fn is_touched(&self) -> bool {
        matches!(self, Slot::Touched(_))
    }

    /// Materialize if needed and borrow the working copy mutably.
    pub fn touch(&mut self) -> &mut F::Working {
        if let Slot::Deferred(value) = self {
            let working = F::materialize(value);
            *self = Slot::Touched(working);
        }
        match self {
            Slot::Touched(working) => working,
            Slot::Deferred(_) => unreachable!("deferred slot was just materialized"),
        }
    }

    /// Alias of [`Slot::touch`].
    pub fn get_mut(&mut self) -> &mut F::Working {
        self.touch()
    }

    /// Replace the working copy.
    pub fn set(&mut self, working: F::Working) {
        *self = Slot::Touched(working);
    }

    /// Immutable value of the slot; deferred slots share the reference value.
    #[must_use]
    pub fn freeze(&self) -> F::Value {
        match self {
            Slot::Deferred(value) => value.clone(),
            Slot::Touched(working) => F::freeze(working),
        }
    }

    /// Diff the slot against a reference value.
    pub fn diff(&self, reference: &F::Value) -> Result<Option<F::Delta>> {
        match self {
            Slot::Deferred(value) => F::diff(reference, value),
            Slot::Touched(working) => F::diff_working(reference, working),
        }
    }

    /// Patch the slot, materializing it first.
    pub fn apply(&mut self, delta: &F::Delta) -> Result<()> {
        F::apply(self.touch(), delta)
    }

    /// Materialize the slot and every nested builder below it.
    pub fn init(&mut self) {
        F::init(self.touch());
    }
}

impl<F: FieldView> Slot<F> {
    /// Read the field without materializing it.
    #[must_use]
    pub fn get(&self) -> &F::Working {
        match self {
            Slot::Deferred(value) => F::view(value),
            Slot::Touched(working) => working,
        }
    }
}

impl<F: FieldKind> Debug for Slot<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Deferred(value) => f.debug_tuple("Deferred").field(value).finish(),
            Slot::Touched(working) => f.debug_tuple("Touched").field(working).finish(),
        }
    }
}

// ── Delta builder slot ──────────────────────────────────────────────

/// Delta-builder-side state of one field.
pub struct DeltaSlot<F: FieldKind> {
    pending: F::Pending,
}

impl<F: FieldKind> DeltaSlot<F> {
    /// An empty slot.
    pub fn new() -> Self {
        Self {
            pending: F::Pending::default(),
        }
    }

    /// A slot seeded from a delta's field payload.
    pub fn from_delta(delta: Option<&F::Delta>) -> Self {
        Self {
            pending: delta.map_or_else(F::Pending::default, F::pending),
        }
    }

    /// Merge a payload.
    pub fn add(&mut self, delta: &F::Delta) -> Result<()> {
        F::merge(&mut self.pending, delta)
    }

    /// Collapse the accumulated payloads.
    #[must_use]
    pub fn build(&self) -> Option<F::Delta> {
        F::settle(&self.pending)
    }

    /// The raw merge state.
    #[must_use]
    pub fn pending(&self) -> &F::Pending {
        &self.pending
    }
}

impl<F: FieldKind> Default for DeltaSlot<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FieldKind> Debug for DeltaSlot<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeltaSlot")
            .field("pending", &self.pending)
            .finish()
    }
}
