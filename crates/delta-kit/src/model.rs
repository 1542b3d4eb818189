//! The four cooperating roles: [`Model`], [`ModelBuilder`], [`ModelDelta`]
//! and [`ModelDeltaBuilder`].
//!
//! A model type names its companions through associated types, and each
//! companion points back at the model, so generic code can move freely between
//! the roles of one record type. The `#[model]` attribute generates all four
//! implementations from a single struct declaration.

use core::cmp::Ordering;
use core::fmt::Debug;
use std::sync::Arc;

use crate::delta_type::DeltaType;
use crate::error::Result;
use crate::schema::ModelDescriptor;

/// Identity type of a model.
pub type KeyOf<M> = <M as Model>::Key;
/// Builder type of a model.
pub type BuilderOf<M> = <M as Model>::Builder;
/// Delta type of a model.
pub type DeltaOf<M> = <M as Model>::Delta;
/// Delta builder type of a model.
pub type DeltaBuilderOf<M> = <M as Model>::DeltaBuilder;

/// An immutable snapshot of a versioned record.
///
/// Models are shared behind [`Arc`]; builders reuse the `Arc`s of untouched
/// fields, so an unmodified edit session never allocates a new model.
pub trait Model: Debug + PartialEq + Sized + 'static {
    /// The immutable identity of a record.
    type Key: Clone + Ord + Debug;
    /// Mutable working copy.
    type Builder: ModelBuilder<Model = Self>;
    /// Immutable structural diff.
    type Delta: ModelDelta<Model = Self>;
    /// Mutable diff accumulator.
    type DeltaBuilder: ModelDeltaBuilder<Model = Self>;

    /// Static field metadata for this model type.
    fn descriptor() -> &'static ModelDescriptor;

    /// Structural fingerprint of the model's field layout.
    fn fingerprint() -> u64 {
        Self::descriptor().fingerprint()
    }

    /// The record's identity.
    fn key(&self) -> &Self::Key;

    /// A model with the given key and every field at its zero value.
    fn empty(key: Self::Key) -> Self;

    /// An editing copy whose reference is `self`.
    fn to_builder(self: &Arc<Self>) -> Self::Builder {
        Self::Builder::from_reference(Arc::clone(self))
    }

    /// A skeleton builder with the same key and no reference.
    fn to_builder_empty(&self) -> Self::Builder {
        Self::Builder::new(self.key().clone())
    }

    /// Describe this model as a delta of the given type.
    ///
    /// `Add` and `Update` carry the full content, diffed against an empty
    /// skeleton. `Delete` carries the teardown of every populated field.
    fn to_delta(self: &Arc<Self>, delta_type: DeltaType) -> Result<Option<Self::Delta>> {
        match delta_type {
            DeltaType::Add | DeltaType::Update => self
                .to_builder()
                .reconcile_against(delta_type, &Self::empty(self.key().clone())),
            DeltaType::Delete => self
                .to_builder_empty()
                .reconcile_against(DeltaType::Delete, &**self),
        }
    }

    /// Order two models by key.
    fn cmp_by_key(&self, other: &Self) -> Ordering {
        self.key().cmp(other.key())
    }
}

/// A mutable staging object for exactly one record identity.
///
/// Each field starts deferred to the reference and is materialized on first
/// mutable access. Once materialized it stays touched for the builder's
/// lifetime.
pub trait ModelBuilder: Debug + Sized {
    /// The model this builder produces.
    type Model: Model<Builder = Self>;

    /// A fresh builder with no reference: every field touched and zeroed.
    fn new(key: KeyOf<Self::Model>) -> Self;

    /// An editing builder over an existing model.
    fn from_reference(reference: Arc<Self::Model>) -> Self;

    /// The identity this builder edits.
    fn key(&self) -> &KeyOf<Self::Model>;

    /// The reference model, if the builder was created from one.
    fn reference(&self) -> Option<&Arc<Self::Model>>;

    /// The type of the last delta applied, if any.
    fn last_delta_type(&self) -> Option<DeltaType>;

    /// Overwrite the recorded last delta type.
    fn set_last_delta_type(&mut self, delta_type: Option<DeltaType>) -> &mut Self;

    /// Whether any field has been materialized.
    fn is_touched(&self) -> bool;

    /// Touch every field, set it to its zero value and forget the last delta
    /// type.
    fn reset(&mut self) -> &mut Self;

    /// Materialize every field, recursing into nested builders.
    fn init(&mut self) -> &mut Self;

    /// Freeze the builder into a model.
    ///
    /// Returns `None` after a delete. Returns the reference itself when no
    /// field was touched.
    fn build(&self) -> Option<Arc<Self::Model>>;

    /// A model with this builder's key and every field at its zero value.
    fn build_empty(&self) -> Arc<Self::Model> {
        Arc::new(<Self::Model as Model>::empty(self.key().clone()))
    }

    /// Patch the builder in place.
    fn apply_delta(&mut self, delta: &DeltaOf<Self::Model>) -> Result<&mut Self>;

    /// Record into `deltas` every difference between this builder and
    /// `reference`.
    fn reconcile_into(
        &self,
        deltas: &mut DeltaBuilderOf<Self::Model>,
        reference: &Self::Model,
    ) -> Result<()>;

    /// Diff the builder against its own reference, or against an empty
    /// skeleton when it has none.
    fn reconcile(&self) -> Result<Option<DeltaOf<Self::Model>>> {
        let delta_type = if self.last_delta_type() == Some(DeltaType::Delete) {
            DeltaType::Delete
        } else if self.reference().is_none() {
            DeltaType::Add
        } else {
            DeltaType::Update
        };
        match self.reference() {
            Some(reference) => self.reconcile_against(delta_type, &**reference),
            None => self.reconcile_against(delta_type, &*self.build_empty()),
        }
    }

    /// Diff the builder against an arbitrary same-key reference.
    fn reconcile_against(
        &self,
        delta_type: DeltaType,
        reference: &Self::Model,
    ) -> Result<Option<DeltaOf<Self::Model>>> {
        let mut deltas = DeltaBuilderOf::<Self::Model>::new(delta_type, self.key().clone());
        self.reconcile_into(&mut deltas, reference)?;
        Ok(deltas.build_delta())
    }

    /// Describe the builder's current state as a delta of the given type.
    fn to_delta(&self, delta_type: DeltaType) -> Result<Option<DeltaOf<Self::Model>>> {
        match delta_type {
            DeltaType::Add | DeltaType::Update => {
                self.reconcile_against(delta_type, &*self.build_empty())
            }
            DeltaType::Delete => {
                let teardown = Self::new(self.key().clone());
                let pristine = !self.is_touched() && self.last_delta_type() != Some(DeltaType::Delete);
                match self.reference().filter(|_| pristine) {
                    Some(reference) => teardown.reconcile_against(DeltaType::Delete, reference),
                    None => {
                        let current = self.build().unwrap_or_else(|| self.build_empty());
                        teardown.reconcile_against(DeltaType::Delete, &*current)
                    }
                }
            }
        }
    }
}

/// An immutable description of the difference between two versions of a
/// model.
///
/// Every field is optional: `Some` means the field carries information and
/// must be applied.
pub trait ModelDelta: Clone + PartialEq + Debug + Sized {
    /// The model this delta describes.
    type Model: Model<Delta = Self>;

    /// Whole-record intent.
    fn delta_type(&self) -> DeltaType;

    /// Identity of the described record.
    fn key(&self) -> &KeyOf<Self::Model>;

    /// Whether any field carries information.
    fn has_changes(&self) -> bool;

    /// An accumulator seeded with this delta.
    fn to_delta_builder(&self) -> DeltaBuilderOf<Self::Model>;

    /// A fresh builder for this delta's key with the delta applied.
    fn to_builder(&self) -> Result<BuilderOf<Self::Model>> {
        let mut builder = BuilderOf::<Self::Model>::new(self.key().clone());
        builder.apply_delta(self)?;
        Ok(builder)
    }
}

/// A mutable accumulator that merges several deltas of one record into a
/// single minimal delta.
pub trait ModelDeltaBuilder: Debug + Sized {
    /// The model whose deltas are accumulated.
    type Model: Model<DeltaBuilder = Self>;

    /// An empty accumulator.
    fn new(delta_type: DeltaType, key: KeyOf<Self::Model>) -> Self;

    /// Identity of the accumulated record.
    fn key(&self) -> &KeyOf<Self::Model>;

    /// Current whole-record intent.
    fn delta_type(&self) -> DeltaType;

    /// The intent the accumulator was created with.
    fn initial_delta_type(&self) -> DeltaType;

    /// Overwrite the current intent.
    fn set_delta_type(&mut self, delta_type: DeltaType) -> &mut Self;

    /// Restore the initial intent (an initial delete restores to update).
    fn reset_delta_type(&mut self) -> &mut Self;

    /// Merge another delta of the same record.
    fn add_delta(&mut self, delta: &DeltaOf<Self::Model>) -> Result<&mut Self>;

    /// Collapse into a delta, or `None` for an update that changes nothing.
    fn build_delta(&self) -> Option<DeltaOf<Self::Model>>;
}
