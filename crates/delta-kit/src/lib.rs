//! # delta-kit
//!
//! A diff/patch algebra for immutable, versioned record graphs.
//!
//! Each record type plays four cooperating roles:
//!
//! - a [`Model`]: an immutable snapshot identified by a key,
//! - a [`ModelBuilder`]: a mutable working copy that defers to its reference
//!   until a field is first mutated,
//! - a [`ModelDelta`]: an immutable, minimal description of what changed,
//! - a [`ModelDeltaBuilder`]: an accumulator that merges several deltas of
//!   one record into one.
//!
//! Fields are scalars, opaque values, nested models, key sets, key/value maps
//! or key/model maps (see [`field`]). Reconciliation recurses into nested
//! models, and untouched fields are shared with the reference rather than
//! copied.
//!
//! ## Quick Start
//!
//! ```
//! use delta_kit::prelude::*;
//!
//! #[model]
//! pub struct Contact {
//!     #[key]
//!     id: u32,
//!     name: Scalar<String>,
//!     tags: KeySet<String>,
//! }
//!
//! let mut builder = Contact::builder(1);
//! builder.set_name("Ada".to_string());
//! let original = builder.build().unwrap();
//!
//! // Unmodified builders return the reference itself.
//! assert!(std::sync::Arc::ptr_eq(&original.to_builder().build().unwrap(), &original));
//!
//! let mut edit = original.to_builder();
//! edit.tags_mut().insert("vip".to_string());
//! let delta = edit.reconcile().unwrap().unwrap();
//! assert_eq!(delta.delta_type(), DeltaType::Update);
//! assert!(!delta.has_name());
//!
//! let mut replica = original.to_builder();
//! replica.apply_delta(&delta).unwrap();
//! assert_eq!(replica.build(), edit.build());
//! ```
//!
//! ## Errors
//!
//! Mixing deltas, builders or references of different records is a contract
//! violation reported as [`DeltaError::IdentityMismatch`].

#![warn(missing_docs)]

mod delta_type;
mod element;
mod error;
mod model;

pub mod field;
pub mod prelude;
pub mod reconcile;
pub mod schema;

pub use delta_type::{DeltaType, DeltaTypeState};
pub use element::{
    KeyDelta, KeyDeltaBuilder, KeyModelDeltaPairDelta, KeyModelDeltaPairDeltaBuilder,
    KeyValuePairDelta, KeyValuePairDeltaBuilder,
};
pub use error::{ensure_same_key, DeltaError, Result};
pub use field::{
    DeltaSlot, FieldKind, FieldView, KeyModelMap, KeySet, KeyValueMap, Nested, Opaque, Scalar,
    Slot,
};
pub use model::{
    BuilderOf, DeltaBuilderOf, DeltaOf, KeyOf, Model, ModelBuilder, ModelDelta,
    ModelDeltaBuilder,
};
pub use schema::{FieldDescriptor, FieldModifier, ModelDescriptor, ValueKind};

/// Attribute macro generating the builder, delta and delta builder of a
/// model struct.
#[cfg(feature = "macros")]
pub use delta_kit_macros::model;

#[doc(hidden)]
pub mod __private {
    pub use tracing;
}
