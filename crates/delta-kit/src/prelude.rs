//! Convenient re-exports for common usage.
//!
//! ```
//! use delta_kit::prelude::*;
//! ```

pub use crate::{
    DeltaError, DeltaType, KeyDelta, KeyModelDeltaPairDelta, KeyModelMap, KeySet, KeyValueMap,
    KeyValuePairDelta, Model, ModelBuilder, ModelDelta, ModelDeltaBuilder, Nested, Opaque, Scalar,
};

#[cfg(feature = "macros")]
pub use delta_kit_macros::model;
