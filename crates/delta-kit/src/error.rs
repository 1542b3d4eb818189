//! Error types for the diff/patch algebra.

use core::fmt::Debug;

use thiserror::Error;

/// Errors raised when the algebra is misused or fed unsupported metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeltaError {
    /// A delta, builder or reference belongs to a different record than the
    /// one the operation targets.
    #[error("identity mismatch in {operation}: expected key {expected}, found {found}")]
    IdentityMismatch {
        /// The operation that detected the mismatch.
        operation: &'static str,
        /// Debug rendering of the key the operation expected.
        expected: String,
        /// Debug rendering of the key it was handed.
        found: String,
    },

    /// Field metadata describes a kind combination the algebra cannot handle.
    #[error("unsupported field kind for `{model}.{field}`: {reason}")]
    UnsupportedFieldKind {
        /// Model the field belongs to.
        model: String,
        /// Offending field, empty when the problem concerns the whole model.
        field: String,
        /// Human-readable description.
        reason: String,
    },
}

impl DeltaError {
    /// Build an [`DeltaError::IdentityMismatch`] from the two keys involved.
    pub fn identity_mismatch<K: Debug + ?Sized>(
        operation: &'static str,
        expected: &K,
        found: &K,
    ) -> Self {
        DeltaError::IdentityMismatch {
            operation,
            expected: format!("{expected:?}"),
            found: format!("{found:?}"),
        }
    }

    pub(crate) fn unsupported(
        model: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        DeltaError::UnsupportedFieldKind {
            model: model.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = core::result::Result<T, DeltaError>;

/// Fail with [`DeltaError::IdentityMismatch`] unless both keys are equal.
///
/// ```
/// use delta_kit::{ensure_same_key, DeltaError};
///
/// assert!(ensure_same_key("apply_delta", &1u32, &1u32).is_ok());
/// assert!(matches!(
///     ensure_same_key("apply_delta", &1u32, &2u32),
///     Err(DeltaError::IdentityMismatch { .. })
/// ));
/// ```
pub fn ensure_same_key<K: PartialEq + Debug + ?Sized>(
    operation: &'static str,
    expected: &K,
    found: &K,
) -> Result<()> {
    if expected == found {
        return Ok(());
    }
    tracing::warn!(operation, ?expected, ?found, "identity mismatch");
    Err(DeltaError::identity_mismatch(operation, expected, found))
}
