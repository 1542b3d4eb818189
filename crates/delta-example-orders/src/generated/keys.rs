// @generated by delta-codegen. Do not edit by hand.

#[allow(unused_imports)]
use super::*;

/// The `LineKey` composite key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LineKey {
    pub order: u64,
    pub line: u32,
}
