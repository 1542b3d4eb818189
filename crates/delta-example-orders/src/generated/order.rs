// @generated by delta-codegen. Do not edit by hand.

#[allow(unused_imports)]
use super::*;
use delta_kit::prelude::*;

/// The `Order` model.
///
/// Schema fingerprint: `0xe5509246d1169124`.
#[model(fingerprint = 16523867865675632932)]
pub struct Order {
    #[key]
    id: u64,
    status: Scalar<Status>,
    customer: Nested<Customer>,
    placed_at: Opaque<Timestamp>,
    tags: KeySet<String>,
    notes: KeyValueMap<String, String>,
    lines: KeyModelMap<LineKey, LineItem>,
}
